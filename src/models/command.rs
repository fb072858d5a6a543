//! Intent, entity and command models produced by the interpreter.
//!
//! [`Intent`] is the closed set of labels the matcher can emit. Each label
//! declares a static [`EntitySchema`]; [`Command::from_entities`] is the only
//! way to turn a label plus loosely-collected [`Entities`] into a typed
//! [`Command`], so executors never branch on strings.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::nlu::ParseError;

/// Canonical action a message is classified as requesting.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// List the user's open tasks.
    ListTasks,
    /// Show details for one or more tasks.
    ShowTask,
    /// Mark one or more tasks as done.
    CompleteTask,
    /// Mark one or more tasks as in progress.
    StartTask,
    /// Delete one or more tasks (requires confirmation).
    DeleteTask,
    /// Create a new task.
    CreateTask,
    /// Change the priority of one or more tasks.
    SetPriority,
    /// Move the due date of one or more tasks.
    PostponeTask,
    /// Ask what the assistant can do.
    Help,
    /// Small-talk greeting.
    Greeting,
    /// Explicit cancellation phrase outside of a pending dialogue.
    Cancel,
    /// Nothing matched.
    None,
}

/// Named slot an entity value is stored under.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum EntityName {
    /// Task indices as shown in the last listing (1-based).
    Indices,
    /// Free-text task title.
    Title,
    /// Priority tier.
    Priority,
    /// Due date.
    Date,
    /// Project name.
    Project,
}

impl EntityName {
    /// Stable label used in logs and capture-group names.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Indices => "indices",
            Self::Title => "title",
            Self::Priority => "priority",
            Self::Date => "date",
            Self::Project => "project",
        }
    }
}

/// Statically declared entities for an intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntitySchema {
    /// Entities that must be present before dispatch, in prompting order.
    pub required: &'static [EntityName],
    /// Entities that may be captured but are never prompted for.
    pub optional: &'static [EntityName],
}

const NO_ENTITIES: EntitySchema = EntitySchema {
    required: &[],
    optional: &[],
};

const INDICES_ONLY: EntitySchema = EntitySchema {
    required: &[EntityName::Indices],
    optional: &[],
};

impl Intent {
    /// Entity schema declared for this intent.
    #[must_use]
    pub fn schema(self) -> EntitySchema {
        match self {
            Self::ShowTask | Self::CompleteTask | Self::StartTask | Self::DeleteTask => INDICES_ONLY,
            Self::CreateTask => EntitySchema {
                required: &[EntityName::Title],
                optional: &[EntityName::Priority, EntityName::Date, EntityName::Project],
            },
            Self::SetPriority => EntitySchema {
                required: &[EntityName::Indices, EntityName::Priority],
                optional: &[],
            },
            Self::PostponeTask => EntitySchema {
                required: &[EntityName::Indices, EntityName::Date],
                optional: &[],
            },
            Self::ListTasks | Self::Help | Self::Greeting | Self::Cancel | Self::None => {
                NO_ENTITIES
            }
        }
    }

    /// Whether this intent is dispatched to the task-store collaborator.
    #[must_use]
    pub fn is_actionable(self) -> bool {
        !matches!(self, Self::Help | Self::Greeting | Self::Cancel | Self::None)
    }

    /// Whether this intent must be confirmed before dispatch.
    #[must_use]
    pub fn requires_confirmation(self) -> bool {
        matches!(self, Self::DeleteTask)
    }

    /// Stable snake-case label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ListTasks => "list_tasks",
            Self::ShowTask => "show_task",
            Self::CompleteTask => "complete_task",
            Self::StartTask => "start_task",
            Self::DeleteTask => "delete_task",
            Self::CreateTask => "create_task",
            Self::SetPriority => "set_priority",
            Self::PostponeTask => "postpone_task",
            Self::Help => "help",
            Self::Greeting => "greeting",
            Self::Cancel => "cancel",
            Self::None => "none",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ascending, duplicate-free set of 1-based task indices.
///
/// Construct through [`crate::nlu::indices::normalize_indices`] or
/// [`IndexSet::try_from`]; both reject zero.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<u32>", into = "Vec<u32>")]
pub struct IndexSet(Vec<u32>);

impl IndexSet {
    /// Indices in ascending order.
    #[must_use]
    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    /// Number of indices in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false` for a constructed set; kept for API symmetry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TryFrom<Vec<u32>> for IndexSet {
    type Error = ParseError;

    fn try_from(mut values: Vec<u32>) -> std::result::Result<Self, Self::Error> {
        if values.is_empty() {
            return Err(ParseError::EmptyIndexList);
        }
        if values.contains(&0) {
            return Err(ParseError::ZeroIndex);
        }
        values.sort_unstable();
        values.dedup();
        Ok(Self(values))
    }
}

impl From<IndexSet> for Vec<u32> {
    fn from(set: IndexSet) -> Self {
        set.0
    }
}

impl fmt::Display for IndexSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<String> = self.0.iter().map(u32::to_string).collect();
        f.write_str(&joined.join(", "))
    }
}

/// Closed priority vocabulary.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    /// User-facing label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Low => "baixa",
            Self::Medium => "média",
            Self::High => "alta",
            Self::Urgent => "urgente",
        }
    }
}

/// Closed due-date vocabulary, resolved relative to a reference day.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DueDate {
    Today,
    Tomorrow,
    DayAfterTomorrow,
    NextWeek,
    /// Next occurrence of a weekday, never today.
    Weekday { day: Weekday },
    /// Explicit calendar day; the year defaults to the next occurrence.
    Calendar { day: u32, month: u32, year: Option<i32> },
}

impl DueDate {
    /// Resolve to a concrete date relative to `today`.
    ///
    /// Returns `None` only for calendar days that do not exist in the
    /// resolved year (e.g. 29/02 outside a leap year).
    #[must_use]
    pub fn resolve(self, today: NaiveDate) -> Option<NaiveDate> {
        match self {
            Self::Today => Some(today),
            Self::Tomorrow => Some(today + Duration::days(1)),
            Self::DayAfterTomorrow => Some(today + Duration::days(2)),
            Self::NextWeek => Some(today + Duration::days(7)),
            Self::Weekday { day } => {
                let current = i64::from(today.weekday().num_days_from_monday());
                let target = i64::from(day.num_days_from_monday());
                let mut ahead = (target - current).rem_euclid(7);
                if ahead == 0 {
                    ahead = 7;
                }
                Some(today + Duration::days(ahead))
            }
            Self::Calendar { day, month, year } => match year {
                Some(year) => NaiveDate::from_ymd_opt(year, month, day),
                None => {
                    let this_year = NaiveDate::from_ymd_opt(today.year(), month, day);
                    match this_year {
                        Some(date) if date >= today => Some(date),
                        _ => NaiveDate::from_ymd_opt(today.year() + 1, month, day),
                    }
                }
            },
        }
    }
}

/// Value resolved against a known vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum EnumeratedValue {
    Priority(Priority),
    Date(DueDate),
}

/// Typed entity value extracted from text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum EntityValue {
    IndexSet(IndexSet),
    FreeText(String),
    Enumerated(EnumeratedValue),
}

/// Named entity values collected for one intent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Entities(BTreeMap<EntityName, EntityValue>);

impl Entities {
    /// Empty entity map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a value.
    pub fn insert(&mut self, name: EntityName, value: EntityValue) {
        self.0.insert(name, value);
    }

    /// Look up a value.
    #[must_use]
    pub fn get(&self, name: EntityName) -> Option<&EntityValue> {
        self.0.get(&name)
    }

    /// Whether a value is present.
    #[must_use]
    pub fn contains(&self, name: EntityName) -> bool {
        self.0.contains_key(&name)
    }

    /// Number of captured entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no entity was captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn indices(&self) -> Option<IndexSet> {
        match self.get(EntityName::Indices) {
            Some(EntityValue::IndexSet(set)) => Some(set.clone()),
            _ => None,
        }
    }

    fn text(&self, name: EntityName) -> Option<String> {
        match self.get(name) {
            Some(EntityValue::FreeText(text)) => Some(text.clone()),
            _ => None,
        }
    }

    fn priority(&self) -> Option<Priority> {
        match self.get(EntityName::Priority) {
            Some(EntityValue::Enumerated(EnumeratedValue::Priority(p))) => Some(*p),
            _ => None,
        }
    }

    fn date(&self) -> Option<DueDate> {
        match self.get(EntityName::Date) {
            Some(EntityValue::Enumerated(EnumeratedValue::Date(d))) => Some(*d),
            _ => None,
        }
    }
}

/// Why entities could not be turned into a [`Command`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    /// A required entity is absent; the dialogue should ask for it.
    Missing(EntityName),
    /// The intent is answered locally and never becomes a command.
    NotActionable(Intent),
}

/// Typed, validated command ready for dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "intent", rename_all = "snake_case")]
pub enum Command {
    ListTasks,
    ShowTask {
        indices: IndexSet,
    },
    CompleteTask {
        indices: IndexSet,
    },
    StartTask {
        indices: IndexSet,
    },
    DeleteTask {
        indices: IndexSet,
    },
    CreateTask {
        title: String,
        priority: Option<Priority>,
        due: Option<DueDate>,
        project: Option<String>,
    },
    SetPriority {
        indices: IndexSet,
        priority: Priority,
    },
    PostponeTask {
        indices: IndexSet,
        due: DueDate,
    },
}

impl Command {
    /// Build a command from an intent's collected entities.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::Missing`] naming the first required entity (in
    /// schema order) that is absent, or [`CommandError::NotActionable`] for
    /// intents that are answered without a collaborator.
    pub fn from_entities(
        intent: Intent,
        entities: &Entities,
    ) -> std::result::Result<Self, CommandError> {
        if let Some(missing) = intent
            .schema()
            .required
            .iter()
            .copied()
            .find(|name| !entities.contains(*name))
        {
            return Err(CommandError::Missing(missing));
        }

        let indices = || entities.indices().ok_or(CommandError::Missing(EntityName::Indices));

        match intent {
            Intent::ListTasks => Ok(Self::ListTasks),
            Intent::ShowTask => Ok(Self::ShowTask { indices: indices()? }),
            Intent::CompleteTask => Ok(Self::CompleteTask { indices: indices()? }),
            Intent::StartTask => Ok(Self::StartTask { indices: indices()? }),
            Intent::DeleteTask => Ok(Self::DeleteTask { indices: indices()? }),
            Intent::CreateTask => Ok(Self::CreateTask {
                title: entities
                    .text(EntityName::Title)
                    .ok_or(CommandError::Missing(EntityName::Title))?,
                priority: entities.priority(),
                due: entities.date(),
                project: entities.text(EntityName::Project),
            }),
            Intent::SetPriority => Ok(Self::SetPriority {
                indices: indices()?,
                priority: entities
                    .priority()
                    .ok_or(CommandError::Missing(EntityName::Priority))?,
            }),
            Intent::PostponeTask => Ok(Self::PostponeTask {
                indices: indices()?,
                due: entities
                    .date()
                    .ok_or(CommandError::Missing(EntityName::Date))?,
            }),
            Intent::Help | Intent::Greeting | Intent::Cancel | Intent::None => {
                Err(CommandError::NotActionable(intent))
            }
        }
    }

    /// Intent label of this command.
    #[must_use]
    pub fn intent(&self) -> Intent {
        match self {
            Self::ListTasks => Intent::ListTasks,
            Self::ShowTask { .. } => Intent::ShowTask,
            Self::CompleteTask { .. } => Intent::CompleteTask,
            Self::StartTask { .. } => Intent::StartTask,
            Self::DeleteTask { .. } => Intent::DeleteTask,
            Self::CreateTask { .. } => Intent::CreateTask,
            Self::SetPriority { .. } => Intent::SetPriority,
            Self::PostponeTask { .. } => Intent::PostponeTask,
        }
    }

    /// Expand into independent single-task actions, one per index.
    #[must_use]
    pub fn actions(&self) -> Vec<TaskAction> {
        let per_index = |set: &IndexSet, build: &dyn Fn(u32) -> TaskAction| -> Vec<TaskAction> {
            set.as_slice().iter().copied().map(build).collect()
        };

        match self {
            Self::ListTasks => vec![TaskAction::List],
            Self::ShowTask { indices } => per_index(indices, &|index| TaskAction::Show { index }),
            Self::CompleteTask { indices } => {
                per_index(indices, &|index| TaskAction::Complete { index })
            }
            Self::StartTask { indices } => per_index(indices, &|index| TaskAction::Start { index }),
            Self::DeleteTask { indices } => {
                per_index(indices, &|index| TaskAction::Delete { index })
            }
            Self::CreateTask {
                title,
                priority,
                due,
                project,
            } => vec![TaskAction::Create {
                title: title.clone(),
                priority: *priority,
                due: *due,
                project: project.clone(),
            }],
            Self::SetPriority { indices, priority } => {
                let priority = *priority;
                per_index(indices, &move |index| TaskAction::SetPriority { index, priority })
            }
            Self::PostponeTask { indices, due } => {
                let due = *due;
                per_index(indices, &move |index| TaskAction::Postpone { index, due })
            }
        }
    }
}

/// One unit of work sent to the task store collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TaskAction {
    List,
    Show {
        index: u32,
    },
    Complete {
        index: u32,
    },
    Start {
        index: u32,
    },
    Delete {
        index: u32,
    },
    Create {
        title: String,
        priority: Option<Priority>,
        due: Option<DueDate>,
        project: Option<String>,
    },
    SetPriority {
        index: u32,
        priority: Priority,
    },
    Postpone {
        index: u32,
        due: DueDate,
    },
}

impl TaskAction {
    /// Task index this action targets, if any.
    #[must_use]
    pub fn index(&self) -> Option<u32> {
        match self {
            Self::List | Self::Create { .. } => None,
            Self::Show { index }
            | Self::Complete { index }
            | Self::Start { index }
            | Self::Delete { index }
            | Self::SetPriority { index, .. }
            | Self::Postpone { index, .. } => Some(*index),
        }
    }

    /// Intent this action was expanded from.
    #[must_use]
    pub fn intent(&self) -> Intent {
        match self {
            Self::List => Intent::ListTasks,
            Self::Show { .. } => Intent::ShowTask,
            Self::Complete { .. } => Intent::CompleteTask,
            Self::Start { .. } => Intent::StartTask,
            Self::Delete { .. } => Intent::DeleteTask,
            Self::Create { .. } => Intent::CreateTask,
            Self::SetPriority { .. } => Intent::SetPriority,
            Self::Postpone { .. } => Intent::PostponeTask,
        }
    }
}

/// How a candidate pattern matched the normalized text.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatchKind {
    /// All literal pattern text matched verbatim.
    Exact,
    /// The leading keyword was corrected by similarity before matching.
    Fuzzy { similarity: f64 },
}

/// Result of classifying one inbound message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedCommand {
    /// Raw text as received.
    pub original_text: String,
    /// Output of the normalizer.
    pub normalized_text: String,
    /// Classified intent (`None` when nothing matched).
    pub intent: Intent,
    /// Entities successfully resolved for the intent.
    pub entities: Entities,
    /// Scalar confidence in `0.0..=1.0`.
    pub confidence: f64,
    /// Identifier of the winning pattern, if any.
    pub matched_pattern_id: Option<String>,
    /// Exact or fuzzy match.
    pub match_kind: Option<MatchKind>,
}

impl ParsedCommand {
    /// Parsed command for text that matched nothing.
    #[must_use]
    pub fn unmatched(original_text: &str, normalized_text: &str) -> Self {
        Self {
            original_text: original_text.to_owned(),
            normalized_text: normalized_text.to_owned(),
            intent: Intent::None,
            entities: Entities::new(),
            confidence: 0.0,
            matched_pattern_id: None,
            match_kind: None,
        }
    }
}
