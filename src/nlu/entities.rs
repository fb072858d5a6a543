//! Entity resolution: free text, priorities, due dates and project names.
//!
//! Closed vocabularies (priority, date) fail explicitly when nothing in the
//! vocabulary is similar enough. The open project vocabulary falls back to
//! the trimmed raw text.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{NaiveDate, Weekday};

use crate::models::command::{
    DueDate, Entities, EntityName, EntityValue, EnumeratedValue, Priority,
};

use super::indices::normalize_indices;
use super::normalizer::{normalize_with, NormalizerOptions};
use super::similarity::{best_match, Similarity};
use super::ParseError;

/// Maximum task title length in characters.
pub const MAX_TITLE_CHARS: usize = 200;

/// Maximum project name length in characters.
pub const MAX_PROJECT_CHARS: usize = 80;

const PRIORITY_ALIASES: &[(&str, Priority)] = &[
    ("baixa", Priority::Low),
    ("baixo", Priority::Low),
    ("minima", Priority::Low),
    ("minimo", Priority::Low),
    ("leve", Priority::Low),
    ("media", Priority::Medium),
    ("medio", Priority::Medium),
    ("normal", Priority::Medium),
    ("moderada", Priority::Medium),
    ("alta", Priority::High),
    ("alto", Priority::High),
    ("importante", Priority::High),
    ("urgente", Priority::Urgent),
    ("urgencia", Priority::Urgent),
    ("maxima", Priority::Urgent),
    ("maximo", Priority::Urgent),
    ("critica", Priority::Urgent),
    ("critico", Priority::Urgent),
];

const DATE_ALIASES: &[(&str, DueDate)] = &[
    ("hoje", DueDate::Today),
    ("amanha", DueDate::Tomorrow),
    ("depois de amanha", DueDate::DayAfterTomorrow),
    ("proxima semana", DueDate::NextWeek),
    ("semana que vem", DueDate::NextWeek),
    ("semana seguinte", DueDate::NextWeek),
    ("segunda", DueDate::Weekday { day: Weekday::Mon }),
    ("terca", DueDate::Weekday { day: Weekday::Tue }),
    ("quarta", DueDate::Weekday { day: Weekday::Wed }),
    ("quinta", DueDate::Weekday { day: Weekday::Thu }),
    ("sexta", DueDate::Weekday { day: Weekday::Fri }),
    ("sabado", DueDate::Weekday { day: Weekday::Sat }),
    ("domingo", DueDate::Weekday { day: Weekday::Sun }),
];

const DATE_FILLERS: &[&str] = &["para", "ate", "dia", "na", "no", "pro"];
const PRIORITY_FILLERS: &[&str] = &["prioridade", "de", "para", "como"];
const INDEX_FILLERS: &[&str] = &[
    "o", "a", "os", "as", "numero", "n", "tarefa", "tarefas", "item", "itens",
];

/// Date vocabulary phrases, weekday names without the `feira` suffix.
pub fn date_vocabulary() -> impl Iterator<Item = &'static str> {
    DATE_ALIASES.iter().map(|(alias, _)| *alias)
}

/// Resolves captured or slot-filled text into typed entity values.
#[derive(Debug, Clone)]
pub struct EntityResolver {
    similarity: Arc<dyn Similarity>,
    min_similarity: f64,
    normalizer: NormalizerOptions,
    /// `(normalized, label)` pairs of configured project names.
    projects: Vec<(String, String)>,
}

impl EntityResolver {
    /// Create a resolver over the configured project vocabulary.
    #[must_use]
    pub fn new(
        similarity: Arc<dyn Similarity>,
        min_similarity: f64,
        normalizer: NormalizerOptions,
        projects: &[String],
    ) -> Self {
        let projects = projects
            .iter()
            .map(|label| (normalize_with(label, normalizer), label.trim().to_owned()))
            .filter(|(normalized, _)| !normalized.is_empty())
            .collect();
        Self {
            similarity,
            min_similarity,
            normalizer,
            projects,
        }
    }

    /// Resolve every capture of a matched pattern.
    ///
    /// # Errors
    ///
    /// Returns the first [`ParseError`] raised by an individual entity.
    pub fn extract(
        &self,
        captures: &BTreeMap<EntityName, String>,
        original: &str,
    ) -> Result<Entities, ParseError> {
        let mut entities = Entities::new();
        for (name, capture) in captures {
            let value = match name {
                EntityName::Indices => EntityValue::IndexSet(normalize_indices(capture)?),
                EntityName::Title => {
                    let recovered = recover_original(original, capture, self.normalizer);
                    let title = free_text(EntityName::Title, &recovered, MAX_TITLE_CHARS)?;
                    EntityValue::FreeText(title)
                }
                EntityName::Priority => EntityValue::Enumerated(EnumeratedValue::Priority(
                    self.resolve_priority(capture)?,
                )),
                EntityName::Date => {
                    EntityValue::Enumerated(EnumeratedValue::Date(self.resolve_date(capture)?))
                }
                EntityName::Project => {
                    let recovered = recover_original(original, capture, self.normalizer);
                    EntityValue::FreeText(self.resolve_project(&recovered)?)
                }
            };
            entities.insert(*name, value);
        }
        Ok(entities)
    }

    /// Interpret a whole message as the value of one expected entity.
    ///
    /// Free-text entities read the original text so casing and accents
    /// survive; everything else reads the normalized text.
    ///
    /// # Errors
    ///
    /// Returns the entity-specific [`ParseError`].
    pub fn parse_entity(
        &self,
        name: EntityName,
        original: &str,
        normalized: &str,
    ) -> Result<EntityValue, ParseError> {
        match name {
            EntityName::Indices => {
                let stripped = strip_leading(normalized, INDEX_FILLERS);
                Ok(EntityValue::IndexSet(normalize_indices(&stripped)?))
            }
            EntityName::Title => Ok(EntityValue::FreeText(free_text(
                EntityName::Title,
                original,
                MAX_TITLE_CHARS,
            )?)),
            EntityName::Priority => Ok(EntityValue::Enumerated(EnumeratedValue::Priority(
                self.resolve_priority(normalized)?,
            ))),
            EntityName::Date => Ok(EntityValue::Enumerated(EnumeratedValue::Date(
                self.resolve_date(normalized)?,
            ))),
            EntityName::Project => Ok(EntityValue::FreeText(self.resolve_project(original)?)),
        }
    }

    /// Resolve a priority tier.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::UnknownPriority`] when nothing in the closed
    /// vocabulary is similar enough.
    pub fn resolve_priority(&self, normalized: &str) -> Result<Priority, ParseError> {
        let text = strip_leading(normalized, PRIORITY_FILLERS);
        if let Some((_, priority)) = PRIORITY_ALIASES.iter().find(|(alias, _)| *alias == text) {
            return Ok(*priority);
        }
        let vocabulary = PRIORITY_ALIASES.iter().map(|(alias, _)| *alias);
        best_match(self.similarity.as_ref(), &text, vocabulary, self.min_similarity)
            .and_then(|(alias, _)| PRIORITY_ALIASES.iter().find(|(a, _)| *a == alias))
            .map(|(_, priority)| *priority)
            .ok_or_else(|| ParseError::UnknownPriority(normalized.to_owned()))
    }

    /// Resolve a due date.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::UnknownDate`] for text that is neither a
    /// vocabulary phrase, a close misspelling of one, nor a valid `dd/mm[/yyyy]`.
    pub fn resolve_date(&self, normalized: &str) -> Result<DueDate, ParseError> {
        let text = strip_leading(normalized, DATE_FILLERS);
        let text = strip_weekday_suffix(&text);

        if let Some((_, date)) = DATE_ALIASES.iter().find(|(alias, _)| *alias == text) {
            return Ok(*date);
        }
        if let Some(date) = calendar_date(text) {
            return Ok(date);
        }
        if !text.starts_with(|c: char| c.is_ascii_digit()) {
            if let Some((alias, _)) =
                best_match(self.similarity.as_ref(), text, date_vocabulary(), self.min_similarity)
            {
                if let Some((_, date)) = DATE_ALIASES.iter().find(|(a, _)| *a == alias) {
                    return Ok(*date);
                }
            }
        }
        Err(ParseError::UnknownDate(normalized.to_owned()))
    }

    /// Resolve a project name against the configured vocabulary.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::EmptyText`] or [`ParseError::TextTooLong`].
    pub fn resolve_project(&self, raw: &str) -> Result<String, ParseError> {
        let cleaned = free_text(EntityName::Project, raw, MAX_PROJECT_CHARS)?;
        let normalized = normalize_with(&cleaned, self.normalizer);
        let vocabulary = self.projects.iter().map(|(key, _)| key.as_str());
        let resolved = best_match(
            self.similarity.as_ref(),
            &normalized,
            vocabulary,
            self.min_similarity,
        )
        .and_then(|(key, _)| self.projects.iter().find(|(k, _)| k == key))
        .map_or(cleaned, |(_, label)| label.clone());
        Ok(resolved)
    }
}

/// Trim, collapse inner whitespace and bound the length.
///
/// # Errors
///
/// Returns [`ParseError::EmptyText`] for blank input or
/// [`ParseError::TextTooLong`] past `max_chars`.
pub fn free_text(entity: EntityName, raw: &str, max_chars: usize) -> Result<String, ParseError> {
    let cleaned = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.is_empty() {
        return Err(ParseError::EmptyText(entity));
    }
    if cleaned.chars().count() > max_chars {
        return Err(ParseError::TextTooLong {
            entity,
            max: max_chars,
        });
    }
    Ok(cleaned)
}

/// Map a normalized capture back onto the original words it came from.
///
/// Falls back to the capture itself when the words cannot be aligned (for
/// example when a phrase synonym merged several words).
#[must_use]
pub fn recover_original(original: &str, capture: &str, options: NormalizerOptions) -> String {
    let wanted: Vec<&str> = capture.split(' ').map(|t| t.trim_end_matches(',')).collect();
    if wanted.iter().all(|token| token.is_empty()) {
        return capture.to_owned();
    }

    let words: Vec<&str> = original.split_whitespace().collect();
    let folded: Vec<Vec<String>> = words
        .iter()
        .map(|word| {
            normalize_with(word, options)
                .split(' ')
                .filter(|t| !t.is_empty())
                .map(|t| t.trim_end_matches(',').to_owned())
                .collect()
        })
        .collect();

    for start in 0..words.len() {
        let mut produced: Vec<&str> = Vec::new();
        for end in start..words.len() {
            produced.extend(folded[end].iter().map(String::as_str));
            if produced.len() > wanted.len() {
                break;
            }
            if produced == wanted && !folded[start].is_empty() {
                let joined = words[start..=end].join(" ");
                return joined
                    .trim_end_matches([',', '.', ';', ':', '!', '?'])
                    .to_owned();
            }
        }
    }
    capture.to_owned()
}

fn strip_leading(normalized: &str, fillers: &[&str]) -> String {
    let tokens: Vec<&str> = normalized.split(' ').collect();
    let mut start = 0;
    while start + 1 < tokens.len() && fillers.contains(&tokens[start].trim_end_matches(',')) {
        start += 1;
    }
    tokens[start..].join(" ")
}

fn strip_weekday_suffix(text: &str) -> &str {
    text.strip_suffix("-feira")
        .or_else(|| text.strip_suffix(" feira"))
        .unwrap_or(text)
}

/// `dd/mm` or `dd/mm/yyyy` (two-digit years are 20yy).
fn calendar_date(text: &str) -> Option<DueDate> {
    let mut parts = text.split('/');
    let day: u32 = parse_digits(parts.next()?, 2)?;
    let month: u32 = parse_digits(parts.next()?, 2)?;
    let year = match parts.next() {
        None => None,
        Some(raw) if raw.len() == 2 => Some(2000 + i32::try_from(parse_digits(raw, 2)?).ok()?),
        Some(raw) => Some(i32::try_from(parse_digits(raw, 4)?).ok()?),
    };
    if parts.next().is_some() {
        return None;
    }
    // 2024 is a leap year, so 29/02 is accepted when the year is omitted.
    NaiveDate::from_ymd_opt(year.unwrap_or(2024), month, day)?;
    Some(DueDate::Calendar { day, month, year })
}

fn parse_digits(raw: &str, max_len: usize) -> Option<u32> {
    if raw.is_empty() || raw.len() > max_len || !raw.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}
