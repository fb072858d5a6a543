//! Built-in pattern table over normalized text.
//!
//! Templates use `{IDX}`, `{DATE}` and `{PRIO}` placeholders that expand to
//! shared fragments before compilation. Named groups map onto entities:
//! `idx`, `title`, `priority`, `date`, `project`.

use regex::Regex;

use crate::errors::{AppError, Result};
use crate::models::command::{EntityName, Intent};

use super::entities::date_vocabulary;

/// Liberal index run; the index sub-grammar rejects what it cannot parse so
/// the user gets a specific correction instead of a miss.
const IDX: &str = r"[\d\-]+(?:(?:\s*,\s*|\s+e\s+|\s+a\s+|\s+ate\s+|\s*-\s*|\s+)[\d\-]+)*";

/// Optional article and noun between a verb and its indices.
const TASK_NOUN: &str = r"(?:(?:a|as|o|os) )?(?:(?:tarefa|tarefas|item|itens|numero) )?";

const PRIO: &str = r"(?:(?:mudar|muda|mude|alterar|altera|altere|definir|define|colocar|coloca|coloque) (?:a )?)?prioridade";

struct PatternDef {
    id: &'static str,
    intent: Intent,
    keywords: &'static [&'static str],
    priority: u8,
    template: &'static str,
}

const DEFINITIONS: &[PatternDef] = &[
    PatternDef {
        id: "list.verb",
        intent: Intent::ListTasks,
        keywords: &["listar"],
        priority: 50,
        template: r"^listar(?: (?:as |minhas |as minhas |todas as )?tarefas)?(?: pendentes| abertas| de hoje)?$",
    },
    PatternDef {
        id: "list.noun",
        intent: Intent::ListTasks,
        keywords: &["tarefas"],
        priority: 40,
        template: r"^(?:minhas |as minhas |quais (?:sao )?(?:as )?(?:minhas )?|mostre (?:as |minhas |as minhas |todas as )?)?tarefas(?: pendentes| abertas| de hoje)?$",
    },
    PatternDef {
        id: "list.question",
        intent: Intent::ListTasks,
        keywords: &["tenho"],
        priority: 30,
        template: r"^o que (?:eu )?tenho (?:para fazer|hoje|para hoje)$",
    },
    PatternDef {
        id: "show.idx",
        intent: Intent::ShowTask,
        keywords: &["mostre"],
        priority: 50,
        template: r"^mostre {TASK}(?P<idx>{IDX})$",
    },
    PatternDef {
        id: "show.bare",
        intent: Intent::ShowTask,
        keywords: &["mostre"],
        priority: 40,
        template: r"^mostre(?: (?:a |uma )?tarefa)?$",
    },
    PatternDef {
        id: "complete.idx",
        intent: Intent::CompleteTask,
        keywords: &["feito"],
        priority: 50,
        template: r"^(?:ja )?feito {TASK}(?P<idx>{IDX})$",
    },
    PatternDef {
        id: "complete.idx_first",
        intent: Intent::CompleteTask,
        keywords: &["feito"],
        priority: 45,
        template: r"^(?:(?:tarefa|tarefas|item|itens) )?(?P<idx>{IDX}) (?:ja )?(?:esta |estao )?feito$",
    },
    PatternDef {
        id: "complete.bare",
        intent: Intent::CompleteTask,
        keywords: &["feito"],
        priority: 40,
        template: r"^(?:ja )?feito$",
    },
    PatternDef {
        id: "complete.embedded",
        intent: Intent::CompleteTask,
        keywords: &["feito"],
        priority: 10,
        template: r"\bfeito {TASK}(?P<idx>{IDX})\b",
    },
    PatternDef {
        id: "start.idx",
        intent: Intent::StartTask,
        keywords: &["comecar"],
        priority: 50,
        template: r"^comecar (?:a fazer )?{TASK}(?P<idx>{IDX})$",
    },
    PatternDef {
        id: "start.bare",
        intent: Intent::StartTask,
        keywords: &["comecar"],
        priority: 40,
        template: r"^comecar(?: (?:a |uma )?tarefa)?$",
    },
    PatternDef {
        id: "delete.idx",
        intent: Intent::DeleteTask,
        keywords: &["apagar"],
        priority: 50,
        template: r"^apagar {TASK}(?P<idx>{IDX})$",
    },
    PatternDef {
        id: "delete.bare",
        intent: Intent::DeleteTask,
        keywords: &["apagar"],
        priority: 40,
        template: r"^apagar(?: (?:a |uma )?tarefa)?$",
    },
    PatternDef {
        id: "create.full",
        intent: Intent::CreateTask,
        keywords: &["criar", "nova", "novo"],
        priority: 50,
        template: r"^(?:criar(?: (?:uma |um )?(?:nova |novo )?(?:tarefa|lembrete)(?: de| para)?)?|(?:nova|novo) (?:tarefa|lembrete)(?: de| para)?) (?P<title>.+?)(?: prioridade (?P<priority>[a-z]+))?(?: (?:para |ate |pro |na |no )?(?P<date>{DATE}))?(?: projeto (?P<project>.+))?$",
    },
    PatternDef {
        id: "create.date_first",
        intent: Intent::CreateTask,
        keywords: &["criar", "nova", "novo"],
        priority: 45,
        template: r"^(?:criar(?: (?:uma |um )?(?:nova |novo )?(?:tarefa|lembrete)(?: de| para)?)?|(?:nova|novo) (?:tarefa|lembrete)(?: de| para)?) (?P<title>.+?) (?:para |ate |pro |na |no )?(?P<date>{DATE}) prioridade (?P<priority>[a-z]+)(?: projeto (?P<project>.+))?$",
    },
    PatternDef {
        id: "create.bare",
        intent: Intent::CreateTask,
        keywords: &["criar", "nova", "novo"],
        priority: 40,
        template: r"^(?:criar|nova|novo)(?: (?:uma |um )?(?:nova |novo )?(?:tarefa|lembrete))?$",
    },
    PatternDef {
        id: "priority.idx",
        intent: Intent::SetPriority,
        keywords: &["prioridade"],
        priority: 50,
        template: r"^{PRIO} (?:da |de |do |das |dos )?{TASK}(?P<idx>{IDX}) (?:para |como |e |em )?(?P<priority>[a-z]+)$",
    },
    PatternDef {
        id: "priority.value_first",
        intent: Intent::SetPriority,
        keywords: &["prioridade"],
        priority: 45,
        template: r"^{PRIO} (?P<priority>[a-z]+) (?:para |na |no |em |nas |nos )?{TASK}(?P<idx>{IDX})$",
    },
    PatternDef {
        id: "priority.idx_first",
        intent: Intent::SetPriority,
        keywords: &["prioridade"],
        priority: 45,
        template: r"^(?:(?:tarefa|tarefas|item|itens) )?(?P<idx>{IDX}) (?:com |para )?prioridade (?P<priority>[a-z]+)$",
    },
    PatternDef {
        id: "priority.partial",
        intent: Intent::SetPriority,
        keywords: &["prioridade"],
        priority: 40,
        template: r"^{PRIO}(?: (?:da |de |do |das |dos )?{TASK}(?P<idx>{IDX}))?$",
    },
    PatternDef {
        id: "postpone.idx",
        intent: Intent::PostponeTask,
        keywords: &["adiar"],
        priority: 50,
        template: r"^adiar {TASK}(?P<idx>{IDX}) (?:para |ate |pro )?(?P<date>(?:[a-z]|\d{1,2}/\d).*)$",
    },
    PatternDef {
        id: "postpone.partial",
        intent: Intent::PostponeTask,
        keywords: &["adiar"],
        priority: 40,
        template: r"^adiar(?: {TASK}(?P<idx>{IDX}))?$",
    },
    PatternDef {
        id: "help",
        intent: Intent::Help,
        keywords: &["ajuda"],
        priority: 50,
        template: r"^(?:(?:preciso de |quero )?ajuda|o que (?:voce )?(?:sabe|pode) fazer|como funciona)$",
    },
    PatternDef {
        id: "greeting",
        intent: Intent::Greeting,
        keywords: &["oi", "bom", "boa"],
        priority: 50,
        template: r"^(?:oi|bom dia|boa tarde|boa noite)(?: tudo bem)?$|^tudo bem$",
    },
    PatternDef {
        id: "cancel",
        intent: Intent::Cancel,
        keywords: &["cancelar"],
        priority: 50,
        template: r"^cancelar(?: tudo| isso)?$",
    },
];

/// A compiled pattern.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    /// Stable identifier reported in [`crate::models::command::ParsedCommand`].
    pub id: &'static str,
    /// Intent this pattern classifies as.
    pub intent: Intent,
    /// Leading words the fuzzy pass may correct towards.
    pub keywords: &'static [&'static str],
    /// Static tie-break priority; higher wins.
    pub priority: u8,
    /// Whether the regex must cover the entire text.
    pub anchored: bool,
    /// Position in the table.
    pub order: usize,
    /// Compiled expression.
    pub regex: Regex,
}

/// Ordered, compiled pattern table.
#[derive(Debug, Clone)]
pub struct PatternTable {
    patterns: Vec<CompiledPattern>,
}

impl PatternTable {
    /// Compile the built-in table.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a template fails to compile.
    pub fn builtin() -> Result<Self> {
        let date = date_fragment();
        let patterns = DEFINITIONS
            .iter()
            .enumerate()
            .map(|(order, def)| {
                let source = def
                    .template
                    .replace("{TASK}", TASK_NOUN)
                    .replace("{IDX}", IDX)
                    .replace("{DATE}", &date)
                    .replace("{PRIO}", PRIO);
                let regex = Regex::new(&source).map_err(|err| {
                    AppError::Config(format!("pattern {} failed to compile: {err}", def.id))
                })?;
                Ok(CompiledPattern {
                    id: def.id,
                    intent: def.intent,
                    keywords: def.keywords,
                    priority: def.priority,
                    anchored: def.template.starts_with('^'),
                    order,
                    regex,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    /// Patterns in table order.
    #[must_use]
    pub fn patterns(&self) -> &[CompiledPattern] {
        &self.patterns
    }

    /// Every distinct trigger keyword, in first-seen order.
    #[must_use]
    pub fn keywords(&self) -> Vec<&'static str> {
        let mut seen = Vec::new();
        for keyword in self.patterns.iter().flat_map(|p| p.keywords.iter().copied()) {
            if !seen.contains(&keyword) {
                seen.push(keyword);
            }
        }
        seen
    }
}

/// Entity a named capture group fills.
#[must_use]
pub fn capture_entity(group: &str) -> Option<EntityName> {
    match group {
        "idx" => Some(EntityName::Indices),
        "title" => Some(EntityName::Title),
        "priority" => Some(EntityName::Priority),
        "date" => Some(EntityName::Date),
        "project" => Some(EntityName::Project),
        _ => None,
    }
}

fn date_fragment() -> String {
    let mut words: Vec<&str> = date_vocabulary().collect();
    words.sort_by_key(|word| std::cmp::Reverse(word.len()));
    let alternation = words
        .iter()
        .map(|word| regex::escape(word))
        .collect::<Vec<_>>()
        .join("|");
    format!(r"(?:(?:{alternation})(?:-feira| feira)?|\d{{1,2}}/\d{{1,2}}(?:/\d{{2}}(?:\d{{2}})?)?)")
}
