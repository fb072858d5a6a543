//! Natural-language understanding: normalization, matching and scoring.
//!
//! Everything in this module is synchronous, allocation-light CPU work with
//! no I/O. The dialogue layer calls into it once per turn.

pub mod analyzer;
pub mod confirmation;
pub mod entities;
pub mod indices;
pub mod matcher;
pub mod normalizer;
pub mod patterns;
pub mod scorer;
pub mod similarity;

use std::fmt::{Display, Formatter};

use crate::models::command::EntityName;

/// Malformed entity value.
///
/// Every variant maps to a specific corrective prompt via
/// [`ParseError::corrective_prompt`]; callers never reply with a generic
/// failure for these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// No index was found in the text.
    EmptyIndexList,
    /// Index `0` was supplied; numbering starts at 1.
    ZeroIndex,
    /// A negative index was supplied.
    NegativeIndex(i64),
    /// A range whose start is greater than its end (e.g. `5-1`).
    InvertedRange {
        /// First number as written.
        start: u32,
        /// Second number as written.
        end: u32,
    },
    /// Token that is not a number, range or separator.
    MalformedIndex(String),
    /// More indices than a single command may address.
    TooManyIndices {
        /// Indices requested.
        count: usize,
        /// Maximum accepted.
        max: usize,
    },
    /// Priority not in the closed vocabulary.
    UnknownPriority(String),
    /// Date not in the closed vocabulary.
    UnknownDate(String),
    /// Free-text entity was blank after trimming.
    EmptyText(EntityName),
    /// Free-text entity exceeds its length bound.
    TextTooLong {
        /// Entity being parsed.
        entity: EntityName,
        /// Maximum length in characters.
        max: usize,
    },
}

impl ParseError {
    /// User-facing message explaining exactly what to correct.
    #[must_use]
    pub fn corrective_prompt(&self) -> String {
        match self {
            Self::EmptyIndexList => {
                "Não encontrei o número da tarefa. Envie o número, por exemplo: 2".into()
            }
            Self::ZeroIndex => {
                "A numeração das tarefas começa em 1. Qual número você quis dizer?".into()
            }
            Self::NegativeIndex(value) => format!(
                "{value} não é um número de tarefa válido. Use números a partir de 1."
            ),
            Self::InvertedRange { start, end } => format!(
                "O intervalo {start}-{end} está invertido. Escreva do menor para o maior, \
                 por exemplo {end}-{start}."
            ),
            Self::MalformedIndex(token) => format!(
                "Não entendi \"{token}\" como número de tarefa. Use algo como 1, 3-5, 7."
            ),
            Self::TooManyIndices { count, max } => format!(
                "São {count} tarefas de uma vez; o máximo é {max}. Divida em partes menores."
            ),
            Self::UnknownPriority(value) => format!(
                "Não conheço a prioridade \"{value}\". Use baixa, média, alta ou urgente."
            ),
            Self::UnknownDate(value) => format!(
                "Não entendi a data \"{value}\". Use hoje, amanhã, um dia da semana ou dd/mm."
            ),
            Self::EmptyText(entity) => match entity {
                EntityName::Title => "O título da tarefa não pode ficar vazio.".into(),
                EntityName::Project => "O nome do projeto não pode ficar vazio.".into(),
                other => format!("O valor de {} não pode ficar vazio.", other.as_str()),
            },
            Self::TextTooLong { entity, max } => match entity {
                EntityName::Title => format!("O título pode ter no máximo {max} caracteres."),
                other => format!(
                    "O valor de {} pode ter no máximo {max} caracteres.",
                    other.as_str()
                ),
            },
        }
    }
}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyIndexList => write!(f, "empty index list"),
            Self::ZeroIndex => write!(f, "index 0 is not valid"),
            Self::NegativeIndex(value) => write!(f, "negative index {value}"),
            Self::InvertedRange { start, end } => write!(f, "inverted range {start}-{end}"),
            Self::MalformedIndex(token) => write!(f, "malformed index token {token:?}"),
            Self::TooManyIndices { count, max } => {
                write!(f, "{count} indices exceed the maximum of {max}")
            }
            Self::UnknownPriority(value) => write!(f, "unknown priority {value:?}"),
            Self::UnknownDate(value) => write!(f, "unknown date {value:?}"),
            Self::EmptyText(entity) => write!(f, "empty {}", entity.as_str()),
            Self::TextTooLong { entity, max } => {
                write!(f, "{} longer than {max} characters", entity.as_str())
            }
        }
    }
}

impl std::error::Error for ParseError {}
