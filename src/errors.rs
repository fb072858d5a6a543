//! Error types shared across the application.

use std::fmt::{Display, Formatter};

/// Shared application result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error enumeration covering all domain failure modes.
///
/// Entity parse failures are not represented here; they are user-facing
/// corrections carried by [`crate::nlu::ParseError`].
#[derive(Debug)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// Persistence failure when interacting with `SQLite`.
    Db(String),
    /// Queue lease, payload or commit failure.
    Queue(String),
    /// Slack API or Socket Mode failure.
    Slack(String),
    /// Task-store collaborator failed after exhausting its own retries.
    Collaborator(String),
    /// Outbound transport failed to deliver a reply.
    Transport(String),
    /// Inbound message rejected by receiver validation.
    Validation(String),
    /// Optimistic concurrency retries exhausted for a dialogue state key.
    Conflict(String),
    /// File-system or I/O operation failure.
    Io(String),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Db(msg) => write!(f, "db: {msg}"),
            Self::Queue(msg) => write!(f, "queue: {msg}"),
            Self::Slack(msg) => write!(f, "slack: {msg}"),
            Self::Collaborator(msg) => write!(f, "collaborator: {msg}"),
            Self::Transport(msg) => write!(f, "transport: {msg}"),
            Self::Validation(msg) => write!(f, "validation: {msg}"),
            Self::Conflict(msg) => write!(f, "conflict: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        Self::Db(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::Db(format!("invalid json payload: {err}"))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
