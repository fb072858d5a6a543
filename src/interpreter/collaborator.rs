//! Seams to the collaborators the interpreter calls out to.

use std::future::Future;
use std::pin::Pin;

use crate::models::command::TaskAction;
use crate::Result;

/// Result of one task-store action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionReport {
    /// Whether the store applied the action.
    pub success: bool,
    /// Text to include in the reply. Empty when the store delivered its
    /// own message to the user.
    pub text: String,
}

impl ExecutionReport {
    /// Successful action with reply text.
    #[must_use]
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            success: true,
            text: text.into(),
        }
    }
}

/// Task-store collaborator. Owns its own retry policy.
pub trait ActionExecutor: Send + Sync {
    /// Apply one action for `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Collaborator` once the store has given up.
    fn execute(
        &self,
        action: &TaskAction,
        user_id: &str,
    ) -> Pin<Box<dyn Future<Output = Result<ExecutionReport>> + Send + '_>>;
}

/// Handler for messages nothing recognized.
pub trait Fallback: Send + Sync {
    /// Produce a reply for an unrecognized message, or `None` to stay quiet.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Collaborator` if the fallback fails.
    fn understand(
        &self,
        user_id: &str,
        text: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<String>>> + Send + '_>>;
}

/// Fallback that always answers with the same text.
#[derive(Debug, Clone)]
pub struct StaticFallback {
    text: String,
}

impl StaticFallback {
    /// Fallback replying with `text`.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl Fallback for StaticFallback {
    fn understand(
        &self,
        _user_id: &str,
        _text: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<String>>> + Send + '_>> {
        let text = self.text.clone();
        Box::pin(async move { Ok(Some(text)) })
    }
}
