//! Command interpreter: one message in, at most one reply out.
//!
//! Each turn is a read-plan-commit cycle against the [`DialogueStore`]. The
//! planned state is committed with compare-and-swap before any action is
//! dispatched, so when two copies of the same message race only the CAS
//! winner reaches the task store. A lost CAS re-runs the whole cycle on the
//! fresh state, where the loser usually finds a duplicate.

pub mod collaborator;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::dialogue::machine::{DialogueMachine, Effect, ReplyKind, DUPLICATE_REPLY};
use crate::dialogue::store::DialogueStore;
use crate::models::command::{Command, ParsedCommand};
use crate::{AppError, Result};

use collaborator::ActionExecutor;

/// Default bound on read-plan-commit cycles per message.
pub const DEFAULT_MAX_CAS_ATTEMPTS: u32 = 5;

const APOLOGY: &str = "Desculpe, não consegui concluir essa ação agora. Tente de novo em instantes.";

/// What the interpreter did with a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    /// Actions were sent to the task store.
    Dispatched {
        /// Actions attempted.
        actions: usize,
        /// Actions that returned an error.
        failures: usize,
    },
    /// Answered locally.
    Replied(ReplyKind),
    /// Repeat of the previous message.
    Duplicate,
    /// Nothing recognized; the caller should consult the fallback.
    LowConfidence,
}

/// Result of handling one message.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    /// What happened.
    pub kind: OutcomeKind,
    /// Reply to send, if any.
    pub reply: Option<String>,
    /// Classification, when the message went through the analyzer.
    pub parsed: Option<ParsedCommand>,
}

/// Interpreter bound to its store and task-store collaborator.
#[derive(Clone)]
pub struct Interpreter {
    machine: Arc<DialogueMachine>,
    store: Arc<dyn DialogueStore>,
    executor: Arc<dyn ActionExecutor>,
    max_cas_attempts: u32,
}

impl Interpreter {
    /// Build an interpreter.
    #[must_use]
    pub fn new(
        machine: Arc<DialogueMachine>,
        store: Arc<dyn DialogueStore>,
        executor: Arc<dyn ActionExecutor>,
        max_cas_attempts: u32,
    ) -> Self {
        Self {
            machine,
            store,
            executor,
            max_cas_attempts: max_cas_attempts.max(1),
        }
    }

    /// Handle a message received now.
    ///
    /// # Errors
    ///
    /// See [`Interpreter::handle_at`].
    pub async fn handle(&self, user_id: &str, text: &str) -> Result<Outcome> {
        self.handle_at(user_id, text, Utc::now()).await
    }

    /// Handle a message received at `now`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` on store failure, or `AppError::Conflict` when
    /// every compare-and-swap attempt lost to a concurrent writer.
    /// Collaborator failures never surface here; they become apology lines.
    pub async fn handle_at(&self, user_id: &str, text: &str, now: DateTime<Utc>) -> Result<Outcome> {
        for attempt in 1..=self.max_cas_attempts {
            let current = self.store.load(user_id).await?;
            let transition = self.machine.plan(&current.value, text, now);

            if let Some(next) = &transition.state {
                if !self
                    .store
                    .compare_and_swap(user_id, current.version, next)
                    .await?
                {
                    debug!(user_id, attempt, "dialogue state changed underneath; replanning");
                    continue;
                }
            }

            return Ok(self.apply(user_id, transition.effect, transition.parsed).await);
        }

        warn!(user_id, attempts = self.max_cas_attempts, "dialogue state contention");
        Err(AppError::Conflict(format!(
            "dialogue state for {user_id} changed on every attempt"
        )))
    }

    async fn apply(&self, user_id: &str, effect: Effect, parsed: Option<ParsedCommand>) -> Outcome {
        match effect {
            Effect::Duplicate => {
                debug!(user_id, "repeated message");
                Outcome {
                    kind: OutcomeKind::Duplicate,
                    reply: Some(DUPLICATE_REPLY.to_owned()),
                    parsed,
                }
            }
            Effect::LowConfidence { confidence } => {
                info!(user_id, confidence, "message not recognized");
                Outcome {
                    kind: OutcomeKind::LowConfidence,
                    reply: None,
                    parsed,
                }
            }
            Effect::Reply { kind, text } => Outcome {
                kind: OutcomeKind::Replied(kind),
                reply: Some(text),
                parsed,
            },
            Effect::Dispatch { command } => {
                let (kind, reply) = self.dispatch(user_id, &command).await;
                Outcome {
                    kind,
                    reply,
                    parsed,
                }
            }
        }
    }

    /// Send each action once and fold the reports into one reply.
    async fn dispatch(&self, user_id: &str, command: &Command) -> (OutcomeKind, Option<String>) {
        let actions = command.actions();
        let mut lines = Vec::with_capacity(actions.len());
        let mut failures = 0;

        for action in &actions {
            match self.executor.execute(action, user_id).await {
                Ok(report) => {
                    if !report.success {
                        debug!(user_id, intent = %action.intent(), index = action.index(), "action refused by task store");
                    }
                    if !report.text.is_empty() {
                        lines.push(report.text);
                    }
                }
                Err(err) => {
                    failures += 1;
                    warn!(user_id, intent = %action.intent(), index = action.index(), %err, "task store action failed");
                    lines.push(APOLOGY.to_owned());
                }
            }
        }

        info!(user_id, intent = %command.intent(), actions = actions.len(), failures, "command dispatched");
        let reply = (!lines.is_empty()).then(|| lines.join("\n"));
        (
            OutcomeKind::Dispatched {
                actions: actions.len(),
                failures,
            },
            reply,
        )
    }
}
