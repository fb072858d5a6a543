//! Per-user dialogue state persisted between turns.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::command::{Command, Entities, EntityName, Intent};

/// Intent waiting for one missing entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingSlot {
    /// Intent already classified in an earlier turn.
    pub intent: Intent,
    /// Entity the last reply asked for.
    pub expected_entity: EntityName,
    /// Entities collected so far.
    pub partial_entities: Entities,
    /// When the slot was opened.
    pub created_at: DateTime<Utc>,
    /// When the slot lapses back to idle.
    pub expires_at: DateTime<Utc>,
}

/// Command waiting for a yes/no answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingConfirmation {
    /// Identifier of the bound action (UUID v4 prefixed `action:`).
    pub action_id: String,
    /// Identifier of the question shown to the user (prefixed `question:`).
    pub question_id: String,
    /// Command executed on a clear "yes".
    pub command: Command,
    /// When the question was asked.
    pub created_at: DateTime<Utc>,
    /// When the question lapses back to idle.
    pub expires_at: DateTime<Utc>,
}

impl PendingConfirmation {
    /// Bind a command to a fresh confirmation question.
    #[must_use]
    pub fn new(command: Command, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            action_id: format!("action:{}", Uuid::new_v4()),
            question_id: format!("question:{}", Uuid::new_v4()),
            command,
            created_at: now,
            expires_at: now + ttl,
        }
    }
}

/// The single pending exchange a user may have open.
///
/// Slot-filling and confirmation are mutually exclusive; writing one
/// replaces the other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Pending {
    Slot(PendingSlot),
    Confirmation(PendingConfirmation),
}

impl Pending {
    /// Expiry instant of whichever exchange is open.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        match self {
            Self::Slot(slot) => slot.expires_at,
            Self::Confirmation(confirmation) => confirmation.expires_at,
        }
    }
}

/// Fingerprint of the last accepted message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastMessage {
    /// Normalized text.
    pub text: String,
    /// SHA-256 hex digest of the normalized text.
    pub fingerprint: String,
    /// When the message was accepted.
    pub timestamp: DateTime<Utc>,
}

impl LastMessage {
    /// Record a normalized message accepted at `timestamp`.
    #[must_use]
    pub fn new(normalized: &str, timestamp: DateTime<Utc>) -> Self {
        Self {
            text: normalized.to_owned(),
            fingerprint: fingerprint(normalized),
            timestamp,
        }
    }
}

/// SHA-256 hex digest of normalized text.
#[must_use]
pub fn fingerprint(normalized: &str) -> String {
    let digest = Sha256::digest(normalized.as_bytes());
    format!("{digest:x}")
}

/// Coarse phase of the dialogue state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialoguePhase {
    /// Nothing pending; the next message is classified fresh.
    Idle,
    /// Waiting for the named entity of the named intent.
    AwaitingEntity(Intent, EntityName),
    /// Waiting for a yes/no answer.
    AwaitingConfirmation,
}

/// Mutable per-user state keyed by user identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogueState {
    /// Open slot or confirmation, if any.
    pub pending: Option<Pending>,
    /// Last accepted message for the repeated-message guard.
    pub last_message: Option<LastMessage>,
}

impl DialogueState {
    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> DialoguePhase {
        match &self.pending {
            None => DialoguePhase::Idle,
            Some(Pending::Slot(slot)) => {
                DialoguePhase::AwaitingEntity(slot.intent, slot.expected_entity)
            }
            Some(Pending::Confirmation(_)) => DialoguePhase::AwaitingConfirmation,
        }
    }

    /// Lazily drop a pending exchange whose deadline has passed.
    ///
    /// Returns `true` when something was cleared.
    pub fn expire(&mut self, now: DateTime<Utc>) -> bool {
        match &self.pending {
            Some(pending) if pending.expires_at() <= now => {
                self.pending = None;
                true
            }
            _ => false,
        }
    }

    /// Whether `normalized` repeats the last message within `window`, inclusive.
    ///
    /// Copies processed out of order count too, so the age is taken in
    /// either direction.
    #[must_use]
    pub fn is_duplicate(&self, normalized: &str, now: DateTime<Utc>, window: Duration) -> bool {
        self.last_message.as_ref().is_some_and(|last| {
            let age = now - last.timestamp;
            let age = if age < Duration::zero() { -age } else { age };
            age <= window && last.fingerprint == fingerprint(normalized)
        })
    }

    /// Move the last message's timestamp forward to `now`, so a retry storm
    /// keeps extending the window. Returns `true` when the timestamp moved.
    pub fn touch_last_message(&mut self, now: DateTime<Utc>) -> bool {
        match &mut self.last_message {
            Some(last) if last.timestamp < now => {
                last.timestamp = now;
                true
            }
            _ => false,
        }
    }
}

/// A value paired with the store version it was read at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned<T> {
    /// Stored value (default when the key is absent).
    pub value: T,
    /// Version to pass to compare-and-swap; `0` means absent.
    pub version: i64,
}
