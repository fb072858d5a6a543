//! Inbound edge: validate a chat message and enqueue it.

use tracing::{debug, info};

use crate::models::queue::QueueMessageIn;
use crate::queue::DurableQueue;
use crate::{AppError, Result};

/// Default inbound text bound in characters.
pub const DEFAULT_MAX_MESSAGE_CHARS: usize = 2000;

/// Accepts messages from the chat adapter.
#[derive(Clone)]
pub struct Receiver {
    inbound: DurableQueue<QueueMessageIn>,
    max_message_chars: usize,
}

impl Receiver {
    /// Receiver pushing to `inbound`.
    #[must_use]
    pub fn new(inbound: DurableQueue<QueueMessageIn>, max_message_chars: usize) -> Self {
        Self {
            inbound,
            max_message_chars,
        }
    }

    /// Validate and enqueue one message. Returns its queue sequence number.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for a blank sender, blank text or text
    /// longer than the configured bound, and `AppError::Db` if the push fails.
    pub async fn accept(&self, message: QueueMessageIn) -> Result<i64> {
        self.validate(&message)?;
        let seq = self.inbound.push(&message).await?;
        info!(sender_id = %message.sender_id, seq, "message received");
        Ok(seq)
    }

    fn validate(&self, message: &QueueMessageIn) -> Result<()> {
        if message.sender_id.trim().is_empty() {
            return Err(AppError::Validation("sender_id must not be empty".into()));
        }
        if message.text.trim().is_empty() {
            return Err(AppError::Validation("text must not be empty".into()));
        }
        let chars = message.text.chars().count();
        if chars > self.max_message_chars {
            debug!(sender_id = %message.sender_id, chars, "message too long");
            return Err(AppError::Validation(format!(
                "text has {chars} characters; the maximum is {}",
                self.max_message_chars
            )));
        }
        Ok(())
    }
}
