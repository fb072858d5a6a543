//! Outbound transport seam used by responder workers.

use std::future::Future;
use std::pin::Pin;

use tracing::info;

use crate::models::queue::QueueMessageOut;
use crate::Result;

/// Delivers replies to users.
pub trait Transport: Send + Sync {
    /// Deliver one reply.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Transport` (or `AppError::Slack`) when delivery
    /// fails; the responder leaves the item leased for redelivery.
    fn deliver(
        &self,
        message: &QueueMessageOut,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Transport that writes replies to the log. Used when Slack is not configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTransport;

impl Transport for LogTransport {
    fn deliver(
        &self,
        message: &QueueMessageOut,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let recipient = message.recipient_id.clone();
        let text = message.text.clone();
        Box::pin(async move {
            info!(recipient_id = %recipient, %text, "reply delivered to log");
            Ok(())
        })
    }
}
