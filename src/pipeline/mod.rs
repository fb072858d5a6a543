//! Receiver → executor → responder pipeline over the durable queues.

pub mod cooldown;
pub mod executor;
pub mod receiver;
pub mod responder;

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::Result;

use cooldown::FailureCooldown;

/// Shared worker loop knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerSettings {
    /// How long one pop waits for an item.
    pub pop_timeout: Duration,
    /// Consecutive failures before a cooldown.
    pub failure_cooldown_trigger: u32,
    /// Cooldown length.
    pub cooldown: Duration,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            pop_timeout: Duration::from_millis(1000),
            failure_cooldown_trigger: cooldown::DEFAULT_TRIGGER,
            cooldown: cooldown::DEFAULT_COOLDOWN,
        }
    }
}

/// Drive `step` until `cancel` fires.
///
/// `step` handles at most one item and resolves to whether it found one.
/// Cancellation is checked between items so an item in flight finishes.
async fn run_worker<F, Fut>(settings: WorkerSettings, cancel: CancellationToken, mut step: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    let mut cooldown = FailureCooldown::new(settings.failure_cooldown_trigger, settings.cooldown);
    while !cancel.is_cancelled() {
        match step().await {
            Ok(true) => cooldown.record_success(),
            Ok(false) => {}
            Err(err) => {
                error!(%err, consecutive = cooldown.consecutive() + 1, "worker step failed");
                if let Some(pause) = cooldown.record_failure() {
                    warn!(pause_secs = pause.as_secs(), "failure storm; cooling down");
                    tokio::select! {
                        () = cancel.cancelled() => break,
                        () = tokio::time::sleep(pause) => {}
                    }
                }
            }
        }
    }
    info!("worker stopped");
}
