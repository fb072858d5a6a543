//! Retention service for time-based data purge.
//!
//! Runs as a background task deleting dialogue rows idle for longer than
//! `retention_hours` and dead-lettered queue rows of the same age.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::db::Database;
use super::dialogue_repo::DialogueRepo;
use super::queue_repo::QueueRepo;
use crate::Result;

const PURGE_INTERVAL: Duration = Duration::from_secs(3600);

/// Spawn the retention purge background task.
///
/// The task runs hourly, starting with an immediate pass.
#[must_use]
pub fn spawn_retention_task(
    db: Arc<Database>,
    retention_hours: u32,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PURGE_INTERVAL);
        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    info!("retention task shutting down");
                    break;
                }
                _ = interval.tick() => {
                    if let Err(err) = purge(&db, retention_hours).await {
                        error!(%err, "retention purge failed");
                    }
                }
            }
        }
    })
}

/// Run one purge pass.
///
/// # Errors
///
/// Returns `AppError::Db` if either delete fails.
pub async fn purge(db: &Arc<Database>, retention_hours: u32) -> Result<()> {
    let cutoff = Utc::now() - chrono::Duration::hours(i64::from(retention_hours));

    let dialogues = DialogueRepo::new(Arc::clone(db)).purge_idle(cutoff).await?;
    let dead = QueueRepo::new(Arc::clone(db)).purge_dead(cutoff).await?;

    info!(retention_hours, dialogues, dead, "retention purge completed");
    Ok(())
}
