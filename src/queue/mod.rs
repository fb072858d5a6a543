//! Typed durable FIFO queue over [`QueueRepo`].
//!
//! Items are leased rather than removed. A worker commits an item only
//! after its side effects are done; if the worker dies first, the lease
//! lapses and another worker receives the item again. Consumers must
//! tolerate duplicates.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Notify;
use tokio::time::{sleep_until, Instant};
use tracing::warn;

use crate::models::queue::{Delivery, QueueDepth, QueueName};
use crate::persistence::db::Database;
use crate::persistence::queue_repo::QueueRepo;
use crate::{AppError, Result};

/// Lease and polling knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueSettings {
    /// How long a leased item stays invisible before redelivery.
    pub visibility_timeout: Duration,
    /// Deliveries after which an item is dead-lettered.
    pub max_deliveries: u32,
    /// Sleep between empty polls.
    pub poll_interval: Duration,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            visibility_timeout: Duration::from_secs(60),
            max_deliveries: 5,
            poll_interval: Duration::from_millis(200),
        }
    }
}

/// Durable queue of `T` values.
pub struct DurableQueue<T> {
    repo: QueueRepo,
    name: QueueName,
    notify: Arc<Notify>,
    settings: QueueSettings,
    _payload: PhantomData<fn() -> T>,
}

impl<T> Clone for DurableQueue<T> {
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            name: self.name,
            notify: Arc::clone(&self.notify),
            settings: self.settings,
            _payload: PhantomData,
        }
    }
}

impl<T> DurableQueue<T>
where
    T: Serialize + DeserializeOwned + Send,
{
    /// Open the named queue.
    #[must_use]
    pub fn new(db: Arc<Database>, name: QueueName, settings: QueueSettings) -> Self {
        Self {
            repo: QueueRepo::new(db),
            name,
            notify: Arc::new(Notify::new()),
            settings,
            _payload: PhantomData,
        }
    }

    /// Queue name.
    #[must_use]
    pub fn name(&self) -> QueueName {
        self.name
    }

    /// Append an item and wake one waiting consumer.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Queue` if the item cannot be serialized, or
    /// `AppError::Db` if the insert fails.
    pub async fn push(&self, item: &T) -> Result<i64> {
        let payload = serde_json::to_string(item).map_err(|err| {
            AppError::Queue(format!("cannot encode {} item: {err}", self.name.as_str()))
        })?;
        let seq = self.repo.push(self.name, &payload).await?;
        self.notify.notify_one();
        Ok(seq)
    }

    /// Lease the oldest ready item, waiting up to `timeout` for one.
    ///
    /// Undecodable payloads are committed away with a warning and never
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` on storage failure.
    pub async fn pop(&self, timeout: Duration) -> Result<Option<Delivery<T>>> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(row) = self
                .repo
                .lease(self.name, self.settings.visibility_timeout, self.settings.max_deliveries)
                .await?
            {
                match serde_json::from_str::<T>(&row.payload) {
                    Ok(payload) => {
                        return Ok(Some(Delivery {
                            seq: row.seq,
                            lease_id: row.lease_id,
                            attempts: row.attempts,
                            payload,
                        }));
                    }
                    Err(err) => {
                        warn!(queue = self.name.as_str(), seq = row.seq, %err, "dropping undecodable item");
                        self.repo.commit(row.seq, &row.lease_id).await?;
                        continue;
                    }
                }
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            let wake = (now + self.settings.poll_interval).min(deadline);
            tokio::select! {
                () = self.notify.notified() => {}
                () = sleep_until(wake) => {}
            }
        }
    }

    /// Remove a leased item. Returns `false` when the lease lapsed and the
    /// item was handed to someone else.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` on storage failure.
    pub async fn commit(&self, delivery: &Delivery<T>) -> Result<bool> {
        let committed = self.repo.commit(delivery.seq, &delivery.lease_id).await?;
        if !committed {
            warn!(queue = self.name.as_str(), seq = delivery.seq, "commit after lease lapsed");
        }
        Ok(committed)
    }

    /// Current row counts.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` on storage failure.
    pub async fn depth(&self) -> Result<QueueDepth> {
        self.repo.depth(self.name).await
    }
}
