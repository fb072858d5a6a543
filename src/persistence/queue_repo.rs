//! Durable queue storage: one `SQLite` table shared by every named queue.
//!
//! Rows are leased rather than removed on read. A lease hides the row until
//! `leased_until`; committing deletes it. A row whose lease lapses becomes
//! visible again, and after `max_deliveries` leases without a commit it is
//! parked with status `dead`.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

use crate::models::queue::{QueueDepth, QueueName};
use crate::Result;

use super::db::Database;

/// Repository wrapper around `SQLite` for queue rows.
#[derive(Clone)]
pub struct QueueRepo {
    db: Arc<Database>,
}

/// A row leased to one consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeasedRow {
    /// Sequence number.
    pub seq: i64,
    /// Lease token required to commit.
    pub lease_id: String,
    /// Lease count including this one.
    pub attempts: u32,
    /// Serialized payload.
    pub payload: String,
}

#[derive(sqlx::FromRow)]
struct LeaseRow {
    seq: i64,
    payload: String,
    attempts: i64,
}

#[derive(sqlx::FromRow)]
struct DepthRow {
    ready: i64,
    leased: i64,
    dead: i64,
}

fn to_millis(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

fn count(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

impl QueueRepo {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Append a payload; returns its sequence number.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the insert fails.
    pub async fn push(&self, queue: QueueName, payload: &str) -> Result<i64> {
        let enqueued_at = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
        let result = sqlx::query(
            "INSERT INTO queue_message (queue, payload, status, attempts, lease_id, leased_until, enqueued_at)
             VALUES (?1, ?2, 'ready', 0, NULL, 0, ?3)",
        )
        .bind(queue.as_str())
        .bind(payload)
        .bind(enqueued_at)
        .execute(self.db.as_ref())
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Lease the oldest visible row, dead-lettering exhausted rows first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if either statement fails.
    pub async fn lease(
        &self,
        queue: QueueName,
        visibility_timeout: Duration,
        max_deliveries: u32,
    ) -> Result<Option<LeasedRow>> {
        let now = Utc::now().timestamp_millis();

        let parked = sqlx::query(
            "UPDATE queue_message SET status = 'dead', lease_id = NULL
             WHERE queue = ?1 AND status = 'ready' AND attempts >= ?2 AND leased_until <= ?3",
        )
        .bind(queue.as_str())
        .bind(i64::from(max_deliveries))
        .bind(now)
        .execute(self.db.as_ref())
        .await?
        .rows_affected();
        if parked > 0 {
            tracing::warn!(queue = queue.as_str(), parked, "dead-lettered exhausted messages");
        }

        let lease_id = Uuid::new_v4().to_string();
        let leased_until = now.saturating_add(to_millis(visibility_timeout));
        let row: Option<LeaseRow> = sqlx::query_as(
            "UPDATE queue_message SET attempts = attempts + 1, lease_id = ?1, leased_until = ?2
             WHERE seq = (
                 SELECT seq FROM queue_message
                 WHERE queue = ?3 AND status = 'ready' AND leased_until <= ?4 AND attempts < ?5
                 ORDER BY seq LIMIT 1
             )
             RETURNING seq, payload, attempts",
        )
        .bind(&lease_id)
        .bind(leased_until)
        .bind(queue.as_str())
        .bind(now)
        .bind(i64::from(max_deliveries))
        .fetch_optional(self.db.as_ref())
        .await?;

        Ok(row.map(|row| LeasedRow {
            seq: row.seq,
            lease_id,
            attempts: u32::try_from(row.attempts).unwrap_or(u32::MAX),
            payload: row.payload,
        }))
    }

    /// Delete a leased row. Returns `false` if the lease is no longer held.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the delete fails.
    pub async fn commit(&self, seq: i64, lease_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM queue_message WHERE seq = ?1 AND lease_id = ?2")
            .bind(seq)
            .bind(lease_id)
            .execute(self.db.as_ref())
            .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Row counts for one queue.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn depth(&self, queue: QueueName) -> Result<QueueDepth> {
        let now = Utc::now().timestamp_millis();
        let row: DepthRow = sqlx::query_as(
            "SELECT
                 COALESCE(SUM(CASE WHEN status = 'ready' THEN 1 ELSE 0 END), 0) AS ready,
                 COALESCE(SUM(CASE WHEN status = 'ready' AND leased_until > ?2 THEN 1 ELSE 0 END), 0) AS leased,
                 COALESCE(SUM(CASE WHEN status = 'dead' THEN 1 ELSE 0 END), 0) AS dead
             FROM queue_message WHERE queue = ?1",
        )
        .bind(queue.as_str())
        .bind(now)
        .fetch_one(self.db.as_ref())
        .await?;

        Ok(QueueDepth {
            ready: count(row.ready),
            leased: count(row.leased),
            dead: count(row.dead),
        })
    }

    /// Delete dead-lettered rows enqueued before `before`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the delete fails.
    pub async fn purge_dead(&self, before: DateTime<Utc>) -> Result<u64> {
        let result =
            sqlx::query("DELETE FROM queue_message WHERE status = 'dead' AND enqueued_at < ?1")
                .bind(before.to_rfc3339_opts(SecondsFormat::Micros, true))
                .execute(self.db.as_ref())
                .await?;
        Ok(result.rows_affected())
    }
}
