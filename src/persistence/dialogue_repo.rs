//! Dialogue state repository with optimistic versioning.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::models::dialogue::{DialogueState, Versioned};
use crate::Result;

use super::db::Database;

/// Repository wrapper around `SQLite` for per-user dialogue state.
#[derive(Clone)]
pub struct DialogueRepo {
    db: Arc<Database>,
}

/// Internal row struct for `SQLite` deserialization.
#[derive(sqlx::FromRow)]
struct DialogueRow {
    state: String,
    version: i64,
}

impl DialogueRow {
    fn into_versioned(self) -> Result<Versioned<DialogueState>> {
        Ok(Versioned {
            value: serde_json::from_str(&self.state)?,
            version: self.version,
        })
    }
}

impl DialogueRepo {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Load a user's state; absent users read as the default state at version 0.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails or the stored JSON is corrupt.
    pub async fn load(&self, user_id: &str) -> Result<Versioned<DialogueState>> {
        let row: Option<DialogueRow> =
            sqlx::query_as("SELECT state, version FROM dialogue_state WHERE user_id = ?1")
                .bind(user_id)
                .fetch_optional(self.db.as_ref())
                .await?;

        match row {
            Some(row) => row.into_versioned(),
            None => Ok(Versioned {
                value: DialogueState::default(),
                version: 0,
            }),
        }
    }

    /// Write `state` only if the stored version still equals `expected_version`.
    ///
    /// Returns `false` when another writer got there first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the statement fails.
    pub async fn compare_and_swap(
        &self,
        user_id: &str,
        expected_version: i64,
        state: &DialogueState,
    ) -> Result<bool> {
        let json = serde_json::to_string(state)?;
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);

        let result = if expected_version == 0 {
            sqlx::query(
                "INSERT INTO dialogue_state (user_id, state, version, updated_at)
                 VALUES (?1, ?2, 1, ?3)
                 ON CONFLICT(user_id) DO NOTHING",
            )
            .bind(user_id)
            .bind(&json)
            .bind(&now)
            .execute(self.db.as_ref())
            .await?
        } else {
            sqlx::query(
                "UPDATE dialogue_state SET state = ?1, version = version + 1, updated_at = ?2
                 WHERE user_id = ?3 AND version = ?4",
            )
            .bind(&json)
            .bind(&now)
            .bind(user_id)
            .bind(expected_version)
            .execute(self.db.as_ref())
            .await?
        };

        Ok(result.rows_affected() == 1)
    }

    /// Delete rows not touched since `before`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the delete fails.
    pub async fn purge_idle(&self, before: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM dialogue_state WHERE updated_at < ?1")
            .bind(before.to_rfc3339_opts(SecondsFormat::Micros, true))
            .execute(self.db.as_ref())
            .await?;
        Ok(result.rows_affected())
    }
}
