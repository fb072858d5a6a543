//! `SQLite` schema bootstrap logic.
//!
//! All table definitions use `CREATE TABLE IF NOT EXISTS` and are safe to
//! re-run on every startup.

use sqlx::SqlitePool;

use crate::Result;

/// Apply all table definitions to the connected `SQLite` database.
///
/// # Errors
///
/// Returns `AppError::Db` if any DDL statement fails.
pub async fn bootstrap_schema(pool: &SqlitePool) -> Result<()> {
    let ddl = r"
CREATE TABLE IF NOT EXISTS dialogue_state (
    user_id         TEXT PRIMARY KEY NOT NULL,
    state           TEXT NOT NULL,
    version         INTEGER NOT NULL,
    updated_at      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS queue_message (
    seq             INTEGER PRIMARY KEY AUTOINCREMENT,
    queue           TEXT NOT NULL CHECK(queue IN ('inbound','outbound')),
    payload         TEXT NOT NULL,
    status          TEXT NOT NULL CHECK(status IN ('ready','dead')),
    attempts        INTEGER NOT NULL DEFAULT 0,
    lease_id        TEXT,
    leased_until    INTEGER NOT NULL DEFAULT 0,
    enqueued_at     TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_queue_ready ON queue_message(queue, status, seq);
CREATE INDEX IF NOT EXISTS idx_dialogue_updated ON dialogue_state(updated_at);
";

    sqlx::raw_sql(ddl).execute(pool).await?;
    Ok(())
}
