//! Database operations for `sync_runs`.
//!
//! Lifecycle: `queued` → `running` → `succeeded` | `failed`, or
//! `queued` → `skipped` when the min-interval guard refuses to start.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

pub const TRIGGER_CLI: &str = "cli";
pub const TRIGGER_SCHEDULER: &str = "scheduler";

const SYNC_RUN_COLUMNS: &str = "id, public_id, trigger_source, status, started_at, completed_at, \
     records_processed, failure_count, report, error_message, created_at";

/// A row from the `sync_runs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SyncRunRow {
    pub id: i64,
    pub public_id: Uuid,
    pub trigger_source: String,
    pub status: String,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Catalog records created or updated by the run.
    pub records_processed: i32,
    pub failure_count: i32,
    /// Serialized sync report; `NULL` until the run finishes.
    pub report: Option<Value>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Creates a new sync run in `queued` status.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_sync_run(pool: &PgPool, trigger_source: &str) -> Result<SyncRunRow, DbError> {
    let public_id = Uuid::new_v4();

    let row = sqlx::query_as::<_, SyncRunRow>(&format!(
        "INSERT INTO sync_runs (public_id, trigger_source, status) \
         VALUES ($1, $2, 'queued') \
         RETURNING {SYNC_RUN_COLUMNS}"
    ))
    .bind(public_id)
    .bind(trigger_source)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Marks a run as `running` and sets `started_at = NOW()`.
///
/// # Errors
///
/// Returns [`DbError::InvalidSyncRunTransition`] if the run is not `queued`,
/// or [`DbError::Sqlx`] if the update fails.
pub async fn start_sync_run(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE sync_runs \
         SET status = 'running', started_at = NOW() \
         WHERE id = $1 AND status = 'queued'",
    )
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidSyncRunTransition {
            id,
            expected_status: "queued",
        });
    }

    Ok(())
}

/// Marks a run as `succeeded` and stores its report.
///
/// # Errors
///
/// Returns [`DbError::InvalidSyncRunTransition`] if the run is not `running`,
/// or [`DbError::Sqlx`] if the update fails.
pub async fn complete_sync_run(
    pool: &PgPool,
    id: i64,
    records_processed: i32,
    failure_count: i32,
    report: &Value,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE sync_runs \
         SET status = 'succeeded', completed_at = NOW(), \
             records_processed = $1, failure_count = $2, report = $3 \
         WHERE id = $4 AND status = 'running'",
    )
    .bind(records_processed)
    .bind(failure_count)
    .bind(report)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidSyncRunTransition {
            id,
            expected_status: "running",
        });
    }

    Ok(())
}

/// Marks a run as `failed`, sets `completed_at = NOW()` and `error_message`.
///
/// A `queued` run may fail too, when bookkeeping breaks before it starts.
///
/// # Errors
///
/// Returns [`DbError::InvalidSyncRunTransition`] if the run is neither
/// `queued` nor `running`, or [`DbError::Sqlx`] if the update fails.
pub async fn fail_sync_run(pool: &PgPool, id: i64, error_message: &str) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE sync_runs \
         SET status = 'failed', completed_at = NOW(), error_message = $1 \
         WHERE id = $2 AND status IN ('queued', 'running')",
    )
    .bind(error_message)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidSyncRunTransition {
            id,
            expected_status: "queued or running",
        });
    }

    Ok(())
}

/// Marks a queued run as `skipped` without ever starting it.
///
/// # Errors
///
/// Returns [`DbError::InvalidSyncRunTransition`] if the run is not `queued`,
/// or [`DbError::Sqlx`] if the update fails.
pub async fn skip_sync_run(pool: &PgPool, id: i64, reason: &str) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE sync_runs \
         SET status = 'skipped', completed_at = NOW(), error_message = $1 \
         WHERE id = $2 AND status = 'queued'",
    )
    .bind(reason)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidSyncRunTransition {
            id,
            expected_status: "queued",
        });
    }

    Ok(())
}

/// Fetches a single run by its internal `id`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given `id`, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_sync_run(pool: &PgPool, id: i64) -> Result<SyncRunRow, DbError> {
    sqlx::query_as::<_, SyncRunRow>(&format!(
        "SELECT {SYNC_RUN_COLUMNS} FROM sync_runs WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Returns the run that most recently started, excluding `exclude_id`.
///
/// Skipped runs never start, so they do not push the min-interval window
/// forward.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn last_started_sync_run(
    pool: &PgPool,
    exclude_id: i64,
) -> Result<Option<SyncRunRow>, DbError> {
    let row = sqlx::query_as::<_, SyncRunRow>(&format!(
        "SELECT {SYNC_RUN_COLUMNS} FROM sync_runs \
         WHERE started_at IS NOT NULL AND id <> $1 \
         ORDER BY started_at DESC, id DESC \
         LIMIT 1"
    ))
    .bind(exclude_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Returns the most recent `limit` runs, ordered by `created_at DESC`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_sync_runs(pool: &PgPool, limit: i64) -> Result<Vec<SyncRunRow>, DbError> {
    let rows = sqlx::query_as::<_, SyncRunRow>(&format!(
        "SELECT {SYNC_RUN_COLUMNS} FROM sync_runs \
         ORDER BY created_at DESC, id DESC \
         LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
