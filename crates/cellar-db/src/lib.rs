//! Postgres persistence for suppliers, the wine catalog, and sync runs.

use std::time::Duration;

use cellar_core::AppConfig;
use sqlx::{postgres::PgPoolOptions, PgPool};
use thiserror::Error;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

#[derive(Debug, Error)]
pub enum DbError {
    #[error("record not found")]
    NotFound,
    #[error("sync run {id} is not in status '{expected_status}'")]
    InvalidSyncRunTransition {
        id: i64,
        expected_status: &'static str,
    },
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Pool sizing and acquire timeout taken from the `CELLAR_DB_*` settings.
#[must_use]
pub fn pool_options(config: &AppConfig) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .min_connections(config.db_min_connections)
        .acquire_timeout(Duration::from_secs(config.db_acquire_timeout_secs))
}

/// Opens the pool for `config.database_url`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the connection cannot be established.
pub async fn connect_pool(config: &AppConfig) -> Result<PgPool, DbError> {
    Ok(pool_options(config).connect(&config.database_url).await?)
}

/// Applies pending migrations and returns how many ran.
///
/// # Errors
///
/// Returns [`DbError::Migration`] if any migration fails.
pub async fn run_migrations(pool: &PgPool) -> Result<usize, DbError> {
    // No bookkeeping table yet on a fresh database.
    let applied =
        sqlx::query_scalar::<_, i64>("SELECT version FROM _sqlx_migrations WHERE success = true")
            .fetch_all(pool)
            .await
            .unwrap_or_default();
    let pending = MIGRATOR
        .iter()
        .filter(|migration| !applied.contains(&migration.version))
        .count();

    MIGRATOR.run(pool).await?;
    Ok(pending)
}

/// Round-trips `SELECT 1`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn ping(pool: &PgPool) -> Result<(), DbError> {
    sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(pool)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_transition_names_expected_status() {
        let err = DbError::InvalidSyncRunTransition {
            id: 12,
            expected_status: "running",
        };
        assert_eq!(err.to_string(), "sync run 12 is not in status 'running'");
    }
}

pub mod catalog;
pub mod suppliers;
pub mod sync_runs;

pub use catalog::{PgCatalog, WineRow};
pub use suppliers::{list_active_suppliers, seed_suppliers, SupplierRow};
pub use sync_runs::{
    complete_sync_run, create_sync_run, fail_sync_run, get_sync_run, last_started_sync_run,
    list_sync_runs, skip_sync_run, start_sync_run, SyncRunRow, TRIGGER_CLI, TRIGGER_SCHEDULER,
};
