//! `schedule` command: cron-driven syncs until interrupted.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use cellar_core::AppConfig;
use sqlx::PgPool;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::sync::{run_sync_command, RunOutcome};

/// Registers the sync job on `config.sync_schedule` and runs it until
/// SIGINT/SIGTERM.
///
/// At most one sync runs at a time: a tick that fires while the previous
/// run is still in flight is skipped.
///
/// # Errors
///
/// Returns an error if the scheduler cannot be created, the cron
/// expression is rejected, or the scheduler fails to start or stop.
pub(crate) async fn run_schedule(pool: PgPool, config: AppConfig) -> anyhow::Result<()> {
    let mut scheduler = JobScheduler::new().await?;
    let schedule = config.sync_schedule.clone();
    let pool = Arc::new(pool);
    let config = Arc::new(config);
    let in_flight = Arc::new(AtomicBool::new(false));

    let job = Job::new_async(schedule.as_str(), move |_uuid, _lock| {
        let pool = Arc::clone(&pool);
        let config = Arc::clone(&config);
        let in_flight = Arc::clone(&in_flight);

        Box::pin(async move {
            let Some(_guard) = InFlightGuard::acquire(&in_flight) else {
                tracing::warn!("scheduler: previous sync still running; skipping this tick");
                return;
            };
            run_scheduled_sync(&pool, &config).await;
        })
    })?;

    scheduler.add(job).await?;
    scheduler.start().await?;
    tracing::info!(schedule = %schedule, "scheduler started");

    shutdown_signal().await;
    scheduler.shutdown().await?;
    Ok(())
}

/// Holds the single-run flag; releases it on drop, including during a panic.
struct InFlightGuard(Arc<AtomicBool>);

impl InFlightGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        if flag.swap(true, Ordering::SeqCst) {
            return None;
        }
        Some(Self(Arc::clone(flag)))
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

async fn run_scheduled_sync(pool: &PgPool, config: &AppConfig) {
    tracing::info!("scheduler: starting sync");
    match run_sync_command(pool, config, cellar_db::TRIGGER_SCHEDULER, false).await {
        Ok(RunOutcome::Completed(report)) => tracing::info!(
            created = report.created,
            updated = report.updated,
            failures = report.failures.len(),
            "scheduler: sync complete"
        ),
        Ok(RunOutcome::Skipped(remaining)) => tracing::info!(
            remaining_secs = remaining.num_seconds(),
            "scheduler: sync skipped by min-interval guard"
        ),
        Err(e) => tracing::error!(error = %format!("{e:#}"), "scheduler: sync failed"),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, stopping scheduler");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_fails_while_guard_is_held() {
        let flag = Arc::new(AtomicBool::new(false));
        let guard = InFlightGuard::acquire(&flag);
        assert!(guard.is_some());
        assert!(InFlightGuard::acquire(&flag).is_none());

        drop(guard);
        assert!(!flag.load(Ordering::SeqCst));
        assert!(InFlightGuard::acquire(&flag).is_some());
    }

    #[test]
    fn panic_while_held_releases_flag() {
        let flag = Arc::new(AtomicBool::new(false));
        let held = Arc::clone(&flag);
        let result = std::panic::catch_unwind(move || {
            let _guard = InFlightGuard::acquire(&held).unwrap();
            panic!("sync blew up");
        });

        assert!(result.is_err());
        assert!(!flag.load(Ordering::SeqCst));
    }
}
