//! `sync` command: one reconciliation run with `sync_runs` bookkeeping.

use anyhow::Context;
use cellar_core::AppConfig;
use cellar_db::PgCatalog;
use cellar_feed::FeedClient;
use cellar_sync::{ImageSink, Reconciler, SyncOrchestrator, SyncReport, SyncSettings};
use chrono::{DateTime, TimeDelta, Utc};

/// How a sync invocation ended.
#[derive(Debug)]
pub(crate) enum RunOutcome {
    Completed(SyncReport),
    /// The min-interval guard refused to start; carries the time left.
    Skipped(TimeDelta),
}

pub(crate) fn build_orchestrator(
    pool: &sqlx::PgPool,
    config: &AppConfig,
) -> anyhow::Result<SyncOrchestrator<PgCatalog, PgCatalog>> {
    let feed = FeedClient::new(
        config.feed_request_timeout_secs,
        &config.feed_user_agent,
        config.feed_max_retries,
        config.feed_retry_backoff_base_secs,
    )
    .context("failed to build supplier feed client")?;

    let catalog = PgCatalog::new(pool.clone());
    let reconciler = Reconciler::new(
        catalog.clone(),
        ImageSink::new(&config.blob_root),
        config.image_policy,
    );
    let settings = SyncSettings {
        max_concurrent_suppliers: config.feed_max_concurrent_suppliers,
        reconcile_max_concurrent: config.reconcile_max_concurrent,
    };

    Ok(SyncOrchestrator::new(catalog, feed, reconciler, settings))
}

/// Time left before another run may start, or `None` if one may start now.
///
/// `min_interval_secs == 0` disables the guard.
fn min_interval_remaining(
    last_started: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    min_interval_secs: u64,
) -> Option<TimeDelta> {
    let last_started = last_started?;
    if min_interval_secs == 0 {
        return None;
    }
    let min_interval = i64::try_from(min_interval_secs)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .unwrap_or(TimeDelta::MAX);
    let elapsed = now.signed_duration_since(last_started);
    let remaining = min_interval.checked_sub(&elapsed)?;
    (remaining > TimeDelta::zero()).then_some(remaining)
}

/// Runs one sync, recording it in `sync_runs`.
///
/// Unless `force` is set, a run that would start within
/// `sync_min_interval_secs` of the previous one is recorded as `skipped`.
///
/// # Errors
///
/// Returns an error if the run cannot be recorded or the sync fails fatally
/// (no suppliers, unreadable registry, or every supplier unreachable). Once
/// the run row exists, any error marks it `failed` on a best-effort basis.
pub(crate) async fn run_sync_command(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    trigger_source: &str,
    force: bool,
) -> anyhow::Result<RunOutcome> {
    let orchestrator = build_orchestrator(pool, config)?;
    let run = cellar_db::create_sync_run(pool, trigger_source).await?;

    match guard_and_start(pool, config, run.id, force).await {
        Ok(None) => {}
        Ok(Some(remaining)) => return Ok(RunOutcome::Skipped(remaining)),
        Err(err) => {
            crate::fail_run_best_effort(pool, run.id, format!("{err:#}")).await;
            return Err(err);
        }
    }
    tracing::info!(run_id = run.id, public_id = %run.public_id, trigger_source, "sync started");

    let report = match orchestrator.run_sync().await {
        Ok(report) => report,
        Err(err) => {
            let message = match &err {
                cellar_sync::SyncError::NoReachableSuppliers { failures } => {
                    let reasons: Vec<&str> = failures.iter().map(|f| f.reason.as_str()).collect();
                    format!("{err}: {}", reasons.join("; "))
                }
                _ => err.to_string(),
            };
            crate::fail_run_best_effort(pool, run.id, message).await;
            return Err(err.into());
        }
    };

    let records = i32::try_from(report.records_written()).unwrap_or(i32::MAX);
    let failures = i32::try_from(report.failures.len()).unwrap_or(i32::MAX);
    let report_json = serde_json::to_value(&report).context("failed to serialize sync report")?;
    if let Err(err) =
        cellar_db::complete_sync_run(pool, run.id, records, failures, &report_json).await
    {
        crate::fail_run_best_effort(pool, run.id, format!("{err:#}")).await;
        return Err(err.into());
    }

    print_report(&report);
    Ok(RunOutcome::Completed(report))
}

/// Applies the min-interval guard to a queued run, then starts it.
///
/// Returns the time left when the guard skipped the run.
async fn guard_and_start(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    run_id: i64,
    force: bool,
) -> anyhow::Result<Option<TimeDelta>> {
    if !force {
        let last = cellar_db::last_started_sync_run(pool, run_id).await?;
        let last_started = last.and_then(|r| r.started_at);
        if let Some(remaining) =
            min_interval_remaining(last_started, Utc::now(), config.sync_min_interval_secs)
        {
            let reason = format!(
                "previous run started less than {}s ago",
                config.sync_min_interval_secs
            );
            cellar_db::skip_sync_run(pool, run_id, &reason).await?;
            tracing::warn!(
                run_id,
                remaining_secs = remaining.num_seconds(),
                "sync skipped: {reason}"
            );
            println!(
                "sync skipped: {reason}; next run allowed in {}s (use --force to override)",
                remaining.num_seconds()
            );
            return Ok(Some(remaining));
        }
    }

    cellar_db::start_sync_run(pool, run_id).await?;
    Ok(None)
}

/// Fetches and aggregates, then prints the winning offers. Writes nothing.
///
/// # Errors
///
/// Returns an error if the sync would fail fatally.
pub(crate) async fn run_preview(pool: &sqlx::PgPool, config: &AppConfig) -> anyhow::Result<()> {
    let orchestrator = build_orchestrator(pool, config)?;
    let preview = orchestrator.preview().await?;

    println!(
        "dry-run: {} of {} suppliers reachable, {} offers, {} products",
        preview.report.suppliers_succeeded,
        preview.report.suppliers_total,
        preview.report.offers_fetched,
        preview.report.products_considered,
    );
    for (upc, offer) in preview.winners.iter() {
        println!(
            "  {upc:<16} {:>10}  supplier {:<4} image: {}",
            offer.price,
            offer.supplier_id,
            if offer.image.is_some() { "yes" } else { "no" },
        );
    }
    print_failures(&preview.report);
    Ok(())
}

fn print_report(report: &SyncReport) {
    println!(
        "sync complete: {}/{} suppliers, {} offers, {} products \
         (created {}, updated {}, unchanged {}), {} image(s) written",
        report.suppliers_succeeded,
        report.suppliers_total,
        report.offers_fetched,
        report.products_considered,
        report.created,
        report.updated,
        report.unchanged,
        report.images_written,
    );
    print_failures(report);
}

fn print_failures(report: &SyncReport) {
    if report.failures.is_empty() {
        return;
    }
    println!("{} failure(s):", report.failures.len());
    for failure in &report.failures {
        println!("  {:?} {:?}: {}", failure.kind, failure.scope, failure.reason);
    }
}
