//! `runs` command: recent sync runs, newest first.

use chrono::{DateTime, Utc};

fn fmt_time(at: Option<DateTime<Utc>>) -> String {
    at.map_or_else(
        || "\u{2014}".to_string(),
        |t| t.format("%Y-%m-%d %H:%M:%S").to_string(),
    )
}

/// Prints the most recent `limit` sync runs.
///
/// # Errors
///
/// Returns an error if the query fails.
pub(crate) async fn run_list_runs(pool: &sqlx::PgPool, limit: i64) -> anyhow::Result<()> {
    let runs = cellar_db::list_sync_runs(pool, limit.max(1)).await?;
    if runs.is_empty() {
        println!("no sync runs recorded");
        return Ok(());
    }

    println!(
        "{:<6} {:<10} {:<9} {:<19} {:<19} {:>7} {:>8}",
        "id", "status", "trigger", "started", "completed", "records", "failures"
    );
    for run in &runs {
        println!(
            "{:<6} {:<10} {:<9} {:<19} {:<19} {:>7} {:>8}",
            run.id,
            run.status,
            run.trigger_source,
            fmt_time(run.started_at),
            fmt_time(run.completed_at),
            run.records_processed,
            run.failure_count,
        );
        if let Some(message) = &run.error_message {
            println!("       {message}");
        }
    }
    Ok(())
}

/// Prints one sync run with its stored report.
///
/// # Errors
///
/// Returns an error if the run does not exist or the query fails.
pub(crate) async fn run_show_run(pool: &sqlx::PgPool, id: i64) -> anyhow::Result<()> {
    let run = match cellar_db::get_sync_run(pool, id).await {
        Ok(run) => run,
        Err(cellar_db::DbError::NotFound) => anyhow::bail!("sync run {id} not found"),
        Err(e) => return Err(e.into()),
    };

    println!("run {}", run.id);
    println!("  status:    {}", run.status);
    println!("  trigger:   {}", run.trigger_source);
    println!("  created:   {}", fmt_time(Some(run.created_at)));
    println!("  started:   {}", fmt_time(run.started_at));
    println!("  completed: {}", fmt_time(run.completed_at));
    println!("  records:   {}", run.records_processed);
    println!("  failures:  {}", run.failure_count);
    if let Some(message) = &run.error_message {
        println!("  error:     {message}");
    }
    if let Some(report) = &run.report {
        println!("{}", serde_json::to_string_pretty(report)?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fmt_time_renders_dash_for_missing() {
        assert_eq!(fmt_time(None), "\u{2014}");
    }

    #[test]
    fn fmt_time_renders_utc_timestamp() {
        let at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        assert_eq!(fmt_time(Some(at)), "2023-11-14 22:13:20");
    }
}
