//! Bounded retry for supplier requests.
//!
//! A retry re-issues the whole request for one supplier, so a successful
//! attempt replaces (never extends) that supplier's offer list. Retries are
//! disabled unless `max_retries > 0`.

use std::future::Future;
use std::time::Duration;

use crate::error::FeedError;

/// Returns `true` if `err` is transient and worth another attempt.
///
/// Retriable: [`FeedError::Unreachable`], [`FeedError::RateLimited`], and
/// 5xx [`FeedError::UnexpectedStatus`]. Everything else (4xx, bad JSON,
/// invalid base URL) would fail the same way again.
fn is_retriable(err: &FeedError) -> bool {
    match err {
        FeedError::Unreachable { .. } | FeedError::RateLimited { .. } => true,
        FeedError::UnexpectedStatus { status, .. } => *status >= 500,
        _ => false,
    }
}

/// Executes `operation`, retrying transient failures with exponential backoff.
///
/// Sleeps `backoff_base_secs * 2^attempt` seconds between attempts, for at most
/// `max_retries` additional attempts after the first. The last error is
/// returned once retries are exhausted; non-retriable errors are returned
/// immediately.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_secs: u64,
    mut operation: F,
) -> Result<T, FeedError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FeedError>>,
{
    let mut attempt = 0u32;

    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        if !is_retriable(&err) || attempt >= max_retries {
            return Err(err);
        }

        let delay_secs = backoff_base_secs.saturating_mul(1u64 << attempt.min(62));
        tracing::warn!(
            attempt,
            max_retries,
            delay_secs,
            error = %err,
            "transient supplier error, retrying after backoff"
        );
        tokio::time::sleep(Duration::from_secs(delay_secs)).await;
        attempt += 1;
    }
}
