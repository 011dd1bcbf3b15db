//! Retry Helper
//!
//! Transient network failures are expected on every backend, so the retry
//! policy is a configuration point rather than hard-coded behavior. Only
//! errors that classify themselves retryable are retried; configuration and
//! parse errors fail immediately.

use std::fmt::Display;
use std::future::Future;

use tracing::warn;

use crate::config::RetryPolicy;

/// Implemented by the per-backend error types to classify transient
/// failures.
pub trait Retryable {
    /// Whether the operation that produced this error may be retried.
    fn is_retryable(&self) -> bool;
}

/// Run `op` under the given retry policy.
///
/// Attempt `n` (1-based) sleeps `initial_backoff * n` before re-running.
pub(crate) async fn with_retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    what: &str,
    mut op: F,
) -> Result<T, E>
where
    E: Retryable + Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt: u32 = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < policy.max_retries => {
                attempt += 1;
                warn!(attempt, error = %err, "{} failed, retrying", what);
                tokio::time::sleep(policy.initial_backoff * attempt).await;
            }
            Err(err) => return Err(err),
        }
    }
}
