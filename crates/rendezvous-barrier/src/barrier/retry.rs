//! Bounded retry of idempotent coordination operations.

use std::future::Future;
use std::time::Duration;

use rendezvous_core::CoordinationError;
use rendezvous_core::SessionId;
use tracing::warn;

use crate::config::RetryPolicy;
use crate::verified::compute_backoff_with_jitter;
use crate::verified::retry_jitter_seed;
use crate::verified::should_retry;

/// Run `op` until it succeeds, fails permanently, or `policy` runs out of
/// attempts. Only transient client errors are retried.
///
/// Callers must only pass operations whose repetition cannot change the
/// outcome: creates that tolerate `NodeExists`, deletes that tolerate
/// `NoNode`, and reads.
pub(crate) async fn retry_idempotent<T, F, Fut>(
    policy: &RetryPolicy,
    session_id: SessionId,
    operation: &'static str,
    mut op: F,
) -> Result<T, CoordinationError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CoordinationError>>,
{
    let mut attempt: u32 = 1;
    let mut backoff_ms = policy.initial_backoff_ms;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if should_retry(attempt, policy.max_attempts, err.is_transient()) => {
                let backoff =
                    compute_backoff_with_jitter(backoff_ms, policy.max_backoff_ms, retry_jitter_seed(session_id.value(), attempt));
                warn!(
                    operation,
                    attempt,
                    max_attempts = policy.max_attempts,
                    sleep_ms = backoff.sleep_ms,
                    error = %err,
                    "transient coordination failure, retrying"
                );
                tokio::time::sleep(Duration::from_millis(backoff.sleep_ms)).await;
                backoff_ms = backoff.next_backoff_ms;
                attempt = attempt.saturating_add(1);
            }
            Err(err) => return Err(err),
        }
    }
}
