//! Pure retry and backoff computation for idempotent barrier operations.
//!
//! # Tiger Style
//!
//! - Saturating arithmetic throughout
//! - Every retry loop is bounded by an explicit attempt limit

use crate::constants::MAX_RETRY_ATTEMPTS;

/// Sleep for this attempt and the backoff to carry into the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffResult {
    /// Sleep duration in milliseconds (includes jitter).
    pub sleep_ms: u64,
    /// Backoff for the following attempt.
    pub next_backoff_ms: u64,
}

/// Compute exponential backoff with additive jitter.
///
/// Jitter is `jitter_seed % (current_backoff_ms / 2 + 1)`, so concurrent
/// participants that fail together spread out their retries.
///
/// # Example
///
/// ```ignore
/// let result = compute_backoff_with_jitter(100, 1000, 25);
/// assert_eq!(result.sleep_ms, 125);
/// assert_eq!(result.next_backoff_ms, 200);
/// ```
#[inline]
pub fn compute_backoff_with_jitter(current_backoff_ms: u64, max_backoff_ms: u64, jitter_seed: u64) -> BackoffResult {
    let max_jitter = current_backoff_ms.saturating_div(2).saturating_add(1);
    let sleep_ms = current_backoff_ms.saturating_add(jitter_seed % max_jitter);
    let next_backoff_ms = current_backoff_ms.saturating_mul(2).min(max_backoff_ms);
    BackoffResult {
        sleep_ms,
        next_backoff_ms,
    }
}

/// Clamp a configured attempt count into `1..=MAX_RETRY_ATTEMPTS`.
#[inline]
pub fn effective_max_attempts(configured: u32) -> u32 {
    configured.clamp(1, MAX_RETRY_ATTEMPTS)
}

/// Decide whether a failed attempt should be retried.
///
/// # Arguments
///
/// * `attempt` - 1-based number of the attempt that just failed
/// * `max_attempts` - Configured attempt limit
/// * `is_transient` - Whether the failure is recoverable
#[inline]
pub fn should_retry(attempt: u32, max_attempts: u32, is_transient: bool) -> bool {
    is_transient && attempt < effective_max_attempts(max_attempts)
}

/// Deterministic jitter seed derived from the session and attempt number.
#[inline]
pub fn retry_jitter_seed(session_id: u64, attempt: u32) -> u64 {
    session_id.wrapping_mul(0x9E37_79B9_7F4A_7C15).rotate_left(attempt % 64) ^ u64::from(attempt)
}
