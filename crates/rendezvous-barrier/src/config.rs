//! Barrier configuration.

use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::constants::DEFAULT_RETRY_INITIAL_BACKOFF_MS;
use crate::constants::DEFAULT_RETRY_MAX_BACKOFF_MS;
use crate::constants::MAX_BARRIER_TARGET_COUNT;
use crate::constants::MAX_RETRY_ATTEMPTS;
use crate::error::BarrierError;
use crate::layout::BarrierPath;
use crate::verified::is_valid_target_count;

/// Bounded retry for idempotent coordination operations.
///
/// Applies to root creation, ready marker creation and deletion, member
/// deletion and reads. Member creation is never retried: a lost reply would
/// leave an orphan member that inflates the count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts per operation, including the first. `1` disables retry.
    pub max_attempts: u32,
    /// Backoff before the first retry.
    pub initial_backoff_ms: u64,
    /// Cap on the backoff between retries.
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff_ms: DEFAULT_RETRY_INITIAL_BACKOFF_MS,
            max_backoff_ms: DEFAULT_RETRY_MAX_BACKOFF_MS,
        }
    }
}

impl RetryPolicy {
    /// Policy that allows up to `max_attempts` attempts with default backoff.
    pub fn with_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    /// Validate the policy.
    pub fn validate(&self) -> Result<(), BarrierError> {
        if self.max_attempts == 0 || self.max_attempts > MAX_RETRY_ATTEMPTS {
            return Err(BarrierError::InvalidConfig {
                reason: format!("retry max_attempts must be in 1..={MAX_RETRY_ATTEMPTS}, got {}", self.max_attempts),
            });
        }
        if self.initial_backoff_ms > self.max_backoff_ms {
            return Err(BarrierError::InvalidConfig {
                reason: format!(
                    "retry initial_backoff_ms ({}) exceeds max_backoff_ms ({})",
                    self.initial_backoff_ms, self.max_backoff_ms
                ),
            });
        }
        Ok(())
    }
}

/// Immutable configuration shared by every participant of one barrier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BarrierConfig {
    path: BarrierPath,
    target_count: u32,
    enter_timeout: Option<Duration>,
    leave_timeout: Option<Duration>,
    retry: RetryPolicy,
    validate_existing_count: bool,
}

impl BarrierConfig {
    /// Configuration for a barrier at `root` that opens once `target_count`
    /// participants have entered.
    pub fn new(root: impl Into<String>, target_count: u32) -> Result<Self, BarrierError> {
        let path = BarrierPath::new(root)?;
        if !is_valid_target_count(target_count) {
            return Err(BarrierError::InvalidConfig {
                reason: format!("target count must be in 1..={MAX_BARRIER_TARGET_COUNT}, got {target_count}"),
            });
        }
        Ok(Self {
            path,
            target_count,
            enter_timeout: None,
            leave_timeout: None,
            retry: RetryPolicy::default(),
            validate_existing_count: false,
        })
    }

    /// Bound how long `enter` waits for the entry quorum.
    pub fn with_enter_timeout(mut self, timeout: Duration) -> Self {
        self.enter_timeout = Some(timeout);
        self
    }

    /// Bound how long `leave` waits for the round to drain.
    pub fn with_leave_timeout(mut self, timeout: Duration) -> Self {
        self.leave_timeout = Some(timeout);
        self
    }

    /// Retry idempotent operations according to `retry`.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Result<Self, BarrierError> {
        retry.validate()?;
        self.retry = retry;
        Ok(self)
    }

    /// Make `init` reject an existing root that stores a different count.
    pub fn with_count_validation(mut self, enabled: bool) -> Self {
        self.validate_existing_count = enabled;
        self
    }

    pub fn path(&self) -> &BarrierPath {
        &self.path
    }

    pub fn target_count(&self) -> u32 {
        self.target_count
    }

    pub fn enter_timeout(&self) -> Option<Duration> {
        self.enter_timeout
    }

    pub fn leave_timeout(&self) -> Option<Duration> {
        self.leave_timeout
    }

    pub fn retry(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn validate_existing_count(&self) -> bool {
        self.validate_existing_count
    }
}
