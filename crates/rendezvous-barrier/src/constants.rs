//! Barrier layout and resource limits.
//!
//! Tiger Style: Constants are fixed and immutable, enforced at compile time.

/// Name of the sentinel child that marks "entry quorum reached".
pub const READY_MARKER_NAME: &str = "ready";

/// Separator between a participant alias and its service-assigned sequence.
pub const MEMBER_SEQUENCE_SEPARATOR: char = '-';

/// Maximum number of participants a single barrier may require.
///
/// Tiger Style: Bounded below the tree's per-node child limit so a full
/// barrier plus its ready marker always fits under the root.
pub const MAX_BARRIER_TARGET_COUNT: u32 = 65_535;

/// Maximum length of a participant alias in bytes.
pub const MAX_ALIAS_SIZE: u32 = 128;

// ============================================================================
// Retry Limits
// ============================================================================

/// Default initial backoff between retries of idempotent operations.
pub const DEFAULT_RETRY_INITIAL_BACKOFF_MS: u64 = 10;

/// Default cap on the backoff between retries.
pub const DEFAULT_RETRY_MAX_BACKOFF_MS: u64 = 1_000;

/// Upper bound on attempts for a single idempotent operation.
///
/// Tiger Style: Retries are always bounded.
pub const MAX_RETRY_ATTEMPTS: u32 = 16;
