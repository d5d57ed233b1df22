//! Verified pure functions for the double barrier.
//!
//! This module implements the "Functional Core, Imperative Shell" pattern:
//! every decision the barrier protocol makes about counts, names and states is
//! a deterministic function here, and the async controller only performs I/O.
//!
//! # Module Organization
//!
//! - [`barrier`]: Quorum and drain checks, root value encoding, participant transitions
//! - [`backoff`]: Bounded retry decisions and exponential backoff with jitter

pub mod backoff;
pub mod barrier;

// ============================================================================
// Re-exports: Barrier
// ============================================================================

// Root Value
pub use barrier::encode_target_count;
pub use barrier::is_valid_target_count;
pub use barrier::parse_target_count;
// Membership
pub use barrier::count_members;
pub use barrier::has_ready_marker;
pub use barrier::is_valid_alias;
pub use barrier::member_name_prefix;
// Quorum and Drain
pub use barrier::is_entry_quorum_reached;
pub use barrier::is_round_drained;
// State Machine
pub use barrier::is_valid_participant_transition;

// ============================================================================
// Re-exports: Backoff
// ============================================================================

pub use backoff::BackoffResult;
pub use backoff::compute_backoff_with_jitter;
pub use backoff::effective_max_attempts;
pub use backoff::retry_jitter_seed;
pub use backoff::should_retry;
