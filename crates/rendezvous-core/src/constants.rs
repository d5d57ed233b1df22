//! Public constants for coordination tree operations.
//!
//! Tiger Style: Constants are fixed and immutable, enforced at compile time.
//! Each constant has explicit bounds to prevent unbounded resource allocation.

// ============================================================================
// Tree Size Limits
// ============================================================================

/// Maximum length of a node path in bytes (1 KB).
///
/// Tiger Style: Fixed limit prevents memory exhaustion from oversized paths.
pub const MAX_PATH_SIZE: u32 = 1024;

/// Maximum size of a node's data payload in bytes (1 MB).
pub const MAX_NODE_DATA_SIZE: u32 = 1024 * 1024;

/// Maximum number of children a single node may hold.
///
/// Tiger Style: Bounds the size of every `get_children` response.
pub const MAX_CHILDREN_PER_NODE: u32 = 65_536;

/// Number of decimal digits appended to sequential node names.
///
/// Matches the zero-padded layout used by hierarchical coordination services,
/// so lexicographic order of sequential siblings equals creation order.
pub const SEQUENCE_SUFFIX_DIGITS: usize = 10;

// ============================================================================
// Watch Dispatch
// ============================================================================

/// Capacity of the per-session watch event channel.
///
/// Tiger Style: Bounded so a stalled watcher applies backpressure to mutations
/// instead of growing memory without limit.
pub const WATCH_EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Maximum number of watches a single session may hold armed at once.
pub const MAX_WATCHES_PER_SESSION: u32 = 10_000;
