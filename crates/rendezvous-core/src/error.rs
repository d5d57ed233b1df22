//! Error types for coordination client operations.
//!
//! Each variant maps to one outcome a hierarchical coordination service can
//! report for a single-node operation. Callers that build idempotent node
//! lifecycles on top (create-if-absent, delete-if-present) match on
//! [`CoordinationError::NodeExists`] and [`CoordinationError::NoNode`].

use snafu::Snafu;

use crate::types::SessionId;

/// Errors returned by a [`CoordinationClient`](crate::CoordinationClient).
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub))]
pub enum CoordinationError {
    /// A non-sequential create collided with an existing node.
    #[snafu(display("node '{path}' already exists"))]
    NodeExists {
        /// Path that already exists.
        path: String,
    },

    /// The node (or, for creates, its parent) does not exist.
    #[snafu(display("node '{path}' does not exist"))]
    NoNode {
        /// Path that was not found.
        path: String,
    },

    /// Delete refused because the node still has children.
    #[snafu(display("node '{path}' has {children} children"))]
    NotEmpty {
        /// Path that still has children.
        path: String,
        /// Number of children at the time of the refusal.
        children: u32,
    },

    /// Delete refused because the node's version did not match.
    #[snafu(display("version mismatch on '{path}': expected {expected}, actual {actual}"))]
    BadVersion {
        /// Path whose version did not match.
        path: String,
        /// Version the caller expected.
        expected: i32,
        /// Version the node actually has.
        actual: i32,
    },

    /// Ephemeral nodes cannot have children.
    #[snafu(display("cannot create children under ephemeral node '{path}'"))]
    NoChildrenForEphemerals {
        /// The ephemeral parent path.
        path: String,
    },

    /// The session this client is bound to has expired.
    #[snafu(display("session {session_id} expired"))]
    SessionExpired {
        /// The expired session.
        session_id: SessionId,
    },

    /// Recoverable connection failure; the operation may or may not have been applied.
    #[snafu(display("connection loss: {reason}"))]
    ConnectionLoss {
        /// Human-readable description of the failure.
        reason: String,
    },

    /// Path failed validation before reaching the service.
    #[snafu(display("invalid path '{path}': {reason}"))]
    InvalidPath {
        /// The rejected path.
        path: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Node already holds the maximum number of children.
    #[snafu(display("node '{path}' already has the maximum of {max} children"))]
    TooManyChildren {
        /// Parent path that is full.
        path: String,
        /// Configured maximum.
        max: u32,
    },

    /// Session already holds the maximum number of armed watches.
    #[snafu(display("session {session_id} already holds the maximum of {max} watches"))]
    TooManyWatches {
        /// Session that hit the limit.
        session_id: SessionId,
        /// Configured maximum.
        max: u32,
    },

    /// Node payload exceeds [`MAX_NODE_DATA_SIZE`](crate::constants::MAX_NODE_DATA_SIZE).
    #[snafu(display("data size {size} exceeds maximum of {max} bytes"))]
    DataTooLarge {
        /// Size of the rejected payload.
        size: usize,
        /// Configured maximum.
        max: u32,
    },
}

impl CoordinationError {
    /// Returns true if retrying the same operation may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, CoordinationError::ConnectionLoss { .. })
    }
}
