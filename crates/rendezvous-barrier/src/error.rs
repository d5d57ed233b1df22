//! Error types for the double barrier.

use rendezvous_core::CoordinationError;
use rendezvous_core::SessionId;
use snafu::Snafu;

use crate::types::BarrierErrorKind;
use crate::types::ParticipantState;

/// Errors from barrier operations.
///
/// Only "already exists" on idempotent creates and "not found" on idempotent
/// deletes are absorbed by the protocol; everything else surfaces here.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum BarrierError {
    /// The existing barrier root stores a different target count.
    #[snafu(display("barrier '{path}' stores target count {stored}, requested {requested}"))]
    Configuration {
        /// Barrier root path.
        path: String,
        /// Count stored in the root.
        stored: u32,
        /// Count this participant was configured with.
        requested: u32,
    },

    /// The barrier root's value is not a decimal target count.
    #[snafu(display("barrier root '{path}' holds an unreadable target count: {reason}"))]
    CorruptedRoot {
        /// Barrier root path.
        path: String,
        /// What was wrong with the stored value.
        reason: String,
    },

    /// Barrier configuration or participant alias rejected before use.
    #[snafu(display("invalid barrier configuration: {reason}"))]
    InvalidConfig {
        /// Why the configuration was rejected.
        reason: String,
    },

    /// A coordination operation failed with a recoverable error.
    #[snafu(display("transient coordination failure during {operation}: {source}"))]
    Transient {
        /// The barrier step that failed.
        operation: &'static str,
        /// The underlying client error.
        source: CoordinationError,
    },

    /// The participant's session expired; its member node is gone.
    #[snafu(display("session {session_id} expired during {operation}"))]
    SessionExpired {
        /// The barrier step that observed the expiry.
        operation: &'static str,
        /// The expired session.
        session_id: SessionId,
    },

    /// The barrier was driven out of protocol order.
    #[snafu(display("protocol violation: {reason}"))]
    ProtocolViolation {
        /// What was violated.
        reason: String,
    },

    /// A configured deadline expired.
    #[snafu(display("{operation} timed out after {timeout_ms}ms"))]
    TimedOut {
        /// The barrier step that timed out.
        operation: &'static str,
        /// The configured timeout.
        timeout_ms: u64,
    },

    /// The operation is not valid in the participant's current state.
    #[snafu(display("cannot {operation} while {state}"))]
    InvalidState {
        /// The rejected operation.
        operation: &'static str,
        /// State the participant was in.
        state: ParticipantState,
    },

    /// Any other coordination failure.
    #[snafu(display("coordination failure during {operation}: {source}"))]
    Coordination {
        /// The barrier step that failed.
        operation: &'static str,
        /// The underlying client error.
        source: CoordinationError,
    },
}

impl BarrierError {
    /// Classify a client error raised during `operation`.
    pub fn from_client(operation: &'static str, source: CoordinationError) -> Self {
        match source {
            CoordinationError::SessionExpired { session_id } => BarrierError::SessionExpired { operation, session_id },
            source if source.is_transient() => BarrierError::Transient { operation, source },
            source => BarrierError::Coordination { operation, source },
        }
    }

    /// The taxonomy bucket this error belongs to.
    pub fn kind(&self) -> BarrierErrorKind {
        match self {
            BarrierError::Configuration { .. } | BarrierError::CorruptedRoot { .. } => BarrierErrorKind::Configuration,
            BarrierError::InvalidConfig { .. } | BarrierError::InvalidState { .. } => BarrierErrorKind::Usage,
            BarrierError::Transient { .. } => BarrierErrorKind::Transient,
            BarrierError::SessionExpired { .. } => BarrierErrorKind::SessionExpired,
            BarrierError::ProtocolViolation { .. } => BarrierErrorKind::ProtocolViolation,
            BarrierError::TimedOut { .. } => BarrierErrorKind::TimedOut,
            BarrierError::Coordination { .. } => BarrierErrorKind::Coordination,
        }
    }
}
