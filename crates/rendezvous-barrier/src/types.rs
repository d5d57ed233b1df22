//! Shared types for barrier participants.

use std::fmt;

/// Lifecycle of one barrier participant.
///
/// ```text
/// Uninitialized -> Initialized -> Entering -> Entered -> Leaving -> Left
///                                    ^                              |
///                                    +------------------------------+
/// ```
///
/// `Entering` falls back to the state it came from when an enter deadline
/// expires. `Failed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParticipantState {
    /// `init` has not completed yet.
    Uninitialized,
    /// The barrier root exists; the participant is outside the barrier.
    Initialized,
    /// Own member node is being created or the participant waits for quorum.
    Entering,
    /// Entry quorum was observed; the participant is inside the barrier.
    Entered,
    /// Own member node is deleted or the participant waits for the drain.
    Leaving,
    /// The round drained; the participant may enter again.
    Left,
    /// A non-recoverable error occurred. Construct a new participant.
    Failed,
}

impl ParticipantState {
    /// Convert the state to a string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ParticipantState::Uninitialized => "uninitialized",
            ParticipantState::Initialized => "initialized",
            ParticipantState::Entering => "entering",
            ParticipantState::Entered => "entered",
            ParticipantState::Leaving => "leaving",
            ParticipantState::Left => "left",
            ParticipantState::Failed => "failed",
        }
    }

    /// Returns true if no further barrier operation can succeed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ParticipantState::Failed)
    }
}

impl fmt::Display for ParticipantState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse classification of barrier errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BarrierErrorKind {
    /// Barrier root disagrees with the caller's configuration.
    Configuration,
    /// A single coordination operation failed recoverably.
    Transient,
    /// The participant's session is gone.
    SessionExpired,
    /// The protocol was driven out of order (e.g. early release).
    ProtocolViolation,
    /// A configured deadline expired.
    TimedOut,
    /// The caller misused the API (bad arguments or call order).
    Usage,
    /// Any other coordination failure.
    Coordination,
}
