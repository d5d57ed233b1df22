//! Node, session and watch event types shared by coordination clients.

use serde::Deserialize;
use serde::Serialize;

/// Identifier of a live session with the coordination service.
///
/// Ephemeral nodes are owned by exactly one session and vanish with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SessionId(pub u64);

impl SessionId {
    /// Get the raw session identifier.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

/// How a node is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreateMode {
    /// Survives the creating session.
    Persistent,
    /// Removed automatically when the creating session ends.
    Ephemeral,
    /// Persistent, with a service-assigned monotonic suffix.
    PersistentSequential,
    /// Ephemeral, with a service-assigned monotonic suffix.
    EphemeralSequential,
}

impl CreateMode {
    /// Returns true if the node is tied to the creating session.
    pub fn is_ephemeral(&self) -> bool {
        matches!(self, CreateMode::Ephemeral | CreateMode::EphemeralSequential)
    }

    /// Returns true if the service appends a sequence suffix to the name.
    pub fn is_sequential(&self) -> bool {
        matches!(self, CreateMode::PersistentSequential | CreateMode::EphemeralSequential)
    }
}

/// Version precondition for deletes and data updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Version {
    /// Matches any version (the `-1` convention of coordination services).
    #[default]
    Any,
    /// Matches only this exact data version.
    Exact(i32),
}

impl Version {
    /// Check whether `actual` satisfies this precondition.
    pub fn matches(&self, actual: i32) -> bool {
        match self {
            Version::Any => true,
            Version::Exact(expected) => *expected == actual,
        }
    }

    /// Raw wire value, `-1` for [`Version::Any`].
    pub fn as_raw(&self) -> i32 {
        match self {
            Version::Any => -1,
            Version::Exact(v) => *v,
        }
    }
}

/// Metadata describing a node at the time it was read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeStat {
    /// Number of times the node's data has changed.
    pub version: i32,
    /// Number of times the node's child set has changed.
    pub cversion: i32,
    /// Owning session for ephemeral nodes.
    pub ephemeral_owner: Option<SessionId>,
    /// Current number of children.
    pub num_children: u32,
    /// Length of the node's data payload.
    pub data_length: u32,
    /// Transaction id of the create (monotonic across the tree).
    pub czxid: u64,
    /// Transaction id of the last modification.
    pub mzxid: u64,
}

/// Kind of change that fired a watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    /// Session state change with no node involved.
    None,
    /// The watched node was created.
    NodeCreated,
    /// The watched node was deleted.
    NodeDeleted,
    /// The watched node's data changed.
    NodeDataChanged,
    /// The watched node's child set changed.
    NodeChildrenChanged,
}

/// State of the session a watch event was delivered under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionState {
    /// Session is live.
    Connected,
    /// Session expired; its ephemeral nodes are gone.
    Expired,
    /// Session was closed by its owner.
    Closed,
}

/// A fired watch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchedEvent {
    /// What happened.
    pub event_type: EventType,
    /// Session state at delivery.
    pub state: SessionState,
    /// Path the watch was armed on, absent for pure session events.
    pub path: Option<String>,
}

impl WatchedEvent {
    /// Build a node event delivered on a live session.
    pub fn node(event_type: EventType, path: impl Into<String>) -> Self {
        Self {
            event_type,
            state: SessionState::Connected,
            path: Some(path.into()),
        }
    }

    /// Build a session-level event.
    pub fn session(state: SessionState) -> Self {
        Self {
            event_type: EventType::None,
            state,
            path: None,
        }
    }

    /// Returns true if this event reports the end of the session.
    pub fn is_session_loss(&self) -> bool {
        matches!(self.state, SessionState::Expired | SessionState::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_mode_flags() {
        assert!(CreateMode::EphemeralSequential.is_ephemeral());
        assert!(CreateMode::EphemeralSequential.is_sequential());
        assert!(!CreateMode::Persistent.is_ephemeral());
        assert!(!CreateMode::Ephemeral.is_sequential());
        assert!(CreateMode::PersistentSequential.is_sequential());
    }

    #[test]
    fn test_version_matching() {
        assert!(Version::Any.matches(0));
        assert!(Version::Any.matches(42));
        assert!(Version::Exact(3).matches(3));
        assert!(!Version::Exact(3).matches(4));
        assert_eq!(Version::Any.as_raw(), -1);
    }

    #[test]
    fn test_session_loss_events() {
        assert!(WatchedEvent::session(SessionState::Expired).is_session_loss());
        assert!(WatchedEvent::session(SessionState::Closed).is_session_loss());
        assert!(!WatchedEvent::node(EventType::NodeCreated, "/b/ready").is_session_loss());
    }
}
