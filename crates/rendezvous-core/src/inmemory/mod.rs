//! Deterministic in-memory coordination service.
//!
//! A single-process stand-in for a hierarchical coordination service with
//! persistent, ephemeral and sequential nodes, one-shot watches and session
//! expiry. Used by tests and by the demo binary.
//!
//! Every operation runs under one tree lock, which gives the per-node
//! atomicity and the atomic read-plus-watch registration the barrier protocol
//! relies on. Fired watches are pushed into each session's bounded channel
//! before the lock is released.

mod session;
mod tree;

use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use parking_lot::Mutex as SyncMutex;
use parking_lot::RwLock;
pub use session::InMemorySession;
use tokio::sync::Mutex;
use tokio::sync::mpsc;
use tracing::debug;

use self::tree::Tree;
use crate::constants::WATCH_EVENT_CHANNEL_CAPACITY;
use crate::error::CoordinationError;
use crate::types::SessionId;
use crate::types::SessionState;

/// Client operation that an injected fault applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultOp {
    /// `create`
    Create,
    /// `delete`
    Delete,
    /// `exists` and `exists_with_watch`
    Exists,
    /// `get_data`
    GetData,
    /// `set_data`
    SetData,
    /// `get_children` and `get_children_with_watch`
    GetChildren,
}

/// A deterministic in-memory coordination service for testing.
///
/// Thread-safe; hand out one [`InMemorySession`] per simulated process with
/// [`connect`](Self::connect).
pub struct DeterministicCoordinationService {
    tree: Mutex<Tree>,
    next_session: AtomicU64,
    faults: SyncMutex<HashMap<FaultOp, VecDeque<CoordinationError>>>,
}

impl DeterministicCoordinationService {
    /// Create a new service wrapped in Arc.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            tree: Mutex::new(Tree::new()),
            next_session: AtomicU64::new(1),
            faults: SyncMutex::new(HashMap::new()),
        })
    }

    /// Open a new session.
    ///
    /// Spawns the session's watch dispatcher, so this must be called from
    /// within a Tokio runtime.
    pub async fn connect(self: &Arc<Self>) -> Arc<InMemorySession> {
        let session_id = SessionId(self.next_session.fetch_add(1, Ordering::SeqCst));
        let (events_tx, events_rx) = mpsc::channel(WATCH_EVENT_CHANNEL_CAPACITY);
        self.tree.lock().await.open_session(session_id, events_tx);
        tokio::spawn(session::run_dispatcher(session_id, events_rx));
        debug!(session = %session_id, "session opened");

        let state = Arc::new(RwLock::new(SessionState::Connected));
        Arc::new(InMemorySession::new(Arc::clone(self), session_id, state))
    }

    /// Make the next `op` call (from any session) fail with `error` before it
    /// reaches the tree. Faults queue up per operation.
    pub fn fail_next(&self, op: FaultOp, error: CoordinationError) {
        self.faults.lock().entry(op).or_default().push_back(error);
    }

    fn take_fault(&self, op: FaultOp) -> Option<CoordinationError> {
        self.faults.lock().get_mut(&op).and_then(VecDeque::pop_front)
    }

    /// Total number of nodes, including the tree root.
    pub async fn node_count(&self) -> usize {
        self.tree.lock().await.node_count()
    }

    /// Children of `path`, bypassing sessions.
    pub async fn children_of(&self, path: &str) -> Result<Vec<String>, CoordinationError> {
        self.tree.lock().await.children(path)
    }

    /// Whether `path` exists, bypassing sessions.
    pub async fn contains(&self, path: &str) -> bool {
        matches!(self.tree.lock().await.stat(path), Ok(Some(_)))
    }
}
