//! Session handles bound to the deterministic coordination service.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::debug;
use tracing::trace;

use super::DeterministicCoordinationService;
use super::FaultOp;
use super::tree::Dispatch;
use super::tree::Firing;
use crate::error::CoordinationError;
use crate::traits::CoordinationClient;
use crate::traits::Watcher;
use crate::types::CreateMode;
use crate::types::NodeStat;
use crate::types::SessionId;
use crate::types::SessionState;
use crate::types::Version;

/// A client session against a [`DeterministicCoordinationService`].
///
/// Watches armed through this session are delivered by one dispatcher task
/// that drains a bounded channel, so callbacks for this session never run
/// concurrently with each other.
pub struct InMemorySession {
    service: Arc<DeterministicCoordinationService>,
    session_id: SessionId,
    state: Arc<RwLock<SessionState>>,
}

impl InMemorySession {
    pub(super) fn new(
        service: Arc<DeterministicCoordinationService>,
        session_id: SessionId,
        state: Arc<RwLock<SessionState>>,
    ) -> Self {
        Self {
            service,
            session_id,
            state,
        }
    }

    /// Simulate session expiry: every ephemeral node this session owns is
    /// removed and every watch it still holds receives an `Expired` event.
    pub async fn expire(&self) {
        self.end(SessionState::Expired).await;
    }

    /// Close the session gracefully. Ephemeral nodes are removed and armed
    /// watches receive a `Closed` event.
    pub async fn close(&self) {
        self.end(SessionState::Closed).await;
    }

    async fn end(&self, final_state: SessionState) {
        let mut tree = self.service.tree.lock().await;
        let mut firings = Vec::new();
        tree.end_session(self.session_id, final_state, &mut firings);
        if let Some(entry) = tree.sessions.get(&self.session_id) {
            *self.state.write() = entry.state;
        }
        debug!(session = %self.session_id, state = ?final_state, "session ended");
        deliver(firings).await;
    }

    fn check_fault(&self, op: FaultOp) -> Result<(), CoordinationError> {
        match self.service.take_fault(op) {
            Some(err) => {
                debug!(session = %self.session_id, ?op, %err, "injected fault");
                Err(err)
            }
            None => Ok(()),
        }
    }
}

/// Forward firings to their dispatch channels in application order.
///
/// Called with the tree lock held; a closed channel means the session already
/// ended and the firing is dropped.
async fn deliver(firings: Vec<Firing>) {
    for (events, dispatch) in firings {
        let _ = events.send(dispatch).await;
    }
}

/// Drain one session's watch channel, invoking watchers sequentially.
pub(super) async fn run_dispatcher(session_id: SessionId, mut events: mpsc::Receiver<Dispatch>) {
    while let Some(dispatch) = events.recv().await {
        trace!(session = %session_id, event = ?dispatch.event, "dispatching watch");
        dispatch.watcher.process(dispatch.event);
    }
    trace!(session = %session_id, "watch dispatcher stopped");
}

#[async_trait]
impl CoordinationClient for InMemorySession {
    async fn create(&self, path: &str, data: Vec<u8>, mode: CreateMode) -> Result<String, CoordinationError> {
        self.check_fault(FaultOp::Create)?;
        let mut tree = self.service.tree.lock().await;
        tree.ensure_live(self.session_id)?;
        let mut firings = Vec::new();
        let result = tree.create(self.session_id, path, data, mode, &mut firings);
        deliver(firings).await;
        result
    }

    async fn delete(&self, path: &str, version: Version) -> Result<(), CoordinationError> {
        self.check_fault(FaultOp::Delete)?;
        let mut tree = self.service.tree.lock().await;
        tree.ensure_live(self.session_id)?;
        let mut firings = Vec::new();
        let result = tree.delete(path, version, &mut firings);
        deliver(firings).await;
        result
    }

    async fn exists(&self, path: &str) -> Result<Option<NodeStat>, CoordinationError> {
        self.check_fault(FaultOp::Exists)?;
        let tree = self.service.tree.lock().await;
        tree.ensure_live(self.session_id)?;
        tree.stat(path)
    }

    async fn exists_with_watch(
        &self,
        path: &str,
        watcher: Arc<dyn Watcher>,
    ) -> Result<Option<NodeStat>, CoordinationError> {
        self.check_fault(FaultOp::Exists)?;
        let mut tree = self.service.tree.lock().await;
        tree.ensure_live(self.session_id)?;
        let stat = tree.stat(path)?;
        tree.watch_data(self.session_id, path, watcher)?;
        Ok(stat)
    }

    async fn get_data(&self, path: &str) -> Result<(Vec<u8>, NodeStat), CoordinationError> {
        self.check_fault(FaultOp::GetData)?;
        let tree = self.service.tree.lock().await;
        tree.ensure_live(self.session_id)?;
        tree.get_data(path)
    }

    async fn set_data(&self, path: &str, data: Vec<u8>, version: Version) -> Result<NodeStat, CoordinationError> {
        self.check_fault(FaultOp::SetData)?;
        let mut tree = self.service.tree.lock().await;
        tree.ensure_live(self.session_id)?;
        let mut firings = Vec::new();
        let result = tree.set_data(path, data, version, &mut firings);
        deliver(firings).await;
        result
    }

    async fn get_children(&self, path: &str) -> Result<Vec<String>, CoordinationError> {
        self.check_fault(FaultOp::GetChildren)?;
        let tree = self.service.tree.lock().await;
        tree.ensure_live(self.session_id)?;
        tree.children(path)
    }

    async fn get_children_with_watch(
        &self,
        path: &str,
        watcher: Arc<dyn Watcher>,
    ) -> Result<Vec<String>, CoordinationError> {
        self.check_fault(FaultOp::GetChildren)?;
        let mut tree = self.service.tree.lock().await;
        tree.ensure_live(self.session_id)?;
        // No watch is armed on a missing node.
        let children = tree.children(path)?;
        tree.watch_children(self.session_id, path, watcher)?;
        Ok(children)
    }

    fn session_id(&self) -> SessionId {
        self.session_id
    }

    fn session_state(&self) -> SessionState {
        *self.state.read()
    }
}
