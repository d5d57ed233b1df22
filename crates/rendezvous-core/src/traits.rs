//! Core traits for coordination tree access.
//!
//! Defines the client contract the barrier protocol is written against and the
//! callback interface through which one-shot watches are delivered.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::CoordinationError;
use crate::types::CreateMode;
use crate::types::NodeStat;
use crate::types::SessionId;
use crate::types::SessionState;
use crate::types::Version;
use crate::types::WatchedEvent;

/// Receiver for fired watches.
///
/// Invoked on the session's single dispatch task, one event at a time.
/// Implementations must return quickly: any blocking here delays delivery of
/// every other watch armed on the same session.
pub trait Watcher: Send + Sync {
    /// Handle one fired watch.
    fn process(&self, event: WatchedEvent);
}

impl<F> Watcher for F
where F: Fn(WatchedEvent) + Send + Sync {
    fn process(&self, event: WatchedEvent) {
        self(event)
    }
}

/// Session-scoped client for a hierarchical, watch-capable coordination service.
///
/// Every operation is atomic with respect to a single node. Watch registration
/// in [`exists_with_watch`](Self::exists_with_watch) and
/// [`get_children_with_watch`](Self::get_children_with_watch) is atomic with
/// the read it accompanies.
#[async_trait]
pub trait CoordinationClient: Send + Sync {
    /// Create a node and return its actual path (with the sequence suffix for
    /// sequential modes).
    async fn create(&self, path: &str, data: Vec<u8>, mode: CreateMode) -> Result<String, CoordinationError>;

    /// Delete a node if `version` matches.
    async fn delete(&self, path: &str, version: Version) -> Result<(), CoordinationError>;

    /// Check existence without arming a watch.
    async fn exists(&self, path: &str) -> Result<Option<NodeStat>, CoordinationError>;

    /// Check existence and arm a one-shot watch for the node's next creation,
    /// deletion or data change. The watch is armed whether or not the node exists.
    async fn exists_with_watch(
        &self,
        path: &str,
        watcher: Arc<dyn Watcher>,
    ) -> Result<Option<NodeStat>, CoordinationError>;

    /// Read a node's data.
    async fn get_data(&self, path: &str) -> Result<(Vec<u8>, NodeStat), CoordinationError>;

    /// Replace a node's data if `version` matches.
    async fn set_data(&self, path: &str, data: Vec<u8>, version: Version) -> Result<NodeStat, CoordinationError>;

    /// List child names without arming a watch.
    async fn get_children(&self, path: &str) -> Result<Vec<String>, CoordinationError>;

    /// List child names and arm a one-shot watch for the next change to the
    /// child set (or the node's deletion).
    async fn get_children_with_watch(
        &self,
        path: &str,
        watcher: Arc<dyn Watcher>,
    ) -> Result<Vec<String>, CoordinationError>;

    /// Identity of the session this client is bound to.
    fn session_id(&self) -> SessionId;

    /// Current state of the session.
    fn session_state(&self) -> SessionState;
}

// Blanket implementation for Arc<T>
#[async_trait]
impl<T: CoordinationClient + ?Sized> CoordinationClient for Arc<T> {
    async fn create(&self, path: &str, data: Vec<u8>, mode: CreateMode) -> Result<String, CoordinationError> {
        (**self).create(path, data, mode).await
    }

    async fn delete(&self, path: &str, version: Version) -> Result<(), CoordinationError> {
        (**self).delete(path, version).await
    }

    async fn exists(&self, path: &str) -> Result<Option<NodeStat>, CoordinationError> {
        (**self).exists(path).await
    }

    async fn exists_with_watch(
        &self,
        path: &str,
        watcher: Arc<dyn Watcher>,
    ) -> Result<Option<NodeStat>, CoordinationError> {
        (**self).exists_with_watch(path, watcher).await
    }

    async fn get_data(&self, path: &str) -> Result<(Vec<u8>, NodeStat), CoordinationError> {
        (**self).get_data(path).await
    }

    async fn set_data(&self, path: &str, data: Vec<u8>, version: Version) -> Result<NodeStat, CoordinationError> {
        (**self).set_data(path, data, version).await
    }

    async fn get_children(&self, path: &str) -> Result<Vec<String>, CoordinationError> {
        (**self).get_children(path).await
    }

    async fn get_children_with_watch(
        &self,
        path: &str,
        watcher: Arc<dyn Watcher>,
    ) -> Result<Vec<String>, CoordinationError> {
        (**self).get_children_with_watch(path, watcher).await
    }

    fn session_id(&self) -> SessionId {
        (**self).session_id()
    }

    fn session_state(&self) -> SessionState {
        (**self).session_state()
    }
}
