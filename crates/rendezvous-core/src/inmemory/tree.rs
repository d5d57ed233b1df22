//! Node tree and watch tables of the deterministic coordination service.
//!
//! All mutation is synchronous and returns the watch firings it caused, in the
//! order the tree applied them. The async layer in [`super::session`] forwards
//! those firings to each session's dispatch channel while still holding the
//! tree lock, so per-path delivery order equals application order.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::constants::MAX_CHILDREN_PER_NODE;
use crate::constants::MAX_NODE_DATA_SIZE;
use crate::constants::MAX_WATCHES_PER_SESSION;
use crate::constants::SEQUENCE_SUFFIX_DIGITS;
use crate::error::CoordinationError;
use crate::path;
use crate::traits::Watcher;
use crate::types::CreateMode;
use crate::types::EventType;
use crate::types::NodeStat;
use crate::types::SessionId;
use crate::types::SessionState;
use crate::types::Version;
use crate::types::WatchedEvent;

/// A watch firing routed to one session's dispatcher.
pub(crate) struct Dispatch {
    pub(crate) watcher: Arc<dyn Watcher>,
    pub(crate) event: WatchedEvent,
}

/// A firing paired with the channel that delivers it.
pub(crate) type Firing = (mpsc::Sender<Dispatch>, Dispatch);

struct Node {
    data: Vec<u8>,
    version: i32,
    cversion: i32,
    ephemeral_owner: Option<SessionId>,
    children: BTreeSet<String>,
    /// Next suffix handed out to a sequential child.
    next_sequence: u64,
    czxid: u64,
    mzxid: u64,
}

impl Node {
    fn new(data: Vec<u8>, ephemeral_owner: Option<SessionId>, zxid: u64) -> Self {
        Self {
            data,
            version: 0,
            cversion: 0,
            ephemeral_owner,
            children: BTreeSet::new(),
            next_sequence: 0,
            czxid: zxid,
            mzxid: zxid,
        }
    }

    fn stat(&self) -> NodeStat {
        NodeStat {
            version: self.version,
            cversion: self.cversion,
            ephemeral_owner: self.ephemeral_owner,
            num_children: self.children.len() as u32,
            data_length: self.data.len() as u32,
            czxid: self.czxid,
            mzxid: self.mzxid,
        }
    }
}

struct Registration {
    session_id: SessionId,
    watcher: Arc<dyn Watcher>,
}

impl Registration {
    fn same_as(&self, session_id: SessionId, watcher: &Arc<dyn Watcher>) -> bool {
        self.session_id == session_id
            && std::ptr::addr_eq(Arc::as_ptr(&self.watcher), Arc::as_ptr(watcher))
    }
}

pub(crate) struct SessionEntry {
    pub(crate) state: SessionState,
    events: Option<mpsc::Sender<Dispatch>>,
    ephemerals: BTreeSet<String>,
    armed_watches: u32,
}

/// Which watch table a registration lives in.
#[derive(Clone, Copy)]
enum WatchKind {
    Data,
    Child,
}

pub(crate) struct Tree {
    nodes: BTreeMap<String, Node>,
    zxid: u64,
    data_watches: HashMap<String, Vec<Registration>>,
    child_watches: HashMap<String, Vec<Registration>>,
    pub(crate) sessions: HashMap<SessionId, SessionEntry>,
}

impl Tree {
    pub(crate) fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(path::ROOT_PATH.to_string(), Node::new(Vec::new(), None, 0));
        Self {
            nodes,
            zxid: 0,
            data_watches: HashMap::new(),
            child_watches: HashMap::new(),
            sessions: HashMap::new(),
        }
    }

    pub(crate) fn open_session(&mut self, session_id: SessionId, events: mpsc::Sender<Dispatch>) {
        self.sessions.insert(session_id, SessionEntry {
            state: SessionState::Connected,
            events: Some(events),
            ephemerals: BTreeSet::new(),
            armed_watches: 0,
        });
    }

    pub(crate) fn ensure_live(&self, session_id: SessionId) -> Result<(), CoordinationError> {
        match self.sessions.get(&session_id) {
            Some(entry) if entry.state == SessionState::Connected => Ok(()),
            _ => Err(CoordinationError::SessionExpired { session_id }),
        }
    }

    pub(crate) fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn create(
        &mut self,
        session_id: SessionId,
        node_path: &str,
        data: Vec<u8>,
        mode: CreateMode,
        firings: &mut Vec<Firing>,
    ) -> Result<String, CoordinationError> {
        path::validate_path(node_path)?;
        if node_path == path::ROOT_PATH {
            return Err(CoordinationError::NodeExists {
                path: node_path.to_string(),
            });
        }
        if data.len() > MAX_NODE_DATA_SIZE as usize {
            return Err(CoordinationError::DataTooLarge {
                size: data.len(),
                max: MAX_NODE_DATA_SIZE,
            });
        }
        let parent_path = path::parent(node_path).unwrap_or(path::ROOT_PATH).to_string();

        let parent = self.nodes.get_mut(&parent_path).ok_or_else(|| CoordinationError::NoNode {
            path: parent_path.clone(),
        })?;
        if parent.ephemeral_owner.is_some() {
            return Err(CoordinationError::NoChildrenForEphemerals { path: parent_path });
        }
        if parent.children.len() >= MAX_CHILDREN_PER_NODE as usize {
            return Err(CoordinationError::TooManyChildren {
                path: parent_path,
                max: MAX_CHILDREN_PER_NODE,
            });
        }

        let actual_path = if mode.is_sequential() {
            let suffixed = format!("{node_path}{:0width$}", parent.next_sequence, width = SEQUENCE_SUFFIX_DIGITS);
            parent.next_sequence = parent.next_sequence.saturating_add(1);
            suffixed
        } else {
            node_path.to_string()
        };
        if self.nodes.contains_key(&actual_path) {
            return Err(CoordinationError::NodeExists { path: actual_path });
        }

        self.zxid += 1;
        let zxid = self.zxid;
        let owner = mode.is_ephemeral().then_some(session_id);
        let name = path::basename(&actual_path).to_string();

        if let Some(parent) = self.nodes.get_mut(&parent_path) {
            parent.children.insert(name);
            parent.cversion = parent.cversion.saturating_add(1);
            parent.mzxid = zxid;
        }
        self.nodes.insert(actual_path.clone(), Node::new(data, owner, zxid));
        if let Some(owner) = owner
            && let Some(entry) = self.sessions.get_mut(&owner)
        {
            entry.ephemerals.insert(actual_path.clone());
        }

        self.fire(WatchKind::Data, &actual_path, EventType::NodeCreated, firings);
        self.fire(WatchKind::Child, &parent_path, EventType::NodeChildrenChanged, firings);
        Ok(actual_path)
    }

    pub(crate) fn delete(
        &mut self,
        node_path: &str,
        version: Version,
        firings: &mut Vec<Firing>,
    ) -> Result<(), CoordinationError> {
        path::validate_path(node_path)?;
        if node_path == path::ROOT_PATH {
            return Err(CoordinationError::InvalidPath {
                path: node_path.to_string(),
                reason: "the tree root cannot be deleted".to_string(),
            });
        }
        let node = self.nodes.get(node_path).ok_or_else(|| CoordinationError::NoNode {
            path: node_path.to_string(),
        })?;
        if !version.matches(node.version) {
            return Err(CoordinationError::BadVersion {
                path: node_path.to_string(),
                expected: version.as_raw(),
                actual: node.version,
            });
        }
        if !node.children.is_empty() {
            return Err(CoordinationError::NotEmpty {
                path: node_path.to_string(),
                children: node.children.len() as u32,
            });
        }
        self.remove_node(node_path, firings);
        Ok(())
    }

    fn remove_node(&mut self, node_path: &str, firings: &mut Vec<Firing>) {
        let Some(node) = self.nodes.remove(node_path) else {
            return;
        };
        self.zxid += 1;
        let zxid = self.zxid;
        let parent_path = path::parent(node_path).unwrap_or(path::ROOT_PATH).to_string();
        if let Some(parent) = self.nodes.get_mut(&parent_path) {
            parent.children.remove(path::basename(node_path));
            parent.cversion = parent.cversion.saturating_add(1);
            parent.mzxid = zxid;
        }
        if let Some(owner) = node.ephemeral_owner
            && let Some(entry) = self.sessions.get_mut(&owner)
        {
            entry.ephemerals.remove(node_path);
        }

        self.fire(WatchKind::Data, node_path, EventType::NodeDeleted, firings);
        self.fire(WatchKind::Child, node_path, EventType::NodeDeleted, firings);
        self.fire(WatchKind::Child, &parent_path, EventType::NodeChildrenChanged, firings);
    }

    pub(crate) fn stat(&self, node_path: &str) -> Result<Option<NodeStat>, CoordinationError> {
        path::validate_path(node_path)?;
        Ok(self.nodes.get(node_path).map(Node::stat))
    }

    pub(crate) fn get_data(&self, node_path: &str) -> Result<(Vec<u8>, NodeStat), CoordinationError> {
        path::validate_path(node_path)?;
        self.nodes.get(node_path).map(|node| (node.data.clone(), node.stat())).ok_or_else(|| {
            CoordinationError::NoNode {
                path: node_path.to_string(),
            }
        })
    }

    pub(crate) fn set_data(
        &mut self,
        node_path: &str,
        data: Vec<u8>,
        version: Version,
        firings: &mut Vec<Firing>,
    ) -> Result<NodeStat, CoordinationError> {
        path::validate_path(node_path)?;
        if data.len() > MAX_NODE_DATA_SIZE as usize {
            return Err(CoordinationError::DataTooLarge {
                size: data.len(),
                max: MAX_NODE_DATA_SIZE,
            });
        }
        let node = self.nodes.get_mut(node_path).ok_or_else(|| CoordinationError::NoNode {
            path: node_path.to_string(),
        })?;
        if !version.matches(node.version) {
            return Err(CoordinationError::BadVersion {
                path: node_path.to_string(),
                expected: version.as_raw(),
                actual: node.version,
            });
        }
        self.zxid += 1;
        node.data = data;
        node.version = node.version.saturating_add(1);
        node.mzxid = self.zxid;
        let stat = node.stat();
        self.fire(WatchKind::Data, node_path, EventType::NodeDataChanged, firings);
        Ok(stat)
    }

    pub(crate) fn children(&self, node_path: &str) -> Result<Vec<String>, CoordinationError> {
        path::validate_path(node_path)?;
        self.nodes.get(node_path).map(|node| node.children.iter().cloned().collect()).ok_or_else(|| {
            CoordinationError::NoNode {
                path: node_path.to_string(),
            }
        })
    }

    pub(crate) fn watch_data(
        &mut self,
        session_id: SessionId,
        node_path: &str,
        watcher: Arc<dyn Watcher>,
    ) -> Result<(), CoordinationError> {
        self.register(WatchKind::Data, session_id, node_path, watcher)
    }

    pub(crate) fn watch_children(
        &mut self,
        session_id: SessionId,
        node_path: &str,
        watcher: Arc<dyn Watcher>,
    ) -> Result<(), CoordinationError> {
        self.register(WatchKind::Child, session_id, node_path, watcher)
    }

    fn register(
        &mut self,
        kind: WatchKind,
        session_id: SessionId,
        node_path: &str,
        watcher: Arc<dyn Watcher>,
    ) -> Result<(), CoordinationError> {
        let entry = self.sessions.get_mut(&session_id).ok_or(CoordinationError::SessionExpired { session_id })?;
        let table = match kind {
            WatchKind::Data => &mut self.data_watches,
            WatchKind::Child => &mut self.child_watches,
        };
        let registrations = table.entry(node_path.to_string()).or_default();
        // One firing per (session, watcher, path, kind), as the service contract requires.
        if registrations.iter().any(|r| r.same_as(session_id, &watcher)) {
            return Ok(());
        }
        if entry.armed_watches >= MAX_WATCHES_PER_SESSION {
            return Err(CoordinationError::TooManyWatches {
                session_id,
                max: MAX_WATCHES_PER_SESSION,
            });
        }
        entry.armed_watches += 1;
        registrations.push(Registration { session_id, watcher });
        Ok(())
    }

    fn fire(&mut self, kind: WatchKind, node_path: &str, event_type: EventType, firings: &mut Vec<Firing>) {
        let table = match kind {
            WatchKind::Data => &mut self.data_watches,
            WatchKind::Child => &mut self.child_watches,
        };
        let Some(registrations) = table.remove(node_path) else {
            return;
        };
        for registration in registrations {
            let Some(entry) = self.sessions.get_mut(&registration.session_id) else {
                continue;
            };
            entry.armed_watches = entry.armed_watches.saturating_sub(1);
            if let Some(events) = &entry.events {
                firings.push((events.clone(), Dispatch {
                    watcher: registration.watcher,
                    event: WatchedEvent::node(event_type, node_path),
                }));
            }
        }
    }

    /// End a session: disarm its watches, remove its ephemeral nodes (firing
    /// watches held by other sessions), then deliver `final_state` to every
    /// watch the session still had armed.
    pub(crate) fn end_session(&mut self, session_id: SessionId, final_state: SessionState, firings: &mut Vec<Firing>) {
        let Some(entry) = self.sessions.get_mut(&session_id) else {
            return;
        };
        if entry.state != SessionState::Connected {
            return;
        }
        entry.state = final_state;
        entry.armed_watches = 0;
        let ephemerals: Vec<String> = entry.ephemerals.iter().cloned().collect();
        let events = entry.events.take();

        let mut orphaned = Vec::new();
        for table in [&mut self.data_watches, &mut self.child_watches] {
            for registrations in table.values_mut() {
                let (own, others): (Vec<_>, Vec<_>) =
                    registrations.drain(..).partition(|r| r.session_id == session_id);
                *registrations = others;
                orphaned.extend(own);
            }
            table.retain(|_, registrations| !registrations.is_empty());
        }

        for ephemeral in ephemerals {
            self.remove_node(&ephemeral, firings);
        }

        if let Some(events) = events {
            for registration in orphaned {
                firings.push((events.clone(), Dispatch {
                    watcher: registration.watcher,
                    event: WatchedEvent::session(final_state),
                }));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree_with_session() -> (Tree, SessionId, mpsc::Receiver<Dispatch>) {
        let mut tree = Tree::new();
        let (tx, rx) = mpsc::channel(16);
        let session = SessionId(1);
        tree.open_session(session, tx);
        (tree, session, rx)
    }

    #[test]
    fn test_sequential_suffix_is_zero_padded_and_monotonic() {
        let (mut tree, session, _rx) = tree_with_session();
        let mut firings = Vec::new();
        tree.create(session, "/b", Vec::new(), CreateMode::Persistent, &mut firings).unwrap();
        let first = tree.create(session, "/b/w-", Vec::new(), CreateMode::EphemeralSequential, &mut firings).unwrap();
        let second = tree.create(session, "/b/w-", Vec::new(), CreateMode::EphemeralSequential, &mut firings).unwrap();
        assert_eq!(first, "/b/w-0000000000");
        assert_eq!(second, "/b/w-0000000001");
    }

    #[test]
    fn test_create_requires_parent() {
        let (mut tree, session, _rx) = tree_with_session();
        let err = tree.create(session, "/missing/child", Vec::new(), CreateMode::Persistent, &mut Vec::new()).unwrap_err();
        assert_eq!(err, CoordinationError::NoNode {
            path: "/missing".to_string()
        });
    }

    #[test]
    fn test_ephemeral_cannot_have_children() {
        let (mut tree, session, _rx) = tree_with_session();
        let mut firings = Vec::new();
        tree.create(session, "/e", Vec::new(), CreateMode::Ephemeral, &mut firings).unwrap();
        let err = tree.create(session, "/e/c", Vec::new(), CreateMode::Persistent, &mut firings).unwrap_err();
        assert!(matches!(err, CoordinationError::NoChildrenForEphemerals { .. }));
    }

    #[test]
    fn test_delete_not_empty() {
        let (mut tree, session, _rx) = tree_with_session();
        let mut firings = Vec::new();
        tree.create(session, "/b", Vec::new(), CreateMode::Persistent, &mut firings).unwrap();
        tree.create(session, "/b/ready", Vec::new(), CreateMode::Persistent, &mut firings).unwrap();
        let err = tree.delete("/b", Version::Any, &mut firings).unwrap_err();
        assert_eq!(err, CoordinationError::NotEmpty {
            path: "/b".to_string(),
            children: 1
        });
    }

    #[test]
    fn test_delete_bad_version() {
        let (mut tree, session, _rx) = tree_with_session();
        let mut firings = Vec::new();
        tree.create(session, "/b", Vec::new(), CreateMode::Persistent, &mut firings).unwrap();
        let err = tree.delete("/b", Version::Exact(3), &mut firings).unwrap_err();
        assert!(matches!(err, CoordinationError::BadVersion { expected: 3, actual: 0, .. }));
    }

    #[test]
    fn test_watch_fires_once() {
        let (mut tree, session, _rx) = tree_with_session();
        let watcher: Arc<dyn Watcher> = Arc::new(|_event: WatchedEvent| {});
        let mut firings = Vec::new();
        tree.create(session, "/b", Vec::new(), CreateMode::Persistent, &mut firings).unwrap();
        tree.watch_children(session, "/b", watcher).unwrap();

        tree.create(session, "/b/x", Vec::new(), CreateMode::Persistent, &mut firings).unwrap();
        assert_eq!(firings.len(), 1);
        assert_eq!(firings[0].1.event, WatchedEvent::node(EventType::NodeChildrenChanged, "/b"));

        tree.create(session, "/b/y", Vec::new(), CreateMode::Persistent, &mut firings).unwrap();
        assert_eq!(firings.len(), 1);
    }

    #[test]
    fn test_duplicate_registration_fires_once() {
        let (mut tree, session, _rx) = tree_with_session();
        let watcher: Arc<dyn Watcher> = Arc::new(|_event: WatchedEvent| {});
        tree.watch_data(session, "/ready", watcher.clone()).unwrap();
        tree.watch_data(session, "/ready", watcher).unwrap();

        let mut firings = Vec::new();
        tree.create(session, "/ready", Vec::new(), CreateMode::Persistent, &mut firings).unwrap();
        assert_eq!(firings.len(), 1);
    }

    #[test]
    fn test_end_session_removes_ephemerals_and_notifies_others() {
        let mut tree = Tree::new();
        let (tx1, _rx1) = mpsc::channel(16);
        let (tx2, _rx2) = mpsc::channel(16);
        tree.open_session(SessionId(1), tx1);
        tree.open_session(SessionId(2), tx2);

        let mut firings = Vec::new();
        tree.create(SessionId(1), "/b", Vec::new(), CreateMode::Persistent, &mut firings).unwrap();
        let member = tree.create(SessionId(1), "/b/w-", Vec::new(), CreateMode::EphemeralSequential, &mut firings).unwrap();

        let watcher: Arc<dyn Watcher> = Arc::new(|_event: WatchedEvent| {});
        tree.watch_children(SessionId(2), "/b", watcher.clone()).unwrap();
        tree.watch_data(SessionId(1), "/b/ready", watcher).unwrap();

        let mut firings = Vec::new();
        tree.end_session(SessionId(1), SessionState::Expired, &mut firings);

        assert!(tree.stat(&member).unwrap().is_none());
        assert!(tree.ensure_live(SessionId(1)).is_err());
        let events: Vec<_> = firings.iter().map(|(_, d)| d.event.clone()).collect();
        assert_eq!(events, vec![
            WatchedEvent::node(EventType::NodeChildrenChanged, "/b"),
            WatchedEvent::session(SessionState::Expired),
        ]);
    }
}
