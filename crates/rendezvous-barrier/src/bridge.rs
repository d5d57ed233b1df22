//! Hand-off from watch callbacks to a suspended barrier participant.
//!
//! Watches fire on the session's dispatch task, which the waiting participant
//! does not control. The bridge pairs a `parking_lot` mutex guarding the
//! pending event with a [`Notify`]. The waiter registers with the notifier
//! and checks the pending slot under the mutex, and the watcher stores the
//! event and signals under the same mutex, so a firing that lands between
//! the check and the suspension is never lost.
//!
//! Each [`arm`](NotificationBridge::arm) starts a new generation. Node events
//! from watchers of an earlier generation are dropped, which keeps a watch
//! left armed by a previous step (e.g. the ready marker's existence watch
//! firing on its deletion) from waking a later wait spuriously. Session-loss
//! events are accepted from any generation.

use std::sync::Arc;
use std::sync::Weak;

use parking_lot::Mutex as SyncMutex;
use rendezvous_core::WatchedEvent;
use rendezvous_core::Watcher;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::trace;

#[derive(Debug, Default)]
struct BridgeState {
    generation: u64,
    pending: Option<WatchedEvent>,
}

/// Single-waiter rendezvous between fired watches and a participant task.
#[derive(Debug, Default)]
pub struct NotificationBridge {
    state: SyncMutex<BridgeState>,
    notify: Notify,
}

impl NotificationBridge {
    /// Create a new bridge wrapped in Arc.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Start a new generation and return the watcher to register for it.
    ///
    /// Any event still pending from an earlier generation is discarded.
    pub fn arm(self: &Arc<Self>) -> Arc<dyn Watcher> {
        let mut state = self.state.lock();
        state.generation = state.generation.wrapping_add(1);
        state.pending = None;
        Arc::new(BridgeWatcher {
            bridge: Arc::downgrade(self),
            generation: state.generation,
        })
    }

    fn signal(&self, generation: u64, event: WatchedEvent) {
        let mut state = self.state.lock();
        if generation != state.generation && !event.is_session_loss() {
            trace!(generation, current = state.generation, ?event, "dropping stale watch event");
            return;
        }
        // Session loss outranks a node event that has not been consumed yet.
        if state.pending.as_ref().is_some_and(WatchedEvent::is_session_loss) {
            return;
        }
        state.pending = Some(event);
        self.notify.notify_one();
    }

    /// Suspend until a watch of the current generation fires or `deadline`
    /// passes.
    ///
    /// # Returns
    ///
    /// The fired event, or `None` if the deadline expired first.
    pub async fn wait(&self, deadline: Option<Instant>) -> Option<WatchedEvent> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            {
                let mut state = self.state.lock();
                if let Some(event) = state.pending.take() {
                    return Some(event);
                }
                notified.as_mut().enable();
            }

            match deadline {
                Some(deadline) => {
                    if tokio::time::timeout_at(deadline, notified).await.is_err() {
                        return self.state.lock().pending.take();
                    }
                }
                None => notified.await,
            }
        }
    }
}

/// Watcher registered with the coordination client for one bridge generation.
struct BridgeWatcher {
    bridge: Weak<NotificationBridge>,
    generation: u64,
}

impl Watcher for BridgeWatcher {
    fn process(&self, event: WatchedEvent) {
        if let Some(bridge) = self.bridge.upgrade() {
            bridge.signal(self.generation, event);
        }
    }
}
