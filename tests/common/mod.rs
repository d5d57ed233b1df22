//! Shared helpers for barrier integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rendezvous::DoubleBarrier;
use rendezvous::barrier::BarrierController;
use rendezvous::core::DeterministicCoordinationService;
use rendezvous::core::InMemorySession;
use tokio::task::JoinHandle;

/// Upper bound on any single barrier step in tests.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Barrier root used across scenarios.
pub const BARRIER_PATH: &str = "/doublebarrier";

pub type Participant = BarrierController<InMemorySession>;

/// Await `future`, failing the test instead of hanging on a protocol bug.
pub async fn bounded<F: Future>(future: F) -> F::Output {
    tokio::time::timeout(TEST_TIMEOUT, future).await.expect("barrier step did not complete in time")
}

/// Create `count` initialized participants, each on its own session.
pub async fn participants(
    service: &Arc<DeterministicCoordinationService>,
    barrier: &DoubleBarrier,
    count: usize,
) -> Vec<(Participant, Arc<InMemorySession>)> {
    let mut out = Vec::with_capacity(count);
    for index in 0..count {
        let session = service.connect().await;
        let mut participant = barrier.participant(Arc::clone(&session), format!("p{index}")).expect("valid alias");
        participant.init().await.expect("init");
        out.push((participant, session));
    }
    out
}

/// Spawn `enter` for a participant, handing the participant back afterwards.
pub fn spawn_enter(mut participant: Participant) -> JoinHandle<Participant> {
    tokio::spawn(async move {
        participant.enter().await.expect("enter");
        participant
    })
}

/// Spawn `leave` for a participant, handing the participant back afterwards.
pub fn spawn_leave(mut participant: Participant) -> JoinHandle<Participant> {
    tokio::spawn(async move {
        participant.leave().await.expect("leave");
        participant
    })
}

/// Enter all participants concurrently.
pub async fn enter_all(participants: Vec<Participant>) -> Vec<Participant> {
    let handles: Vec<_> = participants.into_iter().map(spawn_enter).collect();
    let mut entered = Vec::with_capacity(handles.len());
    for handle in handles {
        entered.push(bounded(handle).await.expect("enter task panicked"));
    }
    entered
}

/// Leave all participants concurrently.
pub async fn leave_all(participants: Vec<Participant>) -> Vec<Participant> {
    let handles: Vec<_> = participants.into_iter().map(spawn_leave).collect();
    let mut left = Vec::with_capacity(handles.len());
    for handle in handles {
        left.push(bounded(handle).await.expect("leave task panicked"));
    }
    left
}
