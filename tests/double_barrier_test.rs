//! End-to-end double barrier scenarios against the deterministic
//! coordination service.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::BARRIER_PATH;
use common::bounded;
use common::enter_all;
use common::leave_all;
use common::participants;
use common::spawn_enter;
use common::spawn_leave;
use rendezvous::BarrierConfig;
use rendezvous::BarrierError;
use rendezvous::CoordinationClient;
use rendezvous::DeterministicCoordinationService;
use rendezvous::DoubleBarrier;
use rendezvous::ParticipantState;
use rendezvous::barrier::BarrierErrorKind;
use rendezvous::barrier::RetryPolicy;
use rendezvous::core::CoordinationError;
use rendezvous::core::FaultOp;

const READY_PATH: &str = "/doublebarrier/ready";

fn barrier(target: u32) -> DoubleBarrier {
    DoubleBarrier::new(BarrierConfig::new(BARRIER_PATH, target).unwrap())
}

async fn members(service: &DeterministicCoordinationService) -> Vec<String> {
    service.children_of(BARRIER_PATH).await.unwrap().into_iter().filter(|child| child != "ready").collect()
}

// ============================================================================
// Entry
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_no_enter_returns_before_last_member_joins() {
    let service = DeterministicCoordinationService::new();
    let barrier = barrier(3);
    let mut joined = participants(&service, &barrier, 3).await.into_iter().map(|(p, _)| p);

    let first = spawn_enter(joined.next().unwrap());
    let second = spawn_enter(joined.next().unwrap());
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(!first.is_finished());
    assert!(!second.is_finished());
    assert_eq!(members(&service).await.len(), 2);
    assert!(!service.contains(READY_PATH).await);

    let mut third = joined.next().unwrap();
    bounded(third.enter()).await.unwrap();
    assert!(service.contains(READY_PATH).await);

    let first = bounded(first).await.unwrap();
    let second = bounded(second).await.unwrap();
    for participant in [&first, &second, &third] {
        assert_eq!(participant.state(), ParticipantState::Entered);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_simultaneous_quorum_creates_one_marker() {
    let service = DeterministicCoordinationService::new();
    let barrier = barrier(8);
    let joined = participants(&service, &barrier, 8).await.into_iter().map(|(p, _)| p).collect();

    let entered = enter_all(joined).await;

    let children = service.children_of(BARRIER_PATH).await.unwrap();
    assert_eq!(children.iter().filter(|child| *child == "ready").count(), 1);
    assert_eq!(children.len(), 9);

    let left = leave_all(entered).await;
    assert!(left.iter().all(|p| p.state() == ParticipantState::Left));
    assert!(service.children_of(BARRIER_PATH).await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_late_joiner_enters_immediately() {
    let service = DeterministicCoordinationService::new();
    let barrier = barrier(2);
    let joined = participants(&service, &barrier, 3).await;
    let mut joined: Vec<_> = joined.into_iter().map(|(p, _)| p).collect();
    let mut late = joined.pop().unwrap();

    let _entered = enter_all(joined).await;
    bounded(late.enter()).await.unwrap();
    assert_eq!(late.state(), ParticipantState::Entered);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_participants_sharing_one_session() {
    let service = DeterministicCoordinationService::new();
    let session = service.connect().await;
    let barrier = barrier(3);

    let mut shared = Vec::new();
    for thread in 0..3 {
        let mut participant = barrier.participant(Arc::clone(&session), format!("thread{thread}")).unwrap();
        participant.init().await.unwrap();
        shared.push(participant);
    }

    let entered = enter_all(shared).await;
    let paths: Vec<_> = entered.iter().map(|p| p.member_path().unwrap().to_string()).collect();
    assert_eq!(members(&service).await.len(), 3);
    assert_ne!(paths[0], paths[1]);

    leave_all(entered).await;
    assert!(service.children_of(BARRIER_PATH).await.unwrap().is_empty());
}

// ============================================================================
// Leaving
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_first_leaver_waits_and_keeps_marker() {
    let service = DeterministicCoordinationService::new();
    let barrier = barrier(2);
    let joined = participants(&service, &barrier, 2).await.into_iter().map(|(p, _)| p).collect();
    let mut entered = enter_all(joined).await;
    let mut last = entered.pop().unwrap();
    let first = entered.pop().unwrap();

    let first = spawn_leave(first);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!first.is_finished());
    assert!(service.contains(READY_PATH).await);
    assert_eq!(members(&service).await.len(), 1);

    bounded(last.leave()).await.unwrap();
    let first = bounded(first).await.unwrap();
    assert_eq!(first.state(), ParticipantState::Left);
    assert!(!service.contains(READY_PATH).await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_crashed_member_does_not_block_drain() {
    let service = DeterministicCoordinationService::new();
    let barrier = barrier(3);
    let joined = participants(&service, &barrier, 3).await;
    let sessions: Vec<_> = joined.iter().map(|(_, s)| Arc::clone(s)).collect();
    let mut entered = enter_all(joined.into_iter().map(|(p, _)| p).collect()).await;

    // Third participant crashes inside the barrier.
    let _crashed = entered.pop().unwrap();
    sessions[2].expire().await;
    assert_eq!(members(&service).await.len(), 2);

    let left = leave_all(entered).await;
    assert_eq!(left.len(), 2);
    assert!(service.children_of(BARRIER_PATH).await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_crash_while_others_wait_in_leave() {
    let service = DeterministicCoordinationService::new();
    let barrier = barrier(3);
    let joined = participants(&service, &barrier, 3).await;
    let sessions: Vec<_> = joined.iter().map(|(_, s)| Arc::clone(s)).collect();
    let mut entered = enter_all(joined.into_iter().map(|(p, _)| p).collect()).await;
    let _crashing = entered.pop().unwrap();

    let waiting: Vec<_> = entered.into_iter().map(spawn_leave).collect();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(waiting.iter().all(|handle| !handle.is_finished()));

    sessions[2].expire().await;
    for handle in waiting {
        assert_eq!(bounded(handle).await.unwrap().state(), ParticipantState::Left);
    }
}

#[tokio::test]
async fn test_session_expiry_during_leave_is_reported() {
    let service = DeterministicCoordinationService::new();
    let barrier = barrier(2);
    let joined = participants(&service, &barrier, 2).await;
    let session = Arc::clone(&joined[0].1);
    let mut entered = enter_all(joined.into_iter().map(|(p, _)| p).collect()).await;
    let _stays = entered.pop().unwrap();
    let mut leaving = entered.pop().unwrap();

    let handle = tokio::spawn(async move {
        let result = leaving.leave().await;
        (result, leaving)
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    session.expire().await;

    let (result, leaving) = bounded(handle).await.unwrap();
    assert!(matches!(result, Err(BarrierError::SessionExpired { operation: "leave", .. })));
    assert_eq!(leaving.state(), ParticipantState::Failed);
}

#[tokio::test]
async fn test_leave_timeout_ends_in_left() {
    let service = DeterministicCoordinationService::new();
    let barrier = DoubleBarrier::new(
        BarrierConfig::new(BARRIER_PATH, 2).unwrap().with_leave_timeout(Duration::from_millis(50)),
    );
    let joined = participants(&service, &barrier, 2).await;
    let mut entered = enter_all(joined.into_iter().map(|(p, _)| p).collect()).await;
    let _stays = entered.pop().unwrap();
    let mut leaving = entered.pop().unwrap();

    let err = bounded(leaving.leave()).await.unwrap_err();
    assert_eq!(err.kind(), BarrierErrorKind::TimedOut);
    assert_eq!(leaving.state(), ParticipantState::Left);
    assert_eq!(members(&service).await.len(), 1);
}

// ============================================================================
// Timeouts and retries
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_timed_out_participant_is_not_counted() {
    let service = DeterministicCoordinationService::new();
    let impatient = DoubleBarrier::new(
        BarrierConfig::new(BARRIER_PATH, 2).unwrap().with_enter_timeout(Duration::from_millis(50)),
    );
    let (mut quitter, _) = participants(&service, &impatient, 1).await.pop().unwrap();

    let err = bounded(quitter.enter()).await.unwrap_err();
    assert!(matches!(err, BarrierError::TimedOut { operation: "enter", .. }));
    assert_eq!(quitter.state(), ParticipantState::Initialized);
    assert!(members(&service).await.is_empty());

    // The withdrawn member must not help a later participant reach quorum.
    let barrier = barrier(2);
    let (waiting, _) = participants(&service, &barrier, 1).await.pop().unwrap();
    let waiting = spawn_enter(waiting);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!waiting.is_finished());

    // The quitter can try again and completes the quorum.
    bounded(quitter.enter()).await.unwrap();
    assert_eq!(bounded(waiting).await.unwrap().state(), ParticipantState::Entered);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_transient_read_failures_are_retried() {
    let service = DeterministicCoordinationService::new();
    let barrier = DoubleBarrier::new(
        BarrierConfig::new(BARRIER_PATH, 2).unwrap().with_retry(RetryPolicy::with_attempts(3)).unwrap(),
    );
    let joined = participants(&service, &barrier, 2).await.into_iter().map(|(p, _)| p).collect();

    let loss = CoordinationError::ConnectionLoss {
        reason: "injected".to_string(),
    };
    service.fail_next(FaultOp::Exists, loss.clone());
    service.fail_next(FaultOp::GetChildren, loss);

    let entered = enter_all(joined).await;
    let left = leave_all(entered).await;
    assert!(left.iter().all(|p| p.state() == ParticipantState::Left));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_failed_enter_leaves_no_member_behind() {
    let service = DeterministicCoordinationService::new();
    let barrier = barrier(2);
    let mut joined: Vec<_> = participants(&service, &barrier, 3).await.into_iter().map(|(p, _)| p).collect();
    let mut failing = joined.pop().unwrap();

    service.fail_next(FaultOp::GetChildren, CoordinationError::ConnectionLoss {
        reason: "injected".to_string(),
    });
    let err = bounded(failing.enter()).await.unwrap_err();
    assert_eq!(err.kind(), BarrierErrorKind::Transient);
    assert_eq!(failing.state(), ParticipantState::Failed);
    assert!(members(&service).await.is_empty());

    // The survivors drain without waiting on the failed participant.
    let left = leave_all(enter_all(joined).await).await;
    assert!(left.iter().all(|p| p.state() == ParticipantState::Left));
    assert!(service.children_of(BARRIER_PATH).await.unwrap().is_empty());
}

// ============================================================================
// Root lifecycle
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_reinit_after_drain_preserves_target() {
    let service = DeterministicCoordinationService::new();
    let barrier = barrier(2);
    let joined = participants(&service, &barrier, 2).await.into_iter().map(|(p, _)| p).collect();
    leave_all(enter_all(joined).await).await;

    let session = service.connect().await;
    let other = DoubleBarrier::new(BarrierConfig::new(BARRIER_PATH, 7).unwrap());
    other.init(session.as_ref()).await.unwrap();
    assert_eq!(barrier.stored_target_count(session.as_ref()).await.unwrap(), 2);

    let strict = DoubleBarrier::new(BarrierConfig::new(BARRIER_PATH, 7).unwrap().with_count_validation(true));
    let err = strict.init(session.as_ref()).await.unwrap_err();
    assert_eq!(err.kind(), BarrierErrorKind::Configuration);

    let matching = DoubleBarrier::new(BarrierConfig::new(BARRIER_PATH, 2).unwrap().with_count_validation(true));
    matching.init(session.as_ref()).await.unwrap();
}

#[tokio::test]
async fn test_early_release_is_protocol_violation() {
    let service = DeterministicCoordinationService::new();
    let barrier = barrier(1);
    let operator = service.connect().await;
    let (mut participant, _) = participants(&service, &barrier, 1).await.pop().unwrap();
    bounded(participant.enter()).await.unwrap();

    let err = barrier.release(operator.as_ref()).await.unwrap_err();
    assert_eq!(err.kind(), BarrierErrorKind::ProtocolViolation);
    assert!(service.contains(BARRIER_PATH).await);

    bounded(participant.leave()).await.unwrap();
    barrier.release(operator.as_ref()).await.unwrap();
    assert!(!service.contains(BARRIER_PATH).await);
    assert_eq!(operator.exists(BARRIER_PATH).await.unwrap(), None);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_rounds() {
    let service = DeterministicCoordinationService::new();
    let barrier = barrier(4);
    let mut current: Vec<_> = participants(&service, &barrier, 4).await.into_iter().map(|(p, _)| p).collect();

    for _ in 0..5 {
        current = leave_all(enter_all(current).await).await;
        assert!(service.children_of(BARRIER_PATH).await.unwrap().is_empty());
    }

    let handles: Vec<_> = current
        .into_iter()
        .map(|mut participant| {
            tokio::spawn(async move {
                for _ in 0..5 {
                    participant.enter().await?;
                    participant.leave().await?;
                }
                Ok::<_, BarrierError>(participant)
            })
        })
        .collect();
    for handle in handles {
        let participant = bounded(handle).await.unwrap().unwrap();
        assert_eq!(participant.state(), ParticipantState::Left);
    }
}
