//! Drives participant tasks through the barrier.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use anyhow::Result;
use rendezvous::config::DemoConfig;
use rendezvous_barrier::BarrierController;
use rendezvous_barrier::DoubleBarrier;
use rendezvous_core::DeterministicCoordinationService;
use rendezvous_core::InMemorySession;
use tokio::task::JoinSet;
use tracing::info;
use tracing::warn;

/// How a participant task ended.
enum Outcome {
    Completed,
    Crashed,
}

/// Summary of a finished run.
#[derive(Debug, Default)]
pub struct RunReport {
    pub completed: u32,
    pub crashed: u32,
}

/// Run every configured participant through the barrier, then release it.
pub async fn run(demo: &DemoConfig) -> Result<RunReport> {
    let service = DeterministicCoordinationService::new();
    let barrier = DoubleBarrier::new(demo.barrier_config()?);
    let operator = service.connect().await;
    barrier.init(operator.as_ref()).await.context("failed to initialize barrier")?;

    let mut tasks = JoinSet::new();
    for index in 0..demo.participants {
        let session = service.connect().await;
        let participant = barrier.participant(Arc::clone(&session), format!("participant{index}"))?;
        let crash = demo.crash_one && index == 0;
        tasks.spawn(run_participant(participant, session, demo.rounds, demo.work_duration(), crash));
    }

    let mut report = RunReport::default();
    while let Some(joined) = tasks.join_next().await {
        match joined.context("participant task panicked")?? {
            Outcome::Completed => report.completed += 1,
            Outcome::Crashed => report.crashed += 1,
        }
    }

    barrier.release(operator.as_ref()).await.context("failed to release barrier")?;
    operator.close().await;
    Ok(report)
}

async fn run_participant(
    mut participant: BarrierController<InMemorySession>,
    session: Arc<InMemorySession>,
    rounds: u32,
    work: Duration,
    crash: bool,
) -> Result<Outcome> {
    let alias = participant.alias().to_string();
    participant.init().await.with_context(|| format!("{alias}: init failed"))?;

    for round in 1..=rounds {
        participant.enter().await.with_context(|| format!("{alias}: enter failed in round {round}"))?;
        info!(alias = %alias, round, member = participant.member_path().unwrap_or_default(), "working");

        if crash {
            session.expire().await;
            warn!(alias = %alias, round, "session expired inside the barrier");
            return Ok(Outcome::Crashed);
        }

        tokio::time::sleep(work).await;
        participant.leave().await.with_context(|| format!("{alias}: leave failed in round {round}"))?;
    }

    session.close().await;
    Ok(Outcome::Completed)
}
