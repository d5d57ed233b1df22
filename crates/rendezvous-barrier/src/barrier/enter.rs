use std::sync::Arc;

use rendezvous_core::CoordinationClient;
use rendezvous_core::CoordinationError;
use rendezvous_core::CreateMode;
use rendezvous_core::EventType;
use tokio::time::Instant;
use tracing::debug;
use tracing::info;
use tracing::trace;
use tracing::warn;

use super::BarrierController;
use super::retry::retry_idempotent;
use crate::error::BarrierError;
use crate::types::ParticipantState;
use crate::verified::count_members;
use crate::verified::is_entry_quorum_reached;

impl<C: CoordinationClient + ?Sized> BarrierController<C> {
    /// Enter the barrier.
    ///
    /// Returns once at least `target_count` member nodes have existed at the
    /// same time, as witnessed by the ready marker.
    ///
    /// # Errors
    ///
    /// - [`BarrierError::TimedOut`] if the configured enter timeout expires.
    ///   The member node is withdrawn and the participant returns to the state
    ///   it entered from, so `enter` can be retried.
    /// - [`BarrierError::SessionExpired`] if the session is lost while waiting.
    /// - [`BarrierError::InvalidState`] unless the participant is
    ///   `Initialized` or `Left`.
    pub async fn enter(&mut self) -> Result<(), BarrierError> {
        self.require("enter", &[ParticipantState::Initialized, ParticipantState::Left])?;
        let resume = self.state;
        self.transition(ParticipantState::Entering)?;

        let deadline = Self::deadline(self.config.enter_timeout());
        match self.await_entry_quorum(deadline).await {
            Ok(()) => {
                self.transition(ParticipantState::Entered)?;
                info!(
                    alias = %self.alias,
                    member = self.member_path.as_deref().unwrap_or_default(),
                    target = self.config.target_count(),
                    "entered barrier"
                );
                Ok(())
            }
            Err(err @ BarrierError::TimedOut { .. }) => {
                if let Err(withdraw_err) = self.delete_member("withdraw member").await {
                    return Err(self.fail(withdraw_err));
                }
                info!(alias = %self.alias, "enter timed out, member withdrawn");
                self.transition(resume)?;
                Err(err)
            }
            Err(err @ BarrierError::SessionExpired { .. }) => {
                // The ephemeral member went away with the session.
                self.member_path = None;
                Err(self.fail(err))
            }
            Err(err) => {
                // No member may outlive a failed enter.
                if let Err(withdraw_err) = self.delete_member("withdraw member").await {
                    warn!(
                        alias = %self.alias,
                        member = self.member_path.as_deref().unwrap_or_default(),
                        error = %withdraw_err,
                        "failed to withdraw member after enter error"
                    );
                }
                Err(self.fail(err))
            }
        }
    }

    async fn await_entry_quorum(&mut self, deadline: Option<Instant>) -> Result<(), BarrierError> {
        // Never retried: a create whose reply was lost would leave an
        // unreferenced member inflating the count.
        let member = self
            .client
            .create(&self.member_prefix, Vec::new(), CreateMode::EphemeralSequential)
            .await
            .map_err(|err| BarrierError::from_client("create member", err))?;
        debug!(alias = %self.alias, path = %member, "created member node");
        self.member_path = Some(member);

        let client = self.client.as_ref();
        let session_id = client.session_id();
        let retry = self.config.retry();
        let root = self.config.path().root();
        let ready = self.config.path().ready_marker();
        let target = self.config.target_count();

        loop {
            // Arm the marker watch before reading membership so a marker
            // created after the read still wakes this participant.
            let watcher = self.bridge.arm();
            let marker = retry_idempotent(retry, session_id, "watch ready marker", move || {
                client.exists_with_watch(ready, Arc::clone(&watcher))
            })
            .await
            .map_err(|err| BarrierError::from_client("watch ready marker", err))?;
            if marker.is_some() {
                return Ok(());
            }

            let children = retry_idempotent(retry, session_id, "count members", move || client.get_children(root))
                .await
                .map_err(|err| BarrierError::from_client("count members", err))?;
            let members = count_members(&children);

            if is_entry_quorum_reached(members, target) {
                let created = retry_idempotent(retry, session_id, "create ready marker", move || {
                    client.create(ready, Vec::new(), CreateMode::Persistent)
                })
                .await;
                match created {
                    Ok(_) => debug!(path = ready, members, target, "created ready marker"),
                    Err(CoordinationError::NodeExists { .. }) => {
                        debug!(path = ready, "ready marker created by a peer")
                    }
                    Err(err) => return Err(BarrierError::from_client("create ready marker", err)),
                }
                return Ok(());
            }

            debug!(alias = %self.alias, members, target, "waiting for entry quorum");
            match self.bridge.wait(deadline).await {
                None => {
                    return Err(BarrierError::TimedOut {
                        operation: "enter",
                        timeout_ms: self.config.enter_timeout().map_or(0, |t| t.as_millis() as u64),
                    });
                }
                Some(event) if event.is_session_loss() => {
                    return Err(BarrierError::SessionExpired {
                        operation: "enter",
                        session_id,
                    });
                }
                Some(event) if event.event_type == EventType::NodeCreated => return Ok(()),
                Some(event) => trace!(?event, "re-checking entry quorum"),
            }
        }
    }
}
