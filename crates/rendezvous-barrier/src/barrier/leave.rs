use rendezvous_core::CoordinationClient;
use rendezvous_core::CoordinationError;
use rendezvous_core::Version;
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
use crate::verified::has_ready_marker;
use crate::verified::is_round_drained;

impl<C: CoordinationClient + ?Sized> BarrierController<C> {
    /// Leave the barrier.
    ///
    /// Deletes this participant's member node and returns once every other
    /// member of the round has left too. The last participant out deletes
    /// the ready marker.
    ///
    /// # Errors
    ///
    /// - [`BarrierError::TimedOut`] if the configured leave timeout expires.
    ///   The member node is already gone, so the participant ends up `Left`.
    /// - [`BarrierError::SessionExpired`] if the session is lost while waiting.
    /// - [`BarrierError::InvalidState`] unless the participant is `Entered`.
    pub async fn leave(&mut self) -> Result<(), BarrierError> {
        self.require("leave", &[ParticipantState::Entered])?;
        self.transition(ParticipantState::Leaving)?;

        let deadline = Self::deadline(self.config.leave_timeout());
        match self.await_drain(deadline).await {
            Ok(()) => {
                self.transition(ParticipantState::Left)?;
                info!(alias = %self.alias, "left barrier");
                Ok(())
            }
            Err(err @ BarrierError::TimedOut { .. }) => {
                info!(alias = %self.alias, "leave timed out");
                self.transition(ParticipantState::Left)?;
                Err(err)
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    async fn await_drain(&mut self, deadline: Option<Instant>) -> Result<(), BarrierError> {
        self.delete_member("delete member").await?;

        let client = self.client.as_ref();
        let session_id = client.session_id();
        let retry = self.config.retry();
        let root = self.config.path().root();
        let ready = self.config.path().ready_marker();

        loop {
            let watcher = self.bridge.arm();
            let listed = retry_idempotent(retry, session_id, "watch members", move || {
                client.get_children_with_watch(root, watcher.clone())
            })
            .await;
            let children = match listed {
                Ok(children) => children,
                Err(CoordinationError::NoNode { .. }) => {
                    warn!(path = root, "barrier root vanished during leave, treating round as drained");
                    return Ok(());
                }
                Err(err) => return Err(BarrierError::from_client("watch members", err)),
            };

            if is_round_drained(&children) {
                if has_ready_marker(&children) {
                    self.delete_ready_marker(ready).await?;
                }
                return Ok(());
            }

            debug!(alias = %self.alias, remaining = count_members(&children), "waiting for round to drain");
            match self.bridge.wait(deadline).await {
                None => {
                    return Err(BarrierError::TimedOut {
                        operation: "leave",
                        timeout_ms: self.config.leave_timeout().map_or(0, |t| t.as_millis() as u64),
                    });
                }
                Some(event) if event.is_session_loss() => {
                    return Err(BarrierError::SessionExpired {
                        operation: "leave",
                        session_id,
                    });
                }
                Some(event) => trace!(?event, "re-checking drain"),
            }
        }
    }

    async fn delete_ready_marker(&self, ready: &str) -> Result<(), BarrierError> {
        let client = self.client.as_ref();
        let deleted = retry_idempotent(self.config.retry(), client.session_id(), "delete ready marker", move || {
            client.delete(ready, Version::Any)
        })
        .await;

        match deleted {
            Ok(()) => {
                debug!(path = ready, "deleted ready marker");
                Ok(())
            }
            Err(CoordinationError::NoNode { .. }) => {
                debug!(path = ready, "ready marker already deleted by a peer");
                Ok(())
            }
            Err(err) => Err(BarrierError::from_client("delete ready marker", err)),
        }
    }
}
