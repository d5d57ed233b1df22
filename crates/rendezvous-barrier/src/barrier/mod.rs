//! Per-participant double barrier controller.
//!
//! One [`BarrierController`] represents one logical participant. Its
//! operations take `&mut self`, so a controller, and with it the participant's
//! member node, can never be shared by concurrent callers of `enter`/`leave`.
//! Processes running several participants construct one controller each, for
//! example through [`DoubleBarrier::participant`](crate::DoubleBarrier::participant).

mod enter;
mod leave;
mod retry;
pub(crate) mod root;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use rendezvous_core::CoordinationClient;
use rendezvous_core::CoordinationError;
use rendezvous_core::Version;
use tokio::time::Instant;
use tracing::debug;
use tracing::warn;

use self::retry::retry_idempotent;
use crate::bridge::NotificationBridge;
use crate::config::BarrierConfig;
use crate::error::BarrierError;
use crate::types::ParticipantState;
use crate::verified::is_valid_participant_transition;

/// A single participant of a double barrier.
///
/// # Lifecycle
///
/// `init` → `enter` → (work) → `leave`, repeatable from `enter` for further
/// rounds. Any non-recoverable error leaves the controller
/// [`Failed`](ParticipantState::Failed); construct a new one with a fresh
/// session to rejoin.
pub struct BarrierController<C: CoordinationClient + ?Sized> {
    client: Arc<C>,
    config: Arc<BarrierConfig>,
    alias: String,
    member_prefix: String,
    state: ParticipantState,
    member_path: Option<String>,
    bridge: Arc<NotificationBridge>,
}

impl<C: CoordinationClient + ?Sized> BarrierController<C> {
    /// Create a participant identified by `alias`.
    ///
    /// The alias prefixes the participant's member node name; it need not be
    /// unique since the coordination service appends a sequence number.
    pub fn new(client: Arc<C>, config: Arc<BarrierConfig>, alias: impl Into<String>) -> Result<Self, BarrierError> {
        let alias = alias.into();
        let member_prefix = config.path().member_prefix(&alias)?;
        Ok(Self {
            client,
            config,
            alias,
            member_prefix,
            state: ParticipantState::Uninitialized,
            member_path: None,
            bridge: NotificationBridge::new(),
        })
    }

    pub fn state(&self) -> ParticipantState {
        self.state
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Path of this participant's member node while it holds one.
    pub fn member_path(&self) -> Option<&str> {
        self.member_path.as_deref()
    }

    pub fn target_count(&self) -> u32 {
        self.config.target_count()
    }

    pub fn config(&self) -> &BarrierConfig {
        &self.config
    }

    /// Ensure the barrier root exists.
    ///
    /// Safe to repeat: an existing root is accepted (and, with count
    /// validation enabled, checked against the configured target count).
    pub async fn init(&mut self) -> Result<(), BarrierError> {
        self.require("init", &[ParticipantState::Uninitialized, ParticipantState::Initialized, ParticipantState::Left])?;

        if let Err(err) = root::ensure_root(self.client.as_ref(), &self.config).await {
            return Err(self.fail(err));
        }
        if self.state == ParticipantState::Uninitialized {
            self.transition(ParticipantState::Initialized)?;
        }
        Ok(())
    }

    /// Delete the barrier root once every participant has left.
    ///
    /// Only valid after this participant left; operators that never joined
    /// use [`DoubleBarrier::release`](crate::DoubleBarrier::release).
    /// Fails with [`BarrierError::ProtocolViolation`] if members remain.
    /// The participant's own state is unaffected.
    pub async fn release(&self) -> Result<(), BarrierError> {
        self.require("release", &[ParticipantState::Left])?;
        root::release_root(self.client.as_ref(), &self.config).await
    }

    fn require(&self, operation: &'static str, allowed: &[ParticipantState]) -> Result<(), BarrierError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(BarrierError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }

    fn transition(&mut self, to: ParticipantState) -> Result<(), BarrierError> {
        if !is_valid_participant_transition(self.state, to) {
            return Err(BarrierError::ProtocolViolation {
                reason: format!("participant '{}' cannot move from {} to {}", self.alias, self.state, to),
            });
        }
        debug!(alias = %self.alias, from = %self.state, to = %to, "participant state change");
        self.state = to;
        Ok(())
    }

    fn fail(&mut self, err: BarrierError) -> BarrierError {
        warn!(alias = %self.alias, state = %self.state, error = %err, "participant failed");
        self.state = ParticipantState::Failed;
        err
    }

    fn deadline(timeout: Option<Duration>) -> Option<Instant> {
        timeout.map(|timeout| Instant::now() + timeout)
    }

    /// Delete this participant's member node, tolerating its absence.
    ///
    /// The member path is forgotten only once the node is known to be gone.
    async fn delete_member(&mut self, operation: &'static str) -> Result<(), BarrierError> {
        let Some(member) = self.member_path.clone() else {
            return Ok(());
        };
        let client = self.client.as_ref();
        let path = member.as_str();
        let deleted =
            retry_idempotent(self.config.retry(), client.session_id(), operation, move || client.delete(path, Version::Any))
                .await;

        match deleted {
            Ok(()) => debug!(alias = %self.alias, path = %member, "deleted member node"),
            Err(CoordinationError::NoNode { .. }) => {
                warn!(alias = %self.alias, path = %member, "member node already gone")
            }
            Err(err) => return Err(BarrierError::from_client(operation, err)),
        }
        self.member_path = None;
        Ok(())
    }
}

impl<C: CoordinationClient + ?Sized> fmt::Debug for BarrierController<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BarrierController")
            .field("alias", &self.alias)
            .field("state", &self.state)
            .field("member_path", &self.member_path)
            .finish_non_exhaustive()
    }
}
