//! Factory for barrier participants sharing one configuration.

use std::sync::Arc;

use rendezvous_core::CoordinationClient;

use crate::barrier::BarrierController;
use crate::barrier::root;
use crate::config::BarrierConfig;
use crate::error::BarrierError;

/// A double barrier, shared by any number of participants.
///
/// Holds the immutable configuration only; every call to
/// [`participant`](Self::participant) yields an independent controller with
/// its own member node.
#[derive(Debug, Clone)]
pub struct DoubleBarrier {
    config: Arc<BarrierConfig>,
}

impl DoubleBarrier {
    pub fn new(config: BarrierConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &BarrierConfig {
        &self.config
    }

    /// Construct a participant bound to `client`'s session.
    pub fn participant<C: CoordinationClient + ?Sized>(
        &self,
        client: Arc<C>,
        alias: impl Into<String>,
    ) -> Result<BarrierController<C>, BarrierError> {
        BarrierController::new(client, Arc::clone(&self.config), alias)
    }

    /// Operator-level form of [`BarrierController::init`].
    pub async fn init<C: CoordinationClient + ?Sized>(&self, client: &C) -> Result<(), BarrierError> {
        root::ensure_root(client, &self.config).await
    }

    /// Operator-level form of [`BarrierController::release`], independent of
    /// any participant's state.
    pub async fn release<C: CoordinationClient + ?Sized>(&self, client: &C) -> Result<(), BarrierError> {
        root::release_root(client, &self.config).await
    }

    /// Target count stored in the barrier root.
    pub async fn stored_target_count<C: CoordinationClient + ?Sized>(&self, client: &C) -> Result<u32, BarrierError> {
        root::read_target_count(client, &self.config).await
    }
}

#[cfg(test)]
mod tests {
    use rendezvous_core::DeterministicCoordinationService;

    use super::*;
    use crate::types::BarrierErrorKind;
    use crate::types::ParticipantState;

    #[tokio::test]
    async fn test_operator_init_and_release() {
        let service = DeterministicCoordinationService::new();
        let operator = service.connect().await;
        let barrier = DoubleBarrier::new(BarrierConfig::new("/doublebarrier", 2).unwrap());

        barrier.init(operator.as_ref()).await.unwrap();
        assert_eq!(barrier.stored_target_count(operator.as_ref()).await.unwrap(), 2);

        barrier.release(operator.as_ref()).await.unwrap();
        assert!(!service.contains("/doublebarrier").await);
        barrier.release(operator.as_ref()).await.unwrap();
    }

    #[tokio::test]
    async fn test_participants_are_independent() {
        let service = DeterministicCoordinationService::new();
        let session = service.connect().await;
        let barrier = DoubleBarrier::new(BarrierConfig::new("/doublebarrier", 2).unwrap());

        let a = barrier.participant(Arc::clone(&session), "worker").unwrap();
        let b = barrier.participant(Arc::clone(&session), "worker").unwrap();
        assert_eq!(a.state(), ParticipantState::Uninitialized);
        assert_eq!(b.target_count(), 2);

        let err = barrier.participant(session, "ready").unwrap_err();
        assert_eq!(err.kind(), BarrierErrorKind::Usage);
    }

    #[tokio::test]
    async fn test_early_release_is_protocol_violation() {
        let service = DeterministicCoordinationService::new();
        let operator = service.connect().await;
        let barrier = DoubleBarrier::new(BarrierConfig::new("/doublebarrier", 1).unwrap());

        let mut worker = barrier.participant(service.connect().await, "w").unwrap();
        worker.init().await.unwrap();
        worker.enter().await.unwrap();

        let err = barrier.release(operator.as_ref()).await.unwrap_err();
        assert!(matches!(err, BarrierError::ProtocolViolation { .. }));
    }
}
