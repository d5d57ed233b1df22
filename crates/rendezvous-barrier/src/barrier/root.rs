//! Barrier root lifecycle shared by participants and operators.

use rendezvous_core::CoordinationClient;
use rendezvous_core::CoordinationError;
use rendezvous_core::CreateMode;
use rendezvous_core::Version;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::retry::retry_idempotent;
use crate::config::BarrierConfig;
use crate::error::BarrierError;
use crate::verified::encode_target_count;
use crate::verified::parse_target_count;

/// Create the barrier root storing the target count, or accept an existing one.
///
/// An existing root is trusted as-is unless count validation is enabled, in
/// which case its stored count must match the configured one.
pub(crate) async fn ensure_root<C: CoordinationClient + ?Sized>(
    client: &C,
    config: &BarrierConfig,
) -> Result<(), BarrierError> {
    let root = config.path().root();
    let target = config.target_count();
    let data = encode_target_count(target);

    let created = retry_idempotent(config.retry(), client.session_id(), "create barrier root", move || {
        client.create(root, data.clone(), CreateMode::Persistent)
    })
    .await;

    match created {
        Ok(_) => {
            info!(path = root, target, "barrier root created");
            Ok(())
        }
        Err(CoordinationError::NodeExists { .. }) if config.validate_existing_count() => {
            let stored = read_target_count(client, config).await?;
            if stored != target {
                return Err(BarrierError::Configuration {
                    path: root.to_string(),
                    stored,
                    requested: target,
                });
            }
            debug!(path = root, target, "barrier root exists with matching target count");
            Ok(())
        }
        Err(CoordinationError::NodeExists { .. }) => {
            debug!(path = root, "barrier root already exists");
            Ok(())
        }
        Err(err) => Err(BarrierError::from_client("create barrier root", err)),
    }
}

/// Read the target count stored in the barrier root.
pub(crate) async fn read_target_count<C: CoordinationClient + ?Sized>(
    client: &C,
    config: &BarrierConfig,
) -> Result<u32, BarrierError> {
    let root = config.path().root();
    let (data, _stat) = retry_idempotent(config.retry(), client.session_id(), "read barrier root", move || {
        client.get_data(root)
    })
    .await
    .map_err(|err| BarrierError::from_client("read barrier root", err))?;

    parse_target_count(&data).ok_or_else(|| BarrierError::CorruptedRoot {
        path: root.to_string(),
        reason: format!("expected a decimal count, found {:?}", String::from_utf8_lossy(&data)),
    })
}

/// Delete the barrier root.
///
/// A root that still has children means release was invoked before every
/// participant left, which is reported and never retried. An absent root is
/// tolerated.
pub(crate) async fn release_root<C: CoordinationClient + ?Sized>(
    client: &C,
    config: &BarrierConfig,
) -> Result<(), BarrierError> {
    let root = config.path().root();
    let deleted = retry_idempotent(config.retry(), client.session_id(), "release barrier root", move || {
        client.delete(root, Version::Any)
    })
    .await;

    match deleted {
        Ok(()) => {
            info!(path = root, "barrier released");
            Ok(())
        }
        Err(CoordinationError::NoNode { .. }) => {
            warn!(path = root, "barrier root already gone");
            Ok(())
        }
        Err(CoordinationError::NotEmpty { children, .. }) => Err(BarrierError::ProtocolViolation {
            reason: format!("release of '{root}' while {children} children remain"),
        }),
        Err(err) => Err(BarrierError::from_client("release barrier root", err)),
    }
}
