//! Distributed double barrier over a hierarchical coordination service.
//!
//! Participants rendezvous twice: nobody proceeds past `enter` until the
//! target count of participants has entered, and nobody returns from `leave`
//! until every participant of the round has left.
//!
//! Membership is one ephemeral sequential node per participant under the
//! barrier root, so a crashed participant's membership disappears with its
//! session. Waiting is driven by one-shot watches, never by polling.
//!
//! ## Example
//!
//! ```ignore
//! use rendezvous_barrier::{BarrierConfig, DoubleBarrier};
//!
//! let barrier = DoubleBarrier::new(BarrierConfig::new("/doublebarrier", 2)?);
//! let mut participant = barrier.participant(session, "worker")?;
//!
//! participant.init().await?;
//! participant.enter().await?;
//! // Shared phase
//! participant.leave().await?;
//! ```

mod barrier;
mod bridge;
mod config;
pub mod constants;
mod double_barrier;
mod error;
mod layout;
mod types;
pub mod verified;

pub use barrier::BarrierController;
pub use bridge::NotificationBridge;
pub use config::BarrierConfig;
pub use config::RetryPolicy;
pub use double_barrier::DoubleBarrier;
pub use error::BarrierError;
pub use layout::BarrierPath;
pub use types::BarrierErrorKind;
pub use types::ParticipantState;
