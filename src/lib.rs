//! Rendezvous: a distributed double barrier over a hierarchical coordination
//! service.
//!
//! This crate re-exports the two workspace crates and adds the layered
//! configuration used by the `rendezvous-demo` binary.
//!
//! - [`core`]: coordination client contract and the deterministic in-memory service
//! - [`barrier`]: the double barrier protocol
//! - [`config`]: demo configuration (environment < TOML < CLI)

pub mod config;

pub use rendezvous_barrier as barrier;
pub use rendezvous_barrier::BarrierConfig;
pub use rendezvous_barrier::BarrierController;
pub use rendezvous_barrier::BarrierError;
pub use rendezvous_barrier::DoubleBarrier;
pub use rendezvous_barrier::ParticipantState;
pub use rendezvous_core as core;
pub use rendezvous_core::CoordinationClient;
pub use rendezvous_core::DeterministicCoordinationService;
