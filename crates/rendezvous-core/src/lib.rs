//! Core types and traits for coordination over a hierarchical node tree.
//!
//! This crate provides the client contract that coordination recipes (such as
//! the double barrier in `rendezvous-barrier`) are written against, plus a
//! deterministic in-memory implementation of that contract.
//!
//! # Key Components
//!
//! - **Traits**: `CoordinationClient`, `Watcher`
//! - **Types**: `CreateMode`, `Version`, `NodeStat`, `WatchedEvent`, `SessionId`
//! - **Paths**: explicit validation, `join`, `parent`, `basename`
//! - **In-memory**: `DeterministicCoordinationService`, `InMemorySession`
//! - **Constants**: Tiger Style resource limits

pub mod constants;
pub mod error;
pub mod inmemory;
pub mod path;
pub mod traits;
pub mod types;

// Constants
pub use constants::MAX_CHILDREN_PER_NODE;
pub use constants::MAX_NODE_DATA_SIZE;
pub use constants::MAX_PATH_SIZE;
pub use constants::MAX_WATCHES_PER_SESSION;
pub use constants::SEQUENCE_SUFFIX_DIGITS;
pub use constants::WATCH_EVENT_CHANNEL_CAPACITY;
// Error types
pub use error::CoordinationError;
// In-memory deterministic implementations for testing
pub use inmemory::DeterministicCoordinationService;
pub use inmemory::FaultOp;
pub use inmemory::InMemorySession;
// Traits
pub use traits::CoordinationClient;
pub use traits::Watcher;
// Types
pub use types::CreateMode;
pub use types::EventType;
pub use types::NodeStat;
pub use types::SessionId;
pub use types::SessionState;
pub use types::Version;
pub use types::WatchedEvent;
