//! Node layout of a barrier under its root path.
//!
//! ```text
//! P                   root, stores the decimal target count
//! P/<alias>-NNNNNNNNNN one ephemeral sequential member per participant
//! P/ready             marker created once the entry quorum is observed
//! ```

use std::fmt;

use rendezvous_core::path;

use crate::constants::READY_MARKER_NAME;
use crate::error::BarrierError;
use crate::verified::is_valid_alias;
use crate::verified::member_name_prefix;

/// A validated barrier root path and the paths derived from it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BarrierPath {
    root: String,
    ready_marker: String,
}

impl BarrierPath {
    /// Validate `root` as a barrier root.
    ///
    /// The tree root `/` is rejected: a barrier needs a node of its own to
    /// store the target count and to hold the member set.
    pub fn new(root: impl Into<String>) -> Result<Self, BarrierError> {
        let root = root.into();
        if let Err(err) = path::validate_path(&root) {
            return Err(BarrierError::InvalidConfig {
                reason: err.to_string(),
            });
        }
        if root == path::ROOT_PATH {
            return Err(BarrierError::InvalidConfig {
                reason: "the tree root cannot be a barrier root".to_string(),
            });
        }
        let ready_marker = path::join(&root, READY_MARKER_NAME);
        Ok(Self { root, ready_marker })
    }

    /// The barrier root path.
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Path of the ready marker.
    pub fn ready_marker(&self) -> &str {
        &self.ready_marker
    }

    /// Path prefix a participant's sequential member node is created with.
    pub fn member_prefix(&self, alias: &str) -> Result<String, BarrierError> {
        if !is_valid_alias(alias) {
            return Err(BarrierError::InvalidConfig {
                reason: format!("invalid participant alias '{alias}'"),
            });
        }
        Ok(path::join(&self.root, &member_name_prefix(alias)))
    }
}

impl fmt::Display for BarrierPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.root)
    }
}
