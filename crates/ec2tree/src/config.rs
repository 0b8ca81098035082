//! Tree provisioning configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::providers::aws::regions;

/// Default AMI (Amazon Linux on arm64 in eu-west-1).
pub const DEFAULT_IMAGE_ID: &str = "ami-01505b5fb77668db8";

/// Default instance type.
pub const DEFAULT_INSTANCE_TYPE: &str = "t4g.nano";

/// Default region.
pub const DEFAULT_REGION: &str = regions::EU_WEST_1;

/// Default number of levels below the root.
pub const DEFAULT_MAX_DEPTH: u32 = 1;

/// Default number of children per internal node.
pub const DEFAULT_FANOUT: u32 = 2;

/// Invalid tree configuration.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// A required string field is empty.
    #[error("{0} must not be empty")]
    Empty(&'static str),

    /// The tree would have more nodes than can be counted.
    #[error("a tree with max depth {max_depth} and fanout {fanout} is too large")]
    TooLarge { max_depth: u32, fanout: u32 },
}

/// Configuration for one provisioning run. Immutable once the service
/// is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeConfig {
    /// Image every node boots from.
    pub image_id: String,
    /// Instance type of every node.
    pub instance_type: String,
    /// Region to provision in.
    pub region: String,
    /// Maximum number of levels below the root.
    pub max_depth: u32,
    /// Children per internal node.
    pub fanout: u32,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            image_id: DEFAULT_IMAGE_ID.to_string(),
            instance_type: DEFAULT_INSTANCE_TYPE.to_string(),
            region: DEFAULT_REGION.to_string(),
            max_depth: DEFAULT_MAX_DEPTH,
            fanout: DEFAULT_FANOUT,
        }
    }
}

impl TreeConfig {
    /// Set the tree shape.
    #[must_use]
    pub fn with_shape(mut self, max_depth: u32, fanout: u32) -> Self {
        self.max_depth = max_depth;
        self.fanout = fanout;
        self
    }

    /// Number of nodes a complete build produces, or `None` on overflow.
    #[must_use]
    pub fn expected_nodes(&self) -> Option<u64> {
        let fanout = u64::from(self.fanout);
        if fanout <= 1 {
            return Some(fanout * u64::from(self.max_depth) + 1);
        }

        let mut level = 1u64;
        let mut total = 1u64;
        for _ in 0..self.max_depth {
            level = level.checked_mul(fanout)?;
            total = total.checked_add(level)?;
        }
        Some(total)
    }

    /// Check the configuration before any remote call is made.
    ///
    /// # Errors
    /// Returns error if a string field is empty or the tree is too large
    /// to count.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.image_id.trim().is_empty() {
            return Err(ConfigError::Empty("image id"));
        }
        if self.instance_type.trim().is_empty() {
            return Err(ConfigError::Empty("instance type"));
        }
        if self.region.trim().is_empty() {
            return Err(ConfigError::Empty("region"));
        }
        if self.expected_nodes().is_none() {
            return Err(ConfigError::TooLarge {
                max_depth: self.max_depth,
                fanout: self.fanout,
            });
        }
        Ok(())
    }
}
