//! Compute provider trait and common types.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during compute provider operations.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} {code} - {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
        /// `RequestID` from the error document, for AWS support.
        request_id: Option<String>,
    },

    /// Resource not found.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Authentication error.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Response body could not be decoded.
    #[error("Failed to decode response: {0}")]
    Xml(#[from] quick_xml::de::DeError),
}

/// Instance (VM) status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceStatus {
    /// Instance is pending creation.
    Pending,
    /// Instance is running.
    Running,
    /// Instance is stopped or stopping.
    Stopped,
    /// Instance is shutting down.
    Terminating,
    /// Instance is terminated.
    Terminated,
    /// Unknown status.
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Stopped => write!(f, "stopped"),
            Self::Terminating => write!(f, "terminating"),
            Self::Terminated => write!(f, "terminated"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// A virtual machine instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    /// Provider-assigned instance identifier.
    pub id: String,
    /// Status reported when the instance was last seen.
    pub status: InstanceStatus,
    /// Instance type/size.
    pub instance_type: String,
    /// OS image used.
    pub image: String,
    /// Key pair the instance was launched with.
    pub key_name: Option<String>,
    /// Availability zone.
    pub zone: Option<String>,
    /// Public IPv4 address.
    pub public_ip: Option<String>,
    /// Private IPv4 address.
    pub private_ip: Option<String>,
    /// When the instance was launched.
    pub launched_at: Option<DateTime<Utc>>,
}

/// An access key pair registered with the provider.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPair {
    /// Key pair name, unique within the account and region.
    pub name: String,
    /// Provider-assigned key pair identifier.
    pub id: Option<String>,
    /// Key fingerprint.
    pub fingerprint: Option<String>,
    /// Unencrypted private key. Only returned once, at creation.
    #[serde(skip)]
    pub private_key: Option<String>,
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("fingerprint", &self.fingerprint)
            .field(
                "private_key",
                &self.private_key.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

/// Request to launch a single instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunInstanceRequest {
    /// OS image to use.
    pub image_id: String,
    /// Instance type/size.
    pub instance_type: String,
    /// Key pair to install on the instance.
    pub key_name: String,
}

/// Trait for compute providers that can host a node tree.
#[async_trait]
pub trait ComputeProvider: Send + Sync {
    /// Create a named key pair.
    async fn create_key_pair(&self, name: &str) -> Result<KeyPair, ProviderError>;

    /// Launch exactly one instance.
    async fn run_instance(&self, req: RunInstanceRequest) -> Result<Instance, ProviderError>;

    /// Request termination of an instance. Does not wait for it to stop.
    async fn terminate_instance(&self, id: &str) -> Result<(), ProviderError>;

    /// Delete a key pair by name.
    async fn delete_key_pair(&self, name: &str) -> Result<(), ProviderError>;
}
