//! EC2 Query API response models.
//!
//! Field names follow the camelCase element names of the 2016-11-15 API
//! version. Elements not listed here are ignored when decoding.

use serde::Deserialize;

/// EC2 API version sent with every request.
pub const API_VERSION: &str = "2016-11-15";

// ============================================================================
// Key pairs
// ============================================================================

/// `CreateKeyPair` response.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateKeyPairResponse {
    /// Key pair name.
    #[serde(rename = "keyName")]
    pub key_name: String,
    /// Key pair ID.
    #[serde(rename = "keyPairId")]
    pub key_pair_id: Option<String>,
    /// SHA-1 digest of the private key.
    #[serde(rename = "keyFingerprint")]
    pub key_fingerprint: Option<String>,
    /// Unencrypted PEM private key.
    #[serde(rename = "keyMaterial")]
    pub key_material: Option<String>,
}

/// `DeleteKeyPair` response.
#[derive(Debug, Clone, Deserialize)]
pub struct DeleteKeyPairResponse {
    /// Whether the request succeeded.
    #[serde(rename = "return")]
    pub ok: bool,
}

// ============================================================================
// Instances
// ============================================================================

/// EC2 instance information.
#[derive(Debug, Clone, Deserialize)]
pub struct Ec2Instance {
    /// Instance ID.
    #[serde(rename = "instanceId")]
    pub instance_id: String,
    /// Instance type.
    #[serde(rename = "instanceType")]
    pub instance_type: String,
    /// Image ID (AMI).
    #[serde(rename = "imageId")]
    pub image_id: String,
    /// Instance state.
    #[serde(rename = "instanceState")]
    pub state: InstanceState,
    /// Key name.
    #[serde(rename = "keyName")]
    pub key_name: Option<String>,
    /// Placement information.
    pub placement: Option<Placement>,
    /// Public IP address.
    #[serde(rename = "ipAddress")]
    pub public_ip_address: Option<String>,
    /// Private IP address.
    #[serde(rename = "privateIpAddress")]
    pub private_ip_address: Option<String>,
    /// Launch time (RFC 3339).
    #[serde(rename = "launchTime")]
    pub launch_time: Option<String>,
}

/// Instance state.
#[derive(Debug, Clone, Deserialize)]
pub struct InstanceState {
    /// State name.
    pub name: String,
}

/// Placement information.
#[derive(Debug, Clone, Deserialize)]
pub struct Placement {
    /// Availability zone.
    #[serde(rename = "availabilityZone")]
    pub availability_zone: Option<String>,
}

/// A list of `<item>` elements wrapped in a `*Set` element.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemSet<T> {
    /// Items in document order.
    #[serde(rename = "item", default = "Vec::new")]
    pub items: Vec<T>,
}

/// `RunInstances` response.
#[derive(Debug, Clone, Deserialize)]
pub struct RunInstancesResponse {
    /// Launched instances.
    #[serde(rename = "instancesSet")]
    pub instances: ItemSet<Ec2Instance>,
}

/// State change reported by `TerminateInstances`.
#[derive(Debug, Clone, Deserialize)]
pub struct InstanceStateChange {
    /// Instance ID.
    #[serde(rename = "instanceId")]
    pub instance_id: String,
    /// State after the request.
    #[serde(rename = "currentState")]
    pub current_state: InstanceState,
    /// State before the request.
    #[serde(rename = "previousState")]
    pub previous_state: InstanceState,
}

/// `TerminateInstances` response.
#[derive(Debug, Clone, Deserialize)]
pub struct TerminateInstancesResponse {
    /// Per-instance state changes.
    #[serde(rename = "instancesSet")]
    pub instances: ItemSet<InstanceStateChange>,
}

// ============================================================================
// Errors
// ============================================================================

/// Error document returned with a non-2xx status.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    /// Errors reported by the service.
    #[serde(rename = "Errors")]
    pub errors: ErrorList,
    /// Request ID for support.
    #[serde(rename = "RequestID")]
    pub request_id: Option<String>,
}

/// Wrapper around the individual errors.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorList {
    /// Individual errors.
    #[serde(rename = "Error", default)]
    pub errors: Vec<ApiErrorDetail>,
}

/// A single EC2 error.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDetail {
    /// Error code, e.g. `InvalidKeyPair.Duplicate`.
    #[serde(rename = "Code")]
    pub code: String,
    /// Human readable message.
    #[serde(rename = "Message")]
    pub message: String,
}

/// AWS regions.
pub mod regions {
    /// EU (Ireland).
    pub const EU_WEST_1: &str = "eu-west-1";
}
