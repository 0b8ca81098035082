//! AWS EC2 compute provider.
//!
//! Implements the [`ComputeProvider`](crate::providers::ComputeProvider)
//! trait against the EC2 Query API.
//!
//! ## Actions used
//!
//! - **CreateKeyPair** / **DeleteKeyPair** - one key pair per tree node
//! - **RunInstances** - always a single instance (`MinCount = MaxCount = 1`)
//! - **TerminateInstances** - fire and forget, no waiting
//!
//! Requests are form-encoded `POST`s signed with Signature Version 4;
//! responses are XML.

mod client;
mod models;
mod sigv4;

pub use client::{AwsCredentials, Ec2};
pub use models::*;
