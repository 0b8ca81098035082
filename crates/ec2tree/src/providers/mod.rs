//! Compute provider abstractions.
//!
//! This module defines the provider trait the tree service drives and
//! the EC2 implementation of it.

pub mod aws;
mod traits;

pub use traits::{
    ComputeProvider, Instance, InstanceStatus, KeyPair, ProviderError, RunInstanceRequest,
};

pub use aws::Ec2;
