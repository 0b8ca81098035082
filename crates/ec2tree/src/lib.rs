//! Provision and tear down a tree of EC2 instances.
//!
//! A root instance gets `fanout` children, each of which gets `fanout`
//! children, down to `max_depth` levels below the root. Every node has
//! its own key pair.
//!
//! # Example
//!
//! ```rust,ignore
//! use ec2tree::providers::aws::{AwsCredentials, Ec2};
//! use ec2tree::{TreeConfig, TreeService};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = TreeConfig::default().with_shape(1, 2);
//!     let credentials = AwsCredentials::new(
//!         std::env::var("AWS_ACCESS_KEY_ID")?,
//!         std::env::var("AWS_SECRET_ACCESS_KEY")?,
//!     );
//!     let ec2 = Ec2::new(credentials, &config.region)?;
//!     let service = TreeService::new(ec2, config)?;
//!
//!     let root = service.create_tree().await?;
//!     println!("{}", root.render());
//!
//!     tokio::signal::ctrl_c().await?;
//!     service.delete_tree(&root).await?;
//!     Ok(())
//! }
//! ```

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod providers;
pub mod service;
pub mod tree;

pub use config::{ConfigError, TreeConfig};
pub use providers::{ComputeProvider, Ec2, Instance, InstanceStatus, KeyPair, ProviderError};
pub use service::{BuildError, BuildStep, TeardownError, TreeService};
pub use tree::{Node, NodePosition};
