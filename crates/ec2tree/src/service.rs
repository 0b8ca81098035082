//! Tree provisioning service.
//!
//! Builds a tree of instances depth-first, left-to-right, one key pair per
//! node, and tears it down parent-first. Every remote call is awaited
//! before the next one starts. Neither operation retries or rolls back:
//! the first failure aborts the whole operation.

use futures::future::BoxFuture;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::{ConfigError, TreeConfig};
use crate::providers::{ComputeProvider, ProviderError, RunInstanceRequest};
use crate::tree::{child_key_name, Node, NodePosition, ROOT_KEY_NAME};

/// Which remote call of a node's creation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStep {
    /// `CreateKeyPair`.
    KeyPair,
    /// `RunInstances`.
    Instance,
}

impl std::fmt::Display for BuildStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::KeyPair => write!(f, "key pair"),
            Self::Instance => write!(f, "instance"),
        }
    }
}

/// Tree creation failed.
///
/// Carries the tree built before the failure. Nothing in it has been
/// cleaned up.
#[derive(Error, Debug)]
#[error("failed to create {step} for node {key_name} at {position}: {source}")]
pub struct BuildError {
    /// Position of the node being created.
    pub position: NodePosition,
    /// The call that failed.
    pub step: BuildStep,
    /// Key pair name of the node being created.
    pub key_name: String,
    /// Provider error.
    pub source: ProviderError,
    /// Root of the partial tree. `None` when the root itself failed.
    pub partial: Option<Box<Node>>,
}

impl BuildError {
    fn new(
        position: NodePosition,
        step: BuildStep,
        key_name: &str,
        source: ProviderError,
    ) -> Self {
        Self {
            position,
            step,
            key_name: key_name.to_string(),
            source,
            partial: None,
        }
    }

    /// The partial tree, if the root was created.
    #[must_use]
    pub fn partial(&self) -> Option<&Node> {
        self.partial.as_deref()
    }

    /// Take ownership of the partial tree.
    #[must_use]
    pub fn into_partial(self) -> Option<Node> {
        self.partial.map(|node| *node)
    }

    /// Key pair created for the failing node but not attached to any
    /// node, because its instance failed to launch.
    #[must_use]
    pub fn orphaned_key(&self) -> Option<&str> {
        match self.step {
            BuildStep::Instance => Some(&self.key_name),
            BuildStep::KeyPair => None,
        }
    }
}

/// Tree teardown failed. Nodes after the failing one in teardown order
/// were not touched.
#[derive(Error, Debug)]
pub enum TeardownError {
    /// `TerminateInstances` failed.
    #[error("failed to terminate instance {instance_id}: {source}")]
    TerminateInstance {
        instance_id: String,
        source: ProviderError,
    },

    /// `DeleteKeyPair` failed.
    #[error("failed to delete key pair {key_name}: {source}")]
    DeleteKeyPair {
        key_name: String,
        source: ProviderError,
    },
}

impl TeardownError {
    /// Instance id or key pair name the failing call targeted.
    #[must_use]
    pub fn resource_id(&self) -> &str {
        match self {
            Self::TerminateInstance { instance_id, .. } => instance_id,
            Self::DeleteKeyPair { key_name, .. } => key_name,
        }
    }
}

/// Provisions and tears down instance trees on a [`ComputeProvider`].
pub struct TreeService<P> {
    provider: P,
    config: TreeConfig,
}

impl<P: ComputeProvider> TreeService<P> {
    /// Create a new service.
    ///
    /// # Errors
    /// Returns error if the configuration is invalid.
    pub fn new(provider: P, config: TreeConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { provider, config })
    }

    /// The configuration this service provisions.
    #[must_use]
    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// The underlying provider.
    #[must_use]
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Provision the whole tree.
    ///
    /// Creates the `root` key pair and instance, then fills in children
    /// depth-first, left-to-right, until `max_depth`.
    ///
    /// # Errors
    /// Returns [`BuildError`] on the first failed remote call. Resources
    /// created before it stay live and are reachable via
    /// [`BuildError::partial`].
    pub async fn create_tree(&self) -> Result<Node, BuildError> {
        info!(
            max_depth = self.config.max_depth,
            fanout = self.config.fanout,
            nodes = ?self.config.expected_nodes(),
            "Creating tree"
        );

        let mut root = self.create_node(ROOT_KEY_NAME, NodePosition::Root).await?;

        if let Err(mut err) = self.populate(&mut root, 0, 0).await {
            err.partial = Some(Box::new(root));
            return Err(err);
        }

        info!(nodes = root.node_count(), "Tree created");
        Ok(root)
    }

    /// Tear down a tree.
    ///
    /// For each node: terminate its instance, delete its key pair, then
    /// visit its children left-to-right. Parents go before their children.
    ///
    /// # Errors
    /// Returns [`TeardownError`] on the first failed remote call; the rest
    /// of the traversal is skipped.
    pub async fn delete_tree(&self, root: &Node) -> Result<(), TeardownError> {
        info!(nodes = root.node_count(), "Deleting tree");

        for node in root {
            let instance_id = &node.instance.id;
            let key_name = &node.key_pair.name;

            self.provider
                .terminate_instance(instance_id)
                .await
                .map_err(|source| TeardownError::TerminateInstance {
                    instance_id: instance_id.clone(),
                    source,
                })?;

            self.provider
                .delete_key_pair(key_name)
                .await
                .map_err(|source| TeardownError::DeleteKeyPair {
                    key_name: key_name.clone(),
                    source,
                })?;

            debug!(instance_id = %instance_id, key_name = %key_name, "Node deleted");
        }

        info!("Tree deleted");
        Ok(())
    }

    /// Create the key pair and instance for one node.
    async fn create_node(
        &self,
        key_name: &str,
        position: NodePosition,
    ) -> Result<Node, BuildError> {
        let key_pair = self
            .provider
            .create_key_pair(key_name)
            .await
            .map_err(|e| BuildError::new(position, BuildStep::KeyPair, key_name, e))?;

        let instance = self
            .provider
            .run_instance(RunInstanceRequest {
                image_id: self.config.image_id.clone(),
                instance_type: self.config.instance_type.clone(),
                key_name: key_pair.name.clone(),
            })
            .await
            .map_err(|e| BuildError::new(position, BuildStep::Instance, key_name, e))?;

        info!(
            position = %position,
            key_name = %key_pair.name,
            instance_id = %instance.id,
            "Node created"
        );

        Ok(Node::new(instance, key_pair))
    }

    /// Append `fanout` children to `parent` and recurse into each one
    /// before creating the next.
    fn populate<'a>(
        &'a self,
        parent: &'a mut Node,
        depth: u32,
        parent_ordinal: u64,
    ) -> BoxFuture<'a, Result<(), BuildError>> {
        Box::pin(async move {
            if depth >= self.config.max_depth {
                return Ok(());
            }

            let fanout = self.config.fanout;
            for index in 0..fanout {
                let ordinal = parent_ordinal * u64::from(fanout) + u64::from(index);
                let key_name = child_key_name(depth, ordinal);

                let child = self
                    .create_node(&key_name, NodePosition::Child { depth, index })
                    .await?;

                parent.children.push(child);
                let slot = parent.children.len() - 1;
                self.populate(&mut parent.children[slot], depth + 1, ordinal)
                    .await?;
            }

            Ok(())
        })
    }
}
