//! The provisioned node tree.
//!
//! Each [`Node`] exclusively owns its children, so the tree has no
//! sharing and no cycles. Traversals are depth-first, left-to-right,
//! parent before children.

use std::fmt::{self, Write as _};

use serde::{Deserialize, Serialize};

use crate::providers::{Instance, KeyPair};

/// Key pair name of the root node.
pub const ROOT_KEY_NAME: &str = "root";

/// Key pair name of a non-root node.
///
/// `depth` is the depth of the node's parent (the root is at depth 0) and
/// `ordinal` is the node's left-to-right position among every node created
/// at that level, so names never repeat within one tree.
#[must_use]
pub fn child_key_name(depth: u32, ordinal: u64) -> String {
    format!("child-{depth}-{ordinal}")
}

/// Where a node sits in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodePosition {
    /// The root node.
    Root,
    /// The `index`-th child of a parent at `depth`.
    Child { depth: u32, index: u32 },
}

impl fmt::Display for NodePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Root => write!(f, "root"),
            Self::Child { depth, index } => write!(f, "depth {depth}, child {index}"),
        }
    }
}

/// One provisioned instance, its key pair, and its children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// The instance backing this node.
    pub instance: Instance,
    /// The key pair dedicated to this node.
    pub key_pair: KeyPair,
    /// Children, in creation order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
}

impl Node {
    /// Create a leaf node.
    #[must_use]
    pub fn new(instance: Instance, key_pair: KeyPair) -> Self {
        Self {
            instance,
            key_pair,
            children: Vec::new(),
        }
    }

    /// Number of nodes in this subtree, including itself.
    #[must_use]
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(Node::node_count).sum::<usize>()
    }

    /// Number of levels below this node.
    #[must_use]
    pub fn height(&self) -> usize {
        self.children
            .iter()
            .map(|c| c.height() + 1)
            .max()
            .unwrap_or(0)
    }

    /// Iterate the subtree in teardown order: parent first, then each
    /// child subtree left-to-right.
    #[must_use]
    pub fn iter(&self) -> PreOrder<'_> {
        PreOrder { stack: vec![self] }
    }

    /// Render the subtree, one line per node, indented by depth.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out, 0);
        out
    }

    fn render_into(&self, out: &mut String, level: usize) {
        let _ = write!(
            out,
            "{:indent$}{} {} ({}, {})",
            "",
            self.key_pair.name,
            self.instance.id,
            self.instance.instance_type,
            self.instance.status,
            indent = level * 2
        );
        if let Some(ip) = &self.instance.private_ip {
            let _ = write!(out, " {ip}");
        }
        out.push('\n');

        for child in &self.children {
            child.render_into(out, level + 1);
        }
    }
}

impl<'a> IntoIterator for &'a Node {
    type Item = &'a Node;
    type IntoIter = PreOrder<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Pre-order iterator over a [`Node`] subtree.
#[derive(Debug)]
pub struct PreOrder<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> Iterator for PreOrder<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}
