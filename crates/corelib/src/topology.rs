//! Ring topology: the physical node set and the vnode count.
//!
//! Every mutation returns a [`TopologyChange`] describing what happened; the
//! caller decides when to rebuild the ring with [`Topology::build_ring`].
//! There is no incremental update, a rebuild rehashes every vnode.

use crate::error::{Error, Result};
use crate::node::{Node, NodeId};
use crate::partitioner::Partitioner;
use crate::ring::{build_ring, HashRing, DEFAULT_VNODES_PER_NODE};
use serde::Serialize;
use tracing::{info, warn};

/// Number of physical nodes a fresh topology starts with.
pub const INITIAL_NODE_COUNT: usize = 2;

/// What a topology mutation did.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "change", rename_all = "snake_case")]
pub enum TopologyChange {
    NodeAdded(Node),
    NodeRemoved(NodeId),
    VnodeCountChanged(usize),
    Reset { nodes: Vec<Node> },
}

/// Physical nodes plus the per-node vnode count.
///
/// # Invariants
///
/// - At least one physical node exists at all times
/// - Node ids are unique
#[derive(Debug, Clone, PartialEq)]
pub struct Topology {
    nodes: Vec<Node>,
    vnodes_per_node: usize,
    initial_vnodes_per_node: usize,
}

impl Default for Topology {
    fn default() -> Self {
        Self::with_vnodes_per_node(DEFAULT_VNODES_PER_NODE)
    }
}

fn initial_nodes() -> Vec<Node> {
    (0..INITIAL_NODE_COUNT).map(Node::from_ordinal).collect()
}

impl Topology {
    /// `Node A` and `Node B` with `vnodes_per_node` each. [`Topology::reset`]
    /// returns to this state.
    pub fn with_vnodes_per_node(vnodes_per_node: usize) -> Self {
        Self {
            nodes: initial_nodes(),
            vnodes_per_node,
            initial_vnodes_per_node: vnodes_per_node,
        }
    }

    /// A topology over an explicit node set.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidNode`] when `nodes` is empty or contains duplicate ids.
    pub fn new(nodes: Vec<Node>, vnodes_per_node: usize) -> Result<Self> {
        if nodes.is_empty() {
            return Err(Error::InvalidNode("topology needs at least one node".into()));
        }
        for (i, node) in nodes.iter().enumerate() {
            if nodes[..i].iter().any(|n| n.id == node.id) {
                return Err(Error::InvalidNode(format!("duplicate node id {}", node.id)));
            }
        }
        Ok(Self {
            nodes,
            vnodes_per_node,
            initial_vnodes_per_node: vnodes_per_node,
        })
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    /// The configured vnode count, possibly zero.
    pub fn vnodes_per_node(&self) -> usize {
        self.vnodes_per_node
    }

    /// The vnode count the ring is built with (never below one).
    pub fn effective_vnodes_per_node(&self) -> usize {
        self.vnodes_per_node.max(1)
    }

    /// Adds the first node whose ordinal name is free (`Node A`, `Node B`, ...).
    pub fn add_node(&mut self) -> TopologyChange {
        let ordinal = (0..)
            .find(|&i| self.node(&NodeId::from_ordinal(i)).is_none())
            .unwrap_or(self.nodes.len());
        let node = Node::from_ordinal(ordinal);

        info!(node = %node.id, color = %node.color, "node added");
        self.nodes.push(node.clone());
        TopologyChange::NodeAdded(node)
    }

    /// Removes a node. Declines (returns `None`) for unknown ids and for the
    /// last remaining node.
    pub fn remove_node(&mut self, id: &NodeId) -> Option<TopologyChange> {
        if self.nodes.len() == 1 {
            warn!(node = %id, "refusing to remove the last node");
            return None;
        }
        let idx = self.nodes.iter().position(|n| &n.id == id)?;
        self.nodes.remove(idx);

        info!(node = %id, remaining = self.nodes.len(), "node removed");
        Some(TopologyChange::NodeRemoved(id.clone()))
    }

    pub fn set_vnodes_per_node(&mut self, count: usize) -> TopologyChange {
        info!(from = self.vnodes_per_node, to = count, "vnode count changed");
        self.vnodes_per_node = count;
        TopologyChange::VnodeCountChanged(count)
    }

    /// Back to `Node A` + `Node B` and the initial vnode count.
    pub fn reset(&mut self) -> TopologyChange {
        self.nodes = initial_nodes();
        self.vnodes_per_node = self.initial_vnodes_per_node;
        info!("topology reset");
        TopologyChange::Reset {
            nodes: self.nodes.clone(),
        }
    }

    /// Rebuilds the whole ring for the current node set.
    pub async fn build_ring(&self, partitioner: &dyn Partitioner) -> Result<HashRing> {
        build_ring(&self.nodes, self.vnodes_per_node, partitioner).await
    }
}
