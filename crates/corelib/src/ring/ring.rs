//! Hash ring data structure.
//!
//! Holds the virtual nodes of every physical node sorted in ring order and
//! answers "which vnode is responsible for this position".

use crate::error::Result;
use crate::node::{Color, Node, NodeId};
use crate::partitioner::Partitioner;
use crate::ring::position::ring_distance;
use crate::vnode::VirtualNode;
use futures::future::try_join_all;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Vnodes per physical node when none is configured.
pub const DEFAULT_VNODES_PER_NODE: usize = 3;

/// A consistent hash ring: virtual nodes sorted by position.
///
/// # Example
///
/// ```rust
/// use corelib::{HashRing, NodeId, VirtualNode, Color};
///
/// let at = |owner: &str, position: f64| VirtualNode {
///     owner_id: NodeId::new(owner),
///     color: Color("#fff".into()),
///     position,
///     display_hash: String::new(),
///     vnode_index: 0,
/// };
/// let ring = HashRing::from_vnodes(vec![at("C", 0.9), at("A", 0.1), at("B", 0.5)]);
///
/// assert_eq!(ring.resolve(0.3).unwrap().owner_id.as_str(), "B");
/// assert_eq!(ring.resolve(0.5).unwrap().owner_id.as_str(), "B");
/// assert_eq!(ring.resolve(0.95).unwrap().owner_id.as_str(), "A");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HashRing {
    vnodes: Vec<VirtualNode>,
}

/// An arc of the ring and the node that owns it.
///
/// Keys in `(start, end]` route to the vnode at `end`, so the arc belongs to
/// the next node clockwise.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
    pub wraps_around: bool,
    pub owner_id: NodeId,
    pub color: Color,
}

impl Segment {
    /// Arc length as a fraction of the keyspace.
    pub fn len(&self) -> f64 {
        ring_distance(self.start, self.end)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0.0
    }
}

impl HashRing {
    /// Creates an empty ring.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a ring from vnodes in any order.
    pub fn from_vnodes(mut vnodes: Vec<VirtualNode>) -> Self {
        vnodes.sort_by(VirtualNode::ring_cmp);
        Self { vnodes }
    }

    /// Vnodes in ring order.
    pub fn vnodes(&self) -> &[VirtualNode] {
        &self.vnodes
    }

    /// Number of virtual nodes on the ring.
    pub fn len(&self) -> usize {
        self.vnodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vnodes.is_empty()
    }

    /// Distinct physical owners on the ring.
    pub fn owners(&self) -> BTreeSet<NodeId> {
        self.vnodes.iter().map(|v| v.owner_id.clone()).collect()
    }

    /// Number of distinct physical nodes on the ring.
    pub fn node_count(&self) -> usize {
        self.owners().len()
    }

    /// The vnode responsible for `position`: the first vnode clockwise whose
    /// position is `>= position`, wrapping to the first vnode when none is.
    ///
    /// Returns `None` only for an empty ring.
    ///
    /// # Performance
    /// - **Time**: O(log n) binary search over n vnodes
    pub fn resolve(&self, position: f64) -> Option<&VirtualNode> {
        let idx = self.vnodes.partition_point(|v| v.position < position);
        self.vnodes.get(idx).or_else(|| self.vnodes.first())
    }

    /// The vnode sitting exactly at `position`, if any.
    pub fn vnode_at(&self, position: f64) -> Option<&VirtualNode> {
        self.resolve(position).filter(|v| v.position == position)
    }

    /// The arcs between consecutive vnodes. Empty when fewer than two vnodes.
    pub fn segments(&self) -> Vec<Segment> {
        if self.vnodes.len() < 2 {
            return Vec::new();
        }

        self.vnodes
            .iter()
            .zip(self.vnodes.iter().cycle().skip(1))
            .map(|(current, next)| Segment {
                start: current.position,
                end: next.position,
                wraps_around: next.position < current.position,
                owner_id: next.owner_id.clone(),
                color: next.color.clone(),
            })
            .collect()
    }

    /// Fraction of the keyspace owned by each physical node.
    ///
    /// A ring with a single vnode gives its owner the whole keyspace.
    pub fn ownership(&self) -> BTreeMap<NodeId, f64> {
        let mut shares = BTreeMap::new();
        match self.vnodes.as_slice() {
            [] => {}
            [only] => {
                shares.insert(only.owner_id.clone(), 1.0);
            }
            _ => {
                for segment in self.segments() {
                    *shares.entry(segment.owner_id.clone()).or_insert(0.0) += segment.len();
                }
            }
        }
        shares
    }
}

/// Builder for a [`HashRing`] from physical nodes.
///
/// ```rust,no_run
/// # async fn demo() -> corelib::Result<()> {
/// use corelib::{Blake3Partitioner, Node, RingBuilder};
///
/// let ring = RingBuilder::new()
///     .with_vnodes(8)
///     .add_node(Node::from_ordinal(0))
///     .add_node(Node::from_ordinal(1))
///     .build(&Blake3Partitioner)
///     .await?;
/// assert_eq!(ring.len(), 16);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct RingBuilder {
    nodes: Vec<Node>,
    vnodes_per_node: usize,
}

impl Default for RingBuilder {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            vnodes_per_node: DEFAULT_VNODES_PER_NODE,
        }
    }
}

impl RingBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Vnodes per physical node. Zero still yields one vnode per node.
    pub fn with_vnodes(mut self, vnodes_per_node: usize) -> Self {
        self.vnodes_per_node = vnodes_per_node;
        self
    }

    pub fn add_node(mut self, node: Node) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn add_nodes(mut self, nodes: impl IntoIterator<Item = Node>) -> Self {
        self.nodes.extend(nodes);
        self
    }

    /// The vnode count actually used per node.
    pub fn effective_vnodes(&self) -> usize {
        self.vnodes_per_node.max(1)
    }

    /// Hashes every `(node, index)` pair concurrently and sorts the result.
    ///
    /// # Errors
    ///
    /// Fails with the first hashing error; a ring with missing vnodes would
    /// silently shift ownership.
    pub async fn build(self, partitioner: &dyn Partitioner) -> Result<HashRing> {
        let per_node = self.effective_vnodes();
        let pending = self.nodes.iter().flat_map(|node| {
            (0..per_node).map(move |index| VirtualNode::from_index(partitioner, node, index))
        });
        let vnodes = try_join_all(pending).await?;

        debug!(
            nodes = self.nodes.len(),
            vnodes = vnodes.len(),
            partitioner = partitioner.name(),
            "ring built"
        );
        Ok(HashRing::from_vnodes(vnodes))
    }
}

/// Builds the full ring for `nodes` with `vnodes_per_node` each.
pub async fn build_ring(
    nodes: &[Node],
    vnodes_per_node: usize,
    partitioner: &dyn Partitioner,
) -> Result<HashRing> {
    RingBuilder::new()
        .with_vnodes(vnodes_per_node)
        .add_nodes(nodes.iter().cloned())
        .build(partitioner)
        .await
}
