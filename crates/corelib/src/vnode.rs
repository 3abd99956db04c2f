//! Virtual node abstractions.
//!
//! # Virtual Nodes (VNodes) Concept
//!
//! Instead of each physical node having a single point on the ring, each node
//! has several points (virtual nodes). More points smooth out the share of
//! the keyspace each physical node owns, and when a node joins or leaves only
//! the arcs next to its points change hands.
//!
//! A virtual node is derived entirely from `(physical node, vnode index)`:
//! the key `"{node id}-v{index}"` is fed to the partitioner, so the same
//! node set and vnode count always produce the same ring.

use crate::error::Result;
use crate::node::{Color, Node, NodeId};
use crate::partitioner::Partitioner;
use crate::ring::position::ring_distance;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A virtual node on the hash ring.
///
/// # Invariants
///
/// - Every `VirtualNode` belongs to exactly one physical node (`owner_id`)
/// - `position` is the partitioner's output for [`VirtualNode::key_for`]
///   of `(owner_id, vnode_index)`
/// - Two vnodes of different owners may share a position; ring order then
///   falls back to `(owner_id, vnode_index)`, see [`VirtualNode::ring_cmp`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirtualNode {
    /// The physical node that owns this virtual node.
    pub owner_id: NodeId,

    /// Display colour copied from the owner.
    pub color: Color,

    /// Position on the ring in `[0, 1]`.
    pub position: f64,

    /// Opaque digest rendering, for tooltips.
    pub display_hash: String,

    /// The index of this vnode among its owner's vnodes (0, 1, 2, ...).
    pub vnode_index: usize,
}

impl VirtualNode {
    /// The partitioner key for vnode `vnode_index` of `owner`.
    ///
    /// # Example
    /// ```rust
    /// use corelib::{NodeId, VirtualNode};
    ///
    /// assert_eq!(VirtualNode::key_for(&NodeId::new("Node A"), 2), "Node A-v2");
    /// ```
    pub fn key_for(owner: &NodeId, vnode_index: usize) -> String {
        format!("{}-v{}", owner, vnode_index)
    }

    /// Create a virtual node from a physical node and vnode index.
    ///
    /// # Algorithm
    ///
    /// 1. Format the key: `"{node id}-v{vnode_index}"`
    /// 2. Hash the key with the partitioner to get a ring point
    /// 3. Copy the owner's id and colour onto the vnode
    ///
    /// # Errors
    ///
    /// Propagates the partitioner's hashing failure.
    pub async fn from_index(
        partitioner: &dyn Partitioner,
        node: &Node,
        vnode_index: usize,
    ) -> Result<Self> {
        let key = Self::key_for(&node.id, vnode_index);
        let point = partitioner.partition(&key).await?;

        Ok(Self {
            owner_id: node.id.clone(),
            color: node.color.clone(),
            position: point.position,
            display_hash: point.display_hash,
            vnode_index,
        })
    }

    /// The partitioner key this vnode was derived from.
    pub fn key(&self) -> String {
        Self::key_for(&self.owner_id, self.vnode_index)
    }

    /// True when both refer to the same `(owner, index)` slot.
    #[inline]
    pub fn same_slot(&self, other: &Self) -> bool {
        self.vnode_index == other.vnode_index && self.owner_id == other.owner_id
    }

    /// Clockwise distance to another virtual node.
    #[inline]
    pub fn distance_to(&self, other: &Self) -> f64 {
        ring_distance(self.position, other.position)
    }

    /// Ring order: by position, ties broken by owner id then vnode index.
    pub fn ring_cmp(&self, other: &Self) -> Ordering {
        self.position
            .total_cmp(&other.position)
            .then_with(|| self.owner_id.cmp(&other.owner_id))
            .then_with(|| self.vnode_index.cmp(&other.vnode_index))
    }
}

impl std::fmt::Display for VirtualNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "VNode(pos={:.6}, node={}, v={})",
            self.position, self.owner_id, self.vnode_index
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partitioner::{Blake3Partitioner, FixedPartitioner};

    fn vnode(owner: &str, index: usize, position: f64) -> VirtualNode {
        VirtualNode {
            owner_id: NodeId::new(owner),
            color: Color("#fff".into()),
            position,
            display_hash: String::new(),
            vnode_index: index,
        }
    }

    #[tokio::test]
    async fn test_vnode_from_index() {
        let node = Node::from_ordinal(0);
        let v0 = VirtualNode::from_index(&Blake3Partitioner, &node, 0).await.unwrap();
        let v1 = VirtualNode::from_index(&Blake3Partitioner, &node, 1).await.unwrap();

        // Different positions, same owner
        assert_ne!(v0.position, v1.position);
        assert_eq!(v0.owner_id, v1.owner_id);
        assert_eq!(v0.color, node.color);
        assert_eq!(v1.key(), "Node A-v1");
    }

    #[tokio::test]
    async fn test_vnode_hashing_failure_propagates() {
        let node = Node::from_ordinal(0);
        let result = VirtualNode::from_index(&FixedPartitioner::new(), &node, 0).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_vnode_distance() {
        let a = vnode("Node A", 0, 0.8);
        let b = vnode("Node B", 0, 0.2);
        assert!((a.distance_to(&b) - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_ring_order_tie_break() {
        let a = vnode("Node A", 1, 0.5);
        let b = vnode("Node B", 0, 0.5);
        let c = vnode("Node A", 0, 0.5);
        assert_eq!(a.ring_cmp(&b), Ordering::Less);
        assert_eq!(c.ring_cmp(&a), Ordering::Less);
        assert_eq!(vnode("Node Z", 9, 0.1).ring_cmp(&c), Ordering::Less);
    }
}
