//! Integration tests for ring construction and routing.
//!
//! # Test Strategy
//!
//! 1. **Basic functionality**: Empty ring, build, resolve
//! 2. **Determinism**: Same nodes and vnode count give the same ring
//! 3. **Edge cases**: Wraparound, single node, zero vnodes, exact boundaries
//! 4. **Topology changes**: Add/remove nodes move only nearby keys

use corelib::partitioner::{Blake3Partitioner, FixedPartitioner};
use corelib::ring::{build_ring, HashRing, RingBuilder};
use corelib::{Node, NodeId, Topology};

fn two_nodes() -> Vec<Node> {
    vec![Node::from_ordinal(0), Node::from_ordinal(1)]
}

/// Three nodes, five vnodes each: A below B below C.
fn layout() -> FixedPartitioner {
    let mut partitioner = FixedPartitioner::new();
    for (owner, base) in [("Node A", 0.1), ("Node B", 0.4), ("Node C", 0.7)] {
        for i in 0..5 {
            partitioner.insert(format!("{owner}-v{i}"), base + 0.05 * i as f64);
        }
    }
    partitioner
}

// ============================================================================
// Basic Functionality Tests
// ============================================================================

#[test]
fn test_empty_ring_lookup() {
    let ring = HashRing::new();
    assert!(ring.resolve(0.3).is_none());
    assert!(ring.vnode_at(0.3).is_none());
    assert_eq!(ring.len(), 0);
    assert_eq!(ring.node_count(), 0);
}

#[tokio::test]
async fn test_build_and_resolve() {
    let ring = RingBuilder::new()
        .with_vnodes(4)
        .add_nodes(two_nodes())
        .build(&Blake3Partitioner)
        .await
        .unwrap();

    assert_eq!(ring.len(), 8);
    assert_eq!(ring.node_count(), 2);

    // Sorted ascending by position
    let positions: Vec<f64> = ring.vnodes().iter().map(|v| v.position).collect();
    assert!(positions.windows(2).all(|w| w[0] <= w[1]));

    let target = ring.resolve(0.5).expect("non-empty ring resolves");
    assert!(target.owner_id == NodeId::new("Node A") || target.owner_id == NodeId::new("Node B"));
}

#[tokio::test]
async fn test_fixed_layout_positions() {
    let topology = Topology::new(
        vec![Node::from_ordinal(0), Node::from_ordinal(1), Node::from_ordinal(2)],
        5,
    )
    .unwrap();
    let ring = topology.build_ring(&layout()).await.unwrap();

    assert_eq!(ring.len(), 15);
    assert_eq!(ring.vnodes()[0].owner_id.as_str(), "Node A");
    assert_eq!(ring.vnodes()[0].vnode_index, 0);
    assert_eq!(ring.vnodes()[14].owner_id.as_str(), "Node C");

    // 0.32 sits between A-v4 (0.3) and B-v0 (0.4)
    let target = ring.resolve(0.32).unwrap();
    assert_eq!(target.owner_id.as_str(), "Node B");
    assert_eq!(target.vnode_index, 0);
}

// ============================================================================
// Determinism Tests
// ============================================================================

#[tokio::test]
async fn test_ring_is_deterministic() {
    let first = build_ring(&two_nodes(), 6, &Blake3Partitioner).await.unwrap();
    let second = build_ring(&two_nodes(), 6, &Blake3Partitioner).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_node_order_does_not_matter() {
    let mut reversed = two_nodes();
    reversed.reverse();
    let a = build_ring(&two_nodes(), 6, &Blake3Partitioner).await.unwrap();
    let b = build_ring(&reversed, 6, &Blake3Partitioner).await.unwrap();
    assert_eq!(a, b);
}

// ============================================================================
// Edge Cases
// ============================================================================

#[tokio::test]
async fn test_zero_vnodes_builds_one_per_node() {
    let ring = build_ring(&two_nodes(), 0, &Blake3Partitioner).await.unwrap();
    assert_eq!(ring.len(), 2);
    assert_eq!(ring.node_count(), 2);
}

#[tokio::test]
async fn test_single_node_owns_everything() {
    let ring = build_ring(&[Node::from_ordinal(0)], 4, &Blake3Partitioner)
        .await
        .unwrap();
    for p in [0.0, 0.25, 0.5, 0.75, 0.999_999] {
        assert_eq!(ring.resolve(p).unwrap().owner_id.as_str(), "Node A");
    }
    let shares = ring.ownership();
    assert!((shares[&NodeId::new("Node A")] - 1.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_wraparound_to_lowest_vnode() {
    let ring = build_ring(&two_nodes(), 4, &Blake3Partitioner).await.unwrap();
    let last = ring.vnodes().last().unwrap().position;
    let wrapped = ring.resolve((last + 1.0) / 2.0).unwrap();
    assert_eq!(wrapped, &ring.vnodes()[0]);
}

#[tokio::test]
async fn test_missing_vnode_hash_fails_build() {
    // Knows Node A but not Node B.
    let partitioner = FixedPartitioner::new().with_point("Node A-v0", 0.2);
    let result = build_ring(&two_nodes(), 1, &partitioner).await;
    assert!(result.is_err());
}

// ============================================================================
// Topology Change Tests
// ============================================================================

#[tokio::test]
async fn test_adding_node_only_moves_keys_to_it() {
    let mut topology = Topology::with_vnodes_per_node(8);
    let before = topology.build_ring(&Blake3Partitioner).await.unwrap();
    topology.add_node();
    let after = topology.build_ring(&Blake3Partitioner).await.unwrap();

    for i in 0..500 {
        let p = i as f64 / 500.0;
        let old_owner = &before.resolve(p).unwrap().owner_id;
        let new_owner = &after.resolve(p).unwrap().owner_id;
        if old_owner != new_owner {
            assert_eq!(new_owner.as_str(), "Node C", "keys only move to the new node");
        }
    }
}

#[tokio::test]
async fn test_removing_node_only_moves_its_keys() {
    let mut topology = Topology::with_vnodes_per_node(8);
    topology.add_node();
    let before = topology.build_ring(&Blake3Partitioner).await.unwrap();
    topology.remove_node(&NodeId::new("Node B")).unwrap();
    let after = topology.build_ring(&Blake3Partitioner).await.unwrap();

    assert!(!after.owners().contains(&NodeId::new("Node B")));
    for i in 0..500 {
        let p = i as f64 / 500.0;
        let old_owner = &before.resolve(p).unwrap().owner_id;
        if old_owner.as_str() != "Node B" {
            assert_eq!(&after.resolve(p).unwrap().owner_id, old_owner);
        }
    }
}
