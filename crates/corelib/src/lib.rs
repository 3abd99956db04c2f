//! Core library for the consistent hashing simulation.
//!
//! This crate provides the ring-side building blocks:
//! - Partitioners that place keys on the unit ring
//! - Physical and virtual node abstractions
//! - Ring construction and "first node clockwise" routing
//! - The mutable topology (node set, vnode count)
//! - Seeded synthetic request generation

pub mod error;
pub mod node;
pub mod partitioner;
pub mod requests;
pub mod ring;
pub mod topology;
pub mod vnode;

pub use error::{Error, Result};
pub use node::{Color, Node, NodeId};
pub use partitioner::{Blake3Partitioner, FixedPartitioner, Partitioner, RingPoint};
pub use requests::{Request, RequestGenerator};
pub use ring::{HashRing, Ring, RingBuilder, Segment};
pub use topology::{Topology, TopologyChange};
pub use vnode::VirtualNode;
