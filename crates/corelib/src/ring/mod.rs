//! Consistent hash ring implementation.
//!
//! The ring keeps virtual nodes in position order and provides the
//! "first node clockwise" lookup used to route requests.

pub mod position;
pub mod ring;

pub use position::{normalise, ring_distance};
pub use ring::{build_ring, HashRing, RingBuilder, Segment, DEFAULT_VNODES_PER_NODE};

/// Alias for the main ring type (used by lib.rs).
pub type Ring = HashRing;
