//! Partitioner abstraction for consistent hashing.
//!
//! Partitioners are responsible for converting keys into normalised
//! positions that can be placed on the hash ring.

pub mod digest;
pub mod fixed;
pub mod traits;

pub use digest::Blake3Partitioner;
pub use fixed::FixedPartitioner;
pub use traits::{Partitioner, RingPoint};
