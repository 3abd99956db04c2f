//! Core partitioner trait definitions.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Where a key lands on the ring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RingPoint {
    /// Normalised position, `digest[0..4] as u32 / 0xFFFF_FFFF`.
    pub position: f64,
    /// Opaque digest rendering for display.
    pub display_hash: String,
}

/// A partitioner converts keys into ring points.
///
/// Partitioners are stateless and must be deterministic: the same key yields
/// the same point on every call, run and platform. Hashing is asynchronous so
/// that ring and request construction can fan many keys out concurrently.
#[async_trait]
pub trait Partitioner: Send + Sync + 'static {
    /// Converts a key into a ring point.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Hashing`](crate::Error::Hashing) when the underlying
    /// digest primitive fails for this key.
    async fn partition(&self, key: &str) -> Result<RingPoint>;

    /// Returns the name of this partitioner.
    fn name(&self) -> &'static str;
}
