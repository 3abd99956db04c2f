//! BLAKE3 digest partitioner.

use crate::error::Result;
use crate::partitioner::traits::{Partitioner, RingPoint};
use crate::ring::position::normalise;
use async_trait::async_trait;

/// Partitioner backed by the BLAKE3 digest.
#[derive(Clone, Copy, Debug, Default)]
pub struct Blake3Partitioner;

impl Blake3Partitioner {
    /// Synchronous form of [`Partitioner::partition`]; BLAKE3 cannot fail.
    pub fn point_for(key: &str) -> RingPoint {
        let digest = blake3::hash(key.as_bytes());
        let bytes = digest.as_bytes();
        let prefix = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        RingPoint {
            position: normalise(prefix),
            display_hash: digest.to_hex().to_string(),
        }
    }
}

#[async_trait]
impl Partitioner for Blake3Partitioner {
    async fn partition(&self, key: &str) -> Result<RingPoint> {
        Ok(Self::point_for(key))
    }

    fn name(&self) -> &'static str {
        "Blake3Partitioner"
    }
}
