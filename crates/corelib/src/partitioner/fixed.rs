//! Map-backed partitioner for hand-placed ring layouts.

use crate::error::{Error, Result};
use crate::partitioner::traits::{Partitioner, RingPoint};
use async_trait::async_trait;
use std::collections::HashMap;

/// Partitioner that looks keys up in a fixed table.
///
/// Unknown keys fail with [`Error::Hashing`], which makes it useful for
/// exercising partial-failure paths as well as exact ring layouts.
#[derive(Clone, Debug, Default)]
pub struct FixedPartitioner {
    points: HashMap<String, f64>,
}

impl FixedPartitioner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_point(mut self, key: impl Into<String>, position: f64) -> Self {
        self.insert(key, position);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, position: f64) {
        self.points.insert(key.into(), position);
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for FixedPartitioner {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        Self {
            points: iter.into_iter().map(|(k, p)| (k.into(), p)).collect(),
        }
    }
}

#[async_trait]
impl Partitioner for FixedPartitioner {
    async fn partition(&self, key: &str) -> Result<RingPoint> {
        match self.points.get(key) {
            Some(&position) => Ok(RingPoint {
                position,
                display_hash: format!("fixed:{key}"),
            }),
            None => Err(Error::hashing(key, "no fixed position")),
        }
    }

    fn name(&self) -> &'static str {
        "FixedPartitioner"
    }
}
