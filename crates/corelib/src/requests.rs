//! Seeded synthetic request generation.
//!
//! Request keys are `user_id_DDDD`, the digits drawn from a seeded PRNG, and
//! each key is placed on the ring with the partitioner. The generator keeps
//! a background cache that only ever grows; the active request set is the
//! first `num_requests` entries of it. Growing draws only the missing keys,
//! so earlier requests keep their positions. Reseeding discards the cache.

use crate::partitioner::Partitioner;
use futures::future::join_all;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Active request count of a fresh generator.
pub const INITIAL_NUM_REQUESTS: usize = 5;

/// Seed used when none is configured.
pub const DEFAULT_SEED: u64 = 1000;

const KEY_PREFIX: &str = "user_id_";
const KEY_DIGITS: usize = 4;

/// A synthetic request and where it lands on the ring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub key: String,
    pub position: f64,
}

/// Draws the next request key from `rng`.
fn next_key(rng: &mut StdRng) -> String {
    let digits: String = (0..KEY_DIGITS)
        .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
        .collect();
    format!("{KEY_PREFIX}{digits}")
}

/// Appends requests to `cache` until it holds `target` entries.
///
/// Keys are drawn sequentially, then hashed concurrently. A key whose hash
/// fails is dropped and the rest are kept, so the cache may end up short.
pub async fn grow_to(
    cache: &mut Vec<Request>,
    target: usize,
    rng: &mut StdRng,
    partitioner: &dyn Partitioner,
) {
    let missing = target.saturating_sub(cache.len());
    if missing == 0 {
        return;
    }

    let keys: Vec<String> = (0..missing).map(|_| next_key(rng)).collect();
    let points = join_all(keys.iter().map(|key| partitioner.partition(key))).await;

    let before = cache.len();
    for (key, point) in keys.into_iter().zip(points) {
        match point {
            Ok(point) => cache.push(Request {
                key,
                position: point.position,
            }),
            Err(err) => warn!(%key, error = %err, "dropping request that failed to hash"),
        }
    }
    debug!(added = cache.len() - before, requested = missing, "request cache grown");
}

/// Reproducible request source.
#[derive(Debug, Clone)]
pub struct RequestGenerator {
    seed: u64,
    rng: StdRng,
    cache: Vec<Request>,
    num_requests: usize,
    initial_num_requests: usize,
}

impl RequestGenerator {
    /// An empty generator; nothing is hashed until the first grow.
    pub fn new(seed: u64, num_requests: usize) -> Self {
        Self {
            seed,
            rng: StdRng::seed_from_u64(seed),
            cache: Vec::new(),
            num_requests,
            initial_num_requests: num_requests,
        }
    }

    /// A generator already filled to `count` requests.
    pub async fn generate(count: usize, seed: u64, partitioner: &dyn Partitioner) -> Self {
        let mut generator = Self::new(seed, count);
        generator.fill(partitioner).await;
        generator
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn num_requests(&self) -> usize {
        self.num_requests
    }

    /// The active request set.
    pub fn requests(&self) -> &[Request] {
        &self.cache[..self.num_requests.min(self.cache.len())]
    }

    /// Everything generated so far, including entries beyond `num_requests`.
    pub fn background(&self) -> &[Request] {
        &self.cache
    }

    /// Tops the background cache up to the active count.
    pub async fn fill(&mut self, partitioner: &dyn Partitioner) {
        grow_to(&mut self.cache, self.num_requests, &mut self.rng, partitioner).await;
    }

    /// Changes the active count. Growing only draws the delta; shrinking
    /// keeps the background cache so a later grow reuses it.
    pub async fn set_num_requests(&mut self, count: usize, partitioner: &dyn Partitioner) {
        self.num_requests = count;
        self.fill(partitioner).await;
    }

    /// Discards the cache and regenerates from position 0 with `seed`.
    pub async fn reseed(&mut self, seed: u64, partitioner: &dyn Partitioner) {
        self.seed = seed;
        self.rng = StdRng::seed_from_u64(seed);
        self.cache.clear();
        self.fill(partitioner).await;
    }

    /// Back to the initial active count. The PRNG stream carries on, so the
    /// regenerated set differs from the first one unless reseeded.
    pub async fn reset(&mut self, partitioner: &dyn Partitioner) {
        self.num_requests = self.initial_num_requests;
        self.cache.clear();
        self.fill(partitioner).await;
    }
}
