//! Short-lived hit markers where requests landed.
//!
//! Markers run on wall-clock time passed in by the caller, not on simulation
//! ticks, so they keep fading while the simulation is paused.

use serde::Serialize;
use std::collections::VecDeque;

/// How long a hit stays visible, in milliseconds.
pub const HIT_LIFETIME_MS: f64 = 5_000.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hit {
    pub id: u64,
    pub position: f64,
    pub completed_at: f64,
}

impl Hit {
    pub fn expires_at(&self) -> f64 {
        self.completed_at + HIT_LIFETIME_MS
    }

    pub fn is_expired(&self, now: f64) -> bool {
        now >= self.expires_at()
    }
}

/// Hits in insertion order. Insert times are expected to be non-decreasing.
#[derive(Debug, Clone, Default)]
pub struct HitTracker {
    hits: VecDeque<Hit>,
    next_id: u64,
}

impl HitTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, position: f64, now: f64) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.hits.push_back(Hit {
            id,
            position,
            completed_at: now,
        });
        id
    }

    /// Drops expired hits and returns how many went.
    pub fn expire(&mut self, now: f64) -> usize {
        let before = self.hits.len();
        while self.hits.front().is_some_and(|hit| hit.is_expired(now)) {
            self.hits.pop_front();
        }
        before - self.hits.len()
    }

    /// Hits still visible at `now`.
    pub fn active(&self, now: f64) -> impl Iterator<Item = &Hit> + '_ {
        self.hits.iter().filter(move |hit| !hit.is_expired(now))
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn clear(&mut self) {
        self.hits.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hits_expire_after_lifetime() {
        let mut hits = HitTracker::new();
        hits.record(0.2, 0.0);
        hits.record(0.4, 1_000.0);

        assert_eq!(hits.active(4_999.0).count(), 2);
        assert_eq!(hits.active(5_000.0).count(), 1);
        assert_eq!(hits.expire(5_500.0), 1);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits.expire(6_000.0), 1);
        assert!(hits.is_empty());
    }

    #[test]
    fn test_ids_are_unique() {
        let mut hits = HitTracker::new();
        let a = hits.record(0.1, 0.0);
        hits.clear();
        let b = hits.record(0.1, 0.0);
        assert_ne!(a, b);
    }
}
