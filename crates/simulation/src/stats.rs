//! Per-node completion counts and load imbalance.

use corelib::NodeId;
use metrics::{counter, describe_counter, describe_gauge, gauge};
use serde::Serialize;
use std::collections::BTreeMap;

const COMPLETED_METRIC: &str = "ringsim_requests_completed_total";
const IMBALANCE_METRIC: &str = "ringsim_load_imbalance_percent";

/// Registers metric descriptions with whatever recorder the host installed.
pub fn describe_metrics() {
    describe_counter!(COMPLETED_METRIC, "Requests completed, per physical node");
    describe_gauge!(
        IMBALANCE_METRIC,
        "Coefficient of variation of per-node completions, in percent"
    );
}

/// Population coefficient of variation of `counts`, in percent.
///
/// Zero for fewer than two values and for an all-zero set.
///
/// ```rust
/// use simulation::stats::coefficient_of_variation;
///
/// assert_eq!(coefficient_of_variation([10, 30]), 50.0);
/// assert_eq!(coefficient_of_variation([10, 10]), 0.0);
/// assert_eq!(coefficient_of_variation([10]), 0.0);
/// ```
pub fn coefficient_of_variation(counts: impl IntoIterator<Item = u64>) -> f64 {
    let values: Vec<f64> = counts.into_iter().map(|c| c as f64).collect();
    if values.len() < 2 {
        return 0.0;
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    if mean == 0.0 {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt() / mean * 100.0
}

/// Completed request counts per physical node.
///
/// Only nodes that completed at least one request appear; a node that was
/// never hit does not drag the mean down.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatsTracker {
    counts: BTreeMap<NodeId, u64>,
}

impl StatsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self, node: &NodeId) {
        *self.counts.entry(node.clone()).or_insert(0) += 1;
        counter!(COMPLETED_METRIC, "node" => node.to_string()).increment(1);
        gauge!(IMBALANCE_METRIC).set(self.load_imbalance());
    }

    pub fn reset(&mut self) {
        self.counts.clear();
        gauge!(IMBALANCE_METRIC).set(0.0);
    }

    pub fn counts(&self) -> &BTreeMap<NodeId, u64> {
        &self.counts
    }

    pub fn count(&self, node: &NodeId) -> u64 {
        self.counts.get(node).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn load_imbalance(&self) -> f64 {
        coefficient_of_variation(self.counts.values().copied())
    }

    /// `node`'s count as a rounded percentage of the busiest node's.
    pub fn relative_load(&self, node: &NodeId) -> u32 {
        let max = self.counts.values().copied().max().unwrap_or(0);
        if max == 0 {
            return 0;
        }
        (self.count(node) as f64 / max as f64 * 100.0).round() as u32
    }
}
