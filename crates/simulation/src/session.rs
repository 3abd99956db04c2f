//! A complete simulation session.
//!
//! Wires the ring-side state (topology, request generator, partitioner) to
//! the orchestrator and routes what comes back out to the stats tracker, the
//! hit markers, the console log and any [`EventBus`] subscribers.
//!
//! # Data flow
//!
//! ```text
//!   config / UI ──▶ Session ──UPDATE──▶ Orchestrator ──▶ Particles
//!                     ▲                     │
//!                     └──── events ─────────┘
//!                     │
//!                     ├──▶ StatsTracker
//!                     ├──▶ HitTracker
//!                     ├──▶ ConsoleLog
//!                     └──▶ EventBus subscribers
//! ```
//!
//! Consumers only read events; nothing downstream mutates the orchestrator.

use crate::config::{Dimensions, SimulationConfig, SpeedConfig};
use crate::console::ConsoleLog;
use crate::error::Result;
use crate::events::EventBus;
use crate::execution::{ExecutionCommand, ExecutionCoordinator, ExecutionStatus, Transition};
use crate::hits::HitTracker;
use crate::orchestrator::{
    CompletedRequest, Orchestrator, RerouteReport, SimulationEvent, SimulationUpdate,
};
use crate::particle::ParticleSnapshot;
use crate::stats::StatsTracker;
use corelib::{
    Blake3Partitioner, HashRing, NodeId, Partitioner, Request, RequestGenerator, Topology,
    TopologyChange,
};
use crossbeam::channel::Receiver;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

/// What subscribers of a [`Session`] see.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionEvent {
    Simulation(SimulationEvent),
    Execution(Transition),
    Topology(TopologyChange),
    StatsReset,
}

pub struct Session {
    config: SimulationConfig,
    partitioner: Arc<dyn Partitioner>,
    topology: Topology,
    generator: RequestGenerator,
    orchestrator: Orchestrator,
    stats: StatsTracker,
    hits: HitTracker,
    console: ConsoleLog,
    execution: ExecutionCoordinator,
    bus: EventBus<SessionEvent>,
    clock: f64,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("partitioner", &self.partitioner.name())
            .field("status", &self.execution.status())
            .field("nodes", &self.topology.nodes().len())
            .field("cycle_count", &self.orchestrator.cycle_count())
            .finish()
    }
}

impl Session {
    /// A session hashing with BLAKE3.
    pub async fn with_config(config: SimulationConfig) -> Result<Self> {
        Self::new(config, Arc::new(Blake3Partitioner)).await
    }

    /// Builds the initial two-node ring and request batch.
    ///
    /// # Errors
    ///
    /// Invalid config values, or a vnode that cannot be hashed.
    pub async fn new(config: SimulationConfig, partitioner: Arc<dyn Partitioner>) -> Result<Self> {
        config.validate()?;

        let topology = Topology::with_vnodes_per_node(config.vnodes_per_node);
        let ring = topology.build_ring(partitioner.as_ref()).await?;
        let generator =
            RequestGenerator::generate(config.num_requests, config.seed, partitioner.as_ref())
                .await;
        let orchestrator = Orchestrator::new(
            ring,
            generator.requests().to_vec(),
            config.speed,
            config.dimensions,
        );

        info!(
            partitioner = partitioner.name(),
            nodes = topology.nodes().len(),
            vnodes = orchestrator.ring().len(),
            requests = generator.requests().len(),
            "session created"
        );
        Ok(Self {
            config,
            partitioner,
            topology,
            generator,
            orchestrator,
            stats: StatsTracker::new(),
            hits: HitTracker::new(),
            console: ConsoleLog::new(),
            execution: ExecutionCoordinator::new(),
            bus: EventBus::new(),
            clock: 0.0,
        })
    }

    pub fn subscribe(&self) -> Receiver<SessionEvent> {
        self.bus.subscribe()
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn status(&self) -> ExecutionStatus {
        self.execution.status()
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn ring(&self) -> &HashRing {
        self.orchestrator.ring()
    }

    pub fn requests(&self) -> &[Request] {
        self.generator.requests()
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub fn snapshots(&self) -> Vec<ParticleSnapshot> {
        self.orchestrator.snapshots()
    }

    pub fn stats(&self) -> &StatsTracker {
        &self.stats
    }

    pub fn hits(&self) -> &HitTracker {
        &self.hits
    }

    pub fn console(&self) -> &ConsoleLog {
        &self.console
    }

    // ------------------------------------------------------------------
    // Execution
    // ------------------------------------------------------------------

    pub fn start(&mut self) -> bool {
        let Some(transition) = self.execution.start() else {
            return false;
        };
        self.orchestrator.start();
        self.console.info(self.clock, "Simulation started");
        self.bus.publish(SessionEvent::Execution(transition));
        true
    }

    pub fn pause(&mut self) -> bool {
        let Some(transition) = self.execution.pause() else {
            return false;
        };
        self.orchestrator.pause();
        self.console.info(self.clock, "Simulation paused");
        self.bus.publish(SessionEvent::Execution(transition));
        true
    }

    pub fn resume(&mut self) -> bool {
        let Some(transition) = self.execution.resume() else {
            return false;
        };
        self.orchestrator.resume();
        self.console.info(self.clock, "Simulation resumed");
        self.bus.publish(SessionEvent::Execution(transition));
        true
    }

    /// Stops and discards the particles in flight. Stats and the cycle
    /// count are kept.
    pub fn stop(&mut self) -> bool {
        let Some(transition) = self.execution.stop() else {
            return false;
        };
        self.orchestrator.stop();
        self.hits.clear();
        self.console.info(self.clock, "Simulation stopped");
        self.bus.publish(SessionEvent::Execution(transition));
        true
    }

    pub fn toggle(&mut self) -> bool {
        match self.execution.status().toggle_command() {
            ExecutionCommand::Start => self.start(),
            ExecutionCommand::Pause => self.pause(),
            ExecutionCommand::Resume => self.resume(),
            ExecutionCommand::Stop => self.stop(),
        }
    }

    /// One animation frame at wall-clock `now` (milliseconds).
    ///
    /// Hit markers age regardless of status; the orchestrator only ticks
    /// while running.
    pub fn frame(&mut self, now: f64) -> Vec<SimulationEvent> {
        self.clock = now;
        self.hits.expire(now);
        if !self.execution.is_running() {
            return Vec::new();
        }

        let events = self.orchestrator.tick(now);
        for event in &events {
            match event {
                SimulationEvent::ParticleCompleted(done) => self.record_completion(done),
                SimulationEvent::CycleCompleted { cycle_count, .. } => {
                    debug!(cycle = cycle_count, "next batch spawned");
                }
                SimulationEvent::ParticleMoved(_) | SimulationEvent::Rerouted(_) => {}
            }
            self.bus.publish(SessionEvent::Simulation(event.clone()));
        }
        events
    }

    fn record_completion(&mut self, done: &CompletedRequest) {
        let Some(target) = &done.target_node else {
            debug!(request = %done.request_key, "completion without a node, not counted");
            return;
        };

        self.stats.increment(&target.owner_id);
        self.hits.record(done.ring_end_pos, self.clock);
        self.console.success(
            self.clock,
            format!(
                "{} from {:.4} served by {} (v{}) at {:.4}",
                done.request_key,
                done.ring_start_pos,
                target.owner_id,
                target.vnode_index,
                done.ring_end_pos
            ),
        );
    }

    // ------------------------------------------------------------------
    // Topology and inputs
    // ------------------------------------------------------------------

    /// Adds the next free node and rebuilds the ring.
    ///
    /// If the new ring cannot be hashed the session is left untouched.
    pub async fn add_node(&mut self) -> Result<TopologyChange> {
        let mut topology = self.topology.clone();
        let change = topology.add_node();
        self.commit_topology(topology).await?;

        if let TopologyChange::NodeAdded(node) = &change {
            self.console.info(self.clock, format!("Added {}", node.id));
        }
        self.bus.publish(SessionEvent::Topology(change.clone()));
        Ok(change)
    }

    /// Removes `id`. Returns `false` when declined (unknown id, last node).
    pub async fn remove_node(&mut self, id: &NodeId) -> Result<bool> {
        let mut topology = self.topology.clone();
        let Some(change) = topology.remove_node(id) else {
            let reason = if self.topology.node(id).is_none() {
                "no such node"
            } else {
                "at least one node must remain"
            };
            self.console
                .warning(self.clock, format!("Cannot remove {id}: {reason}"));
            return Ok(false);
        };
        self.commit_topology(topology).await?;
        self.console.info(self.clock, format!("Removed {id}"));
        self.bus.publish(SessionEvent::Topology(change));
        Ok(true)
    }

    pub async fn set_vnodes_per_node(&mut self, count: usize) -> Result<()> {
        if count == self.topology.vnodes_per_node() {
            return Ok(());
        }
        let mut topology = self.topology.clone();
        let change = topology.set_vnodes_per_node(count);
        self.commit_topology(topology).await?;
        self.console
            .info(self.clock, format!("Virtual nodes per node set to {count}"));
        self.bus.publish(SessionEvent::Topology(change));
        Ok(())
    }

    /// New request count; applies from the next batch.
    pub async fn set_num_requests(&mut self, count: usize) -> Result<()> {
        self.generator
            .set_num_requests(count, self.partitioner.as_ref())
            .await;
        self.config.num_requests = count;
        self.push_requests()
    }

    /// New seed; regenerates the request set from scratch.
    pub async fn set_seed(&mut self, seed: u64) -> Result<()> {
        self.generator.reseed(seed, self.partitioner.as_ref()).await;
        self.config.seed = seed;
        self.console.info(self.clock, format!("Seed set to {seed}"));
        self.push_requests()
    }

    pub fn set_speed_multiplier(&mut self, multiplier: f64) -> Result<()> {
        let speed = SpeedConfig {
            speed_multiplier: multiplier,
            ..self.config.speed
        };
        self.orchestrator.update(SimulationUpdate::speed(speed))?;
        self.config.speed = speed;
        Ok(())
    }

    pub fn set_dimensions(&mut self, dimensions: Dimensions) -> Result<()> {
        self.orchestrator
            .update(SimulationUpdate::dimensions(dimensions))?;
        self.config.dimensions = dimensions;
        Ok(())
    }

    /// Back to the initial topology and request count with fresh stats.
    pub async fn reset(&mut self) -> Result<()> {
        if let Some(transition) = self.execution.stop() {
            self.bus.publish(SessionEvent::Execution(transition));
        }
        self.orchestrator.reset();

        let mut topology = self.topology.clone();
        let change = topology.reset();
        self.commit_topology(topology).await?;
        self.bus.publish(SessionEvent::Topology(change));

        self.generator.reset(self.partitioner.as_ref()).await;
        self.config.num_requests = self.generator.num_requests();
        self.push_requests()?;

        self.stats.reset();
        self.hits.clear();
        self.bus.publish(SessionEvent::StatsReset);
        self.console.info(self.clock, "System reset");
        Ok(())
    }

    fn push_requests(&mut self) -> Result<()> {
        self.orchestrator
            .update(SimulationUpdate::requests(self.generator.requests().to_vec()))?;
        Ok(())
    }

    /// Builds the ring for `topology` and only then swaps it in.
    async fn commit_topology(&mut self, topology: Topology) -> Result<()> {
        let ring = topology.build_ring(self.partitioner.as_ref()).await?;
        self.config.vnodes_per_node = topology.vnodes_per_node();
        self.topology = topology;
        if let Some(report) = self.orchestrator.update(SimulationUpdate::ring(ring))? {
            self.log_reroutes(&report);
            if !report.is_empty() {
                self.bus
                    .publish(SessionEvent::Simulation(SimulationEvent::Rerouted(report)));
            }
        }
        Ok(())
    }

    fn log_reroutes(&mut self, report: &RerouteReport) {
        for (node, count) in report.by_target() {
            self.console.warning(
                self.clock,
                format!(
                    "Rerouted {count} requests to {node} ({:.0}%)",
                    report.percentage(count)
                ),
            );
        }
    }
}
