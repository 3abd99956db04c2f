//! Simulation orchestrator.
//!
//! Owns the ring snapshot, the pending request batch and every live
//! particle. The driver calls [`Orchestrator::tick`] once per frame; the
//! orchestrator advances each particle and returns what happened.
//!
//! # State machine
//!
//! ```text
//!            start                    all particles completed
//!  idle ─────────────▶ spawning ──▶ running ─────────────▶ cycle complete
//!   ▲                     ▲           │                          │
//!   │        pause        │           │                          │
//!   └─────────────────────┼───────────┘                          │
//!   resume ──▶ running    └──────────────────────────────────────┘
//! ```
//!
//! `spawning` and `cycle complete` are transient: every public operation
//! leaves the orchestrator either `Idle` or `Running`.

use crate::config::{validate_dimensions, validate_speed, Dimensions, SpeedConfig, FRAME_MS};
use crate::error::Result;
use crate::geometry::{to_xy, Point};
use crate::particle::{Particle, ParticleEvent, ParticleId, ParticleSnapshot};
use corelib::{HashRing, NodeId, Request, VirtualNode};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrchestratorState {
    Idle,
    Spawning,
    Running,
    CycleComplete,
}

/// A particle that reached its target.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletedRequest {
    pub particle_id: ParticleId,
    pub request_key: String,
    pub ring_start_pos: f64,
    pub ring_end_pos: f64,
    /// The vnode sitting at `ring_end_pos` in the current ring. `None` when
    /// the ring changed so that no vnode is there any more.
    pub target_node: Option<VirtualNode>,
}

/// One in-flight particle whose target moved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reroute {
    pub particle_id: ParticleId,
    pub request_key: String,
    pub old_target: Option<VirtualNode>,
    pub new_target: VirtualNode,
}

/// Outcome of a ring change for the particles in flight at that moment.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RerouteReport {
    /// Particles not yet completed when the ring changed.
    pub in_flight: usize,
    pub rerouted: Vec<Reroute>,
}

impl RerouteReport {
    pub fn is_empty(&self) -> bool {
        self.rerouted.is_empty()
    }

    /// Rerouted particle count per new target node.
    pub fn by_target(&self) -> BTreeMap<NodeId, usize> {
        let mut counts = BTreeMap::new();
        for reroute in &self.rerouted {
            *counts.entry(reroute.new_target.owner_id.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// `count` as a percentage of the in-flight particles.
    pub fn percentage(&self, count: usize) -> f64 {
        if self.in_flight == 0 {
            return 0.0;
        }
        count as f64 / self.in_flight as f64 * 100.0
    }
}

/// Everything the orchestrator reports upwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SimulationEvent {
    ParticleMoved(ParticleSnapshot),
    ParticleCompleted(CompletedRequest),
    CycleCompleted { cycle_count: u64, ring_size: usize },
    Rerouted(RerouteReport),
}

/// Context fields to merge. `None` leaves the current value alone.
#[derive(Debug, Clone, Default)]
pub struct SimulationUpdate {
    pub ring: Option<HashRing>,
    pub requests: Option<Vec<Request>>,
    pub speed: Option<SpeedConfig>,
    pub dimensions: Option<Dimensions>,
}

impl SimulationUpdate {
    pub fn ring(ring: HashRing) -> Self {
        Self {
            ring: Some(ring),
            ..Self::default()
        }
    }

    pub fn requests(requests: Vec<Request>) -> Self {
        Self {
            requests: Some(requests),
            ..Self::default()
        }
    }

    pub fn speed(speed: SpeedConfig) -> Self {
        Self {
            speed: Some(speed),
            ..Self::default()
        }
    }

    pub fn dimensions(dimensions: Dimensions) -> Self {
        Self {
            dimensions: Some(dimensions),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
struct LiveParticle {
    particle: Particle,
    /// The vnode the particle is heading for.
    target: Option<VirtualNode>,
}

#[derive(Debug, Clone)]
pub struct Orchestrator {
    state: OrchestratorState,
    ring: HashRing,
    requests: Vec<Request>,
    speed: SpeedConfig,
    dimensions: Dimensions,
    particles: BTreeMap<ParticleId, LiveParticle>,
    next_particle_id: ParticleId,
    cycle_count: u64,
    last_tick_time: Option<f64>,
    spawn_positions: Vec<Point>,
}

impl Orchestrator {
    pub fn new(
        ring: HashRing,
        requests: Vec<Request>,
        speed: SpeedConfig,
        dimensions: Dimensions,
    ) -> Self {
        Self {
            state: OrchestratorState::Idle,
            ring,
            requests,
            speed,
            dimensions,
            particles: BTreeMap::new(),
            next_particle_id: 0,
            cycle_count: 0,
            last_tick_time: None,
            spawn_positions: Vec::new(),
        }
    }

    pub fn state(&self) -> OrchestratorState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == OrchestratorState::Running
    }

    pub fn cycle_count(&self) -> u64 {
        self.cycle_count
    }

    pub fn ring(&self) -> &HashRing {
        &self.ring
    }

    pub fn requests(&self) -> &[Request] {
        &self.requests
    }

    pub fn speed(&self) -> SpeedConfig {
        self.speed
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    pub fn last_tick_time(&self) -> Option<f64> {
        self.last_tick_time
    }

    /// Where the current batch entered the ring, for preview rendering.
    pub fn spawn_positions(&self) -> &[Point] {
        &self.spawn_positions
    }

    /// Live particles in id order.
    pub fn particles(&self) -> impl Iterator<Item = &Particle> + '_ {
        self.particles.values().map(|live| &live.particle)
    }

    pub fn particle(&self, id: ParticleId) -> Option<&Particle> {
        self.particles.get(&id).map(|live| &live.particle)
    }

    /// The vnode particle `id` is heading for.
    pub fn target_of(&self, id: ParticleId) -> Option<&VirtualNode> {
        self.particles.get(&id).and_then(|live| live.target.as_ref())
    }

    pub fn snapshots(&self) -> Vec<ParticleSnapshot> {
        self.particles().map(Particle::snapshot).collect()
    }

    /// Particles not yet completed.
    pub fn in_flight(&self) -> usize {
        self.particles().filter(|p| !p.is_completed()).count()
    }

    /// Spawns a fresh batch and starts running. Only valid from `Idle`.
    pub fn start(&mut self) -> bool {
        if self.state != OrchestratorState::Idle {
            return false;
        }
        self.spawn();
        self.last_tick_time = None;
        info!(particles = self.particles.len(), "simulation started");
        true
    }

    /// Stops ticking and forgets the tick baseline. Particles are kept.
    pub fn pause(&mut self) -> bool {
        if self.state != OrchestratorState::Running {
            return false;
        }
        self.state = OrchestratorState::Idle;
        self.last_tick_time = None;
        info!(in_flight = self.in_flight(), "simulation paused");
        true
    }

    /// Continues with the retained particles. A run that never spawned
    /// spawns now.
    pub fn resume(&mut self) -> bool {
        if self.state != OrchestratorState::Idle {
            return false;
        }
        if self.particles.is_empty() {
            self.spawn();
        } else {
            self.state = OrchestratorState::Running;
        }
        info!(in_flight = self.in_flight(), "simulation resumed");
        true
    }

    /// Drops every particle and goes back to `Idle`. The cycle count is
    /// kept; the next `start` spawns a fresh batch.
    pub fn stop(&mut self) {
        self.state = OrchestratorState::Idle;
        self.particles.clear();
        self.spawn_positions.clear();
        self.last_tick_time = None;
        debug!(cycles = self.cycle_count, "orchestrator stopped");
    }

    /// [`stop`](Self::stop), and the cycle count back to zero.
    pub fn reset(&mut self) {
        self.stop();
        self.cycle_count = 0;
        debug!("orchestrator reset");
    }

    /// Processes one frame at timestamp `time` (milliseconds).
    ///
    /// The first tick after start or resume counts as one reference frame.
    /// Outside `Running` this does nothing.
    pub fn tick(&mut self, time: f64) -> Vec<SimulationEvent> {
        if self.state != OrchestratorState::Running {
            return Vec::new();
        }

        // Nothing spawned, nothing to complete.
        if self.particles.is_empty() {
            self.last_tick_time = Some(time);
            return Vec::new();
        }

        if self.particles.values().all(|live| live.particle.is_completed()) {
            self.last_tick_time = Some(time);
            return vec![self.complete_cycle()];
        }

        let delta = time - self.last_tick_time.unwrap_or(time - FRAME_MS);
        self.last_tick_time = Some(time);

        let ring = &self.ring;
        let mut events = Vec::new();
        for live in self.particles.values_mut() {
            for event in live.particle.advance(delta) {
                events.push(match event {
                    ParticleEvent::Moved(snapshot) => SimulationEvent::ParticleMoved(snapshot),
                    ParticleEvent::Completed(done) => {
                        let target_node = ring.vnode_at(done.ring_end_pos).cloned();
                        if target_node.is_none() {
                            warn!(
                                request = %done.request_key,
                                position = done.ring_end_pos,
                                "completed particle has no vnode at its target"
                            );
                        }
                        SimulationEvent::ParticleCompleted(CompletedRequest {
                            particle_id: done.id,
                            request_key: done.request_key,
                            ring_start_pos: done.ring_start_pos,
                            ring_end_pos: done.ring_end_pos,
                            target_node,
                        })
                    }
                });
            }
        }
        events
    }

    /// Merges new context without changing state.
    ///
    /// Speed and dimensions are pushed into every particle. A new request
    /// set applies from the next spawn. A new ring re-resolves every
    /// in-flight particle from its start position and redirects those whose
    /// responsible vnode changed; the returned report lists them.
    ///
    /// # Errors
    ///
    /// A negative or non-finite speed, or non-positive dimensions. Nothing
    /// is applied in that case.
    pub fn update(&mut self, update: SimulationUpdate) -> Result<Option<RerouteReport>> {
        if let Some(speed) = &update.speed {
            validate_speed(speed)?;
        }
        if let Some(dimensions) = &update.dimensions {
            validate_dimensions(dimensions)?;
        }

        if let Some(speed) = update.speed {
            self.speed = speed;
            for live in self.particles.values_mut() {
                live.particle.set_speed(speed);
            }
        }
        if let Some(dimensions) = update.dimensions {
            self.dimensions = dimensions;
            for live in self.particles.values_mut() {
                live.particle.set_dimensions(dimensions);
            }
        }
        if let Some(requests) = update.requests {
            self.requests = requests;
        }
        Ok(update.ring.map(|ring| self.replace_ring(ring)))
    }

    fn replace_ring(&mut self, ring: HashRing) -> RerouteReport {
        self.ring = ring;

        let mut report = RerouteReport::default();
        for (&id, live) in self.particles.iter_mut() {
            if live.particle.is_completed() {
                continue;
            }
            report.in_flight += 1;

            let Some(new_target) = self.ring.resolve(live.particle.ring_start_pos()) else {
                continue;
            };
            let unchanged = live
                .target
                .as_ref()
                .is_some_and(|old| old.same_slot(new_target) && old.position == new_target.position);
            if unchanged {
                continue;
            }

            live.particle.retarget(new_target.position);
            let old_target = live.target.replace(new_target.clone());
            report.rerouted.push(Reroute {
                particle_id: id,
                request_key: live.particle.request_key().to_string(),
                old_target,
                new_target: new_target.clone(),
            });
        }

        if !report.is_empty() {
            info!(
                rerouted = report.rerouted.len(),
                in_flight = report.in_flight,
                "in-flight requests rerouted"
            );
        }
        report
    }

    fn spawn(&mut self) {
        self.state = OrchestratorState::Spawning;
        self.particles.clear();
        self.spawn_positions.clear();

        for request in &self.requests {
            let Some(target) = self.ring.resolve(request.position) else {
                warn!(request = %request.key, "no ring to route to, request skipped");
                continue;
            };
            let id = self.next_particle_id;
            self.next_particle_id += 1;

            let particle = Particle::new(
                id,
                request.key.clone(),
                request.position,
                target.position,
                self.speed,
                self.dimensions,
            );
            self.spawn_positions
                .push(to_xy(request.position, &self.dimensions));
            self.particles.insert(
                id,
                LiveParticle {
                    particle,
                    target: Some(target.clone()),
                },
            );
        }

        debug!(particles = self.particles.len(), "batch spawned");
        self.state = OrchestratorState::Running;
    }

    fn complete_cycle(&mut self) -> SimulationEvent {
        self.state = OrchestratorState::CycleComplete;
        self.cycle_count += 1;
        info!(cycle = self.cycle_count, "cycle completed");

        let event = SimulationEvent::CycleCompleted {
            cycle_count: self.cycle_count,
            ring_size: self.ring.len(),
        };
        self.spawn();
        event
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corelib::{Color, NodeId};
    use pretty_assertions::assert_eq;

    fn vnode(owner: &str, index: usize, position: f64) -> VirtualNode {
        VirtualNode {
            owner_id: NodeId::new(owner),
            color: Color("#000".into()),
            position,
            display_hash: String::new(),
            vnode_index: index,
        }
    }

    fn request(key: &str, position: f64) -> Request {
        Request {
            key: key.into(),
            position,
        }
    }

    fn orchestrator(requests: Vec<Request>) -> Orchestrator {
        let ring = HashRing::from_vnodes(vec![vnode("A", 0, 0.3), vnode("B", 0, 0.7)]);
        Orchestrator::new(ring, requests, SpeedConfig::default(), Dimensions::default())
    }

    /// Ticks at 60 Hz until `done` or a frame budget runs out.
    fn drive(
        orch: &mut Orchestrator,
        clock: &mut f64,
        mut done: impl FnMut(&[SimulationEvent]) -> bool,
    ) -> Vec<SimulationEvent> {
        let mut all = Vec::new();
        for _ in 0..5_000 {
            *clock += FRAME_MS;
            let events = orch.tick(*clock);
            let stop = done(&events);
            all.extend(events);
            if stop {
                return all;
            }
        }
        panic!("condition not reached");
    }

    #[test]
    fn test_start_spawns_batch() {
        let mut orch = orchestrator(vec![request("a", 0.1), request("b", 0.5)]);
        assert_eq!(orch.state(), OrchestratorState::Idle);
        assert!(orch.start());
        assert_eq!(orch.state(), OrchestratorState::Running);
        assert_eq!(orch.particles().count(), 2);
        assert_eq!(orch.spawn_positions().len(), 2);
        assert_eq!(orch.target_of(0).unwrap().owner_id.as_str(), "A");
        assert_eq!(orch.target_of(1).unwrap().owner_id.as_str(), "B");
        assert!(!orch.start());
    }

    #[test]
    fn test_idle_ignores_ticks() {
        let mut orch = orchestrator(vec![request("a", 0.1)]);
        assert!(orch.tick(100.0).is_empty());
        assert_eq!(orch.last_tick_time(), None);
    }

    #[test]
    fn test_first_tick_is_one_frame() {
        let mut orch = orchestrator(vec![request("a", 0.1)]);
        orch.start();
        orch.tick(50_000.0);
        let p = orch.particle(0).unwrap();
        assert!((p.initial_progress() - 0.01).abs() < 1e-9);
        assert_eq!(orch.last_tick_time(), Some(50_000.0));
    }

    #[test]
    fn test_pause_clears_baseline() {
        let mut orch = orchestrator(vec![request("a", 0.1)]);
        orch.start();
        orch.tick(0.0);
        assert!(orch.pause());
        assert_eq!(orch.last_tick_time(), None);
        assert!(orch.tick(10_000.0).is_empty());

        assert!(orch.resume());
        orch.tick(60_000.0);
        let p = orch.particle(0).unwrap();
        // Two frames of progress, not a minute's worth.
        assert!((p.initial_progress() - 0.02).abs() < 1e-9);
    }

    #[test]
    fn test_completion_carries_target() {
        let mut orch = orchestrator(vec![request("a", 0.2)]);
        orch.start();
        let mut clock = 0.0;
        let events = drive(&mut orch, &mut clock, |events| {
            events
                .iter()
                .any(|e| matches!(e, SimulationEvent::ParticleCompleted(_)))
        });

        let completed = events
            .iter()
            .find_map(|e| match e {
                SimulationEvent::ParticleCompleted(c) => Some(c),
                _ => None,
            })
            .unwrap();
        assert_eq!(completed.request_key, "a");
        assert_eq!(completed.ring_end_pos, 0.3);
        assert_eq!(completed.target_node.as_ref().unwrap().owner_id.as_str(), "A");
    }

    #[test]
    fn test_cycle_respawns() {
        let mut orch = orchestrator(vec![request("a", 0.2), request("b", 0.6), request("c", 0.9)]);
        orch.start();
        let mut clock = 0.0;
        drive(&mut orch, &mut clock, |events| {
            events
                .iter()
                .any(|e| matches!(e, SimulationEvent::CycleCompleted { .. }))
        });

        assert_eq!(orch.cycle_count(), 1);
        assert_eq!(orch.state(), OrchestratorState::Running);
        assert_eq!(orch.particles().count(), 3);
        assert!(orch.particles().all(|p| !p.is_completed()));
        // Fresh ids for the new batch.
        assert!(orch.particles().all(|p| p.id() >= 3));
    }

    #[test]
    fn test_empty_batch_never_cycles() {
        let mut orch = orchestrator(Vec::new());
        orch.start();
        for i in 0..100 {
            assert!(orch.tick(i as f64 * FRAME_MS).is_empty());
        }
        assert_eq!(orch.cycle_count(), 0);
    }

    #[test]
    fn test_update_speed_reaches_particles() {
        let mut orch = orchestrator(vec![request("a", 0.1)]);
        orch.start();
        let fast = SpeedConfig {
            speed_multiplier: 3.0,
            ..SpeedConfig::default()
        };
        assert!(orch.update(SimulationUpdate::speed(fast)).unwrap().is_none());
        assert_eq!(orch.particle(0).unwrap().speed(), fast);
        assert_eq!(orch.state(), OrchestratorState::Running);
    }

    #[test]
    fn test_invalid_speed_rejected() {
        let mut orch = orchestrator(vec![request("a", 0.1)]);
        orch.start();
        let backwards = SpeedConfig {
            speed_multiplier: -1.0,
            ..SpeedConfig::default()
        };
        assert!(orch.update(SimulationUpdate::speed(backwards)).is_err());
        assert_eq!(orch.speed(), SpeedConfig::default());
        assert_eq!(orch.particle(0).unwrap().speed(), SpeedConfig::default());

        // Nothing moves further than one ordinary frame.
        orch.tick(0.0);
        let p = orch.particle(0).unwrap();
        assert!(!p.is_completed());
        assert!((p.initial_progress() - 0.01).abs() < 1e-9);
    }

    #[test]
    fn test_new_requests_apply_next_spawn() {
        let mut orch = orchestrator(vec![request("a", 0.1)]);
        orch.start();
        orch.update(SimulationUpdate::requests(vec![request("x", 0.4), request("y", 0.5)]))
            .unwrap();
        assert_eq!(orch.particles().count(), 1);

        let mut clock = 0.0;
        drive(&mut orch, &mut clock, |events| {
            events
                .iter()
                .any(|e| matches!(e, SimulationEvent::CycleCompleted { .. }))
        });
        assert_eq!(orch.particles().count(), 2);
    }

    #[test]
    fn test_ring_change_reroutes() {
        let mut orch = orchestrator(vec![request("a", 0.1), request("b", 0.5)]);
        orch.start();
        orch.tick(0.0);

        // C now sits between 0.1 and A.
        let ring = HashRing::from_vnodes(vec![
            vnode("A", 0, 0.3),
            vnode("B", 0, 0.7),
            vnode("C", 0, 0.2),
        ]);
        let report = orch.update(SimulationUpdate::ring(ring)).unwrap().unwrap();

        assert_eq!(report.in_flight, 2);
        assert_eq!(report.rerouted.len(), 1);
        let reroute = &report.rerouted[0];
        assert_eq!(reroute.request_key, "a");
        assert_eq!(reroute.old_target.as_ref().unwrap().owner_id.as_str(), "A");
        assert_eq!(reroute.new_target.owner_id.as_str(), "C");
        assert_eq!(orch.particle(0).unwrap().ring_end_pos(), 0.2);
        assert_eq!(orch.target_of(0).unwrap().owner_id.as_str(), "C");
        assert_eq!(orch.particle(1).unwrap().ring_end_pos(), 0.7);

        assert_eq!(report.by_target()[&NodeId::new("C")], 1);
        assert_eq!(report.percentage(1), 50.0);
    }

    #[test]
    fn test_same_ring_reroutes_nothing() {
        let mut orch = orchestrator(vec![request("a", 0.1)]);
        orch.start();
        let same = orch.ring().clone();
        let report = orch.update(SimulationUpdate::ring(same)).unwrap().unwrap();
        assert!(report.is_empty());
        assert_eq!(report.in_flight, 1);
    }

    #[test]
    fn test_completion_without_vnode_has_no_target() {
        let mut orch = orchestrator(vec![request("a", 0.25)]);
        orch.start();
        // An empty ring offers no new route, so the particle keeps flying
        // towards a position where no vnode sits any more.
        let report = orch
            .update(SimulationUpdate::ring(HashRing::new()))
            .unwrap()
            .unwrap();
        assert!(report.is_empty());

        let mut clock = 0.0;
        let events = drive(&mut orch, &mut clock, |events| {
            events
                .iter()
                .any(|e| matches!(e, SimulationEvent::ParticleCompleted(_)))
        });
        let completed = events
            .iter()
            .find_map(|e| match e {
                SimulationEvent::ParticleCompleted(c) => Some(c),
                _ => None,
            })
            .unwrap();
        assert_eq!(completed.ring_end_pos, 0.3);
        assert!(completed.target_node.is_none());
    }

    #[test]
    fn test_stop_keeps_cycle_count() {
        let mut orch = orchestrator(vec![request("a", 0.2)]);
        orch.start();
        let mut clock = 0.0;
        drive(&mut orch, &mut clock, |events| {
            events
                .iter()
                .any(|e| matches!(e, SimulationEvent::CycleCompleted { .. }))
        });

        orch.stop();
        assert_eq!(orch.state(), OrchestratorState::Idle);
        assert_eq!(orch.particles().count(), 0);
        assert_eq!(orch.last_tick_time(), None);
        assert_eq!(orch.cycle_count(), 1);
        assert!(orch.start());
        assert_eq!(orch.cycle_count(), 1);
    }

    #[test]
    fn test_reset() {
        let mut orch = orchestrator(vec![request("a", 0.1)]);
        orch.start();
        orch.reset();
        assert_eq!(orch.state(), OrchestratorState::Idle);
        assert_eq!(orch.particles().count(), 0);
        assert_eq!(orch.cycle_count(), 0);
        assert!(orch.start());
    }
}
