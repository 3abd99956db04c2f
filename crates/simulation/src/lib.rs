//! Request routing simulation over a consistent hash ring.
//!
//! Requests are animated as particles that spawn at the ring centre, move
//! out to their key's position and then travel clockwise to the vnode
//! responsible for them. Everything here is driven by explicit `tick(now)`
//! calls; nothing schedules itself.
//!
//! - [`particle`]: one request's `initial → ring → completed` lifecycle
//! - [`orchestrator`]: batches, cycles, rerouting on ring changes
//! - [`stats`]: per-node completion counts and load imbalance
//! - [`execution`]: stopped / running / paused gating
//! - [`session`]: all of the above wired together for a host application

pub mod config;
pub mod console;
pub mod error;
pub mod events;
pub mod execution;
pub mod geometry;
pub mod hits;
pub mod orchestrator;
pub mod particle;
pub mod session;
pub mod stats;

pub use config::{Dimensions, SimulationConfig, SpeedConfig, FRAME_MS};
pub use console::{ConsoleLog, LogEntry, LogLevel};
pub use error::{Result, SimulationError};
pub use events::EventBus;
pub use execution::{ExecutionCommand, ExecutionCoordinator, ExecutionStatus};
pub use hits::HitTracker;
pub use orchestrator::{
    CompletedRequest, Orchestrator, OrchestratorState, Reroute, RerouteReport, SimulationEvent,
    SimulationUpdate,
};
pub use particle::{Particle, ParticlePhase, ParticleSnapshot};
pub use session::{Session, SessionEvent};
pub use stats::StatsTracker;
