//! `ringsim` subcommands.

use clap::Subcommand;
use corelib::{Blake3Partitioner, HashRing, Node, NodeId, RingPoint, Topology, VirtualNode};
use serde::Serialize;
use simulation::{LogEntry, Session, SimulationConfig, FRAME_MS};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::time::Duration;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::info;

/// Newest console lines included in a run summary.
const SUMMARY_LOG_LINES: usize = 10;

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Drive a simulation session and report per-node load
    Run {
        /// Frames to simulate
        #[arg(long, default_value_t = 2_000)]
        frames: u64,

        /// Requests per batch
        #[arg(long, env = "RINGSIM_REQUESTS")]
        requests: Option<usize>,

        /// Speed multiplier
        #[arg(long, env = "RINGSIM_SPEED")]
        speed: Option<f64>,

        /// Tick at wall-clock 60 Hz instead of as fast as possible
        #[arg(long)]
        realtime: bool,

        /// Add a node when this frame is reached (repeatable)
        #[arg(long = "add-node-at-frame")]
        add_node_at_frame: Vec<u64>,
    },
    /// Print the ring's vnodes and each node's share of the keyspace
    Ring,
    /// Show where a key lands and which vnode serves it
    Route {
        key: String,
    },
}

/// What a command produced.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum CommandResult {
    Run(RunSummary),
    Ring(RingReport),
    Route(RouteReport),
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub frames: u64,
    pub cycles: u64,
    pub nodes: usize,
    pub vnodes: usize,
    pub completed: BTreeMap<NodeId, u64>,
    pub relative_load: BTreeMap<NodeId, u32>,
    pub load_imbalance: f64,
    pub log: Vec<LogEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RingReport {
    pub vnodes: Vec<VirtualNode>,
    pub ownership: BTreeMap<NodeId, f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RouteReport {
    pub key: String,
    pub point: RingPoint,
    pub target: Option<VirtualNode>,
}

impl Command {
    /// Folds command-specific flags into the simulation config.
    pub fn apply_overrides(&self, config: &mut SimulationConfig) {
        if let Command::Run {
            requests, speed, ..
        } = self
        {
            if let Some(requests) = requests {
                config.num_requests = *requests;
            }
            if let Some(speed) = speed {
                config.speed.speed_multiplier = *speed;
            }
        }
    }

    pub async fn execute(
        &self,
        config: SimulationConfig,
        nodes: usize,
    ) -> anyhow::Result<CommandResult> {
        match self {
            Command::Run {
                frames,
                realtime,
                add_node_at_frame,
                ..
            } => run(config, nodes, *frames, *realtime, add_node_at_frame)
                .await
                .map(CommandResult::Run),
            Command::Ring => {
                let ring = build_topology(nodes, config.vnodes_per_node)?
                    .build_ring(&Blake3Partitioner)
                    .await?;
                Ok(CommandResult::Ring(RingReport {
                    ownership: ring.ownership(),
                    vnodes: ring.vnodes().to_vec(),
                }))
            }
            Command::Route { key } => {
                let ring = build_topology(nodes, config.vnodes_per_node)?
                    .build_ring(&Blake3Partitioner)
                    .await?;
                Ok(CommandResult::Route(route(&ring, key)))
            }
        }
    }
}

fn build_topology(nodes: usize, vnodes_per_node: usize) -> anyhow::Result<Topology> {
    let nodes = (0..nodes).map(Node::from_ordinal).collect();
    Ok(Topology::new(nodes, vnodes_per_node)?)
}

fn route(ring: &HashRing, key: &str) -> RouteReport {
    let point = Blake3Partitioner::point_for(key);
    RouteReport {
        key: key.to_string(),
        target: ring.resolve(point.position).cloned(),
        point,
    }
}

async fn run(
    config: SimulationConfig,
    nodes: usize,
    frames: u64,
    realtime: bool,
    add_node_at_frame: &[u64],
) -> anyhow::Result<RunSummary> {
    let mut session = Session::with_config(config).await?;

    // Sessions start with two nodes.
    while session.topology().nodes().len() < nodes {
        session.add_node().await?;
    }
    if nodes == 1 {
        session.remove_node(&NodeId::from_ordinal(1)).await?;
    }

    let mut ticker = realtime.then(|| {
        let mut ticker = interval(Duration::from_secs_f64(FRAME_MS / 1_000.0));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker
    });
    let started = Instant::now();

    session.start();
    info!(frames, realtime, "run started");
    for frame in 0..frames {
        if add_node_at_frame.contains(&frame) {
            session.add_node().await?;
        }
        let now = match ticker.as_mut() {
            Some(ticker) => {
                ticker.tick().await;
                started.elapsed().as_secs_f64() * 1_000.0
            }
            None => frame as f64 * FRAME_MS,
        };
        session.frame(now);
    }
    session.pause();

    let stats = session.stats();
    let node_ids: Vec<NodeId> = session
        .topology()
        .nodes()
        .iter()
        .map(|n| n.id.clone())
        .collect();
    Ok(RunSummary {
        frames,
        cycles: session.orchestrator().cycle_count(),
        nodes: node_ids.len(),
        vnodes: session.ring().len(),
        completed: node_ids
            .iter()
            .map(|id| (id.clone(), stats.count(id)))
            .collect(),
        relative_load: node_ids
            .iter()
            .map(|id| (id.clone(), stats.relative_load(id)))
            .collect(),
        load_imbalance: stats.load_imbalance(),
        log: session
            .console()
            .entries()
            .take(SUMMARY_LOG_LINES)
            .cloned()
            .collect(),
    })
}

impl CommandResult {
    pub fn render(&self, json: bool) -> anyhow::Result<String> {
        if json {
            return Ok(serde_json::to_string_pretty(self)?);
        }

        let mut out = String::new();
        match self {
            CommandResult::Run(summary) => {
                writeln!(
                    out,
                    "{} frames, {} cycles, {} nodes / {} vnodes",
                    summary.frames, summary.cycles, summary.nodes, summary.vnodes
                )?;
                for (node, count) in &summary.completed {
                    let load = summary.relative_load.get(node).copied().unwrap_or(0);
                    writeln!(out, "  {node:<8} {count:>6} completed  {load:>3}%")?;
                }
                writeln!(out, "load imbalance: {:.1}%", summary.load_imbalance)?;
                for entry in summary.log.iter().rev() {
                    writeln!(out, "  [{}] {}", entry.level, entry.message)?;
                }
            }
            CommandResult::Ring(report) => {
                for vnode in &report.vnodes {
                    writeln!(
                        out,
                        "{:.6}  {}  {}",
                        vnode.position,
                        vnode,
                        &vnode.display_hash[..vnode.display_hash.len().min(16)]
                    )?;
                }
                for (node, share) in &report.ownership {
                    writeln!(out, "{node:<8} owns {:.1}%", share * 100.0)?;
                }
            }
            CommandResult::Route(report) => {
                write!(out, "{} -> {:.6}", report.key, report.point.position)?;
                match &report.target {
                    Some(target) => write!(out, " -> {target} at {:.6}", target.position)?,
                    None => write!(out, " -> (empty ring)")?,
                }
            }
        }
        Ok(out.trim_end().to_string())
    }
}
