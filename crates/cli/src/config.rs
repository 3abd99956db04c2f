//! Command-line configuration.
//!
//! Simulation settings resolve in three layers: built-in defaults, an
//! optional JSON config file, then explicit flags (or their environment
//! variables).

use crate::commands::Command;
use anyhow::Context;
use clap::Parser;
use simulation::SimulationConfig;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "ringsim")]
#[command(version, about = "Consistent hashing ring simulator")]
pub struct CliConfig {
    /// JSON file with simulation settings; missing fields use defaults
    #[arg(long, global = true, env = "RINGSIM_CONFIG")]
    pub config: Option<PathBuf>,

    /// Physical nodes on the ring
    #[arg(long, global = true, env = "RINGSIM_NODES", default_value_t = 2)]
    pub nodes: usize,

    /// Virtual nodes per physical node
    #[arg(long, global = true, env = "RINGSIM_VNODES")]
    pub vnodes: Option<usize>,

    /// Request generator seed
    #[arg(long, global = true, env = "RINGSIM_SEED")]
    pub seed: Option<u64>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true, env = "RINGSIM_LOG_JSON")]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl CliConfig {
    /// Installs the global tracing subscriber. `RUST_LOG` overrides the
    /// default `warn` filter.
    pub fn init_tracing(&self) {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let registry = tracing_subscriber::registry().with(filter);
        if self.log_json {
            registry.with(fmt::layer().json().with_writer(std::io::stderr)).init();
        } else {
            registry.with(fmt::layer().with_writer(std::io::stderr)).init();
        }
    }

    /// Defaults, then the config file, then flags.
    pub fn simulation_config(&self) -> anyhow::Result<SimulationConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                serde_json::from_str(&raw)
                    .with_context(|| format!("parsing {}", path.display()))?
            }
            None => SimulationConfig::default(),
        };

        if let Some(vnodes) = self.vnodes {
            config.vnodes_per_node = vnodes;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        self.command.apply_overrides(&mut config);

        config.validate()?;
        anyhow::ensure!(self.nodes > 0, "--nodes must be at least 1");
        Ok(config)
    }

    pub async fn run(self) -> anyhow::Result<()> {
        self.init_tracing();
        simulation::stats::describe_metrics();
        let config = self.simulation_config()?;
        let result = self.command.execute(config, self.nodes).await?;
        println!("{}", result.render(self.json)?);
        Ok(())
    }
}
