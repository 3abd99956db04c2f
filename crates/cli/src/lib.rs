//! CLI for the consistent hashing simulator.
//!
//! Provides commands for:
//! - Running a simulation session headless or in real time
//! - Inspecting ring state and keyspace ownership
//! - Routing a single key

pub mod commands;
pub mod config;

pub use commands::{Command, CommandResult};
pub use config::CliConfig;
