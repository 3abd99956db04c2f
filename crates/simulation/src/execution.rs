//! Execution status: whether the frame driver should deliver ticks.
//!
//! ```text
//!            START             PAUSE
//!  stopped ────────▶ running ◀────────▶ paused
//!     ▲               │       RESUME      │
//!     └──── STOP ─────┴───────────────────┘
//! ```
//!
//! Knows nothing about the simulation; callers react to the returned
//! transitions.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    #[default]
    Stopped,
    Running,
    Paused,
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExecutionStatus::Stopped => "stopped",
            ExecutionStatus::Running => "running",
            ExecutionStatus::Paused => "paused",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExecutionCommand {
    Start,
    Pause,
    Resume,
    Stop,
}

/// A transition that actually happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Transition {
    pub from: ExecutionStatus,
    pub to: ExecutionStatus,
    pub command: ExecutionCommand,
}

impl ExecutionStatus {
    /// Where `command` leads from here, `None` when it does not apply.
    pub fn next(self, command: ExecutionCommand) -> Option<ExecutionStatus> {
        use ExecutionCommand::*;
        use ExecutionStatus::*;

        match (self, command) {
            (Stopped, Start) => Some(Running),
            (Running, Pause) => Some(Paused),
            (Paused, Resume) => Some(Running),
            (Running | Paused, Stop) => Some(Stopped),
            _ => None,
        }
    }

    /// The command a single start/pause button sends from here.
    pub fn toggle_command(self) -> ExecutionCommand {
        match self {
            ExecutionStatus::Stopped => ExecutionCommand::Start,
            ExecutionStatus::Running => ExecutionCommand::Pause,
            ExecutionStatus::Paused => ExecutionCommand::Resume,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExecutionCoordinator {
    status: ExecutionStatus,
}

impl ExecutionCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> ExecutionStatus {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.status == ExecutionStatus::Running
    }

    /// Applies `command`; inapplicable commands are ignored.
    pub fn send(&mut self, command: ExecutionCommand) -> Option<Transition> {
        let from = self.status;
        let to = from.next(command)?;
        self.status = to;
        debug!(%from, %to, ?command, "execution status changed");
        Some(Transition { from, to, command })
    }

    pub fn start(&mut self) -> Option<Transition> {
        self.send(ExecutionCommand::Start)
    }

    pub fn pause(&mut self) -> Option<Transition> {
        self.send(ExecutionCommand::Pause)
    }

    pub fn resume(&mut self) -> Option<Transition> {
        self.send(ExecutionCommand::Resume)
    }

    pub fn stop(&mut self) -> Option<Transition> {
        self.send(ExecutionCommand::Stop)
    }

    /// Stopped starts, running pauses, paused resumes. Always transitions.
    pub fn toggle(&mut self) -> Option<Transition> {
        self.send(self.status.toggle_command())
    }
}
