//! Human-readable activity log.
//!
//! A bounded, newest-first list the UI shows as a console. Every entry is
//! also forwarded to `tracing` so headless runs see the same lines.

use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;
use tracing::{error, info, warn};

/// Entries kept before the oldest is dropped.
pub const MAX_ENTRIES: usize = 200;

const GREETING: &str = "System initialised";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogLevel::Info => "info",
            LogLevel::Success => "success",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    pub timestamp_ms: f64,
    pub level: LogLevel,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct ConsoleLog {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl Default for ConsoleLog {
    fn default() -> Self {
        Self::with_capacity(MAX_ENTRIES)
    }
}

impl ConsoleLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let mut log = Self {
            entries: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        };
        log.push(0.0, LogLevel::Info, GREETING);
        log
    }

    pub fn push(&mut self, timestamp_ms: f64, level: LogLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            LogLevel::Info | LogLevel::Success => info!(target: "console", %level, "{message}"),
            LogLevel::Warning => warn!(target: "console", "{message}"),
            LogLevel::Error => error!(target: "console", "{message}"),
        }

        self.entries.push_front(LogEntry {
            timestamp_ms,
            level,
            message,
        });
        self.entries.truncate(self.capacity);
    }

    pub fn info(&mut self, timestamp_ms: f64, message: impl Into<String>) {
        self.push(timestamp_ms, LogLevel::Info, message);
    }

    pub fn success(&mut self, timestamp_ms: f64, message: impl Into<String>) {
        self.push(timestamp_ms, LogLevel::Success, message);
    }

    pub fn warning(&mut self, timestamp_ms: f64, message: impl Into<String>) {
        self.push(timestamp_ms, LogLevel::Warning, message);
    }

    pub fn error(&mut self, timestamp_ms: f64, message: impl Into<String>) {
        self.push(timestamp_ms, LogLevel::Error, message);
    }

    /// Newest first.
    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> + '_ {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&LogEntry> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Empties the log. Unlike a fresh log there is no greeting.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_with_greeting() {
        let log = ConsoleLog::new();
        assert_eq!(log.len(), 1);
        assert_eq!(log.latest().unwrap().message, GREETING);
    }

    #[test]
    fn test_newest_first_and_bounded() {
        let mut log = ConsoleLog::new();
        for i in 0..250 {
            log.info(i as f64, format!("entry {i}"));
        }
        assert_eq!(log.len(), MAX_ENTRIES);
        assert_eq!(log.latest().unwrap().message, "entry 249");
        assert_eq!(log.entries().last().unwrap().message, "entry 50");
    }

    #[test]
    fn test_levels() {
        let mut log = ConsoleLog::new();
        log.warning(1.0, "careful");
        log.error(2.0, "broken");
        log.success(3.0, "fine");
        let levels: Vec<LogLevel> = log.entries().map(|e| e.level).collect();
        assert_eq!(
            levels,
            vec![LogLevel::Success, LogLevel::Error, LogLevel::Warning, LogLevel::Info]
        );
    }

    #[test]
    fn test_clear() {
        let mut log = ConsoleLog::new();
        log.clear();
        assert!(log.is_empty());
    }
}
