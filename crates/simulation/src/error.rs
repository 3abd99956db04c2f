//! Error types for the simulation crate.

/// Result type alias for the simulation crate.
pub type Result<T> = std::result::Result<T, SimulationError>;

/// Errors surfaced by the simulation layer.
///
/// Guarded transitions (pausing a stopped run, removing the last node) are
/// not errors; they are declined through `bool` / `Option` returns.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimulationError {
    /// Ring construction failed.
    #[error(transparent)]
    Core(#[from] corelib::Error),
    /// A configuration value is out of range.
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}
