//! Simulation parameters.
//!
//! Everything the UI layer can change at runtime lives here. Values are
//! `serde`-deserializable so hosts can load them from JSON or any other
//! format; missing fields fall back to the defaults below.

use crate::error::{Result, SimulationError};
use corelib::requests::{DEFAULT_SEED, INITIAL_NUM_REQUESTS};
use corelib::ring::DEFAULT_VNODES_PER_NODE;
use serde::{Deserialize, Serialize};

/// Duration of one reference frame at 60 Hz, in milliseconds.
pub const FRAME_MS: f64 = 16.667;

/// Ring distance a particle covers per reference frame at multiplier 1.
pub const DEFAULT_PARTICLE_SPEED: f64 = 0.002;

/// Particle speed settings. Every particle keeps its own copy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeedConfig {
    pub particle_speed: f64,
    pub speed_multiplier: f64,
}

impl Default for SpeedConfig {
    fn default() -> Self {
        Self {
            particle_speed: DEFAULT_PARTICLE_SPEED,
            speed_multiplier: 1.0,
        }
    }
}

impl SpeedConfig {
    /// Ring distance to cover for a tick of `delta_ms`, independent of the
    /// frame rate the ticks arrive at.
    #[inline]
    pub fn frame_adjusted(&self, delta_ms: f64) -> f64 {
        self.particle_speed * (delta_ms / FRAME_MS) * self.speed_multiplier
    }
}

/// Viewport the ring is drawn into, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Dimensions {
    pub width: f64,
    pub height: f64,
    pub radius: f64,
}

impl Default for Dimensions {
    fn default() -> Self {
        Self {
            width: 600.0,
            height: 600.0,
            radius: 240.0,
        }
    }
}

/// Full configuration for a simulation session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub vnodes_per_node: usize,
    pub num_requests: usize,
    pub seed: u64,
    pub speed: SpeedConfig,
    pub dimensions: Dimensions,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            vnodes_per_node: DEFAULT_VNODES_PER_NODE,
            num_requests: INITIAL_NUM_REQUESTS,
            seed: DEFAULT_SEED,
            speed: SpeedConfig::default(),
            dimensions: Dimensions::default(),
        }
    }
}

impl SimulationConfig {
    /// Checks the numeric ranges.
    ///
    /// # Errors
    ///
    /// [`SimulationError::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> Result<()> {
        validate_speed(&self.speed)?;
        validate_dimensions(&self.dimensions)
    }
}

pub(crate) fn validate_speed(speed: &SpeedConfig) -> Result<()> {
    if !(speed.particle_speed.is_finite() && speed.particle_speed >= 0.0) {
        return Err(SimulationError::InvalidConfig(format!(
            "particle_speed must be a non-negative number, got {}",
            speed.particle_speed
        )));
    }
    if !(speed.speed_multiplier.is_finite() && speed.speed_multiplier >= 0.0) {
        return Err(SimulationError::InvalidConfig(format!(
            "speed_multiplier must be a non-negative number, got {}",
            speed.speed_multiplier
        )));
    }
    Ok(())
}

pub(crate) fn validate_dimensions(dims: &Dimensions) -> Result<()> {
    let all_positive = [dims.width, dims.height, dims.radius]
        .iter()
        .all(|v| v.is_finite() && *v > 0.0);
    if !all_positive {
        return Err(SimulationError::InvalidConfig(format!(
            "dimensions must be positive, got {}x{} r={}",
            dims.width, dims.height, dims.radius
        )));
    }
    Ok(())
}
