//! Ring position to viewport coordinates.

use crate::config::Dimensions;
use serde::Serialize;
use std::f64::consts::{FRAC_PI_2, TAU};

/// A point in viewport pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    /// Linear interpolation towards `to`; `t` is clamped to `[0, 1]`.
    pub fn lerp(self, to: Point, t: f64) -> Point {
        let t = t.clamp(0.0, 1.0);
        Point {
            x: self.x + (to.x - self.x) * t,
            y: self.y + (to.y - self.y) * t,
        }
    }
}

/// Centre of the ring.
pub fn center(dims: &Dimensions) -> Point {
    Point {
        x: dims.width / 2.0,
        y: dims.height / 2.0,
    }
}

/// Pixel coordinates of a ring position. Position 0 is at twelve o'clock and
/// positions grow clockwise.
pub fn to_xy(position: f64, dims: &Dimensions) -> Point {
    let angle = position * TAU - FRAC_PI_2;
    let c = center(dims);
    Point {
        x: c.x + dims.radius * angle.cos(),
        y: c.y + dims.radius * angle.sin(),
    }
}
