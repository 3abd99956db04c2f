//! Ring position arithmetic.
//!
//! Positions live in the unit keyspace `[0, 1)` and wrap at `1 -> 0`.

/// Divisor that maps a 32-bit digest prefix onto the unit ring.
pub const RING_SCALE: f64 = 0xFFFF_FFFF_u32 as f64;

/// Maps a 32-bit digest prefix onto the ring.
///
/// `u32::MAX` maps to exactly `1.0`, which routes like `0.0`'s successor
/// would: nothing is greater, so the resolver wraps to the first vnode.
#[inline]
pub fn normalise(raw: u32) -> f64 {
    f64::from(raw) / RING_SCALE
}

/// Clockwise distance from `from` to `to`.
///
/// ```
/// use corelib::ring::position::ring_distance;
///
/// assert!((ring_distance(0.2, 0.5) - 0.3).abs() < 1e-12);
/// assert!((ring_distance(0.9, 0.1) - 0.2).abs() < 1e-12);
/// assert_eq!(ring_distance(0.4, 0.4), 0.0);
/// ```
#[inline]
pub fn ring_distance(from: f64, to: f64) -> f64 {
    if to >= from {
        to - from
    } else {
        1.0 - from + to
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalise_bounds() {
        assert_eq!(normalise(0), 0.0);
        assert_eq!(normalise(u32::MAX), 1.0);
        assert!((normalise(u32::MAX / 2) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_wraparound_distance() {
        assert!((ring_distance(0.75, 0.25) - 0.5).abs() < 1e-12);
        assert!((ring_distance(0.25, 0.75) - 0.5).abs() < 1e-12);
    }
}
