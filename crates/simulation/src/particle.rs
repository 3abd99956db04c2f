//! Request particle lifecycle.
//!
//! A particle animates one routed request in three phases:
//!
//! ```text
//!  initial ──progress >= 1──▶ ring ──current == end──▶ completed
//! (centre → ring start)   (clockwise to target)       (terminal)
//! ```
//!
//! The particle is plain data advanced by [`Particle::advance`]; whatever
//! owns it collects the returned events instead of receiving messages.

use crate::config::{Dimensions, SpeedConfig};
use crate::geometry::{center, to_xy, Point};
use corelib::ring::ring_distance;
use serde::Serialize;

/// Spawn animation runs this many times faster than ring travel.
pub const INITIAL_SPEED_FACTOR: f64 = 5.0;

/// Slack used only to detect arrival; the stored position is snapped exactly.
pub const ARRIVAL_EPSILON: f64 = 1e-8;

/// Identifier of a particle, unique within one orchestrator.
pub type ParticleId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticlePhase {
    Initial,
    Ring,
    Completed,
}

/// What the rendering layer needs about a particle after a tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParticleSnapshot {
    pub id: ParticleId,
    pub request_key: String,
    pub phase: ParticlePhase,
    pub current_pos: f64,
    pub x: f64,
    pub y: f64,
    pub is_completed: bool,
}

/// Emitted once when a particle reaches its target.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParticleCompletion {
    pub id: ParticleId,
    pub request_key: String,
    pub ring_start_pos: f64,
    pub ring_end_pos: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParticleEvent {
    Moved(ParticleSnapshot),
    Completed(ParticleCompletion),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    id: ParticleId,
    request_key: String,
    phase: ParticlePhase,
    speed: SpeedConfig,
    dimensions: Dimensions,
    ring_start_pos: f64,
    ring_end_pos: f64,
    current_pos: f64,
    initial_progress: f64,
    initial_frames: u32,
    ring_frames: u32,
}

impl Particle {
    pub fn new(
        id: ParticleId,
        request_key: impl Into<String>,
        ring_start_pos: f64,
        ring_end_pos: f64,
        speed: SpeedConfig,
        dimensions: Dimensions,
    ) -> Self {
        Self {
            id,
            request_key: request_key.into(),
            phase: ParticlePhase::Initial,
            speed,
            dimensions,
            ring_start_pos,
            ring_end_pos,
            current_pos: ring_start_pos,
            initial_progress: 0.0,
            initial_frames: 0,
            ring_frames: 0,
        }
    }

    pub fn id(&self) -> ParticleId {
        self.id
    }

    pub fn request_key(&self) -> &str {
        &self.request_key
    }

    pub fn phase(&self) -> ParticlePhase {
        self.phase
    }

    pub fn is_completed(&self) -> bool {
        self.phase == ParticlePhase::Completed
    }

    pub fn ring_start_pos(&self) -> f64 {
        self.ring_start_pos
    }

    pub fn ring_end_pos(&self) -> f64 {
        self.ring_end_pos
    }

    pub fn current_pos(&self) -> f64 {
        self.current_pos
    }

    /// Spawn animation progress; may exceed 1 on the tick it finishes.
    pub fn initial_progress(&self) -> f64 {
        self.initial_progress
    }

    /// Ticks spent in the spawn animation and on the ring.
    pub fn frames(&self) -> (u32, u32) {
        (self.initial_frames, self.ring_frames)
    }

    pub fn speed(&self) -> SpeedConfig {
        self.speed
    }

    pub fn set_speed(&mut self, speed: SpeedConfig) {
        self.speed = speed;
    }

    pub fn set_dimensions(&mut self, dimensions: Dimensions) {
        self.dimensions = dimensions;
    }

    /// Points the particle at a new target. Completed particles keep theirs.
    pub fn retarget(&mut self, ring_end_pos: f64) -> bool {
        if self.is_completed() {
            return false;
        }
        self.ring_end_pos = ring_end_pos;
        true
    }

    /// Pixel position: on the line from the centre to the ring start while
    /// spawning, on the ring afterwards.
    pub fn point(&self) -> Point {
        match self.phase {
            ParticlePhase::Initial => center(&self.dimensions).lerp(
                to_xy(self.ring_start_pos, &self.dimensions),
                self.initial_progress,
            ),
            ParticlePhase::Ring | ParticlePhase::Completed => {
                to_xy(self.current_pos, &self.dimensions)
            }
        }
    }

    pub fn snapshot(&self) -> ParticleSnapshot {
        let Point { x, y } = self.point();
        ParticleSnapshot {
            id: self.id,
            request_key: self.request_key.clone(),
            phase: self.phase,
            current_pos: self.current_pos,
            x,
            y,
            is_completed: self.is_completed(),
        }
    }

    /// Advances one tick of `delta_ms` milliseconds.
    ///
    /// Returns a `Moved` event for every tick processed, followed by a
    /// `Completed` event on the tick the particle arrives. Completed
    /// particles ignore ticks and return nothing.
    pub fn advance(&mut self, delta_ms: f64) -> Vec<ParticleEvent> {
        let step = self.speed.frame_adjusted(delta_ms.max(0.0));

        match self.phase {
            ParticlePhase::Completed => Vec::new(),
            ParticlePhase::Initial => {
                self.initial_progress += step * INITIAL_SPEED_FACTOR;
                self.initial_frames += 1;
                if self.initial_progress >= 1.0 {
                    self.phase = ParticlePhase::Ring;
                    self.current_pos = self.ring_start_pos;
                }
                vec![ParticleEvent::Moved(self.snapshot())]
            }
            ParticlePhase::Ring => {
                if !self.at_target() {
                    self.step_along_ring(step);
                }
                if !self.at_target() {
                    return vec![ParticleEvent::Moved(self.snapshot())];
                }

                self.phase = ParticlePhase::Completed;
                vec![
                    ParticleEvent::Moved(self.snapshot()),
                    ParticleEvent::Completed(ParticleCompletion {
                        id: self.id,
                        request_key: self.request_key.clone(),
                        ring_start_pos: self.ring_start_pos,
                        ring_end_pos: self.ring_end_pos,
                    }),
                ]
            }
        }
    }

    // Exact comparison: arrival stores ring_end_pos itself.
    #[allow(clippy::float_cmp)]
    fn at_target(&self) -> bool {
        self.current_pos == self.ring_end_pos
    }

    fn step_along_ring(&mut self, step: f64) {
        let mut next = self.current_pos + step;
        if next > 1.0 {
            next -= 1.0;
        }

        // A step of a full lap or more passes every point.
        let travelled = if step >= 1.0 {
            step
        } else {
            ring_distance(self.current_pos, next)
        };
        let needed = ring_distance(self.current_pos, self.ring_end_pos);

        if travelled + ARRIVAL_EPSILON >= needed {
            self.current_pos = self.ring_end_pos;
        } else {
            self.current_pos = next;
            self.ring_frames += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FRAME_MS;

    fn particle(start: f64, end: f64) -> Particle {
        Particle::new(
            1,
            "user_id_0001",
            start,
            end,
            SpeedConfig::default(),
            Dimensions::default(),
        )
    }

    fn run_until_ring(p: &mut Particle) -> usize {
        let mut ticks = 0;
        while p.phase() == ParticlePhase::Initial {
            p.advance(FRAME_MS);
            ticks += 1;
            assert!(ticks < 1_000, "spawn animation never finished");
        }
        ticks
    }

    #[test]
    fn test_starts_initial() {
        let p = particle(0.2, 0.5);
        assert_eq!(p.phase(), ParticlePhase::Initial);
        assert_eq!(p.initial_progress(), 0.0);
        assert_eq!(p.current_pos(), 0.2);
        assert_eq!(p.point(), center(&Dimensions::default()));
    }

    #[test]
    fn test_initial_to_ring() {
        let mut p = particle(0.2, 0.5);
        let ticks = run_until_ring(&mut p);

        // 0.002 * 5 per frame: 100 frames, give or take rounding
        assert!((99..=101).contains(&ticks), "took {ticks} ticks");
        assert!(p.initial_progress() >= 1.0);
        assert_eq!(p.current_pos(), 0.2);
        assert_eq!(p.point(), to_xy(0.2, &Dimensions::default()));
    }

    #[test]
    fn test_ring_travel_snaps_to_target() {
        let mut p = particle(0.2, 0.5);
        run_until_ring(&mut p);

        let mut completion = None;
        for _ in 0..400 {
            for event in p.advance(FRAME_MS) {
                if let ParticleEvent::Completed(c) = event {
                    completion = Some(c);
                }
            }
            if p.is_completed() {
                break;
            }
        }

        assert_eq!(p.phase(), ParticlePhase::Completed);
        assert_eq!(p.current_pos(), 0.5);
        let completion = completion.expect("completion event");
        assert_eq!(completion.ring_start_pos, 0.2);
        assert_eq!(completion.ring_end_pos, 0.5);
        // 0.3 / 0.002 = 150 steps
        assert!((148..=151).contains(&p.frames().1));
    }

    #[test]
    fn test_ring_travel_wraps() {
        let mut p = particle(0.95, 0.05);
        run_until_ring(&mut p);
        let mut saw_wrap = false;
        while !p.is_completed() {
            p.advance(FRAME_MS);
            if p.current_pos() < 0.5 {
                saw_wrap = true;
            }
        }
        assert!(saw_wrap);
        assert_eq!(p.current_pos(), 0.05);
    }

    #[test]
    fn test_target_at_start_completes_immediately() {
        let mut p = particle(0.3, 0.3);
        run_until_ring(&mut p);
        let events = p.advance(FRAME_MS);
        assert!(p.is_completed());
        assert!(matches!(events.last(), Some(ParticleEvent::Completed(_))));
    }

    #[test]
    fn test_completed_ignores_ticks() {
        let mut p = particle(0.3, 0.3);
        run_until_ring(&mut p);
        p.advance(FRAME_MS);
        assert!(p.advance(FRAME_MS).is_empty());
        assert!(!p.retarget(0.9));
        assert_eq!(p.ring_end_pos(), 0.3);
    }

    #[test]
    fn test_every_tick_reports_position() {
        let mut p = particle(0.1, 0.12);
        for _ in 0..200 {
            let events = p.advance(FRAME_MS);
            if p.is_completed() {
                assert_eq!(events.len(), 2);
                break;
            }
            assert!(matches!(events.as_slice(), [ParticleEvent::Moved(_)]));
        }
        assert!(p.is_completed());
    }

    #[test]
    fn test_speed_multiplier_shortens_travel() {
        let mut slow = particle(0.0, 0.4);
        let mut fast = particle(0.0, 0.4);
        fast.set_speed(SpeedConfig {
            speed_multiplier: 4.0,
            ..SpeedConfig::default()
        });

        let mut ticks = [0, 0];
        for (i, p) in [&mut slow, &mut fast].into_iter().enumerate() {
            while !p.is_completed() {
                p.advance(FRAME_MS);
                ticks[i] += 1;
            }
        }
        assert!(ticks[1] * 3 < ticks[0]);
    }

    #[test]
    fn test_huge_step_still_arrives() {
        let mut p = particle(0.6, 0.4);
        run_until_ring(&mut p);
        p.advance(FRAME_MS * 2_000.0);
        assert!(p.is_completed());
        assert_eq!(p.current_pos(), 0.4);
    }

    #[test]
    fn test_retarget_in_flight() {
        let mut p = particle(0.1, 0.9);
        run_until_ring(&mut p);
        assert!(p.retarget(0.15));
        while !p.is_completed() {
            p.advance(FRAME_MS);
        }
        assert_eq!(p.current_pos(), 0.15);
    }
}
