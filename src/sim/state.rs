//! World state and core simulation types
//!
//! Everything the host simulates for one run lives here. World y grows
//! downward, so climbing means decreasing y.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::settings::{CameraTuning, Settings};

/// Avatar state - resting against a platform or in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AvatarState {
    /// Resting on a platform, zero velocity, waiting for a jump
    Stuck,
    /// Subject to gravity and collision
    Airborne,
}

/// The ball-shaped avatar
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Avatar {
    pub pos: Vec2,
    /// World units per nominal frame
    pub vel: Vec2,
    pub radius: f32,
    pub state: AvatarState,
}

impl Avatar {
    pub fn new(pos: Vec2, radius: f32) -> Self {
        Self {
            pos,
            vel: Vec2::ZERO,
            radius,
            state: AvatarState::Stuck,
        }
    }

    #[inline]
    pub fn is_stuck(&self) -> bool {
        self.state == AvatarState::Stuck
    }

    /// Come to rest at `pos`
    pub fn stick_at(&mut self, pos: Vec2) {
        self.pos = pos;
        self.vel = Vec2::ZERO;
        self.state = AvatarState::Stuck;
    }
}

/// Axis-aligned rectangle, `y` is the top edge
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    #[inline]
    pub fn min(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    #[inline]
    pub fn max(&self) -> Vec2 {
        Vec2::new(self.x + self.w, self.y + self.h)
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.w * 0.5, self.y + self.h * 0.5)
    }

    #[inline]
    pub fn half_extents(&self) -> Vec2 {
        Vec2::new(self.w * 0.5, self.h * 0.5)
    }

    /// Grow by `amount` on every side
    pub fn inflate(&self, amount: f32) -> Rect {
        Rect::new(
            self.x - amount,
            self.y - amount,
            self.w + 2.0 * amount,
            self.h + 2.0 * amount,
        )
    }

    /// Bounding box of two points
    pub fn spanning(a: Vec2, b: Vec2) -> Rect {
        let lo = a.min(b);
        let hi = a.max(b);
        Rect::new(lo.x, lo.y, hi.x - lo.x, hi.y - lo.y)
    }

    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x <= other.x + other.w
            && other.x <= self.x + self.w
            && self.y <= other.y + other.h
            && other.y <= self.y + self.h
    }
}

/// What a contact with a platform does to the avatar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionResponse {
    /// Absorb: the avatar comes to rest at the contact point
    Stick,
    /// Elastic: mirror velocity about the normal with an energy gain
    Reflect,
}

/// Platform materials
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlatformKind {
    /// Full-width ground at the start of a run
    Floor,
    #[default]
    Normal,
    Bouncy,
    /// Tall and narrow wall segment
    Vertical,
}

impl PlatformKind {
    /// Collision response for this material
    pub const fn response(self) -> CollisionResponse {
        match self {
            PlatformKind::Floor | PlatformKind::Normal | PlatformKind::Vertical => {
                CollisionResponse::Stick
            }
            PlatformKind::Bouncy => CollisionResponse::Reflect,
        }
    }
}

/// A platform entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Platform {
    pub id: u32,
    pub kind: PlatformKind,
    pub rect: Rect,
}

/// Vertical scroll offset (world y at the top of the viewport)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Camera {
    pub offset: f32,
    /// Spring velocity (units/second)
    pub velocity: f32,
}

impl Camera {
    pub fn new(offset: f32) -> Self {
        Self {
            offset,
            velocity: 0.0,
        }
    }

    /// Critically damped follow toward `target`, never scrolling downward
    pub fn follow(&mut self, target: f32, dt: f32, tuning: &CameraTuning) {
        let omega = 2.0 / tuning.smooth_time;
        let x = omega * dt;
        let decay = 1.0 / (1.0 + x + 0.48 * x * x + 0.235 * x * x * x);
        let change = self.offset - target;
        let temp = (self.velocity + omega * change) * dt;
        let mut next = target + (change + temp) * decay;
        let mut velocity = (self.velocity - omega * temp) * decay;

        if target < self.offset && next < target {
            next = target;
            velocity = 0.0;
        }

        if next < self.offset {
            self.velocity = velocity;
            self.offset = next;
        } else {
            self.velocity = 0.0;
        }
    }
}

/// Height bookkeeping for a run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoreTracker {
    /// Best height climbed, in meters
    pub best: u32,
    /// Highest `best / report_step` already reported
    reported_bucket: u32,
}

impl ScoreTracker {
    /// Fold in the current height; returns true when `best` grew
    pub fn observe(&mut self, height_meters: f32) -> bool {
        if !height_meters.is_finite() || height_meters <= 0.0 {
            return false;
        }
        let meters = height_meters.floor() as u32;
        if meters > self.best {
            self.best = meters;
            true
        } else {
            false
        }
    }

    /// Returns the best height if it crossed a new reporting step
    pub fn take_report(&mut self, step: u32) -> Option<u32> {
        let bucket = self.best / step.max(1);
        if bucket > self.reported_bucket {
            self.reported_bucket = bucket;
            Some(self.best)
        } else {
            None
        }
    }
}

/// Starting position for the avatar: resting on top of the floor
pub fn spawn_point(settings: &Settings) -> Vec2 {
    Vec2::new(
        settings.world.width * 0.5,
        settings.world.floor_y - settings.physics.avatar_radius,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_material_responses() {
        assert_eq!(PlatformKind::Floor.response(), CollisionResponse::Stick);
        assert_eq!(PlatformKind::Normal.response(), CollisionResponse::Stick);
        assert_eq!(PlatformKind::Vertical.response(), CollisionResponse::Stick);
        assert_eq!(PlatformKind::Bouncy.response(), CollisionResponse::Reflect);
    }

    #[test]
    fn test_camera_never_scrolls_down() {
        let tuning = CameraTuning::default();
        let mut camera = Camera::new(0.0);
        for _ in 0..120 {
            camera.follow(-300.0, 1.0 / 60.0, &tuning);
        }
        let risen = camera.offset;
        assert!(risen < -250.0);

        for _ in 0..120 {
            camera.follow(500.0, 1.0 / 60.0, &tuning);
            assert!(camera.offset <= risen);
        }
        assert_eq!(camera.offset, risen);
    }

    #[test]
    fn test_camera_does_not_overshoot() {
        let tuning = CameraTuning::default();
        let mut camera = Camera::new(0.0);
        for _ in 0..600 {
            camera.follow(-100.0, 1.0 / 60.0, &tuning);
            assert!(camera.offset >= -100.0 - 1e-3);
        }
        assert!((camera.offset + 100.0).abs() < 0.5);
    }

    #[test]
    fn test_score_tracker_reports_each_step_once() {
        let mut score = ScoreTracker::default();
        assert!(score.observe(9.7));
        assert_eq!(score.take_report(10), None);
        assert!(score.observe(12.0));
        assert_eq!(score.take_report(10), Some(12));
        assert!(score.observe(15.0));
        assert_eq!(score.take_report(10), None);
        assert!(!score.observe(3.0));
        assert_eq!(score.best, 15);
    }

    #[test]
    fn test_rect_overlap_and_inflate() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(12.0, 0.0, 5.0, 5.0);
        assert!(!a.overlaps(&b));
        assert!(a.inflate(2.0).overlaps(&b));
        assert_eq!(a.inflate(2.0).center(), a.center());
    }
}
