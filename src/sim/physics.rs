//! Avatar jump and sub-stepped integration

use std::f32::consts::PI;

use glam::Vec2;

use super::collision::{push_out, reflect_velocity, sweep_circle};
use super::state::{Avatar, AvatarState, CollisionResponse, Platform};
use crate::consts::NOMINAL_FRAME_RATE;
use crate::input::TiltVector;
use crate::settings::PhysicsTuning;
use crate::{normalize_angle, polar_to_cartesian};

/// Gap kept between a stuck avatar and the face it rests on
const CONTACT_SKIN: f32 = 0.01;
/// Overlapping platforms can push the avatar from one into another
const MAX_DEPENETRATION_PASSES: usize = 4;

/// A launched jump
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JumpImpulse {
    pub force: f32,
    /// Launch direction (radians, world space)
    pub angle: f32,
    /// Haptic pulse to request on the controller
    pub vibrate_ms: u32,
}

/// Horizontal limits and the death line for one frame
#[derive(Debug, Clone, Copy)]
pub struct Arena {
    pub width: f32,
    /// Avatar y beyond this ends the run
    pub death_y: f32,
}

/// What happened during one `integrate` call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepReport {
    /// Platform id the avatar stuck to
    pub landed_on: Option<u32>,
    pub bounces: u32,
    /// Hit a side boundary
    pub hit_boundary: bool,
    /// Fell past the death line
    pub fell: bool,
}

/// Launch the avatar away from the tilt direction
///
/// Only legal while stuck; returns `None` otherwise. The controller aims like
/// a slingshot anchor, so the launch angle is the tilt angle plus π.
pub fn jump(avatar: &mut Avatar, tilt: &TiltVector, tuning: &PhysicsTuning) -> Option<JumpImpulse> {
    if !avatar.is_stuck() {
        return None;
    }

    let magnitude = if tilt.magnitude.is_finite() {
        tilt.magnitude.max(0.0)
    } else {
        0.0
    };
    let force = (magnitude * tuning.force_multiplier).min(tuning.force_cap);
    let angle = normalize_angle(tilt.angle + PI);

    avatar.vel = polar_to_cartesian(force, angle);
    avatar.state = AvatarState::Airborne;

    Some(JumpImpulse {
        force,
        angle,
        vibrate_ms: (force * tuning.vibrate_ms_per_force).floor() as u32,
    })
}

/// Advance an airborne avatar by one frame
///
/// Gravity and friction are applied once per frame. The positional update is
/// split into `tuning.substeps` equal pieces, each swept against every
/// platform. A stick ends the frame; a bounce keeps sub-stepping with the
/// reflected velocity. An avatar found inside a platform (after the wall clamp,
/// or spawned there) is pushed out through the nearest face before it moves.
/// A stuck avatar is left untouched.
pub fn integrate(
    avatar: &mut Avatar,
    platforms: &[Platform],
    arena: &Arena,
    tuning: &PhysicsTuning,
    dt: f32,
) -> StepReport {
    let mut report = StepReport::default();
    if avatar.is_stuck() {
        return report;
    }

    let frames = (dt * NOMINAL_FRAME_RATE).max(0.0);
    avatar.vel.y += tuning.gravity * frames;
    avatar.vel.x *= tuning.friction.powf(frames);
    avatar.vel = clamp_speed(avatar.vel, tuning.max_speed);

    let substeps = tuning.substeps.max(1);
    let step_frames = frames / substeps as f32;
    let x_range = (avatar.radius, arena.width - avatar.radius);

    for _ in 0..substeps {
        depenetrate(avatar, platforms, x_range);
        let start = avatar.pos;
        let proposed = start + avatar.vel * step_frames;

        let hit = sweep_circle(
            start,
            proposed,
            avatar.radius,
            platforms.iter().map(|p| &p.rect),
        );
        let Some(hit) = hit else {
            avatar.pos = proposed;
            continue;
        };

        let platform = &platforms[hit.index];
        match platform.kind.response() {
            CollisionResponse::Stick => {
                avatar.stick_at(hit.point + hit.normal * CONTACT_SKIN);
                report.landed_on = Some(platform.id);
                break;
            }
            CollisionResponse::Reflect => {
                avatar.vel = bounce_velocity(avatar.vel, hit.normal, tuning);
                avatar.pos = hit.point + hit.normal * tuning.bounce_nudge;
                report.bounces += 1;
            }
        }
    }

    report.hit_boundary = clamp_to_bounds(avatar, arena.width, tuning.boundary_restitution);
    if !avatar.is_stuck() {
        depenetrate(avatar, platforms, x_range);
    }
    report.fell = avatar.pos.y > arena.death_y;
    report
}

/// Mirror `vel` about `normal`, scaled by the bounce gain
///
/// The gain is applied in full; `max_speed` only caps the velocity at the
/// start of the next frame.
pub fn bounce_velocity(vel: Vec2, normal: Vec2, tuning: &PhysicsTuning) -> Vec2 {
    let reflected = if vel.dot(normal) < 0.0 {
        reflect_velocity(vel, normal)
    } else {
        vel
    };
    reflected * tuning.bounce_gain
}

/// Push the avatar out of every platform it has sunk into
fn depenetrate(avatar: &mut Avatar, platforms: &[Platform], x_range: (f32, f32)) {
    for _ in 0..MAX_DEPENETRATION_PASSES {
        let mut pushed = false;
        for platform in platforms {
            if let Some((pos, _)) =
                push_out(avatar.pos, avatar.radius, &platform.rect, CONTACT_SKIN, x_range)
            {
                avatar.pos = pos;
                pushed = true;
            }
        }
        if !pushed {
            break;
        }
    }
}

fn clamp_speed(vel: Vec2, max_speed: f32) -> Vec2 {
    if vel.is_finite() {
        vel.clamp_length_max(max_speed)
    } else {
        Vec2::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SIM_DT;
    use crate::sim::state::{PlatformKind, Rect};

    const FORCE: f32 = crate::consts::FORCE_MULTIPLIER;

    fn tuning() -> PhysicsTuning {
        PhysicsTuning::default()
    }

    fn arena() -> Arena {
        Arena {
            width: 800.0,
            death_y: 10_000.0,
        }
    }

    fn slab(id: u32, kind: PlatformKind, y: f32) -> Platform {
        Platform {
            id,
            kind,
            rect: Rect::new(0.0, y, 800.0, 20.0),
        }
    }

    #[test]
    fn test_jump_leaps_away_from_tilt() {
        let mut avatar = Avatar::new(Vec2::new(100.0, 100.0), 15.0);
        let tilt = TiltVector::from_components(10.0, -10.0, 100.0);
        let impulse = jump(&mut avatar, &tilt, &tuning()).unwrap();

        assert_eq!(avatar.state, AvatarState::Airborne);
        let expected_force = (tilt.magnitude * FORCE).min(25.0);
        assert!((impulse.force - expected_force).abs() < 1e-4);
        assert!((avatar.vel.length() - expected_force).abs() < 1e-4);
        let vel_angle = avatar.vel.y.atan2(avatar.vel.x);
        assert!((vel_angle - normalize_angle(tilt.angle + PI)).abs() < 1e-4);
        assert_eq!(impulse.vibrate_ms, (expected_force * 5.0).floor() as u32);
    }

    #[test]
    fn test_jump_force_is_capped() {
        let mut avatar = Avatar::new(Vec2::ZERO, 15.0);
        let tilt = TiltVector::from_components(0.0, 100.0, 100.0);
        let impulse = jump(&mut avatar, &tilt, &tuning()).unwrap();
        assert_eq!(impulse.force, 25.0);
        assert_eq!(impulse.vibrate_ms, 125);
    }

    #[test]
    fn test_jump_ignored_while_airborne() {
        let mut avatar = Avatar::new(Vec2::ZERO, 15.0);
        avatar.state = AvatarState::Airborne;
        avatar.vel = Vec2::new(1.0, 2.0);
        let tilt = TiltVector::from_components(30.0, 30.0, 100.0);
        assert!(jump(&mut avatar, &tilt, &tuning()).is_none());
        assert_eq!(avatar.vel, Vec2::new(1.0, 2.0));
    }

    #[test]
    fn test_stuck_avatar_is_left_alone() {
        let mut avatar = Avatar::new(Vec2::new(100.0, 85.0), 15.0);
        let platforms = vec![slab(1, PlatformKind::Normal, 100.0)];
        for _ in 0..10 {
            let report = integrate(&mut avatar, &platforms, &arena(), &tuning(), SIM_DT);
            assert_eq!(report, StepReport::default());
        }
        assert_eq!(avatar.pos, Vec2::new(100.0, 85.0));
        assert_eq!(avatar.vel, Vec2::ZERO);
    }

    #[test]
    fn test_falling_avatar_lands_and_sticks() {
        let mut avatar = Avatar::new(Vec2::new(100.0, 40.0), 15.0);
        avatar.state = AvatarState::Airborne;
        let platforms = vec![slab(7, PlatformKind::Normal, 100.0)];

        let mut landed = None;
        for _ in 0..120 {
            let report = integrate(&mut avatar, &platforms, &arena(), &tuning(), SIM_DT);
            if report.landed_on.is_some() {
                landed = report.landed_on;
                break;
            }
        }

        assert_eq!(landed, Some(7));
        assert!(avatar.is_stuck());
        assert_eq!(avatar.vel, Vec2::ZERO);
        assert!((avatar.pos.y - 85.0).abs() < 0.05);
    }

    #[test]
    fn test_single_substep_does_not_tunnel() {
        let mut t = tuning();
        t.substeps = 1;
        t.max_speed = 500.0;
        let mut avatar = Avatar::new(Vec2::new(100.0, 0.0), 5.0);
        avatar.state = AvatarState::Airborne;
        avatar.vel = Vec2::new(0.0, 300.0);
        let platforms = vec![slab(3, PlatformKind::Vertical, 100.0)];

        let report = integrate(&mut avatar, &platforms, &arena(), &t, SIM_DT);
        assert_eq!(report.landed_on, Some(3));
        assert!(avatar.pos.y < 100.0);
    }

    #[test]
    fn test_jump_from_platform_leaves_it() {
        let mut avatar = Avatar::new(Vec2::new(100.0, 85.0 - CONTACT_SKIN), 15.0);
        let platforms = vec![slab(1, PlatformKind::Normal, 100.0)];
        let tilt = TiltVector::from_components(0.0, 50.0, 100.0);
        jump(&mut avatar, &tilt, &tuning()).unwrap();

        let report = integrate(&mut avatar, &platforms, &arena(), &tuning(), SIM_DT);
        assert_eq!(report.landed_on, None);
        assert!(!avatar.is_stuck());
        assert!(avatar.pos.y < 85.0);
    }

    #[test]
    fn test_bounce_mirrors_and_gains_speed() {
        let t = tuning();
        let vel = Vec2::new(3.0, 4.0);
        let normal = Vec2::new(0.0, -1.0);
        let out = bounce_velocity(vel, normal, &t);

        assert!((out.length() - vel.length() * t.bounce_gain).abs() < 1e-4);
        assert!((out.x - 3.0 * t.bounce_gain).abs() < 1e-4);
        assert!((out.y + 4.0 * t.bounce_gain).abs() < 1e-4);
    }

    #[test]
    fn test_bouncy_platform_keeps_avatar_airborne() {
        let mut avatar = Avatar::new(Vec2::new(100.0, 80.0), 15.0);
        avatar.state = AvatarState::Airborne;
        avatar.vel = Vec2::new(2.0, 8.0);
        let platforms = vec![slab(2, PlatformKind::Bouncy, 100.0)];

        let report = integrate(&mut avatar, &platforms, &arena(), &tuning(), SIM_DT);
        assert_eq!(report.bounces, 1);
        assert_eq!(avatar.state, AvatarState::Airborne);
        assert!(avatar.vel.y < 0.0);
        assert!(avatar.pos.y < 85.0);
    }

    fn inside_inflated(avatar: &Avatar, rect: &Rect) -> bool {
        let b = rect.inflate(avatar.radius);
        let (lo, hi) = (b.min(), b.max());
        avatar.pos.x > lo.x && avatar.pos.x < hi.x && avatar.pos.y > lo.y && avatar.pos.y < hi.y
    }

    #[test]
    fn test_wall_clamp_never_leaves_avatar_inside_platform() {
        // The left gap (28) is narrower than the avatar, so the clamp lands
        // it inside the platform's inflated box
        let ledge = Platform {
            id: 1,
            kind: PlatformKind::Normal,
            rect: Rect::new(28.0, 100.0, 100.0, 20.0),
        };
        let platforms = vec![ledge.clone()];
        let mut avatar = Avatar::new(Vec2::new(15.0, 70.0), 15.0);
        avatar.state = AvatarState::Airborne;
        avatar.vel = Vec2::new(-10.0, 40.0);

        integrate(&mut avatar, &platforms, &arena(), &tuning(), SIM_DT);
        assert!(!inside_inflated(&avatar, &ledge.rect), "at {:?}", avatar.pos);
        assert!(avatar.pos.x >= 15.0);

        let start_y = avatar.pos.y;
        for _ in 0..30 {
            integrate(&mut avatar, &platforms, &arena(), &tuning(), SIM_DT);
        }
        assert!(!avatar.is_stuck());
        assert!(avatar.pos.y > start_y + 50.0);
    }

    #[test]
    fn test_jump_from_inside_platform_escapes() {
        let ledge = Rect::new(28.0, 100.0, 100.0, 20.0);
        let platforms = vec![Platform {
            id: 1,
            kind: PlatformKind::Normal,
            rect: ledge,
        }];
        let sunk = Vec2::new(15.0, 110.5);

        // Downward launch: pushed out the bottom, then falls free
        let mut avatar = Avatar::new(sunk, 15.0);
        let tilt = TiltVector::from_components(0.0, -50.0, 100.0);
        jump(&mut avatar, &tilt, &tuning()).unwrap();
        let report = integrate(&mut avatar, &platforms, &arena(), &tuning(), SIM_DT);
        assert_eq!(report.landed_on, None);
        assert!(avatar.pos.y > 135.0);

        // Upward launch: re-sticks under the ledge, never inside it
        let mut avatar = Avatar::new(sunk, 15.0);
        let tilt = TiltVector::from_components(0.0, 50.0, 100.0);
        jump(&mut avatar, &tilt, &tuning()).unwrap();
        integrate(&mut avatar, &platforms, &arena(), &tuning(), SIM_DT);
        assert!(!inside_inflated(&avatar, &ledge));
    }

    #[test]
    fn test_sunk_into_bouncy_platform_does_not_hover() {
        let bouncy = slab(2, PlatformKind::Bouncy, 100.0);
        let platforms = vec![bouncy.clone()];
        let mut avatar = Avatar::new(Vec2::new(400.0, 110.0), 15.0);
        avatar.state = AvatarState::Airborne;
        avatar.vel = Vec2::new(0.0, -10.0);

        let report = integrate(&mut avatar, &platforms, &arena(), &tuning(), SIM_DT);
        assert!(report.bounces <= 1);
        assert!(!inside_inflated(&avatar, &bouncy.rect));

        let mut last = avatar.pos;
        for _ in 0..5 {
            integrate(&mut avatar, &platforms, &arena(), &tuning(), SIM_DT);
            assert!(!inside_inflated(&avatar, &bouncy.rect));
            assert_ne!(avatar.pos, last);
            last = avatar.pos;
        }
    }

    #[test]
    fn test_bounce_gain_exceeds_max_speed() {
        let t = tuning();
        let vel = Vec2::new(0.0, 58.0);
        let out = bounce_velocity(vel, Vec2::NEG_Y, &t);
        assert!((out.length() - 58.0 * t.bounce_gain).abs() < 1e-3);
        assert!(out.length() > t.max_speed);
    }

    #[test]
    fn test_boundary_reflection() {
        let mut avatar = Avatar::new(Vec2::new(14.0, 300.0), 15.0);
        avatar.state = AvatarState::Airborne;
        avatar.vel = Vec2::new(-5.0, 0.0);

        assert!(clamp_to_bounds(&mut avatar, 800.0, 0.8));
        assert_eq!(avatar.pos.x, 15.0);
        assert!((avatar.vel.x - 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_fall_past_death_line() {
        let mut avatar = Avatar::new(Vec2::new(100.0, 495.0), 15.0);
        avatar.state = AvatarState::Airborne;
        avatar.vel = Vec2::new(0.0, 10.0);
        let report = integrate(
            &mut avatar,
            &[],
            &Arena {
                width: 800.0,
                death_y: 500.0,
            },
            &tuning(),
            SIM_DT,
        );
        assert!(report.fell);
    }
}
