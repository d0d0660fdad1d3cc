//! Fixed timestep world tick
//!
//! One call advances a run by one frame: physics, camera, score, level
//! generation and pruning, then the death check.

use glam::Vec2;
use serde::Serialize;

use super::generator::WorldGenerator;
use super::physics::{self, Arena, JumpImpulse};
use super::state::{Avatar, Camera, Platform, ScoreTracker, spawn_point};
use crate::input::TiltVector;
use crate::settings::Settings;

/// Result of one frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickOutcome {
    /// Best height if it crossed a new report step this frame
    pub score_report: Option<u32>,
    /// Platform id landed on this frame
    pub landed_on: Option<u32>,
    pub bounces: u32,
    /// The avatar fell below the death line; the run is over
    pub game_over: bool,
}

/// Complete world for one run
#[derive(Debug, Clone)]
pub struct World {
    settings: Settings,
    pub seed: u64,
    pub avatar: Avatar,
    pub camera: Camera,
    pub score: ScoreTracker,
    generator: WorldGenerator,
    start_y: f32,
    /// Simulation tick counter
    pub time_ticks: u64,
}

impl World {
    /// Build a fresh run with the given seed
    pub fn new(settings: &Settings, seed: u64) -> Self {
        let spawn = spawn_point(settings);
        let mut generator = WorldGenerator::new(settings.world.clone(), seed);
        generator.generate_initial();
        let camera = Camera::new(0.0);
        generator.extend(camera.offset);

        Self {
            settings: settings.clone(),
            seed,
            avatar: Avatar::new(spawn, settings.physics.avatar_radius),
            camera,
            score: ScoreTracker::default(),
            generator,
            start_y: spawn.y,
            time_ticks: 0,
        }
    }

    pub fn platforms(&self) -> &[Platform] {
        self.generator.platforms()
    }

    /// Height above the spawn point, in meters (negative below it)
    pub fn height_meters(&self) -> f32 {
        (self.start_y - self.avatar.pos.y) / self.settings.score.units_per_meter
    }

    /// World y past which the avatar is dead
    pub fn death_y(&self) -> f32 {
        self.camera.offset + self.settings.world.viewport_height + self.settings.world.death_margin
    }

    /// Request a jump with the given tilt; no-op unless the avatar is stuck
    pub fn jump(&mut self, tilt: &TiltVector) -> Option<JumpImpulse> {
        physics::jump(&mut self.avatar, tilt, &self.settings.physics)
    }

    /// Advance one frame of `dt` seconds
    pub fn tick(&mut self, dt: f32) -> TickOutcome {
        self.time_ticks += 1;
        let mut outcome = TickOutcome::default();

        let arena = Arena {
            width: self.settings.world.width,
            death_y: self.death_y(),
        };
        let report = physics::integrate(
            &mut self.avatar,
            self.generator.platforms(),
            &arena,
            &self.settings.physics,
            dt,
        );
        outcome.landed_on = report.landed_on;
        outcome.bounces = report.bounces;

        let target = self.avatar.pos.y - self.settings.world.viewport_height * self.settings.camera.anchor;
        self.camera.follow(target, dt, &self.settings.camera);

        if self.score.observe(self.height_meters()) {
            outcome.score_report = self.score.take_report(self.settings.score.report_step);
        }

        self.generator.extend(self.camera.offset);
        self.generator.prune(self.camera.offset);

        outcome.game_over = report.fell || self.avatar.pos.y > self.death_y();
        outcome
    }

    /// JSON snapshot for debugging
    pub fn snapshot(&self) -> WorldSnapshot<'_> {
        WorldSnapshot {
            seed: self.seed,
            time_ticks: self.time_ticks,
            avatar: &self.avatar,
            camera: self.camera.offset,
            best_height: self.score.best,
            platforms: self.generator.platforms(),
        }
    }

    /// Spawn position of this run
    pub fn spawn(&self) -> Vec2 {
        spawn_point(&self.settings)
    }
}

/// Borrowed, serializable view of a world
#[derive(Debug, Serialize)]
pub struct WorldSnapshot<'a> {
    pub seed: u64,
    pub time_ticks: u64,
    pub avatar: &'a Avatar,
    pub camera: f32,
    pub best_height: u32,
    pub platforms: &'a [Platform],
}
