//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Caller-supplied timestep only
//! - Seeded RNG only
//! - Stable iteration order (platforms by id)
//! - No networking or platform dependencies

pub mod collision;
pub mod generator;
pub mod physics;
pub mod state;
pub mod tick;

pub use collision::{SweepHit, reflect_velocity, sweep_circle, sweep_circle_rect};
pub use generator::WorldGenerator;
pub use physics::{Arena, JumpImpulse, StepReport, integrate, jump};
pub use state::{Avatar, AvatarState, Camera, CollisionResponse, Platform, PlatformKind, Rect};
pub use tick::{TickOutcome, World, WorldSnapshot};
