//! Host-authoritative session coordinator
//!
//! Owns the game-state machine, the world, and the latest tilt received from
//! the controller. Inbound frames are applied as they arrive; feedback
//! messages come back out as values for the caller to send.

use crate::highscores::HighScores;
use crate::input::TiltVector;
use crate::protocol::{self, ControllerMessage, HostMessage};
use crate::settings::Settings;
use crate::sim::World;

/// Coarse game phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    /// Waiting for a controller
    Start,
    Playing,
    /// Run ended; only observable between game over and the automatic reset
    GameOver,
}

/// State of the link to the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    /// Controller gone; the session stays frozen
    Closed,
}

/// Single-slot holder for the most recent tilt
///
/// Every write replaces the previous value. A jump reads whatever is there,
/// which may be up to one sample stale relative to the button press.
#[derive(Debug, Clone, Default)]
pub struct TiltMailbox {
    slot: TiltVector,
    writes: u64,
}

impl TiltMailbox {
    pub fn replace(&mut self, tilt: TiltVector) {
        self.slot = tilt;
        self.writes += 1;
    }

    pub fn latest(&self) -> TiltVector {
        self.slot
    }

    /// Number of samples received
    pub fn writes(&self) -> u64 {
        self.writes
    }
}

/// A run that just ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub run: u32,
    pub height: u32,
    /// Rank on the session board, if it made it
    pub rank: Option<usize>,
}

/// Everything one tick produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionOutput {
    pub messages: Vec<HostMessage>,
    pub game_over: Option<RunSummary>,
}

/// Seed for the `run`-th world of a session (0-based)
pub fn run_seed(session_seed: u64, run: u32) -> u64 {
    session_seed.wrapping_add((run as u64).wrapping_mul(2654435761))
}

pub struct SessionCoordinator {
    settings: Settings,
    seed: u64,
    /// Completed runs
    runs: u32,
    phase: GamePhase,
    connection: ConnectionState,
    tilt: TiltMailbox,
    world: World,
    high_scores: HighScores,
    dropped_frames: u64,
}

impl SessionCoordinator {
    pub fn new(settings: Settings, seed: u64) -> Self {
        let world = World::new(&settings, run_seed(seed, 0));
        Self {
            settings,
            seed,
            runs: 0,
            phase: GamePhase::Start,
            connection: ConnectionState::Connecting,
            tilt: TiltMailbox::default(),
            world,
            high_scores: HighScores::new(),
            dropped_frames: 0,
        }
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn connection(&self) -> ConnectionState {
        self.connection
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    /// Mutable world access for tests and tooling
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn latest_tilt(&self) -> TiltVector {
        self.tilt.latest()
    }

    pub fn high_scores(&self) -> &HighScores {
        &self.high_scores
    }

    pub fn runs(&self) -> u32 {
        self.runs
    }

    /// Frames discarded as malformed or unknown
    pub fn dropped_frames(&self) -> u64 {
        self.dropped_frames
    }

    /// A controller connected. Returns false if the session already had one
    /// (connected or lost); the caller should drop the new connection.
    pub fn controller_connected(&mut self) -> bool {
        if self.connection != ConnectionState::Connecting {
            return false;
        }
        self.connection = ConnectionState::Connected;
        self.phase = GamePhase::Playing;
        log::info!("Controller paired, run {} starting", self.runs + 1);
        true
    }

    /// The controller went away; the session freezes for good
    pub fn controller_disconnected(&mut self) {
        if self.connection == ConnectionState::Closed {
            return;
        }
        self.connection = ConnectionState::Closed;
        log::warn!(
            "Controller disconnected at {}m after {} tilt samples, session frozen",
            self.world.score.best,
            self.tilt.writes()
        );
    }

    fn accepting_input(&self) -> bool {
        self.connection == ConnectionState::Connected && self.phase == GamePhase::Playing
    }

    /// Decode and apply one raw frame from the controller
    pub fn handle_frame(&mut self, frame: &str) -> Vec<HostMessage> {
        match protocol::decode_controller(frame) {
            Ok(message) => self.handle_message(message),
            Err(e) => {
                self.dropped_frames += 1;
                log::debug!("Dropping controller frame: {e}");
                Vec::new()
            }
        }
    }

    /// Apply one decoded controller message
    pub fn handle_message(&mut self, message: ControllerMessage) -> Vec<HostMessage> {
        if !self.accepting_input() {
            return Vec::new();
        }

        match message {
            ControllerMessage::Tilt { vector } => {
                if !vector.is_finite() {
                    self.dropped_frames += 1;
                    return Vec::new();
                }
                let mut vector = vector;
                vector.magnitude = vector.magnitude.clamp(0.0, self.settings.input.max_magnitude);
                self.tilt.replace(vector);
                Vec::new()
            }
            ControllerMessage::Jump => {
                let tilt = self.tilt.latest();
                match self.world.jump(&tilt) {
                    Some(impulse) => {
                        log::debug!(
                            "Jump: force {:.2} at {:.3} rad",
                            impulse.force,
                            impulse.angle
                        );
                        vec![HostMessage::Vibrate {
                            duration: impulse.vibrate_ms,
                        }]
                    }
                    None => Vec::new(),
                }
            }
        }
    }

    /// Advance the simulation one frame
    pub fn tick(&mut self, dt: f32) -> SessionOutput {
        let mut output = SessionOutput::default();
        if !self.accepting_input() {
            return output;
        }

        let outcome = self.world.tick(dt);
        if let Some(height) = outcome.score_report {
            output.messages.push(HostMessage::score_meters(height));
        }

        if outcome.game_over {
            self.phase = GamePhase::GameOver;
            output.game_over = Some(self.finish_run());
            self.reset();
        }

        output
    }

    fn finish_run(&mut self) -> RunSummary {
        self.runs += 1;
        let height = self.world.score.best;
        let rank = self.high_scores.add_run(height, self.runs, self.world.seed);
        log::info!("Game over: run {} reached {}m", self.runs, height);
        if log::log_enabled!(log::Level::Debug) {
            match serde_json::to_string(&self.world.snapshot()) {
                Ok(json) => log::debug!("Final world: {json}"),
                Err(e) => log::debug!("Could not serialize final world: {e}"),
            }
        }
        if rank == Some(1) {
            log::info!("New session best: {height}m");
        }
        RunSummary {
            run: self.runs,
            height,
            rank,
        }
    }

    /// Fresh world for the next run, keeping the pairing and latest tilt
    pub fn reset(&mut self) {
        self.world = World::new(&self.settings, run_seed(self.seed, self.runs));
        if self.phase == GamePhase::GameOver {
            self.phase = GamePhase::Playing;
        }
    }
}
