//! XR Runner - spawn/recycle/collision engine for VR arcade minigames
//!
//! Core modules:
//! - `sim`: Deterministic simulation (entity pools, collisions, difficulty, phases)
//! - `platform`: Host collaborator interfaces (clock, input, renderer, effects, HUD)
//! - `game_loop`: Per-frame driver wiring the simulation to the host
//! - `persistence`: JSON save helpers and error types
//! - `highscores`, `settings`: the saved best score and preferences
//! - `audio`: sound effect names and the Web Audio synthesizer
//! - `tuning`: Data-driven game rules

pub mod audio;
pub mod game_loop;
pub mod highscores;
pub mod persistence;
pub mod platform;
pub mod settings;
pub mod sim;
pub mod tuning;

pub use game_loop::GameLoop;
pub use highscores::HighScore;
pub use settings::Settings;
pub use tuning::{GameConfig, Preset};

/// Engine-wide constants
pub mod consts {
    /// Largest frame delta the loop will integrate (backgrounded tabs report huge gaps)
    pub const MAX_FRAME_DT: f32 = 0.1;
    /// Nominal headset refresh rate used by the headless runner
    pub const HEADSET_DT: f32 = 1.0 / 72.0;
    /// Seed used when the host does not supply one
    pub const DEFAULT_SEED: u64 = 0x5EED_CAFE;
    /// Standing eye height in world units
    pub const DEFAULT_PLAYER_HEIGHT: f32 = 1.6;
}

/// Wrap an angle into [0, 2π)
#[inline]
pub fn wrap_angle(angle: f32) -> f32 {
    angle.rem_euclid(std::f32::consts::TAU)
}
