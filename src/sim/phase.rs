//! Game phase state machine
//!
//! ```text
//! Menu ──Start──▶ Playing ──Lethal──▶ GameOver ──Restart──▶ Playing
//!                    │
//!                    └──WinReached──▶ Win ──Restart──▶ Playing
//! ```
//!
//! Any trigger without an edge from the current phase is ignored.

use serde::{Deserialize, Serialize};

/// Current phase of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GamePhase {
    /// Waiting for the player to start
    #[default]
    Menu,
    /// Active gameplay
    Playing,
    /// Run ended by a lethal hit
    GameOver,
    /// Run ended by surviving long enough
    Win,
}

impl GamePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            GamePhase::Menu => "Menu",
            GamePhase::Playing => "Playing",
            GamePhase::GameOver => "Game Over",
            GamePhase::Win => "Win",
        }
    }

    /// Run is over and waiting for a restart
    pub fn is_finished(&self) -> bool {
        matches!(self, GamePhase::GameOver | GamePhase::Win)
    }
}

/// Things that can move the machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Start action from the menu
    Start,
    /// Restart action after a finished run
    Restart,
    /// Health reached zero
    Lethal,
    /// Survival time reached the win threshold
    WinReached,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStateMachine {
    phase: GamePhase,
}

impl GameStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    /// Next phase for `trigger`, or `None` if the transition is not legal
    pub fn next(&self, trigger: Trigger) -> Option<GamePhase> {
        use GamePhase::*;
        match (self.phase, trigger) {
            (Menu, Trigger::Start) => Some(Playing),
            (GameOver | Win, Trigger::Restart) => Some(Playing),
            (Playing, Trigger::Lethal) => Some(GameOver),
            (Playing, Trigger::WinReached) => Some(Win),
            _ => None,
        }
    }

    /// Apply `trigger`; returns the new phase if it moved
    pub fn apply(&mut self, trigger: Trigger) -> Option<GamePhase> {
        let next = self.next(trigger)?;
        log::info!("Phase {} -> {} ({:?})", self.phase.as_str(), next.as_str(), trigger);
        self.phase = next;
        Some(next)
    }
}
