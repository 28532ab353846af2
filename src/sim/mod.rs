//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Seeded RNG only
//! - Stable iteration order (spawn order within each pool)
//! - No rendering or platform dependencies

pub mod collision;
pub mod difficulty;
pub mod entity;
pub mod phase;
pub mod pool;
pub mod state;
pub mod tick;

pub use collision::{CollisionEvent, CollisionResolver, CollisionRules, HitShape, Resolution, Vitals};
pub use difficulty::{Difficulty, DifficultyRamp};
pub use entity::{Entity, EntityId, EntityKind, Payload};
pub use phase::{GamePhase, GameStateMachine, Trigger};
pub use pool::{DespawnPolicy, EntityPool, SpawnSpec, SweepReport};
pub use state::{GameEvent, GameSession, HudSnapshot, Particle, Player};
pub use tick::{TickInput, autopilot_axis, tick};
