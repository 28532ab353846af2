//! Transient entity types
//!
//! Entities are plain gameplay data. Rendering reads them but never stores
//! gameplay state on scene nodes.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Pool-local entity handle (never reused within a pool)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u32);

/// Entity categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Obstacle,
    Collectible,
    Projectile,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Obstacle => "obstacle",
            EntityKind::Collectible => "collectible",
            EntityKind::Projectile => "projectile",
        }
    }
}

/// Per-kind gameplay data
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Payload {
    /// Health removed on contact
    Obstacle { damage: i32 },
    /// Score granted on pickup
    Collectible { reward: u64 },
    /// Seconds of flight left
    Projectile { ttl: f32 },
}

impl Payload {
    pub fn kind(&self) -> EntityKind {
        match self {
            Payload::Obstacle { .. } => EntityKind::Obstacle,
            Payload::Collectible { .. } => EntityKind::Collectible,
            Payload::Projectile { .. } => EntityKind::Projectile,
        }
    }
}

/// One spawned game object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub pos: Vec3,
    /// Own velocity along +z (toward the player), added to world scroll
    pub velocity: f32,
    /// Half-extent used for hit tests
    pub radius: f32,
    /// Cosmetic rotation (radians)
    pub spin: f32,
    /// Inactive entities are invisible to rendering, collisions and counts
    pub active: bool,
    pub payload: Payload,
}

impl Entity {
    pub fn new(id: EntityId, pos: Vec3, radius: f32, payload: Payload) -> Self {
        Self {
            id,
            pos,
            velocity: 0.0,
            radius,
            spin: 0.0,
            active: true,
            payload,
        }
    }

    #[inline]
    pub fn kind(&self) -> EntityKind {
        self.payload.kind()
    }

    /// True once a projectile has used up its flight time
    pub fn expired(&self) -> bool {
        matches!(self.payload, Payload::Projectile { ttl } if ttl <= 0.0)
    }
}
