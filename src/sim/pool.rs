//! Entity pools
//!
//! A pool owns every entity of one kind. Removal never splices the vector
//! mid-pass: entities are deactivated in place and the pool is compacted once
//! per tick, so a forward pass visits each entity exactly once no matter what
//! gets consumed along the way.
//!
//! Entities are kept in spawn order, which is also ascending `EntityId` order.

use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::collision::HitShape;
use super::entity::{Entity, EntityId, EntityKind, Payload};
use crate::tuning::PoolConfig;
use crate::wrap_angle;

/// What happens to an entity that falls behind the player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DespawnPolicy {
    /// Reposition it ahead of the player (constant density)
    #[default]
    Recycle,
    /// Drop it (paired with timed spawning)
    Remove,
}

/// Where and what to spawn
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnSpec {
    /// Half-width of the lateral band
    pub lateral_spread: f32,
    pub height: f32,
    /// Random vertical offset (+/-)
    pub vertical_jitter: f32,
    /// Distance ahead of the origin
    pub depth: f32,
    /// Extra random distance beyond `depth`
    pub depth_spread: f32,
    pub radius: f32,
    pub payload: Payload,
}

impl SpawnSpec {
    /// Spawn template for a configured pool
    pub fn for_pool(config: &PoolConfig, depth: f32, depth_spread: f32, payload: Payload) -> Self {
        Self {
            lateral_spread: config.lateral_spread,
            height: config.height,
            vertical_jitter: config.vertical_jitter,
            depth,
            depth_spread,
            radius: config.radius,
            payload,
        }
    }

    /// Random position `depth..depth + depth_spread` ahead of `origin`
    pub fn sample_position(&self, origin: Vec3, rng: &mut impl Rng) -> Vec3 {
        let ahead = self.depth + unit(rng) * self.depth_spread;
        self.sample_at_depth(origin, ahead, rng)
    }

    /// Random lateral/vertical position at an exact distance ahead of `origin`
    pub fn sample_at_depth(&self, origin: Vec3, ahead: f32, rng: &mut impl Rng) -> Vec3 {
        Vec3::new(
            symmetric(rng, self.lateral_spread),
            self.height + symmetric(rng, self.vertical_jitter),
            origin.z - ahead,
        )
    }
}

#[inline]
fn unit(rng: &mut impl Rng) -> f32 {
    rng.random::<f32>()
}

#[inline]
fn symmetric(rng: &mut impl Rng, half: f32) -> f32 {
    if half > 0.0 {
        rng.random_range(-half..=half)
    } else {
        0.0
    }
}

/// Outcome of a despawn sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub recycled: usize,
    pub removed: usize,
}

/// Homogeneous collection of transient entities
#[derive(Debug, Clone)]
pub struct EntityPool {
    kind: EntityKind,
    policy: DespawnPolicy,
    capacity: Option<usize>,
    /// Entities further than this behind the player are despawned
    despawn_threshold: f32,
    /// Hitbox discipline for proximity queries
    shape: HitShape,
    /// Whether world scroll moves these entities
    scrolls: bool,
    spin_rate: f32,
    entities: Vec<Entity>,
    next_id: u32,
}

impl EntityPool {
    pub fn new(kind: EntityKind, policy: DespawnPolicy) -> Self {
        Self {
            kind,
            policy,
            capacity: None,
            despawn_threshold: 5.0,
            shape: HitShape::Sphere,
            scrolls: true,
            spin_rate: 0.0,
            entities: Vec::new(),
            next_id: 1,
        }
    }

    /// Pool built from a rule set entry
    pub fn from_config(kind: EntityKind, config: &PoolConfig, despawn_threshold: f32) -> Self {
        let mut pool = Self::new(kind, config.policy)
            .with_despawn_threshold(despawn_threshold)
            .with_spin_rate(config.spin_rate)
            .with_shape(config.shape);
        pool.capacity = config.capacity;
        pool
    }

    pub fn with_capacity_limit(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    pub fn with_despawn_threshold(mut self, threshold: f32) -> Self {
        self.despawn_threshold = threshold;
        self
    }

    pub fn with_shape(mut self, shape: HitShape) -> Self {
        self.shape = shape;
        self
    }

    pub fn with_spin_rate(mut self, spin_rate: f32) -> Self {
        self.spin_rate = spin_rate;
        self
    }

    /// Entities move only by their own velocity (projectiles)
    pub fn unscrolled(mut self) -> Self {
        self.scrolls = false;
        self
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn policy(&self) -> DespawnPolicy {
        self.policy
    }

    /// Number of active entities
    pub fn len(&self) -> usize {
        self.entities.iter().filter(|e| e.active).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn at_capacity(&self) -> bool {
        self.capacity.is_some_and(|cap| self.len() >= cap)
    }

    /// Spawn one entity at a randomized position ahead of `origin`.
    /// Returns `None` (and spawns nothing) when the pool is full.
    pub fn spawn(&mut self, spec: &SpawnSpec, origin: Vec3, rng: &mut impl Rng) -> Option<EntityId> {
        if self.at_capacity() {
            log::debug!("{} pool full, spawn skipped", self.kind.as_str());
            return None;
        }
        let pos = spec.sample_position(origin, rng);
        self.spawn_at(pos, spec.radius, spec.payload)
    }

    /// Spawn one entity at an exact position
    pub fn spawn_at(&mut self, pos: Vec3, radius: f32, payload: Payload) -> Option<EntityId> {
        self.spawn_moving(pos, 0.0, radius, payload)
    }

    /// Spawn one entity with its own velocity along +z
    pub fn spawn_moving(
        &mut self,
        pos: Vec3,
        velocity: f32,
        radius: f32,
        payload: Payload,
    ) -> Option<EntityId> {
        if self.at_capacity() {
            return None;
        }
        debug_assert_eq!(payload.kind(), self.kind, "payload kind must match pool kind");
        let id = EntityId(self.next_id);
        self.next_id += 1;
        let mut entity = Entity::new(id, pos, radius, payload);
        entity.velocity = velocity;
        self.entities.push(entity);
        Some(id)
    }

    /// Place `count` entities spread between `near` and the spawn depth
    pub fn populate(&mut self, count: usize, spec: &SpawnSpec, origin: Vec3, near: f32, rng: &mut impl Rng) {
        let far = spec.depth + spec.depth_spread;
        let (lo, hi) = if near <= far { (near, far) } else { (far, near) };
        for _ in 0..count {
            let ahead = lo + unit(rng) * (hi - lo);
            let pos = spec.sample_at_depth(origin, ahead, rng);
            if self.spawn_at(pos, spec.radius, spec.payload).is_none() {
                break;
            }
        }
    }

    /// Move every active entity and burn projectile flight time
    pub fn advance(&mut self, dt: f32, world_speed: f32) {
        let scroll = if self.scrolls { world_speed } else { 0.0 };
        for entity in self.entities.iter_mut().filter(|e| e.active) {
            entity.pos.z += (scroll + entity.velocity) * dt;
            if self.spin_rate != 0.0 {
                entity.spin = wrap_angle(entity.spin + self.spin_rate * dt);
            }
            if let Payload::Projectile { ttl } = &mut entity.payload {
                *ttl -= dt;
            }
        }
    }

    /// Despawn entities that passed behind the player or ran out of flight
    /// time, then compact. Consumed entities are already inactive and are
    /// never despawned a second time.
    pub fn sweep(&mut self, player_pos: Vec3, respawn: &SpawnSpec, rng: &mut impl Rng) -> SweepReport {
        let mut report = SweepReport::default();
        for entity in self.entities.iter_mut().filter(|e| e.active) {
            if entity.expired() {
                entity.active = false;
                report.removed += 1;
                continue;
            }
            if entity.pos.z - player_pos.z <= self.despawn_threshold {
                continue;
            }
            match self.policy {
                DespawnPolicy::Recycle => {
                    entity.pos = respawn.sample_position(player_pos, rng);
                    entity.spin = 0.0;
                    report.recycled += 1;
                }
                DespawnPolicy::Remove => {
                    entity.active = false;
                    report.removed += 1;
                }
            }
        }
        self.compact();
        report
    }

    /// `advance` followed by `sweep`
    pub fn tick(
        &mut self,
        dt: f32,
        world_speed: f32,
        player_pos: Vec3,
        respawn: &SpawnSpec,
        rng: &mut impl Rng,
    ) -> SweepReport {
        self.advance(dt, world_speed);
        self.sweep(player_pos, respawn, rng)
    }

    /// Active entities overlapping a probe of `radius` at `point`
    /// (snapshot of ids, safe to remove from while iterating)
    pub fn query_near(&self, point: Vec3, radius: f32) -> Vec<EntityId> {
        self.iter_active()
            .filter(|e| self.shape.overlaps(point, e.pos, radius + e.radius))
            .map(|e| e.id)
            .collect()
    }

    /// Deactivate an entity. Returns false if it was already gone.
    pub fn remove(&mut self, id: EntityId) -> bool {
        match self.index_of(id) {
            Some(index) => self.consume_at(index),
            None => false,
        }
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.index_of(id)
            .map(|i| &self.entities[i])
            .filter(|e| e.active)
    }

    pub fn iter_active(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter().filter(|e| e.active)
    }

    /// Slot count including entities awaiting compaction
    pub fn slot_count(&self) -> usize {
        self.entities.len()
    }

    /// Entity in `index` if it is still active
    pub fn active_at(&self, index: usize) -> Option<&Entity> {
        self.entities.get(index).filter(|e| e.active)
    }

    /// Deactivate the entity in `index`; false if already inactive
    pub fn consume_at(&mut self, index: usize) -> bool {
        match self.entities.get_mut(index) {
            Some(entity) if entity.active => {
                entity.active = false;
                true
            }
            _ => false,
        }
    }

    /// Drop deactivated slots, keeping spawn order
    pub fn compact(&mut self) {
        self.entities.retain(|e| e.active);
    }

    /// Remove everything. Ids keep counting so stale handles never alias.
    pub fn clear(&mut self) {
        self.entities.clear();
    }

    fn index_of(&self, id: EntityId) -> Option<usize> {
        self.entities.binary_search_by_key(&id, |e| e.id).ok()
    }
}
