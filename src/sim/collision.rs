//! Proximity collision detection and resolution
//!
//! Hit tests are point-vs-point with a combined reach (player radius plus
//! entity radius). Each pool picks one discipline:
//! - `Sphere`: Euclidean distance in 3D
//! - `Box`: independent x/z thresholds, height ignored (lane collision for
//!   forward runners where obstacles sit on the road)
//!
//! Resolution applies score/health changes as hits are found and stops at the
//! first lethal hit, so two simultaneous obstacles can never both land.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::entity::{EntityId, EntityKind, Payload};
use super::pool::EntityPool;

/// Hitbox discipline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HitShape {
    #[default]
    Sphere,
    Box,
}

impl HitShape {
    /// True if `a` and `b` are within `reach` of each other
    #[inline]
    pub fn overlaps(&self, a: Vec3, b: Vec3, reach: f32) -> bool {
        match self {
            HitShape::Sphere => a.distance_squared(b) < reach * reach,
            HitShape::Box => (a.x - b.x).abs() < reach && (a.z - b.z).abs() < reach,
        }
    }
}

/// Score and health of the current run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vitals {
    pub score: u64,
    pub health: i32,
}

impl Vitals {
    pub fn new(health: i32) -> Self {
        Self { score: 0, health }
    }

    /// Subtract damage, flooring at zero. Returns true if this was lethal.
    pub fn take_damage(&mut self, damage: i32) -> bool {
        self.health = (self.health - damage.max(0)).max(0);
        self.health == 0
    }

    pub fn add_score(&mut self, points: u64) {
        self.score = self.score.saturating_add(points);
    }

    pub fn is_dead(&self) -> bool {
        self.health <= 0
    }
}

/// One resolved hit
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CollisionEvent {
    /// Player ran into an obstacle
    Crash {
        obstacle: EntityId,
        pos: Vec3,
        damage: i32,
    },
    /// Player picked up a collectible
    Collect {
        collectible: EntityId,
        pos: Vec3,
        reward: u64,
    },
    /// A projectile destroyed an obstacle
    Kill {
        obstacle: EntityId,
        projectile: EntityId,
        pos: Vec3,
        reward: u64,
    },
}

impl CollisionEvent {
    /// The entity this event consumed (the obstacle for kills)
    pub fn entity(&self) -> EntityId {
        match *self {
            CollisionEvent::Crash { obstacle, .. } => obstacle,
            CollisionEvent::Collect { collectible, .. } => collectible,
            CollisionEvent::Kill { obstacle, .. } => obstacle,
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            CollisionEvent::Crash { .. } | CollisionEvent::Kill { .. } => EntityKind::Obstacle,
            CollisionEvent::Collect { .. } => EntityKind::Collectible,
        }
    }

    pub fn pos(&self) -> Vec3 {
        match *self {
            CollisionEvent::Crash { pos, .. }
            | CollisionEvent::Collect { pos, .. }
            | CollisionEvent::Kill { pos, .. } => pos,
        }
    }
}

/// Events from one player-contact pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    pub events: Vec<CollisionEvent>,
    /// Health reached zero; nothing after the lethal hit was processed
    pub lethal: bool,
}

/// Rules applied when hits resolve
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionRules {
    /// Any obstacle contact drops health to zero
    pub instant_death: bool,
    /// Score for shooting down an obstacle
    pub reward_per_kill: u64,
}

/// Turns proximity into gameplay events, at most once per entity per tick
#[derive(Debug, Clone)]
pub struct CollisionResolver {
    rules: CollisionRules,
}

impl CollisionResolver {
    pub fn new(rules: CollisionRules) -> Self {
        Self { rules }
    }

    /// Test the player against every active obstacle/collectible.
    ///
    /// Hit entities are consumed immediately so a later despawn sweep or a
    /// second test in the same tick cannot see them again. Projectile pools
    /// are skipped; use `resolve_projectiles` for those.
    pub fn resolve(
        &self,
        player_pos: Vec3,
        player_radius: f32,
        pools: &mut [&mut EntityPool],
        vitals: &mut Vitals,
    ) -> Resolution {
        let mut resolution = Resolution::default();

        'pools: for pool in pools.iter_mut() {
            if pool.kind() == EntityKind::Projectile {
                continue;
            }
            for id in pool.query_near(player_pos, player_radius) {
                let Some((pos, payload)) = pool.get(id).map(|e| (e.pos, e.payload)) else {
                    continue;
                };
                if !pool.remove(id) {
                    continue;
                }

                match payload {
                    Payload::Obstacle { damage } => {
                        let damage = if self.rules.instant_death {
                            vitals.health
                        } else {
                            damage
                        };
                        let lethal = vitals.take_damage(damage);
                        log::debug!("Crash into obstacle {:?}, health {}", id, vitals.health);
                        resolution.events.push(CollisionEvent::Crash {
                            obstacle: id,
                            pos,
                            damage,
                        });
                        if lethal {
                            resolution.lethal = true;
                            break 'pools;
                        }
                    }
                    Payload::Collectible { reward } => {
                        vitals.add_score(reward);
                        resolution.events.push(CollisionEvent::Collect {
                            collectible: id,
                            pos,
                            reward,
                        });
                    }
                    Payload::Projectile { .. } => {}
                }
            }
        }

        resolution
    }

    /// Test projectiles against obstacles (sphere discipline).
    ///
    /// Projectiles are visited in pool order; the first one to reach an
    /// obstacle gets the credit and both are consumed. A projectile that
    /// loses the race keeps flying until its ttl runs out.
    pub fn resolve_projectiles(
        &self,
        projectiles: &mut EntityPool,
        obstacles: &mut EntityPool,
        vitals: &mut Vitals,
    ) -> Vec<CollisionEvent> {
        let mut events = Vec::new();

        for p_index in 0..projectiles.slot_count() {
            let Some(shot) = projectiles.active_at(p_index) else {
                continue;
            };
            let (shot_id, shot_pos, shot_radius) = (shot.id, shot.pos, shot.radius);

            let target = (0..obstacles.slot_count()).find_map(|o_index| {
                obstacles
                    .active_at(o_index)
                    .filter(|o| HitShape::Sphere.overlaps(shot_pos, o.pos, shot_radius + o.radius))
                    .map(|o| (o_index, o.id, o.pos))
            });

            if let Some((o_index, obstacle_id, pos)) = target {
                obstacles.consume_at(o_index);
                projectiles.consume_at(p_index);
                vitals.add_score(self.rules.reward_per_kill);
                log::debug!("Projectile {:?} destroyed obstacle {:?}", shot_id, obstacle_id);
                events.push(CollisionEvent::Kill {
                    obstacle: obstacle_id,
                    projectile: shot_id,
                    pos,
                    reward: self.rules.reward_per_kill,
                });
            }
        }

        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::pool::DespawnPolicy;
    use proptest::prelude::*;

    fn resolver(instant_death: bool) -> CollisionResolver {
        CollisionResolver::new(CollisionRules {
            instant_death,
            reward_per_kill: 100,
        })
    }

    fn obstacles() -> EntityPool {
        EntityPool::new(EntityKind::Obstacle, DespawnPolicy::Recycle)
    }

    #[test]
    fn test_single_obstacle_hit() {
        let mut pool = obstacles();
        pool.spawn_at(Vec3::new(0.5, 0.0, 0.0), 1.0, Payload::Obstacle { damage: 20 });
        let mut vitals = Vitals::new(100);

        let res = resolver(false).resolve(Vec3::ZERO, 0.0, &mut [&mut pool], &mut vitals);
        assert_eq!(res.events.len(), 1);
        assert!(matches!(res.events[0], CollisionEvent::Crash { damage: 20, .. }));
        assert_eq!(vitals.health, 80);
        assert!(!res.lethal);

        // Consumed: a second pass in the same tick finds nothing
        let again = resolver(false).resolve(Vec3::ZERO, 0.0, &mut [&mut pool], &mut vitals);
        assert!(again.events.is_empty());
        assert_eq!(vitals.health, 80);
    }

    #[test]
    fn test_simultaneous_lethal_hits_stop_at_zero() {
        let mut pool = obstacles();
        pool.spawn_at(Vec3::new(0.1, 0.0, 0.0), 1.0, Payload::Obstacle { damage: 20 });
        pool.spawn_at(Vec3::new(-0.1, 0.0, 0.0), 1.0, Payload::Obstacle { damage: 20 });
        let mut vitals = Vitals::new(20);

        let res = resolver(false).resolve(Vec3::ZERO, 0.5, &mut [&mut pool], &mut vitals);
        assert!(res.lethal);
        assert_eq!(res.events.len(), 1);
        assert_eq!(vitals.health, 0);
        // The second obstacle was never processed
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_overkill_floors_health() {
        let mut pool = obstacles();
        pool.spawn_at(Vec3::ZERO, 1.0, Payload::Obstacle { damage: 20 });
        pool.spawn_at(Vec3::ZERO, 1.0, Payload::Obstacle { damage: 20 });
        let mut vitals = Vitals::new(30);

        let res = resolver(false).resolve(Vec3::ZERO, 0.5, &mut [&mut pool], &mut vitals);
        assert!(res.lethal);
        assert_eq!(res.events.len(), 2);
        assert_eq!(vitals.health, 0);
    }

    #[test]
    fn test_instant_death() {
        let mut pool = obstacles();
        pool.spawn_at(Vec3::ZERO, 1.0, Payload::Obstacle { damage: 1 });
        let mut vitals = Vitals::new(100);

        let res = resolver(true).resolve(Vec3::ZERO, 0.5, &mut [&mut pool], &mut vitals);
        assert!(res.lethal);
        assert!(vitals.is_dead());
    }

    #[test]
    fn test_collectible_scores_and_is_removed() {
        let mut gems = EntityPool::new(EntityKind::Collectible, DespawnPolicy::Recycle);
        gems.spawn_at(Vec3::new(0.0, 0.0, -0.3), 0.25, Payload::Collectible { reward: 5 });
        gems.spawn_at(Vec3::new(3.0, 0.0, 0.0), 0.25, Payload::Collectible { reward: 5 });
        let mut pool = obstacles();
        let mut vitals = Vitals::new(100);

        let res = resolver(false).resolve(
            Vec3::ZERO,
            0.75,
            &mut [&mut pool, &mut gems],
            &mut vitals,
        );
        assert_eq!(res.events.len(), 1);
        assert_eq!(res.events[0].kind(), EntityKind::Collectible);
        assert_eq!(vitals.score, 5);
        assert_eq!(gems.len(), 1);
        assert_eq!(vitals.health, 100);
    }

    #[test]
    fn test_box_and_sphere_disagree_on_height() {
        let above = Vec3::new(0.0, 2.0, 0.0);
        assert!(!HitShape::Sphere.overlaps(Vec3::ZERO, above, 1.0));
        assert!(HitShape::Box.overlaps(Vec3::ZERO, above, 1.0));
        // Box corners reach further than the sphere
        assert!(HitShape::Box.overlaps(Vec3::ZERO, Vec3::new(0.9, 0.0, 0.9), 1.0));
        assert!(!HitShape::Sphere.overlaps(Vec3::ZERO, Vec3::new(0.9, 0.0, 0.9), 1.0));
    }

    #[test]
    fn test_resolve_uses_pool_shape() {
        let above = Vec3::new(0.0, 2.0, 0.0);
        let mut lanes = obstacles().with_shape(HitShape::Box);
        lanes.spawn_at(above, 0.5, Payload::Obstacle { damage: 10 });
        let mut round = obstacles();
        round.spawn_at(above, 0.5, Payload::Obstacle { damage: 10 });
        let mut vitals = Vitals::new(100);

        let res = resolver(false).resolve(
            Vec3::ZERO,
            0.5,
            &mut [&mut lanes, &mut round],
            &mut vitals,
        );
        assert_eq!(res.events.len(), 1);
        assert!(lanes.is_empty());
        assert_eq!(round.len(), 1);
        assert_eq!(vitals.health, 90);
    }

    #[test]
    fn test_two_projectiles_one_obstacle_credit_once() {
        let mut shots = EntityPool::new(EntityKind::Projectile, DespawnPolicy::Remove).unscrolled();
        let first = shots
            .spawn_at(Vec3::new(0.0, 0.0, -10.0), 0.3, Payload::Projectile { ttl: 1.0 })
            .unwrap();
        let second = shots
            .spawn_at(Vec3::new(0.2, 0.0, -10.0), 0.3, Payload::Projectile { ttl: 1.0 })
            .unwrap();
        let mut rocks = obstacles();
        let rock = rocks
            .spawn_at(Vec3::new(0.0, 0.0, -10.5), 1.0, Payload::Obstacle { damage: 10 })
            .unwrap();
        let mut vitals = Vitals::new(100);

        let events = resolver(false).resolve_projectiles(&mut shots, &mut rocks, &mut vitals);
        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0],
            CollisionEvent::Kill {
                obstacle: rock,
                projectile: first,
                pos: Vec3::new(0.0, 0.0, -10.5),
                reward: 100,
            }
        );
        assert_eq!(vitals.score, 100);
        assert!(rocks.is_empty());
        // Losing projectile keeps flying
        assert!(shots.get(second).is_some());
        assert!(shots.get(first).is_none());
    }

    #[test]
    fn test_resolve_skips_projectile_pools() {
        let mut shots = EntityPool::new(EntityKind::Projectile, DespawnPolicy::Remove);
        shots.spawn_at(Vec3::ZERO, 0.3, Payload::Projectile { ttl: 1.0 });
        let mut vitals = Vitals::new(100);
        let res = resolver(false).resolve(Vec3::ZERO, 1.0, &mut [&mut shots], &mut vitals);
        assert!(res.events.is_empty());
        assert_eq!(shots.len(), 1);
    }

    proptest! {
        #[test]
        fn prop_at_most_one_credit_per_entity(
            obstacle_xs in prop::collection::vec(-3.0f32..3.0, 1..8),
            shot_xs in prop::collection::vec(-3.0f32..3.0, 1..16),
        ) {
            let mut rocks = obstacles();
            for x in &obstacle_xs {
                rocks.spawn_at(Vec3::new(*x, 0.0, -20.0), 1.0, Payload::Obstacle { damage: 10 });
            }
            let mut shots = EntityPool::new(EntityKind::Projectile, DespawnPolicy::Remove);
            for x in &shot_xs {
                shots.spawn_at(Vec3::new(*x, 0.0, -20.0), 0.3, Payload::Projectile { ttl: 1.0 });
            }
            let mut vitals = Vitals::new(100);

            let events = resolver(false).resolve_projectiles(&mut shots, &mut rocks, &mut vitals);

            let mut obstacle_ids: Vec<_> = events.iter().map(|e| e.entity()).collect();
            obstacle_ids.sort();
            obstacle_ids.dedup();
            prop_assert_eq!(obstacle_ids.len(), events.len());

            let mut shot_ids: Vec<_> = events
                .iter()
                .filter_map(|e| match e {
                    CollisionEvent::Kill { projectile, .. } => Some(*projectile),
                    _ => None,
                })
                .collect();
            shot_ids.sort();
            shot_ids.dedup();
            prop_assert_eq!(shot_ids.len(), events.len());
            prop_assert_eq!(rocks.len() + events.len(), obstacle_xs.len());
        }
    }
}
