//! Session state and core simulation types
//!
//! `GameSession` owns every pool, the player and the run counters. Nothing
//! outside the session holds an entity.

use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::collision::{CollisionEvent, CollisionResolver, CollisionRules, Vitals};
use super::difficulty::{Difficulty, DifficultyRamp};
use super::entity::{EntityKind, Payload};
use super::phase::{GamePhase, GameStateMachine, Trigger};
use super::pool::{DespawnPolicy, EntityPool, SpawnSpec};
use crate::tuning::{GameConfig, PoolConfig};

/// Stream offset so cosmetic randomness never perturbs gameplay spawns
const FX_STREAM: u64 = 0x00F0_0D5E;

/// The player rig (camera, ship or vehicle)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    /// Lateral offset, always within the lane bounds
    pub lateral: f32,
    pub height: f32,
    /// Forward progress (world units)
    pub distance: f32,
    /// Cosmetic roll derived from steering
    pub tilt: f32,
}

impl Player {
    pub fn new(height: f32) -> Self {
        Self {
            lateral: 0.0,
            height,
            distance: 0.0,
            tilt: 0.0,
        }
    }

    /// Collision point. The player sits at z = 0; the world moves past.
    pub fn pos(&self) -> Vec3 {
        Vec3::new(self.lateral, self.height, 0.0)
    }

    /// Move sideways by `axis` (-1..1) for `dt` seconds, clamped to the lane
    pub fn steer(&mut self, axis: f32, dt: f32, lateral_speed: f32, lane_limit: f32, max_tilt: f32) {
        let axis = if axis.is_finite() { axis.clamp(-1.0, 1.0) } else { 0.0 };
        self.lateral = (self.lateral + axis * lateral_speed * dt).clamp(-lane_limit, lane_limit);
        self.tilt = -axis * max_tilt;
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.height);
    }
}

/// A particle for visual effects (never collided against)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Particle {
    pub pos: Vec3,
    pub vel: Vec3,
    /// Kind of the entity that produced it, for color lookup
    pub source: EntityKind,
    /// 0-1, decreases over time
    pub life: f32,
    pub size: f32,
}

/// Everything a frame can report to the host
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GameEvent {
    /// A resolved hit
    Collision(CollisionEvent),
    /// Player fired a projectile
    ShotFired { pos: Vec3 },
    /// Difficulty stepped up
    DifficultyUp { level: u32, speed: f32 },
    /// State machine moved
    PhaseChanged { from: GamePhase, to: GamePhase },
}

/// Values pushed to the HUD
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HudSnapshot {
    pub score: u64,
    pub health: i32,
    pub phase: GamePhase,
    pub survival_time: f32,
    pub level: u32,
}

/// Aggregate state of one game session
#[derive(Debug, Clone)]
pub struct GameSession {
    pub(crate) config: GameConfig,
    seed: u64,
    pub(crate) machine: GameStateMachine,
    pub(crate) player: Player,
    pub(crate) obstacles: EntityPool,
    pub(crate) collectibles: EntityPool,
    pub(crate) projectiles: EntityPool,
    pub(crate) particles: Vec<Particle>,
    pub(crate) vitals: Vitals,
    /// Seconds spent in `Playing` this run
    pub(crate) survival_time: f32,
    pub(crate) difficulty: Difficulty,
    pub(crate) ramp: DifficultyRamp,
    pub(crate) resolver: CollisionResolver,
    pub(crate) obstacle_timer: f32,
    pub(crate) collectible_timer: f32,
    pub(crate) fire_cooldown: f32,
    /// Fractional survival points not yet credited
    pub(crate) score_carry: f32,
    pub(crate) rng: Pcg32,
    fx_rng: Pcg32,
    runs: u32,
}

impl GameSession {
    /// Create a session in `Menu` with the world populated for the backdrop
    pub fn new(config: GameConfig, seed: u64) -> Self {
        let ramp = DifficultyRamp::new(config.base_speed, config.ramp.clone());
        let resolver = CollisionResolver::new(CollisionRules {
            instant_death: config.instant_death,
            reward_per_kill: config.reward_per_kill,
        });

        let obstacles =
            EntityPool::from_config(EntityKind::Obstacle, &config.obstacles, config.despawn_threshold);
        let collectibles = match &config.collectibles {
            Some(pool) => {
                EntityPool::from_config(EntityKind::Collectible, pool, config.despawn_threshold)
            }
            None => EntityPool::new(EntityKind::Collectible, DespawnPolicy::Remove)
                .with_capacity_limit(0),
        };
        let projectiles = EntityPool::new(EntityKind::Projectile, DespawnPolicy::Remove).unscrolled();
        let projectiles = match &config.weapon {
            Some(weapon) => match weapon.capacity {
                Some(cap) => projectiles.with_capacity_limit(cap),
                None => projectiles,
            },
            None => projectiles.with_capacity_limit(0),
        };

        let mut session = Self {
            player: Player::new(config.player_height),
            vitals: Vitals::new(config.initial_health),
            difficulty: ramp.for_level(0),
            ramp,
            resolver,
            machine: GameStateMachine::new(),
            obstacles,
            collectibles,
            projectiles,
            particles: Vec::new(),
            survival_time: 0.0,
            obstacle_timer: 0.0,
            collectible_timer: 0.0,
            fire_cooldown: 0.0,
            score_carry: 0.0,
            rng: Pcg32::seed_from_u64(seed),
            fx_rng: Pcg32::new(seed, FX_STREAM),
            runs: 0,
            seed,
            config,
        };
        session.reset();
        session
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn phase(&self) -> GamePhase {
        self.machine.phase()
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn obstacles(&self) -> &EntityPool {
        &self.obstacles
    }

    pub fn collectibles(&self) -> &EntityPool {
        &self.collectibles
    }

    pub fn projectiles(&self) -> &EntityPool {
        &self.projectiles
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn score(&self) -> u64 {
        self.vitals.score
    }

    pub fn health(&self) -> i32 {
        self.vitals.health
    }

    pub fn survival_time(&self) -> f32 {
        self.survival_time
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    /// Runs started since the session was created
    pub fn runs(&self) -> u32 {
        self.runs
    }

    pub fn hud_snapshot(&self) -> HudSnapshot {
        HudSnapshot {
            score: self.vitals.score,
            health: self.vitals.health,
            phase: self.phase(),
            survival_time: self.survival_time,
            level: self.difficulty.level,
        }
    }

    /// Spawn template for obstacles at the configured spawn depth
    pub fn obstacle_spec(&self) -> SpawnSpec {
        let damage = self.config.damage_per_hit;
        self.pool_spec(&self.config.obstacles, Payload::Obstacle { damage })
    }

    /// Spawn template for collectibles (a zero-reward template when the
    /// rule set has none; the pool has zero capacity then)
    pub fn collectible_spec(&self) -> SpawnSpec {
        let reward = self.config.reward_per_collectible;
        let payload = Payload::Collectible { reward };
        match &self.config.collectibles {
            Some(pool) => self.pool_spec(pool, payload),
            None => self.pool_spec(&PoolConfig::default(), payload),
        }
    }

    fn pool_spec(&self, pool: &PoolConfig, payload: Payload) -> SpawnSpec {
        SpawnSpec::for_pool(pool, self.config.spawn_depth, self.config.spawn_spread, payload)
    }

    /// Clear the run: pools repopulated, counters zeroed, player centered.
    /// Happens in one call so the next tick never sees a half-reset session.
    pub fn reset(&mut self) {
        self.obstacles.clear();
        self.collectibles.clear();
        self.projectiles.clear();
        self.particles.clear();

        self.vitals = Vitals::new(self.config.initial_health);
        self.survival_time = 0.0;
        self.score_carry = 0.0;
        self.fire_cooldown = 0.0;
        self.difficulty = self.ramp.for_level(0);
        self.obstacle_timer = self.difficulty.spawn_interval * self.config.obstacles.interval_scale;
        self.collectible_timer = self.difficulty.spawn_interval
            * self
                .config
                .collectibles
                .as_ref()
                .map_or(1.0, |c| c.interval_scale);
        self.player.reset();

        let origin = self.player.pos();
        let spec = self.obstacle_spec();
        let count = self.config.obstacles.initial_count;
        let near = self.config.obstacles.initial_near;
        self.obstacles.populate(count, &spec, origin, near, &mut self.rng);

        if let Some(pool) = &self.config.collectibles {
            let (count, near) = (pool.initial_count, pool.initial_near);
            let spec = self.collectible_spec();
            self.collectibles.populate(count, &spec, origin, near, &mut self.rng);
        }

        log::debug!(
            "Session reset: {} obstacles, {} collectibles",
            self.obstacles.len(),
            self.collectibles.len()
        );
    }

    /// Fire `trigger` at the state machine. Entering `Playing` resets the run.
    pub fn transition(&mut self, trigger: Trigger) -> Option<GameEvent> {
        let from = self.phase();
        let to = self.machine.apply(trigger)?;
        if to == GamePhase::Playing {
            self.reset();
            self.runs += 1;
            log::info!("Run {} started (seed {})", self.runs, self.seed);
        } else if to.is_finished() {
            log::info!(
                "Run {} ended: {} - score {}, survived {:.1}s",
                self.runs,
                to.as_str(),
                self.vitals.score,
                self.survival_time
            );
        }
        Some(GameEvent::PhaseChanged { from, to })
    }

    /// Leave the menu and begin the first run
    pub fn start(&mut self) -> Option<GameEvent> {
        self.transition(Trigger::Start)
    }

    /// Begin a fresh run after game over or win
    pub fn restart(&mut self) -> Option<GameEvent> {
        self.transition(Trigger::Restart)
    }

    /// Start from the menu or restart a finished run, whichever is legal
    pub fn start_or_restart(&mut self) -> Option<GameEvent> {
        self.start().or_else(|| self.restart())
    }

    /// Emit a small burst of particles at `pos`
    pub(crate) fn spawn_burst(&mut self, pos: Vec3, source: EntityKind, count: usize) {
        let room = self.config.max_particles.saturating_sub(self.particles.len());
        for _ in 0..count.min(room) {
            let dir = Vec3::new(
                self.fx_rng.random_range(-1.0..=1.0),
                self.fx_rng.random_range(-0.2..=1.0),
                self.fx_rng.random_range(-1.0..=1.0),
            )
            .normalize_or_zero();
            let speed = self.fx_rng.random_range(2.0..=6.0);
            self.particles.push(Particle {
                pos,
                vel: dir * speed,
                source,
                life: 1.0,
                size: self.fx_rng.random_range(0.05..=0.15),
            });
        }
    }

    /// Advance cosmetic particles (runs in every phase)
    pub(crate) fn update_particles(&mut self, dt: f32) {
        for particle in self.particles.iter_mut() {
            particle.pos += particle.vel * dt;
            particle.vel *= 0.96;
            particle.vel.y -= 4.0 * dt;
            particle.life -= dt * 1.5;
        }
        self.particles.retain(|p| p.life > 0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuning::Preset;

    #[test]
    fn test_new_session_in_menu_with_backdrop() {
        let session = GameSession::new(Preset::GemRunner.config(), 7);
        assert_eq!(session.phase(), GamePhase::Menu);
        assert_eq!(session.obstacles().len(), 20);
        assert_eq!(session.collectibles().len(), 30);
        assert_eq!(session.health(), 100);
    }

    #[test]
    fn test_lane_clamp_at_edge() {
        let mut player = Player::new(1.6);
        player.lateral = 3.9;
        player.steer(1.0, 1.0, 1.0, 4.0, 0.2);
        assert_eq!(player.lateral, 4.0);
        assert!((player.tilt + 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_steer_ignores_nan() {
        let mut player = Player::new(1.6);
        player.steer(f32::NAN, 1.0, 5.0, 4.0, 0.2);
        assert_eq!(player.lateral, 0.0);
    }

    #[test]
    fn test_start_resets_everything() {
        let mut session = GameSession::new(Preset::GemRunner.config(), 11);
        session.vitals.score = 42;
        session.vitals.health = 3;
        session.survival_time = 99.0;
        session.player.lateral = 2.0;
        let stale = session.obstacles().iter_active().map(|e| e.id).collect::<Vec<_>>();

        let event = session.start_or_restart();
        assert_eq!(
            event,
            Some(GameEvent::PhaseChanged {
                from: GamePhase::Menu,
                to: GamePhase::Playing
            })
        );
        assert_eq!(session.score(), 0);
        assert_eq!(session.health(), 100);
        assert_eq!(session.survival_time(), 0.0);
        assert_eq!(session.player().lateral, 0.0);
        assert_eq!(session.obstacles().len(), 20);
        assert!(stale.iter().all(|id| session.obstacles().get(*id).is_none()));
        assert_eq!(session.runs(), 1);
    }

    #[test]
    fn test_start_while_playing_is_noop() {
        let mut session = GameSession::new(Preset::GemRunner.config(), 11);
        session.start_or_restart();
        session.vitals.score = 5;
        assert_eq!(session.start_or_restart(), None);
        assert_eq!(session.score(), 5);
    }

    #[test]
    fn test_particles_capped_and_fade() {
        let mut config = Preset::GemRunner.config();
        config.max_particles = 10;
        let mut session = GameSession::new(config, 3);
        session.spawn_burst(Vec3::ZERO, EntityKind::Obstacle, 8);
        session.spawn_burst(Vec3::ZERO, EntityKind::Obstacle, 8);
        assert_eq!(session.particles().len(), 10);
        for _ in 0..120 {
            session.update_particles(1.0 / 60.0);
        }
        assert!(session.particles().is_empty());
    }

    #[test]
    fn test_shooter_has_no_collectibles() {
        let mut session = GameSession::new(Preset::SpaceShooter.config(), 5);
        let spec = session.collectible_spec();
        assert!(session.collectibles.spawn(&spec, Vec3::ZERO, &mut session.rng).is_none());
    }
}
