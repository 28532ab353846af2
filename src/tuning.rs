//! Data-driven game rules
//!
//! Every variant of the runner/shooter is the same engine fed a different
//! `GameConfig`. Presets cover the shipped rule sets; anything else can be
//! loaded from JSON.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::DEFAULT_PLAYER_HEIGHT;
use crate::persistence::{self, PersistError};
use crate::sim::{DespawnPolicy, HitShape};

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// Config text is not valid JSON for `GameConfig`
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Config file could not be read
    #[error("Load error: {0}")]
    Load(#[from] PersistError),

    /// A field holds a value the engine cannot run with
    #[error("Invalid `{field}`: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

fn invalid(field: &'static str, reason: &'static str) -> ConfigError {
    ConfigError::Invalid { field, reason }
}

/// Rules for one entity pool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Hard cap on live entities (None = unbounded)
    pub capacity: Option<usize>,
    /// Entities placed on reset
    pub initial_count: usize,
    /// Closest depth (ahead of the player) used for the initial population
    pub initial_near: f32,
    /// Half-width of the lateral band entities spawn in
    pub lateral_spread: f32,
    /// Spawn height
    pub height: f32,
    /// Random vertical offset (+/-) added to `height`
    pub vertical_jitter: f32,
    /// Entity half-extent
    pub radius: f32,
    /// What happens to entities that pass behind the player
    pub policy: DespawnPolicy,
    /// Hitbox discipline for player contact
    pub shape: HitShape,
    /// Spawn periodically on the difficulty ramp's interval
    pub timed_spawns: bool,
    /// Multiplier applied to the ramp's spawn interval for this pool
    pub interval_scale: f32,
    /// Cosmetic rotation (radians/sec)
    pub spin_rate: f32,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            capacity: None,
            initial_count: 0,
            initial_near: 10.0,
            lateral_spread: 3.0,
            height: 1.0,
            vertical_jitter: 0.0,
            radius: 0.5,
            policy: DespawnPolicy::Recycle,
            shape: HitShape::Sphere,
            timed_spawns: false,
            interval_scale: 1.0,
            spin_rate: 0.0,
        }
    }
}

/// Stepped difficulty parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RampConfig {
    /// Seconds of survival between difficulty steps
    pub step_interval: f32,
    /// World speed added per step
    pub speed_step: f32,
    /// World speed ceiling
    pub max_speed: f32,
    /// Spawn interval at level 0 (seconds)
    pub base_spawn_interval: f32,
    /// Spawn interval removed per step
    pub interval_step: f32,
    /// Spawn interval floor
    pub min_spawn_interval: f32,
}

impl Default for RampConfig {
    fn default() -> Self {
        Self {
            step_interval: 10.0,
            speed_step: 0.6,
            max_speed: 14.0,
            base_spawn_interval: 2.0,
            interval_step: 0.15,
            min_spawn_interval: 0.5,
        }
    }
}

/// Player weapon (shooter variants)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeaponConfig {
    /// Seconds between shots
    pub fire_cooldown: f32,
    /// Projectile speed toward -z (units/sec), independent of world scroll
    pub projectile_speed: f32,
    /// Seconds of flight before a projectile expires
    pub projectile_ttl: f32,
    pub projectile_radius: f32,
    /// Max projectiles in flight
    pub capacity: Option<usize>,
    /// Spawn a replacement obstacle as soon as one is shot down
    pub replace_destroyed: bool,
}

impl Default for WeaponConfig {
    fn default() -> Self {
        Self {
            fire_cooldown: 0.25,
            projectile_speed: 60.0,
            projectile_ttl: 2.0,
            projectile_radius: 0.3,
            capacity: Some(32),
            replace_destroyed: false,
        }
    }
}

/// Complete rule set for one game variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// World scroll speed at level 0 (units/sec)
    pub base_speed: f32,
    /// Player lateral offset is clamped to [-lane_limit, +lane_limit]
    pub lane_limit: f32,
    /// Lateral units/sec at full stick deflection
    pub lateral_speed: f32,
    pub player_height: f32,
    pub player_radius: f32,
    /// Cosmetic roll (radians) at full deflection
    pub max_tilt: f32,

    pub initial_health: i32,
    pub damage_per_hit: i32,
    /// Any obstacle contact ends the run
    pub instant_death: bool,
    pub reward_per_collectible: u64,
    pub reward_per_kill: u64,
    /// Survival scoring while playing
    pub points_per_second: f32,
    /// Seconds of survival that win the run (None = endless)
    pub win_threshold: Option<f32>,

    /// How far ahead new entities appear
    pub spawn_depth: f32,
    /// Extra random depth added beyond `spawn_depth`
    pub spawn_spread: f32,
    /// Entities further than this behind the player despawn
    pub despawn_threshold: f32,

    pub ramp: RampConfig,
    pub weapon: Option<WeaponConfig>,
    pub obstacles: PoolConfig,
    pub collectibles: Option<PoolConfig>,

    /// Cosmetic particle cap
    pub max_particles: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        Preset::GemRunner.config()
    }
}

impl GameConfig {
    /// Parse and validate a JSON rule set
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: GameConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON rule set from disk
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config: GameConfig = persistence::read_json(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.lane_limit > 0.0) {
            return Err(invalid("lane_limit", "must be positive"));
        }
        if !(self.lateral_speed >= 0.0) {
            return Err(invalid("lateral_speed", "must not be negative"));
        }
        if !(self.player_radius >= 0.0) {
            return Err(invalid("player_radius", "must not be negative"));
        }
        if self.initial_health <= 0 {
            return Err(invalid("initial_health", "must be positive"));
        }
        if self.damage_per_hit < 0 {
            return Err(invalid("damage_per_hit", "must not be negative"));
        }
        if self.despawn_threshold < 0.0 {
            return Err(invalid("despawn_threshold", "must not be negative"));
        }
        if !(self.spawn_depth > 0.0) {
            return Err(invalid("spawn_depth", "must be positive"));
        }
        if self.spawn_spread < 0.0 {
            return Err(invalid("spawn_spread", "must not be negative"));
        }
        if let Some(t) = self.win_threshold {
            if !(t > 0.0) {
                return Err(invalid("win_threshold", "must be positive"));
            }
        }

        let ramp = &self.ramp;
        if !(ramp.step_interval > 0.0) {
            return Err(invalid("ramp.step_interval", "must be positive"));
        }
        if ramp.speed_step < 0.0 || ramp.interval_step < 0.0 {
            return Err(invalid("ramp", "steps must not be negative"));
        }
        if ramp.max_speed < self.base_speed {
            return Err(invalid("ramp.max_speed", "must be at least base_speed"));
        }
        if !(ramp.min_spawn_interval > 0.0) {
            return Err(invalid("ramp.min_spawn_interval", "must be positive"));
        }
        if ramp.base_spawn_interval < ramp.min_spawn_interval {
            return Err(invalid(
                "ramp.base_spawn_interval",
                "must be at least min_spawn_interval",
            ));
        }

        validate_pool("obstacles", &self.obstacles)?;
        if let Some(pool) = &self.collectibles {
            validate_pool("collectibles", pool)?;
        }

        if let Some(weapon) = &self.weapon {
            if weapon.fire_cooldown < 0.0 {
                return Err(invalid("weapon.fire_cooldown", "must not be negative"));
            }
            if !(weapon.projectile_speed > 0.0) || !(weapon.projectile_ttl > 0.0) {
                return Err(invalid("weapon", "projectiles need positive speed and ttl"));
            }
        }

        Ok(())
    }
}

fn validate_pool(field: &'static str, pool: &PoolConfig) -> Result<(), ConfigError> {
    if pool.radius < 0.0 || pool.lateral_spread < 0.0 || pool.vertical_jitter < 0.0 {
        return Err(invalid(field, "radius and spreads must not be negative"));
    }
    if let Some(cap) = pool.capacity {
        if cap < pool.initial_count {
            return Err(invalid(field, "capacity is below initial_count"));
        }
    }
    if pool.timed_spawns && !(pool.interval_scale > 0.0) {
        return Err(invalid(field, "interval_scale must be positive"));
    }
    // Recycled entities never leave, so timed spawns need a ceiling
    if pool.timed_spawns && pool.policy == DespawnPolicy::Recycle && pool.capacity.is_none() {
        return Err(invalid(field, "timed spawns with recycle need a capacity"));
    }
    Ok(())
}

/// Named rule sets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Preset {
    /// Collect gems, one touch of a box ends the run
    #[default]
    GemRunner,
    /// Health-based lane dodger with survival scoring and a finish line
    HighwayDodge,
    /// On-rails shooter: blast asteroids before they reach you
    SpaceShooter,
}

impl Preset {
    pub const ALL: [Preset; 3] = [Preset::GemRunner, Preset::HighwayDodge, Preset::SpaceShooter];

    pub fn as_str(&self) -> &'static str {
        match self {
            Preset::GemRunner => "gem-runner",
            Preset::HighwayDodge => "highway-dodge",
            Preset::SpaceShooter => "space-shooter",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "gem-runner" | "gems" | "runner" => Some(Preset::GemRunner),
            "highway-dodge" | "highway" | "dodge" => Some(Preset::HighwayDodge),
            "space-shooter" | "shooter" | "space" => Some(Preset::SpaceShooter),
            _ => None,
        }
    }

    /// Build the rule set for this preset
    pub fn config(&self) -> GameConfig {
        match self {
            Preset::GemRunner => gem_runner(),
            Preset::HighwayDodge => highway_dodge(),
            Preset::SpaceShooter => space_shooter(),
        }
    }
}

fn gem_runner() -> GameConfig {
    GameConfig {
        base_speed: 4.8,
        lane_limit: 4.0,
        lateral_speed: 7.2,
        player_height: DEFAULT_PLAYER_HEIGHT,
        player_radius: 0.5,
        max_tilt: 0.25,
        initial_health: 100,
        damage_per_hit: 100,
        instant_death: true,
        reward_per_collectible: 1,
        reward_per_kill: 0,
        points_per_second: 0.0,
        win_threshold: None,
        spawn_depth: 150.0,
        spawn_spread: 15.0,
        despawn_threshold: 5.0,
        ramp: RampConfig::default(),
        weapon: None,
        obstacles: PoolConfig {
            initial_count: 20,
            initial_near: 15.0,
            lateral_spread: 3.0,
            radius: 0.7,
            ..PoolConfig::default()
        },
        collectibles: Some(PoolConfig {
            capacity: Some(40),
            initial_count: 30,
            initial_near: 10.0,
            lateral_spread: 2.0,
            radius: 0.5,
            timed_spawns: true,
            spin_rate: 1.8,
            ..PoolConfig::default()
        }),
        max_particles: 256,
    }
}

fn highway_dodge() -> GameConfig {
    GameConfig {
        base_speed: 12.0,
        lane_limit: 4.0,
        lateral_speed: 8.0,
        player_height: DEFAULT_PLAYER_HEIGHT,
        player_radius: 0.6,
        max_tilt: 0.35,
        initial_health: 100,
        damage_per_hit: 20,
        instant_death: false,
        reward_per_collectible: 25,
        reward_per_kill: 0,
        points_per_second: 10.0,
        win_threshold: Some(180.0),
        spawn_depth: 200.0,
        spawn_spread: 40.0,
        despawn_threshold: 5.0,
        ramp: RampConfig {
            step_interval: 15.0,
            speed_step: 2.0,
            max_speed: 30.0,
            base_spawn_interval: 1.5,
            interval_step: 0.1,
            min_spawn_interval: 0.4,
        },
        weapon: None,
        obstacles: PoolConfig {
            capacity: Some(48),
            initial_count: 16,
            initial_near: 40.0,
            lateral_spread: 3.5,
            height: DEFAULT_PLAYER_HEIGHT,
            radius: 0.8,
            shape: HitShape::Box,
            timed_spawns: true,
            ..PoolConfig::default()
        },
        collectibles: Some(PoolConfig {
            capacity: Some(8),
            initial_count: 2,
            initial_near: 60.0,
            lateral_spread: 3.5,
            height: DEFAULT_PLAYER_HEIGHT,
            radius: 0.5,
            policy: DespawnPolicy::Remove,
            timed_spawns: true,
            interval_scale: 4.0,
            spin_rate: 2.5,
            ..PoolConfig::default()
        }),
        max_particles: 256,
    }
}

fn space_shooter() -> GameConfig {
    GameConfig {
        base_speed: 10.0,
        lane_limit: 6.0,
        lateral_speed: 9.0,
        player_height: DEFAULT_PLAYER_HEIGHT,
        player_radius: 0.8,
        max_tilt: 0.5,
        initial_health: 100,
        damage_per_hit: 25,
        instant_death: false,
        reward_per_collectible: 0,
        reward_per_kill: 100,
        points_per_second: 0.0,
        win_threshold: Some(120.0),
        spawn_depth: 120.0,
        spawn_spread: 30.0,
        despawn_threshold: 8.0,
        ramp: RampConfig {
            step_interval: 20.0,
            speed_step: 1.5,
            max_speed: 22.0,
            base_spawn_interval: 1.2,
            interval_step: 0.1,
            min_spawn_interval: 0.35,
        },
        weapon: Some(WeaponConfig {
            replace_destroyed: true,
            ..WeaponConfig::default()
        }),
        obstacles: PoolConfig {
            capacity: Some(40),
            initial_count: 6,
            initial_near: 60.0,
            lateral_spread: 6.0,
            height: DEFAULT_PLAYER_HEIGHT,
            vertical_jitter: 1.0,
            radius: 1.2,
            policy: DespawnPolicy::Remove,
            timed_spawns: true,
            spin_rate: 0.8,
            ..PoolConfig::default()
        },
        collectibles: None,
        max_particles: 512,
    }
}
