//! Per-frame simulation step
//!
//! Advances the session by one variable-length frame. Ordering within a tick:
//! steer → fire → advance pools → timed spawns → projectile hits → player
//! hits → despawn sweep → survival clock / difficulty / win check.
//! Hits resolve before the despawn sweep so a consumed entity is never also
//! recycled.

use glam::Vec3;

use super::collision::CollisionEvent;
use super::entity::{EntityKind, Payload};
use super::phase::{GamePhase, Trigger};
use super::state::{GameEvent, GameSession};

/// Particles emitted per resolved hit
const BURST_PARTICLES: usize = 12;

/// Input commands for a single tick
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Lateral axis in [-1, 1] (0 when no input source is available)
    pub lateral: f32,
    /// Fire held (shooter variants)
    pub fire: bool,
    /// Start/restart action
    pub start: bool,
    /// Idle/demo mode - the core steers and fires by itself
    pub autopilot: bool,
}

/// Advance the session by `dt` seconds and report what happened
pub fn tick(session: &mut GameSession, input: &TickInput, dt: f32) -> Vec<GameEvent> {
    let mut events = Vec::new();
    let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };

    // A start/restart frame only resets; the fresh run begins next tick
    if input.start {
        if let Some(event) = session.start_or_restart() {
            events.push(event);
            return events;
        }
    }

    // Cosmetics keep animating in every phase
    session.update_particles(dt);

    if session.phase() != GamePhase::Playing {
        return events;
    }

    // Steering
    let axis = if input.autopilot {
        autopilot_axis(session)
    } else {
        input.lateral
    };
    let config = &session.config;
    let (lateral_speed, lane_limit, max_tilt) = (config.lateral_speed, config.lane_limit, config.max_tilt);
    session.player.steer(axis, dt, lateral_speed, lane_limit, max_tilt);

    // Weapon
    let wants_fire = input.fire || (input.autopilot && session.config.weapon.is_some());
    fire_weapon(session, wants_fire, dt, &mut events);

    // Pools
    let speed = session.difficulty.speed;
    session.obstacles.advance(dt, speed);
    session.collectibles.advance(dt, speed);
    session.projectiles.advance(dt, speed);
    run_spawn_timers(session, dt);

    // Collisions
    resolve_hits(session, &mut events);
    if session.vitals.is_dead() {
        events.extend(session.transition(Trigger::Lethal));
        return events;
    }

    // Despawn what fell behind
    let player_pos = session.player.pos();
    let obstacle_spec = session.obstacle_spec();
    let collectible_spec = session.collectible_spec();
    session.obstacles.sweep(player_pos, &obstacle_spec, &mut session.rng);
    session.collectibles.sweep(player_pos, &collectible_spec, &mut session.rng);
    // Projectiles use the remove policy; the respawn template is never used
    session.projectiles.sweep(player_pos, &obstacle_spec, &mut session.rng);

    // Survival clock
    session.survival_time += dt;
    session.player.distance += speed * dt;
    credit_survival_points(session, dt);

    let level = session.ramp.level_at(session.survival_time);
    if level != session.difficulty.level {
        session.difficulty = session.ramp.for_level(level);
        log::info!(
            "Difficulty level {}: speed {:.1}, spawn every {:.2}s",
            level,
            session.difficulty.speed,
            session.difficulty.spawn_interval
        );
        events.push(GameEvent::DifficultyUp {
            level,
            speed: session.difficulty.speed,
        });
    }

    if let Some(threshold) = session.config.win_threshold {
        if session.survival_time >= threshold {
            events.extend(session.transition(Trigger::WinReached));
        }
    }

    events
}

fn fire_weapon(session: &mut GameSession, wants_fire: bool, dt: f32, events: &mut Vec<GameEvent>) {
    let Some(weapon) = session.config.weapon.as_ref() else {
        return;
    };
    session.fire_cooldown = (session.fire_cooldown - dt).max(0.0);
    if !wants_fire || session.fire_cooldown > 0.0 {
        return;
    }

    let pos = session.player.pos() + Vec3::new(0.0, -0.2, -1.0);
    let (speed, radius, ttl, cooldown) = (
        weapon.projectile_speed,
        weapon.projectile_radius,
        weapon.projectile_ttl,
        weapon.fire_cooldown,
    );
    if session
        .projectiles
        .spawn_moving(pos, -speed, radius, Payload::Projectile { ttl })
        .is_some()
    {
        session.fire_cooldown = cooldown;
        events.push(GameEvent::ShotFired { pos });
    }
}

fn run_spawn_timers(session: &mut GameSession, dt: f32) {
    let interval = session.difficulty.spawn_interval;
    let origin = session.player.pos();

    if session.config.obstacles.timed_spawns {
        session.obstacle_timer -= dt;
        if session.obstacle_timer <= 0.0 {
            let spec = session.obstacle_spec();
            session.obstacles.spawn(&spec, origin, &mut session.rng);
            session.obstacle_timer = interval * session.config.obstacles.interval_scale;
        }
    }

    let collectible_scale = match &session.config.collectibles {
        Some(pool) if pool.timed_spawns => pool.interval_scale,
        _ => return,
    };
    session.collectible_timer -= dt;
    if session.collectible_timer <= 0.0 {
        let spec = session.collectible_spec();
        session.collectibles.spawn(&spec, origin, &mut session.rng);
        session.collectible_timer = interval * collectible_scale;
    }
}

fn resolve_hits(session: &mut GameSession, events: &mut Vec<GameEvent>) {
    let kills = session.resolver.resolve_projectiles(
        &mut session.projectiles,
        &mut session.obstacles,
        &mut session.vitals,
    );
    let replace = session.config.weapon.as_ref().is_some_and(|w| w.replace_destroyed);
    for kill in kills {
        session.spawn_burst(kill.pos(), EntityKind::Obstacle, BURST_PARTICLES);
        if replace {
            let spec = session.obstacle_spec();
            let origin = session.player.pos();
            session.obstacles.spawn(&spec, origin, &mut session.rng);
        }
        events.push(GameEvent::Collision(kill));
    }

    let player_pos = session.player.pos();
    let player_radius = session.config.player_radius;
    let resolution = session.resolver.resolve(
        player_pos,
        player_radius,
        &mut [&mut session.obstacles, &mut session.collectibles],
        &mut session.vitals,
    );
    for hit in resolution.events {
        let source = hit.kind();
        let pos = match hit {
            CollisionEvent::Crash { .. } => player_pos,
            _ => hit.pos(),
        };
        session.spawn_burst(pos, source, BURST_PARTICLES);
        events.push(GameEvent::Collision(hit));
    }
}

fn credit_survival_points(session: &mut GameSession, dt: f32) {
    if session.config.points_per_second <= 0.0 {
        return;
    }
    session.score_carry += session.config.points_per_second * dt;
    let whole = session.score_carry.floor();
    if whole >= 1.0 {
        session.vitals.add_score(whole as u64);
        session.score_carry -= whole;
    }
}

/// Demo steering: dodge the closest obstacle in our lane, otherwise chase
/// the closest collectible, otherwise line up a shot or drift to center.
pub fn autopilot_axis(session: &GameSession) -> f32 {
    let config = &session.config;
    let player = session.player.pos();
    let look_ahead = (session.difficulty.speed * 2.5).max(20.0);
    let clearance = config.player_radius + config.obstacles.radius + 0.4;

    let ahead = |z: f32| z < player.z + 1.0 && z > player.z - look_ahead;

    let threat = session
        .obstacles
        .iter_active()
        .filter(|o| ahead(o.pos.z) && (o.pos.x - player.x).abs() < clearance)
        .max_by(|a, b| a.pos.z.total_cmp(&b.pos.z));

    if let Some(obstacle) = threat {
        let away = if obstacle.pos.x > player.x { -1.0 } else { 1.0 };
        let blocked = (player.x + away * clearance).abs() > config.lane_limit;
        return if blocked { -away } else { away };
    }

    let toward = |x: f32| ((x - player.x) * 2.0).clamp(-1.0, 1.0);

    let gem = session
        .collectibles
        .iter_active()
        .filter(|c| ahead(c.pos.z))
        .max_by(|a, b| a.pos.z.total_cmp(&b.pos.z));
    if let Some(gem) = gem {
        return toward(gem.pos.x);
    }

    if config.weapon.is_some() {
        let target = session
            .obstacles
            .iter_active()
            .filter(|o| o.pos.z < player.z)
            .max_by(|a, b| a.pos.z.total_cmp(&b.pos.z));
        if let Some(target) = target {
            return toward(target.pos.x);
        }
    }

    toward(0.0)
}
