//! Stepped difficulty ramp
//!
//! Difficulty rises in discrete steps every `step_interval` seconds of
//! survival rather than along a smooth curve, so players feel distinct
//! "gear changes". Speed is capped and the spawn interval floored.

use serde::{Deserialize, Serialize};

use crate::tuning::RampConfig;

/// Difficulty at one point of a run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Difficulty {
    pub level: u32,
    /// World scroll speed (units/sec)
    pub speed: f32,
    /// Seconds between timed spawns
    pub spawn_interval: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DifficultyRamp {
    base_speed: f32,
    ramp: RampConfig,
}

impl DifficultyRamp {
    pub fn new(base_speed: f32, ramp: RampConfig) -> Self {
        Self { base_speed, ramp }
    }

    /// Step index reached after `survival_time` seconds
    pub fn level_at(&self, survival_time: f32) -> u32 {
        if self.ramp.step_interval <= 0.0 {
            return 0;
        }
        (survival_time.max(0.0) / self.ramp.step_interval).floor() as u32
    }

    pub fn at(&self, survival_time: f32) -> Difficulty {
        self.for_level(self.level_at(survival_time))
    }

    pub fn for_level(&self, level: u32) -> Difficulty {
        let steps = level as f32;
        let speed = (self.base_speed + steps * self.ramp.speed_step)
            .min(self.ramp.max_speed)
            .max(self.base_speed.min(self.ramp.max_speed));
        let spawn_interval = (self.ramp.base_spawn_interval - steps * self.ramp.interval_step)
            .max(self.ramp.min_spawn_interval);
        Difficulty {
            level,
            speed,
            spawn_interval,
        }
    }
}
