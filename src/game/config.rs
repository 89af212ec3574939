//! Simulation tunables. Defaults assume 60 ticks per second.

use thiserror::Error;

/// Nominal simulation rate the tick-based defaults are expressed in.
pub const TICKS_PER_SECOND: u32 = 60;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be at least 1")]
    Zero(&'static str),
    #[error("minimum spawn interval {min} exceeds initial spawn interval {initial}")]
    SpawnRange { min: u32, initial: u32 },
    #[error("{name} must be a positive finite number (got {value})")]
    NotPositive { name: &'static str, value: f32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    /// Filled cells a cluster row or column needs to be cleared.
    pub line_threshold: usize,
    pub points_per_line: u64,
    /// Entity step period in seconds; the cooldown is `tetromino_speed * 60` ticks.
    pub tetromino_speed: u32,
    /// Player cells per tick while a direction is held and unlocked.
    pub player_speed: f32,
    pub initial_spawn_interval: u32,
    pub min_spawn_interval: u32,
    /// Ticks between spawn-interval decrements.
    pub difficulty_interval: u64,
    /// Consecutive held ticks before a direction locks.
    pub max_hold: u32,
    /// Lock duration in ticks.
    pub cooldown_duration: u32,
    /// Held-meter decay per idle tick.
    pub hold_decay: f32,
    /// Spawn radius around the player, in cells.
    pub spawn_distance: f32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            line_threshold: 10,
            points_per_line: 100,
            tetromino_speed: 1,
            player_speed: 0.1,
            initial_spawn_interval: TICKS_PER_SECOND,
            min_spawn_interval: 1,
            difficulty_interval: 30 * u64::from(TICKS_PER_SECOND),
            max_hold: 5 * TICKS_PER_SECOND,
            cooldown_duration: 5 * TICKS_PER_SECOND,
            hold_decay: 0.5,
            spawn_distance: 20.0,
        }
    }
}

impl SimConfig {
    /// Ticks an entity waits between steps.
    pub fn move_interval(&self) -> u32 {
        self.tetromino_speed.saturating_mul(TICKS_PER_SECOND)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.line_threshold == 0 {
            return Err(ConfigError::Zero("line threshold"));
        }
        if self.initial_spawn_interval == 0 {
            return Err(ConfigError::Zero("initial spawn interval"));
        }
        if self.min_spawn_interval == 0 {
            return Err(ConfigError::Zero("minimum spawn interval"));
        }
        if self.min_spawn_interval > self.initial_spawn_interval {
            return Err(ConfigError::SpawnRange {
                min: self.min_spawn_interval,
                initial: self.initial_spawn_interval,
            });
        }
        if self.difficulty_interval == 0 {
            return Err(ConfigError::Zero("difficulty interval"));
        }
        if self.max_hold == 0 {
            return Err(ConfigError::Zero("max hold"));
        }
        for (name, value) in [
            ("player speed", self.player_speed),
            ("hold decay", self.hold_decay),
            ("spawn distance", self.spawn_distance),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::NotPositive { name, value });
            }
        }
        Ok(())
    }
}
