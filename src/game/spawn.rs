//! Time-driven spawning around the player, with a shrinking interval.

use rand::Rng;
use std::f32::consts::TAU;

use super::config::SimConfig;
use super::entity::GridPos;
use super::shape::{ShapeKind, ShapeMatrix};

/// Spawn interval that steps down by one every `step_every` ticks, never below `min`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DifficultyScheduler {
    interval: u32,
    min: u32,
    step_every: u64,
}

impl DifficultyScheduler {
    pub fn new(config: &SimConfig) -> Self {
        Self {
            interval: config.initial_spawn_interval.max(config.min_spawn_interval),
            min: config.min_spawn_interval.max(1),
            step_every: config.difficulty_interval.max(1),
        }
    }

    /// Call with the tick counter after it was incremented.
    pub fn update(&mut self, tick: u64) {
        if tick % self.step_every == 0 {
            self.interval = self.interval.saturating_sub(1).max(self.min);
        }
    }

    pub fn interval(&self) -> u32 {
        self.interval
    }
}

/// Counts ticks and fires once the count reaches the current interval.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpawnController {
    counter: u32,
}

impl SpawnController {
    pub fn update(&mut self, interval: u32) -> bool {
        self.counter += 1;
        if self.counter >= interval {
            self.counter = 0;
            true
        } else {
            false
        }
    }
}

/// Where and what to spawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnPlan {
    pub origin: GridPos,
    pub kind: ShapeKind,
    pub shape: ShapeMatrix,
}

/// Random catalog shape, randomly turned, at `distance` cells from the player along a random angle.
pub fn plan_spawn<R: Rng + ?Sized>(rng: &mut R, player: (f32, f32), distance: f32) -> SpawnPlan {
    let angle = rng.random_range(0.0..TAU);
    let x = player.0 + (angle.cos() * distance).trunc();
    let y = player.1 + (angle.sin() * distance).trunc();
    let kind = ShapeKind::ALL[rng.random_range(0..ShapeKind::ALL.len())];
    let turns = rng.random_range(0..4u8);
    SpawnPlan {
        origin: GridPos::truncate(x, y),
        kind,
        shape: kind.matrix().rotated(turns),
    }
}
