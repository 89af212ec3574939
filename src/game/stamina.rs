//! Per-direction stamina gates. Holding a direction too long locks it for a cooldown.

use super::config::SimConfig;

/// Movement directions, in meter order (W, A, S, D).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Left,
    Down,
    Right,
}

impl Direction {
    pub const ALL: [Self; 4] = [Self::Up, Self::Left, Self::Down, Self::Right];

    pub fn index(&self) -> usize {
        match self {
            Self::Up => 0,
            Self::Left => 1,
            Self::Down => 2,
            Self::Right => 3,
        }
    }

    /// Unit vector in grid space (y grows down).
    pub fn vector(&self) -> (f32, f32) {
        match self {
            Self::Up => (0.0, -1.0),
            Self::Left => (-1.0, 0.0),
            Self::Down => (0.0, 1.0),
            Self::Right => (1.0, 0.0),
        }
    }

    pub fn key_label(&self) -> char {
        match self {
            Self::Up => 'W',
            Self::Left => 'A',
            Self::Down => 'S',
            Self::Right => 'D',
        }
    }
}

/// One direction's meter. `held` is fractional because idle decay is.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StaminaGate {
    held: f32,
    cooldown: u32,
}

impl StaminaGate {
    /// Advance one tick with the current input state.
    pub fn update(&mut self, input_held: bool, config: &SimConfig) {
        if self.cooldown > 0 {
            self.cooldown -= 1;
        } else if input_held {
            self.held += 1.0;
            if self.held >= config.max_hold as f32 {
                self.cooldown = config.cooldown_duration;
                self.held = 0.0;
            }
        } else {
            self.held = (self.held - config.hold_decay).max(0.0);
        }
    }

    #[inline]
    pub fn allows_movement(&self) -> bool {
        self.cooldown == 0
    }

    pub fn held_ticks(&self) -> f32 {
        self.held
    }

    pub fn cooldown_ticks(&self) -> u32 {
        self.cooldown
    }

    pub fn is_locked(&self) -> bool {
        self.cooldown > 0
    }
}

/// The four gates, indexed by [`Direction`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StaminaGates {
    gates: [StaminaGate; 4],
}

impl StaminaGates {
    pub fn update(&mut self, held: [bool; 4], config: &SimConfig) {
        for dir in Direction::ALL {
            self.gates[dir.index()].update(held[dir.index()], config);
        }
    }

    pub fn gate(&self, dir: Direction) -> &StaminaGate {
        &self.gates[dir.index()]
    }

    pub fn allows(&self, dir: Direction) -> bool {
        self.gate(dir).allows_movement()
    }
}
