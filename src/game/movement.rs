//! Hunt/flee stepping. Mode is a pure function of the entity tag and the player tag.

use super::entity::Entity;
use super::shape::{ShapeKind, Tag};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Hunt,
    Flee,
}

/// Entities wearing the player's tag flee; everything else, clusters included, hunts.
pub fn mode_for(tag: Tag, player_tag: ShapeKind) -> Mode {
    if tag == Tag::Shape(player_tag) {
        Mode::Flee
    } else {
        Mode::Hunt
    }
}

/// One unit step along the dominant axis of `delta`. Ties go to y; a zero component stays put.
pub fn step_for(delta: (f32, f32)) -> (i32, i32) {
    let (dx, dy) = delta;
    if dx.abs() > dy.abs() {
        (unit(dx), 0)
    } else {
        (0, unit(dy))
    }
}

/// Sign as a cell step; `f32::signum` maps 0.0 to 1.0, which would move on a zero delta.
fn unit(v: f32) -> i32 {
    if v > 0.0 {
        1
    } else if v < 0.0 {
        -1
    } else {
        0
    }
}

/// Tick one entity's movement. While its cooldown is positive it only counts down;
/// otherwise it steps toward (hunt) or away from (flee) the player's fractional position
/// and the cooldown resets.
pub fn advance(entity: &mut Entity, player: (f32, f32), player_tag: ShapeKind, move_interval: u32) {
    if entity.move_cooldown > 0 {
        entity.move_cooldown -= 1;
        return;
    }
    let toward = (
        player.0 - entity.origin.x as f32,
        player.1 - entity.origin.y as f32,
    );
    let delta = match mode_for(entity.tag, player_tag) {
        Mode::Hunt => toward,
        Mode::Flee => (-toward.0, -toward.1),
    };
    let (sx, sy) = step_for(delta);
    entity.origin.x += sx;
    entity.origin.y += sy;
    entity.move_cooldown = move_interval;
}
