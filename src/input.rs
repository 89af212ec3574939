//! Key bindings and held-direction tracking.

use crate::game::Direction;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::time::{Duration, Instant};

/// Without release events a direction counts as held this long after its last press or repeat.
/// Slightly above typical OS auto-repeat delay so a held key does not stutter.
pub const HELD_FALLBACK: Duration = Duration::from_millis(550);

/// Action from a key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Move(Direction),
    CycleForward,
    CycleBackward,
    Pause,
    Restart,
    Quit,
    None,
}

/// Map key event to action. WASD and arrows move; Q/E and [/] cycle the player shape.
pub fn key_to_action(key: KeyEvent) -> Action {
    let KeyEvent {
        code, modifiers, ..
    } = key;
    if modifiers.contains(KeyModifiers::CONTROL) {
        return match code {
            KeyCode::Char('c' | 'C') => Action::Quit,
            _ => Action::None,
        };
    }
    match code {
        KeyCode::Esc => Action::Quit,
        KeyCode::Up | KeyCode::Char('w' | 'W') => Action::Move(Direction::Up),
        KeyCode::Left | KeyCode::Char('a' | 'A') => Action::Move(Direction::Left),
        KeyCode::Down | KeyCode::Char('s' | 'S') => Action::Move(Direction::Down),
        KeyCode::Right | KeyCode::Char('d' | 'D') => Action::Move(Direction::Right),
        KeyCode::Char('q' | 'Q' | '[') => Action::CycleBackward,
        KeyCode::Char('e' | 'E' | ']') => Action::CycleForward,
        KeyCode::Char('p' | 'P') => Action::Pause,
        KeyCode::Char('r' | 'R') => Action::Restart,
        _ => Action::None,
    }
}

/// Which directions are currently held.
///
/// Terminals that report release events drive this exactly. Others only send
/// presses and auto-repeats, so each press extends the hold by [`HELD_FALLBACK`].
#[derive(Debug, Clone, Default)]
pub struct HeldKeys {
    last_seen: [Option<Instant>; 4],
    /// Set once a release event has been seen; from then on timeouts are not applied.
    releases_reported: bool,
}

impl HeldKeys {
    pub fn on_key(&mut self, dir: Direction, kind: KeyEventKind, now: Instant) {
        let slot = &mut self.last_seen[dir.index()];
        match kind {
            KeyEventKind::Press | KeyEventKind::Repeat => *slot = Some(now),
            KeyEventKind::Release => {
                *slot = None;
                self.releases_reported = true;
            }
        }
    }

    /// Held flags in [`Direction`] index order.
    pub fn snapshot(&self, now: Instant) -> [bool; 4] {
        self.last_seen.map(|seen| {
            seen.is_some_and(|t| {
                self.releases_reported || now.saturating_duration_since(t) < HELD_FALLBACK
            })
        })
    }

    pub fn clear(&mut self) {
        self.last_seen = [None; 4];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_bindings() {
        assert_eq!(key_to_action(press(KeyCode::Char('w'))), Action::Move(Direction::Up));
        assert_eq!(key_to_action(press(KeyCode::Left)), Action::Move(Direction::Left));
        assert_eq!(key_to_action(press(KeyCode::Char('E'))), Action::CycleForward);
        assert_eq!(key_to_action(press(KeyCode::Char('['))), Action::CycleBackward);
        assert_eq!(key_to_action(press(KeyCode::Esc)), Action::Quit);
        assert_eq!(
            key_to_action(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Action::Quit
        );
        assert_eq!(
            key_to_action(KeyEvent::new(KeyCode::Char('w'), KeyModifiers::CONTROL)),
            Action::None
        );
    }

    #[test]
    fn test_release_events_end_hold() {
        let t0 = Instant::now();
        let mut held = HeldKeys::default();
        held.on_key(Direction::Right, KeyEventKind::Press, t0);
        assert_eq!(held.snapshot(t0), [false, false, false, true]);
        held.on_key(Direction::Right, KeyEventKind::Release, t0);
        assert_eq!(held.snapshot(t0), [false; 4]);
        // With releases reported, a press holds indefinitely.
        held.on_key(Direction::Up, KeyEventKind::Press, t0);
        assert!(held.snapshot(t0 + Duration::from_secs(10))[0]);
    }

    #[test]
    fn test_hold_times_out_without_releases() {
        let t0 = Instant::now();
        let mut held = HeldKeys::default();
        held.on_key(Direction::Down, KeyEventKind::Press, t0);
        assert!(held.snapshot(t0 + Duration::from_millis(100))[2]);
        held.on_key(Direction::Down, KeyEventKind::Repeat, t0 + Duration::from_millis(400));
        assert!(held.snapshot(t0 + Duration::from_millis(800))[2]);
        assert!(!held.snapshot(t0 + Duration::from_millis(1000))[2]);
    }
}
