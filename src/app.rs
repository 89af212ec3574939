//! App: terminal init, main loop, fixed-rate ticking and key handling.

use crate::Args;
use crate::game::{GameState, TickInput};
use crate::input::{Action, HeldKeys, key_to_action};
use crate::theme::Theme;
use crate::ui::ActiveEffect;
use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind};
use ratatui::DefaultTerminal;
use std::time::{Duration, Instant};

/// Most ticks run in one frame; any older backlog is dropped so a stall does not fast-forward.
const MAX_SUBSTEPS: u32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Playing,
    GameOver,
}

pub struct App {
    args: Args,
    theme: Theme,
    state: GameState,
    screen: Screen,
    paused: bool,
    held: HeldKeys,
    /// Tag cycling requested since the last tick.
    cycle_forward: bool,
    cycle_backward: bool,
    effects: Vec<ActiveEffect>,
    tick_interval: Duration,
    frame_interval: Duration,
    accumulator: Duration,
    last_frame: Instant,
}

impl App {
    pub fn new(args: Args, state: GameState, theme: Theme) -> Self {
        let tick_interval = Duration::from_secs_f64(1.0 / args.tick_rate);
        let frame_interval = Duration::from_secs_f64(1.0 / args.frame_rate);
        Self {
            args,
            theme,
            state,
            screen: Screen::Playing,
            paused: false,
            held: HeldKeys::default(),
            cycle_forward: false,
            cycle_backward: false,
            effects: Vec::new(),
            tick_interval,
            frame_interval,
            accumulator: Duration::ZERO,
            last_frame: Instant::now(),
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    fn reset_game(&mut self) {
        log::info!("restart (score was {})", self.state.score);
        self.state = self.state.restarted();
        self.screen = Screen::Playing;
        self.paused = false;
        self.held.clear();
        self.cycle_forward = false;
        self.cycle_backward = false;
        self.effects.clear();
        self.accumulator = Duration::ZERO;
        self.last_frame = Instant::now();
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags},
            execute,
            terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen)?;

        // Release events let held directions end exactly; not every terminal supports them.
        let enhanced = execute!(
            stdout,
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
        )
        .is_ok();
        log::debug!("keyboard enhancement: {enhanced}");

        let mut terminal =
            ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;
        terminal.clear()?;
        self.last_frame = Instant::now();

        let result = self.run_loop(&mut terminal);

        // Restore
        let _ = execute!(std::io::stdout(), PopKeyboardEnhancementFlags);
        execute!(std::io::stdout(), LeaveAlternateScreen)?;
        disable_raw_mode()?;

        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        loop {
            let frame_start = Instant::now();
            let delta = frame_start.saturating_duration_since(self.last_frame);
            self.last_frame = frame_start;

            if self.screen == Screen::Playing && !self.paused {
                self.accumulator += delta;
                self.run_ticks(frame_start);
            }

            let effect_delta = if self.paused { Duration::ZERO } else { delta };
            terminal.draw(|f| {
                crate::ui::draw(
                    f,
                    self.screen,
                    &self.state,
                    &self.theme,
                    self.paused,
                    &mut self.effects,
                    effect_delta,
                );
            })?;
            self.effects.retain(|e| !e.done());

            let timeout = self.frame_interval.saturating_sub(frame_start.elapsed());
            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    if let Event::Key(key) = event::read()? {
                        if self.handle_key(key.kind, key_to_action(key)) {
                            return Ok(());
                        }
                    }
                }
            }
        }
    }

    /// Apply one key event. Returns true when the app should exit.
    fn handle_key(&mut self, kind: KeyEventKind, action: Action) -> bool {
        if let Action::Move(dir) = action {
            // Every kind counts here: repeats extend a hold, releases end it.
            self.held.on_key(dir, kind, Instant::now());
            return false;
        }
        if kind != KeyEventKind::Press {
            return false;
        }
        match (self.screen, action) {
            (_, Action::Quit) => return true,
            (Screen::Playing, Action::Pause) => {
                self.paused = !self.paused;
                self.held.clear();
            }
            (Screen::Playing, Action::CycleForward) if !self.paused => self.cycle_forward = true,
            (Screen::Playing, Action::CycleBackward) if !self.paused => {
                self.cycle_backward = true;
            }
            (Screen::GameOver, Action::Restart) => self.reset_game(),
            _ => {}
        }
        false
    }

    fn run_ticks(&mut self, now: Instant) {
        let mut steps = 0;
        while self.accumulator >= self.tick_interval {
            if steps == MAX_SUBSTEPS {
                log::debug!("dropping {:?} of tick backlog", self.accumulator);
                self.accumulator = Duration::ZERO;
                break;
            }
            let input = TickInput {
                held: self.held.snapshot(now),
                cycle_forward: std::mem::take(&mut self.cycle_forward),
                cycle_backward: std::mem::take(&mut self.cycle_backward),
            };
            self.state.tick(&input);
            self.accumulator -= self.tick_interval;
            steps += 1;

            for request in self.state.drain_effects() {
                if !self.args.no_effects {
                    self.effects
                        .push(ActiveEffect::from_request(&request, &self.theme));
                }
            }
            if self.state.is_over() {
                self.screen = Screen::GameOver;
                self.accumulator = Duration::ZERO;
                break;
            }
        }
    }
}
