//! Tetri-Survivor: a survival arena in the terminal where tetrominoes hunt you,
//! fuse into clusters on contact, and shatter when a cluster fills a line.

mod app;
mod game;
mod input;
mod theme;
mod ui;

use anyhow::{Context, Result, bail};
use app::App;
use clap::{Parser, ValueEnum};
use game::{GameState, SimConfig, TICKS_PER_SECOND, TickInput};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_file.as_deref())?;

    let config = args.sim_config();
    let seed = args.seed.unwrap_or_else(clock_seed);
    let state = GameState::new(config, seed).context("invalid game settings")?;
    log::info!("seed {seed} (replay with --seed {seed})");

    if args.headless {
        let state = run_headless(state, args.max_ticks);
        if state.is_over() {
            println!("Game Over! Final Score: {}", state.score);
        } else {
            println!("Final Score: {}", state.score);
        }
        println!("Ticks: {}", state.ticks);
        return Ok(());
    }

    if !(args.tick_rate.is_finite() && args.tick_rate > 0.0) {
        bail!("--tick-rate must be a positive number");
    }
    if !(args.frame_rate.is_finite() && args.frame_rate > 0.0) {
        bail!("--frame-rate must be a positive number");
    }
    let theme = theme::Theme::load(args.theme.as_deref(), args.palette).unwrap_or_else(|e| {
        log::warn!("theme not loaded ({e}), using defaults");
        let mut theme = theme::Theme::default();
        theme.apply_palette(args.palette);
        theme
    });

    let mut app = App::new(args, state, theme);
    app.run()?;
    println!("Game Over! Final Score: {}", app.state().score);
    Ok(())
}

/// Logs go to stderr (the TUI owns stdout) or to `--log-file`.
fn init_logging(log_file: Option<&Path>) -> Result<()> {
    let mut builder = match log_file {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("cannot create log file {}", path.display()))?;
            let mut builder = env_logger::Builder::from_env(
                env_logger::Env::default().default_filter_or("info"),
            );
            builder.target(env_logger::Target::Pipe(Box::new(file)));
            builder
        }
        None => {
            env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        }
    };
    builder.try_init()?;
    Ok(())
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default()
}

/// Idle input until the game ends or `max_ticks` is reached.
fn run_headless(mut state: GameState, max_ticks: Option<u64>) -> GameState {
    let idle = TickInput::default();
    let report_every = 30 * u64::from(TICKS_PER_SECOND);
    while !state.is_over() && max_ticks.is_none_or(|max| state.ticks < max) {
        state.tick(&idle);
        state.drain_effects();
        if state.ticks % report_every == 0 {
            log::info!(
                "seed {} tick {}: {} shapes, score {}, spawn every {}",
                state.seed(),
                state.ticks,
                state.entity_count(),
                state.score,
                state.spawn_interval()
            );
        }
    }
    state
}

/// Survive the arena: every tetromino that is not your shape hunts you.
#[derive(Debug, Parser)]
#[command(
    name = "tetrisurvivor",
    version,
    about = "Survival arena in the terminal. Tetrominoes hunt or flee you, merge into clusters, and shatter on full lines.",
    long_about = "Tetri-Survivor is a survival game played on an endless grid.\n\n\
        Tetrominoes spawn around you. Those wearing your current shape flee; all others hunt you. \
        When two shapes touch they fuse into a white cluster. A cluster row or column with 10 cells \
        is cleared for 100 points, and any loose tetromino left behind breaks free again. \
        Touching any shape ends the run.\n\n\
        Holding a direction for 5 seconds locks it for 5 seconds, so keep moving.\n\n\
        CONTROLS:\n  W/A/S/D or arrows  Move     Q / E or [ / ]  Change shape\n  \
        P  Pause     R  Restart (after game over)     Esc / Ctrl-C  Quit"
)]
pub struct Args {
    /// RNG seed; the same seed and inputs replay the same game. Random if not set.
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Ticks between spawns at the start.
    #[arg(long, default_value = "60", value_name = "TICKS")]
    pub initial_spawn_interval: u32,

    /// Spawn interval floor.
    #[arg(long, default_value = "1", value_name = "TICKS")]
    pub min_spawn_interval: u32,

    /// Ticks between one-tick reductions of the spawn interval.
    #[arg(long, default_value = "1800", value_name = "TICKS")]
    pub difficulty_interval: u64,

    /// Simulation ticks per second. Tunables are expressed at 60.
    #[arg(long, default_value = "60.0", value_name = "RATE")]
    pub tick_rate: f64,

    /// Target render frames per second.
    #[arg(long, default_value = "30.0", value_name = "RATE")]
    pub frame_rate: f64,

    /// Path to theme file (btop-style theme[key]=\"value\"), e.g. theme[shape_t]=\"#AA00AA\".
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<PathBuf>,

    /// Colour palette: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// Disable merge, line-clear and fragment flashes.
    #[arg(long)]
    pub no_effects: bool,

    /// Write logs to this file instead of stderr (RUST_LOG still sets the filter).
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Run without a terminal UI using idle input; prints the final score.
    #[arg(long)]
    pub headless: bool,

    /// With --headless: stop after this many ticks.
    #[arg(long, value_name = "N")]
    pub max_ticks: Option<u64>,
}

impl Args {
    fn sim_config(&self) -> SimConfig {
        SimConfig {
            initial_spawn_interval: self.initial_spawn_interval,
            min_spawn_interval: self.min_spawn_interval,
            difficulty_interval: self.difficulty_interval,
            ..SimConfig::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Palette {
    #[default]
    Normal,

    #[value(alias = "highcontrast", alias = "contrast")]
    HighContrast,

    #[value(alias = "colourblind")]
    Colorblind,
}
