//! Layout and drawing: arena view, sidebar, pause overlay, game over, effect flashes.

use crate::app::Screen;
use crate::game::{
    Direction as Dir, EffectKind, EffectRequest, GameState, GridPos, ShapeKind,
    TICKS_PER_SECOND,
};
use crate::theme::Theme;
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, Gauge, Paragraph, Widget};
use std::time::Duration;
use tachyonfx::{Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx};

/// Terminal columns per grid cell, so cells look roughly square.
const CELL_WIDTH: u16 = 2;
const SIDEBAR_WIDTH: u16 = 26;

const MERGE_FLASH_MS: u32 = 250;
const LINE_CLEAR_FLASH_MS: u32 = 450;
const FRAGMENT_FLASH_MS: u32 = 350;

/// A running flash anchored to grid cells; its screen rect follows the camera.
pub struct ActiveEffect {
    effect: Effect,
    pos: GridPos,
    extent: (u16, u16),
}

impl ActiveEffect {
    pub fn from_request(request: &EffectRequest, theme: &Theme) -> Self {
        let (color, ms, pad) = match request.kind {
            EffectKind::Merge => (theme.cluster, MERGE_FLASH_MS, 0),
            EffectKind::LineClear => (theme.title, LINE_CLEAR_FLASH_MS, 1),
            EffectKind::Fragment => (theme.tag_color(request.tag), FRAGMENT_FLASH_MS, 0),
        };
        let (w, h) = request.extent;
        Self {
            effect: fx::fade_from(color, color, (ms, Interpolation::Linear)),
            pos: GridPos::new(request.pos.x - pad, request.pos.y - pad),
            extent: (
                (w as u16).saturating_add(2 * pad as u16),
                (h as u16).saturating_add(2 * pad as u16),
            ),
        }
    }

    pub fn done(&self) -> bool {
        self.effect.done()
    }
}

/// Maps grid cells to screen cells for one frame, centred on the player.
#[derive(Debug, Clone, Copy)]
struct Camera {
    board: Rect,
    /// Grid cell shown at the board's top-left corner.
    top_left: GridPos,
}

impl Camera {
    fn new(board: Rect, center: GridPos) -> Self {
        let cols = i32::from(board.width / CELL_WIDTH);
        let rows = i32::from(board.height);
        Self {
            board,
            top_left: GridPos::new(center.x - cols / 2, center.y - rows / 2),
        }
    }

    /// Screen position of a grid cell, if it is on the board.
    fn project(&self, p: GridPos) -> Option<(u16, u16)> {
        let sx = p.x - self.top_left.x;
        let sy = p.y - self.top_left.y;
        let cols = i32::from(self.board.width / CELL_WIDTH);
        let rows = i32::from(self.board.height);
        if sx < 0 || sy < 0 || sx >= cols || sy >= rows {
            return None;
        }
        Some((
            self.board.x + sx as u16 * CELL_WIDTH,
            self.board.y + sy as u16,
        ))
    }

    /// Screen rect covering a block of grid cells, clipped to the board.
    fn project_rect(&self, pos: GridPos, (w, h): (u16, u16)) -> Rect {
        let x0 = i64::from(self.board.x)
            + (i64::from(pos.x) - i64::from(self.top_left.x)) * i64::from(CELL_WIDTH);
        let y0 = i64::from(self.board.y) + i64::from(pos.y) - i64::from(self.top_left.y);
        let x1 = x0 + i64::from(w) * i64::from(CELL_WIDTH);
        let y1 = y0 + i64::from(h);
        let clamp_x = |v: i64| {
            v.clamp(
                i64::from(self.board.x),
                i64::from(self.board.x + self.board.width),
            ) as u16
        };
        let clamp_y = |v: i64| {
            v.clamp(
                i64::from(self.board.y),
                i64::from(self.board.y + self.board.height),
            ) as u16
        };
        let (left, right) = (clamp_x(x0), clamp_x(x1));
        let (top, bottom) = (clamp_y(y0), clamp_y(y1));
        Rect {
            x: left,
            y: top,
            width: right - left,
            height: bottom - top,
        }
    }
}

/// Draw the current screen. `effects` are advanced by `delta` and rendered over the arena.
pub fn draw(
    frame: &mut Frame,
    screen: Screen,
    state: &GameState,
    theme: &Theme,
    paused: bool,
    effects: &mut [ActiveEffect],
    delta: Duration,
) {
    let area = frame.area();
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Fill(1), Constraint::Length(SIDEBAR_WIDTH)])
        .split(area);
    let camera = draw_arena(frame, state, theme, chunks[0]);
    draw_sidebar(frame, state, theme, chunks[1]);

    let tfx_delta = TfxDuration::from_millis(delta.as_millis().min(u128::from(u32::MAX)) as u32);
    for active in effects.iter_mut() {
        let rect = camera.project_rect(active.pos, active.extent);
        frame.render_effect(&mut active.effect, rect, tfx_delta);
    }

    match screen {
        Screen::Playing if paused => draw_pause_overlay(frame, theme, area),
        Screen::Playing => {}
        Screen::GameOver => draw_game_over(frame, state, theme, area),
    }
}

fn draw_arena(frame: &mut Frame, state: &GameState, theme: &Theme, area: Rect) -> Camera {
    let title = format!(" Tetri-Survivor  | Score: {} ", state.score);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(Span::styled(title, Style::default().fg(theme.title)));
    let board = block.inner(area);
    block.render(area, frame.buffer_mut());

    let player = state.player.cell();
    let camera = Camera::new(board, player);
    let buf = frame.buffer_mut();

    let grid_style = Style::default().fg(theme.div_line).bg(theme.bg);
    for y in board.top()..board.bottom() {
        for x in (board.left()..board.right()).step_by(CELL_WIDTH as usize) {
            buf[(x, y)].set_symbol("·").set_style(grid_style);
            if x + 1 < board.right() {
                buf[(x + 1, y)].set_symbol(" ").set_style(grid_style);
            }
        }
    }

    for entity in state.entities() {
        let color = theme.tag_color(entity.tag);
        let style = Style::default().fg(color).bg(theme.bg);
        for cell in entity.global_cells() {
            if let Some((x, y)) = camera.project(cell) {
                buf.set_string(x, y, "██", style);
            }
        }
    }

    if let Some((x, y)) = camera.project(player) {
        let style = Style::default()
            .fg(theme.shape_color(state.player.tag))
            .bg(theme.bg)
            .add_modifier(Modifier::BOLD);
        buf.set_string(x, y, "◆ ", style);
    }
    camera
}

fn section(theme: &Theme, title: &str) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(Span::styled(
            format!(" {title} "),
            Style::default().fg(theme.title),
        ))
}

fn draw_sidebar(frame: &mut Frame, state: &GameState, theme: &Theme, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(7), // stats
            Constraint::Length(6), // active shape
            Constraint::Length(6), // stamina
            Constraint::Fill(1),   // controls
        ])
        .split(area);

    let label = Style::default().fg(theme.title);
    let value = Style::default().fg(theme.main_fg);
    let row = |name: &str, v: String| {
        Line::from(vec![
            Span::styled(format!("{name:<9}"), label),
            Span::styled(v, value),
        ])
    };
    let secs = state.ticks / u64::from(TICKS_PER_SECOND);
    let stats = vec![
        row("Score", state.score.to_string()),
        row("Time", format!("{:02}:{:02}", secs / 60, secs % 60)),
        row("Lines", state.lines_cleared.to_string()),
        row("Shapes", state.entity_count().to_string()),
        row("Spawn", format!("every {} ticks", state.spawn_interval())),
    ];
    let block = section(theme, "Stats");
    let inner = block.inner(chunks[0]);
    block.render(chunks[0], frame.buffer_mut());
    Paragraph::new(Text::from(stats)).render(inner, frame.buffer_mut());

    let block = section(theme, "You are");
    let inner = block.inner(chunks[1]);
    block.render(chunks[1], frame.buffer_mut());
    draw_tag_preview(frame, theme, state.player.tag, inner);

    let block = section(theme, "Stamina");
    let inner = block.inner(chunks[2]);
    block.render(chunks[2], frame.buffer_mut());
    draw_stamina(frame, state, theme, inner);

    let hint = Style::default().fg(theme.inactive_fg);
    let controls = vec![
        Line::from(Span::styled("WASD / arrows  move", hint)),
        Line::from(Span::styled("Q / E  change shape", hint)),
        Line::from(Span::styled("P pause   Esc quit", hint)),
        Line::from(""),
        Line::from(Span::styled("Your shape flees you;", hint)),
        Line::from(Span::styled("all others hunt you.", hint)),
    ];
    let block = section(theme, "Controls");
    let inner = block.inner(chunks[3]);
    block.render(chunks[3], frame.buffer_mut());
    Paragraph::new(Text::from(controls)).render(inner, frame.buffer_mut());
}

/// Active shape drawn at cell scale, with its letter.
fn draw_tag_preview(frame: &mut Frame, theme: &Theme, kind: ShapeKind, area: Rect) {
    let color = theme.shape_color(kind);
    let matrix = kind.matrix();
    let w = matrix.width() as u16 * CELL_WIDTH;
    let off_x = area.width.saturating_sub(w) / 2;
    let buf = frame.buffer_mut();
    for (x, y) in matrix.cells() {
        let sx = area.x + off_x + x as u16 * CELL_WIDTH;
        let sy = area.y + 1 + y as u16;
        if sx + 1 < area.right() && sy < area.bottom() {
            buf.set_string(sx, sy, "██", Style::default().fg(color).bg(theme.bg));
        }
    }
    if area.height > 0 {
        buf.set_string(
            area.x + 1,
            area.y,
            format!("{}  Q ◀ ▶ E", kind.label()),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        );
    }
}

fn draw_stamina(frame: &mut Frame, state: &GameState, theme: &Theme, area: Rect) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1); 4])
        .split(area);
    let config = &state.config;
    for (dir, rect) in Dir::ALL.into_iter().zip(rows.iter()) {
        let gate = state.gates.gate(dir);
        let (ratio, color, label) = if gate.is_locked() {
            let secs = gate.cooldown_ticks() as f32 / TICKS_PER_SECOND as f32;
            (
                f64::from(gate.cooldown_ticks()) / f64::from(config.cooldown_duration.max(1)),
                theme.meter_cooldown,
                format!("{} locked {secs:.1}s", dir.key_label()),
            )
        } else {
            (
                f64::from(gate.held_ticks()) / f64::from(config.max_hold),
                theme.meter_held,
                dir.key_label().to_string(),
            )
        };
        Gauge::default()
            .ratio(ratio.clamp(0.0, 1.0))
            .label(label)
            .gauge_style(Style::default().fg(color).bg(theme.inactive_fg))
            .render(*rect, frame.buffer_mut());
    }
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    Rect {
        x: area.x + area.width.saturating_sub(width) / 2,
        y: area.y + area.height.saturating_sub(height) / 2,
        width: width.min(area.width),
        height: height.min(area.height),
    }
}

fn draw_pause_overlay(frame: &mut Frame, theme: &Theme, area: Rect) {
    let popup = centered(area, 28, 5);
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Paused ",
            Style::default().fg(Color::Black).bg(theme.title),
        )),
        Line::from(""),
        Line::from(Span::styled(
            " P resume    Esc quit ",
            Style::default().fg(theme.main_fg),
        )),
    ];
    Clear.render(popup, frame.buffer_mut());
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
        )
        .render(popup, frame.buffer_mut());
}

fn draw_game_over(frame: &mut Frame, state: &GameState, theme: &Theme, area: Rect) {
    let popup = centered(area, 34, 11);
    let secs = state.ticks / u64::from(TICKS_PER_SECOND);
    let fg = Style::default().fg(theme.main_fg);
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Game Over ",
            Style::default().fg(Color::White).bg(theme.meter_cooldown),
        )),
        Line::from(""),
        Line::from(Span::styled(format!(" Final Score: {} ", state.score), fg)),
        Line::from(Span::styled(
            format!(" Survived: {:02}:{:02} ", secs / 60, secs % 60),
            fg,
        )),
        Line::from(Span::styled(
            format!(" Lines: {} ", state.lines_cleared),
            fg,
        )),
        Line::from(""),
        Line::from(Span::styled(" R restart    Esc quit ", fg)),
    ];
    Clear.render(popup, frame.buffer_mut());
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
                .title(Span::styled(" Tetri-Survivor ", Style::default().fg(theme.title))),
        )
        .render(popup, frame.buffer_mut());
}
