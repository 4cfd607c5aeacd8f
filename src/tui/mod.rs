//! Terminal rendering.
//!
//! Draws the shared [`UiState`] with ratatui: the main scrollback on
//! the left, the configured stream windows stacked on the right, and a
//! status strip (vitals, hands, timers, compass) above the input line.

mod input;

pub use input::InputState;

use anyhow::Result;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Gauge, Paragraph};
use ratatui::Terminal;
use std::io::{stdout, Stdout};

use crate::config::WindowSpec;
use crate::state::UiState;
use crate::widgets::text_window::{StyledRun, TextWindowState};

const SIDE_WIDTH: u16 = 41;

pub struct Tui {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl Tui {
    pub fn new() -> Result<Self> {
        enable_raw_mode()?;
        let mut out = stdout();
        out.execute(EnterAlternateScreen)?;
        let terminal = Terminal::new(CrosstermBackend::new(out))?;
        Ok(Tui { terminal })
    }

    pub fn restore() -> Result<()> {
        disable_raw_mode()?;
        stdout().execute(LeaveAlternateScreen)?;
        Ok(())
    }

    pub fn draw(
        &mut self,
        state: &mut UiState,
        input: &InputState,
        side_windows: &[WindowSpec],
        show_status: bool,
    ) -> Result<()> {
        self.terminal.draw(|frame| {
            let area = frame.area();
            let columns = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Min(40), Constraint::Length(SIDE_WIDTH)])
                .split(area);

            let strip = if show_status { 1 } else { 0 };
            let left = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Min(5),
                    Constraint::Length(strip),
                    Constraint::Length(strip),
                    Constraint::Length(1),
                ])
                .split(columns[0]);

            render_text_window(frame, left[0], "", state, "main");
            if show_status {
                render_vitals(frame, left[1], state);
                render_status(frame, left[2], state);
            }
            render_input(frame, left[3], state, input);
            render_side(frame, columns[1], state, side_windows);
        })?;
        Ok(())
    }
}

fn parse_color(code: &str) -> Option<Color> {
    let code = code.trim_start_matches('#');
    if code.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(&code[0..2], 16).ok()?;
    let g = u8::from_str_radix(&code[2..4], 16).ok()?;
    let b = u8::from_str_radix(&code[4..6], 16).ok()?;
    Some(Color::Rgb(r, g, b))
}

fn run_style(run: &StyledRun) -> Style {
    let mut style = Style::default();
    if let Some(color) = run.fg.as_deref().and_then(parse_color) {
        style = style.fg(color);
    }
    if let Some(color) = run.bg.as_deref().and_then(parse_color) {
        style = style.bg(color);
    }
    if run.underline {
        style = style.add_modifier(Modifier::UNDERLINED);
    }
    style
}

fn render_text_window(
    frame: &mut ratatui::Frame,
    area: Rect,
    title: &str,
    state: &mut UiState,
    stream: &str,
) {
    let (inner, block) = if title.is_empty() {
        (area, None)
    } else {
        let block = Block::default().borders(Borders::TOP).title(title.to_string());
        (
            Rect {
                y: area.y + 1,
                height: area.height.saturating_sub(1),
                ..area
            },
            Some(block),
        )
    };
    if let Some(block) = block {
        frame.render_widget(block, area);
    }
    let Some(window) = state.windows.get_mut(stream) else {
        return;
    };
    window.set_width(inner.width as usize);
    let lines: Vec<Line> = window
        .visible(inner.height as usize)
        .map(|(text, colors)| {
            Line::from(
                TextWindowState::styled_runs(text, colors)
                    .into_iter()
                    .map(|run| {
                        let style = run_style(&run);
                        Span::styled(run.text, style)
                    })
                    .collect::<Vec<_>>(),
            )
        })
        .collect();
    frame.render_widget(Paragraph::new(lines), inner);
}

fn render_vitals(frame: &mut ratatui::Frame, area: Rect, state: &UiState) {
    let bars = ["health", "mana", "stamina", "spirit", "mind", "stance", "encumbrance"];
    let shades = [
        Color::Red,
        Color::Blue,
        Color::Yellow,
        Color::Magenta,
        Color::Cyan,
        Color::Green,
        Color::Gray,
    ];
    let cells = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(vec![Constraint::Ratio(1, bars.len() as u32); bars.len()])
        .split(area);
    for ((bar, shade), cell) in bars.iter().zip(shades).zip(cells.iter()) {
        let Some(progress) = state.progress.get(*bar) else {
            continue;
        };
        let gauge = Gauge::default()
            .ratio(progress.ratio())
            .gauge_style(Style::default().fg(shade))
            .label(format!("{} {}", bar, progress.current()));
        frame.render_widget(gauge, *cell);
    }
}

/// Hands, prepared spell, timers and compass in one strip.
fn render_status(frame: &mut ratatui::Frame, area: Rect, state: &UiState) {
    let mut spans: Vec<Span> = Vec::new();
    spans.push(Span::raw(format!(
        "R: {}  L: {}  S: {}  ",
        pad_label(&state.right_hand),
        pad_label(&state.left_hand),
        state.prepared_spell,
    )));
    if let Some(rt) = state.countdowns.get("roundtime") {
        if rt.value() > 0 {
            spans.push(Span::styled(
                format!("RT {:>2} ", rt.value()),
                Style::default().fg(Color::Red),
            ));
        }
        if rt.secondary_value() > 0 {
            spans.push(Span::styled(
                format!("CT {:>2} ", rt.secondary_value()),
                Style::default().fg(Color::Cyan),
            ));
        }
    }
    if let Some(stun) = state.countdowns.get("stunned") {
        if stun.value() > 0 || stun.active == Some(true) {
            spans.push(Span::styled(
                format!("STUN {:>2} ", stun.value()),
                Style::default().fg(Color::Yellow),
            ));
        }
    }
    let dirs: String = ["nw", "n", "ne", "w", "out", "e", "sw", "s", "se", "up", "down"]
        .iter()
        .filter(|d| {
            state
                .indicators
                .get(&format!("compass:{d}"))
                .is_some_and(|i| i.is_active())
        })
        .map(|d| format!("{d} "))
        .collect();
    if !dirs.is_empty() {
        spans.push(Span::styled(
            format!("[{}]", dirs.trim_end()),
            Style::default().fg(Color::Green),
        ));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn pad_label(label: &str) -> &str {
    if label.is_empty() {
        "Empty"
    } else {
        label
    }
}

fn render_input(frame: &mut ratatui::Frame, area: Rect, state: &UiState, input: &InputState) {
    let prompt = if state.prompt_text.is_empty() {
        ">"
    } else {
        state.prompt_text.as_str()
    };
    let line = Line::from(vec![
        Span::styled(format!("{prompt} "), Style::default().fg(Color::DarkGray)),
        Span::raw(input.buffer().to_string()),
    ]);
    frame.render_widget(Paragraph::new(line), area);
    let cursor_x = area.x + prompt.len() as u16 + 1 + input.cursor() as u16;
    frame.set_cursor_position((cursor_x.min(area.right().saturating_sub(1)), area.y));
}

fn render_side(
    frame: &mut ratatui::Frame,
    area: Rect,
    state: &mut UiState,
    side_windows: &[WindowSpec],
) {
    let constraints: Vec<Constraint> = side_windows
        .iter()
        .map(|w| Constraint::Length(w.rows + 1))
        .chain(std::iter::once(Constraint::Min(0)))
        .collect();
    let cells = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);
    for (spec, cell) in side_windows.iter().zip(cells.iter()) {
        let title = if spec.title.is_empty() {
            spec.stream.as_str()
        } else {
            spec.title.as_str()
        };
        render_text_window(frame, *cell, title, state, &spec.stream);
    }
}
