//! Session loop.
//!
//! Wires the network reader, the line handler, the countdown tickers
//! and the terminal together. Incoming lines are drained in bursts and
//! the screen redraws once per burst, not once per line.

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use std::path::PathBuf;
use std::process::Command;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tracing::{info, warn};

use crate::config::Config;
use crate::network::ServerMessage;
use crate::parser::LineHandler;
use crate::state::{TickerRequest, UiState};
use crate::tui::{InputState, Tui};
use crate::widgets::TextWindowState;

/// Grace period after a line arrives before redrawing, so a burst of
/// lines paints once.
const COALESCE: Duration = Duration::from_millis(10);
const TICKER_INTERVAL: Duration = Duration::from_millis(150);
const SCROLL_STEP: usize = 10;

pub struct App {
    state: Arc<Mutex<UiState>>,
    handler: LineHandler,
    input: InputState,
    config: Config,
    config_path: PathBuf,
    command_tx: mpsc::UnboundedSender<String>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    show_status: bool,
    running: bool,
}

impl App {
    pub fn new(
        config: Config,
        config_path: PathBuf,
        command_tx: mpsc::UnboundedSender<String>,
        server_rx: mpsc::UnboundedReceiver<ServerMessage>,
        show_status: bool,
    ) -> Result<Self> {
        let mut state = UiState::new();
        bind_windows(&mut state, &config);
        let handler = LineHandler::new(&config)?;
        Ok(App {
            state: Arc::new(Mutex::new(state)),
            handler,
            input: InputState::new(),
            config,
            config_path,
            command_tx,
            server_rx,
            show_status,
            running: true,
        })
    }

    pub async fn run(&mut self, tui: &mut Tui) -> Result<()> {
        self.draw(tui).await?;
        while self.running {
            let processed = self.drain_server().await;
            if processed {
                self.service_outbox().await;
            }

            let mut input_changed = false;
            while event::poll(Duration::ZERO)? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key.code, key.modifiers).await;
                        input_changed = true;
                    }
                }
            }

            let dirty = {
                let mut ui = self.state.lock().await;
                std::mem::take(&mut ui.need_update)
            };
            if dirty || input_changed {
                self.draw(tui).await?;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        Ok(())
    }

    async fn draw(&mut self, tui: &mut Tui) -> Result<()> {
        let mut ui = self.state.lock().await;
        tui.draw(&mut ui, &self.input, &self.config.windows, self.show_status)
    }

    /// Drain everything the reader has queued; once started, keep
    /// draining until the connection stays quiet for the grace period.
    async fn drain_server(&mut self) -> bool {
        let mut processed = false;
        loop {
            match self.server_rx.try_recv() {
                Ok(msg) => {
                    self.apply_message(msg).await;
                    processed = true;
                }
                Err(mpsc::error::TryRecvError::Empty) => {
                    if !processed {
                        return false;
                    }
                    let late = tokio::time::timeout(COALESCE, self.server_rx.recv()).await;
                    match late {
                        Ok(Some(msg)) => self.apply_message(msg).await,
                        _ => return true,
                    }
                }
                Err(mpsc::error::TryRecvError::Disconnected) => return processed,
            }
        }
    }

    async fn apply_message(&mut self, msg: ServerMessage) {
        let mut ui = self.state.lock().await;
        match msg {
            ServerMessage::Connected => info!("session established"),
            ServerMessage::Line(line) => self.handler.handle_line(&mut ui, &line),
            ServerMessage::Disconnected => {
                for line in [" *", " * Connection closed", " *"] {
                    ui.append_main(line, Vec::new());
                }
                ui.mark_dirty();
            }
        }
    }

    async fn service_outbox(&mut self) {
        let (requests, urls) = {
            let mut ui = self.state.lock().await;
            (ui.take_ticker_requests(), ui.take_pending_urls())
        };
        for request in requests {
            spawn_ticker(Arc::clone(&self.state), request);
        }
        for url in urls {
            launch_browser(&url);
        }
    }

    async fn handle_key(&mut self, code: KeyCode, modifiers: KeyModifiers) {
        if modifiers.contains(KeyModifiers::CONTROL) {
            match code {
                KeyCode::Char('c') | KeyCode::Char('q') => self.running = false,
                KeyCode::Char('r') => self.reload_config().await,
                _ => {}
            }
            return;
        }
        match code {
            KeyCode::Char(ch) => self.input.insert(ch),
            KeyCode::Backspace => self.input.backspace(),
            KeyCode::Delete => self.input.delete(),
            KeyCode::Left => self.input.move_left(),
            KeyCode::Right => self.input.move_right(),
            KeyCode::Home => self.input.move_home(),
            KeyCode::End => self.input.move_end(),
            KeyCode::Up => self.input.history_prev(),
            KeyCode::Down => self.input.history_next(),
            KeyCode::Enter => self.submit().await,
            KeyCode::PageUp => self.scroll_main(|w| w.scroll_up(SCROLL_STEP)).await,
            KeyCode::PageDown => self.scroll_main(|w| w.scroll_down(SCROLL_STEP)).await,
            KeyCode::Esc => self.scroll_main(TextWindowState::scroll_to_bottom).await,
            _ => {}
        }
    }

    async fn scroll_main(&mut self, f: impl FnOnce(&mut TextWindowState)) {
        let mut ui = self.state.lock().await;
        if let Some(window) = ui.windows.get_mut("main") {
            f(window);
        }
        ui.mark_dirty();
    }

    async fn submit(&mut self) {
        let line = self.input.submit();
        if line.is_empty() {
            return;
        }
        // a leading dot addresses Lich scripts
        let command = match line.strip_prefix('.') {
            Some(rest) => format!(";{rest}"),
            None => line,
        };
        {
            let mut ui = self.state.lock().await;
            let prompt = if ui.prompt_text.is_empty() {
                ">".to_string()
            } else {
                ui.prompt_text.clone()
            };
            let echo = format!("{prompt} {command}");
            ui.append_main(&echo, Vec::new());
        }
        if self.command_tx.send(command).is_err() {
            warn!("command channel closed");
        }
    }

    async fn reload_config(&mut self) {
        match Config::load(&self.config_path) {
            Ok(config) => {
                if let Err(e) = self.handler.apply_config(&config) {
                    warn!("config reload rejected: {}", e);
                    return;
                }
                let mut ui = self.state.lock().await;
                bind_windows(&mut ui, &config);
                ui.mark_dirty();
                self.config = config;
                info!("configuration reloaded");
            }
            Err(e) => warn!("config reload failed: {}", e),
        }
    }
}

/// Create the text windows the config names, leaving any that already
/// exist (and their scrollback) alone.
fn bind_windows(state: &mut UiState, config: &Config) {
    state
        .windows
        .entry("main".to_string())
        .or_insert_with(|| TextWindowState::new(config.ui.buffer_lines));
    for spec in &config.windows {
        state
            .windows
            .entry(spec.stream.clone())
            .or_insert_with(|| TextWindowState::new(500));
    }
}

fn spawn_ticker(state: Arc<Mutex<UiState>>, request: TickerRequest) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(TICKER_INTERVAL);
        interval.tick().await;
        loop {
            interval.tick().await;
            let mut ui = state.lock().await;
            let offset = ui.server_time_offset;
            let verdict = match ui.countdowns.get_mut(&request.countdown) {
                None => None,
                Some(cd) => {
                    let current = if request.secondary {
                        cd.secondary_generation()
                    } else {
                        cd.generation()
                    };
                    if current != request.generation {
                        // a newer deadline owns this countdown now
                        None
                    } else {
                        let changed = cd.refresh(offset);
                        let value = if request.secondary {
                            cd.secondary_value()
                        } else {
                            cd.value()
                        };
                        Some((changed, value == 0))
                    }
                }
            };
            match verdict {
                None => break,
                Some((changed, done)) => {
                    if changed {
                        ui.need_update = true;
                    }
                    if done {
                        break;
                    }
                }
            }
        }
    });
}

fn launch_browser(path: &str) {
    let url = if path.starts_with("http") {
        path.to_string()
    } else {
        format!("https://www.play.net{path}")
    };
    let spawned = if cfg!(target_os = "windows") {
        Command::new("cmd").args(["/c", "start", &url]).spawn()
    } else if cfg!(target_os = "macos") {
        Command::new("open").arg(&url).spawn()
    } else {
        Command::new("xdg-open").arg(&url).spawn()
    };
    match spawned {
        Ok(_) => info!("opened {}", url),
        Err(e) => warn!("could not open {}: {}", url, e),
    }
}
