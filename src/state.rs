//! Shared UI state.
//!
//! Everything the renderer draws lives in one [`UiState`] behind an
//! `Arc<Mutex<_>>`. The reader task mutates it as protocol lines
//! arrive; the render loop snapshots it. Timer work is requested
//! through the `ticker_requests` outbox instead of spawned here, which
//! keeps the projector synchronous and testable.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::parser::spans::ColorSpan;
use crate::room::RoomView;
use crate::spells::SpellPanel;
use crate::widgets::{CountdownState, IndicatorState, ProgressBarState, TextWindowState};

/// Ask the session loop to spawn (or re-arm) a ticker for a countdown.
/// The generation pins the request to one specific deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickerRequest {
    pub countdown: String,
    pub generation: u64,
    pub secondary: bool,
}

#[derive(Debug, Default)]
pub struct UiState {
    pub windows: HashMap<String, TextWindowState>,
    pub indicators: HashMap<String, IndicatorState>,
    pub progress: HashMap<String, ProgressBarState>,
    pub countdowns: HashMap<String, CountdownState>,
    pub room: RoomView,
    pub spell_panel: SpellPanel,

    pub prompt_text: String,
    pub need_prompt: bool,
    pub need_update: bool,

    pub left_hand: String,
    pub right_hand: String,
    pub prepared_spell: String,

    pub server_time_offset: f64,
    offset_latched: bool,

    pub ticker_requests: Vec<TickerRequest>,
    pub pending_urls: Vec<String>,
}

impl UiState {
    pub fn new() -> Self {
        let mut state = UiState::default();
        for id in ["health", "mana", "stamina", "spirit", "mind", "encumbrance", "stance"] {
            state.progress.insert(id.into(), ProgressBarState::new(id));
        }
        state
            .countdowns
            .insert("roundtime".into(), CountdownState::with_label("RT"));
        state
            .countdowns
            .insert("stunned".into(), CountdownState::with_label("ST"));
        state
    }

    pub fn mark_dirty(&mut self) {
        self.need_update = true;
    }

    /// Append a line to a stream window. Returns false when no window
    /// is bound to the stream so the caller can fall back to main.
    pub fn append(&mut self, stream: &str, text: &str, colors: Vec<ColorSpan>) -> bool {
        let Some(window) = self.windows.get_mut(stream) else {
            return false;
        };
        if window.add_text(text, colors) {
            self.need_update = true;
        }
        true
    }

    pub fn append_main(&mut self, text: &str, colors: Vec<ColorSpan>) {
        if let Some(window) = self.windows.get_mut("main") {
            if window.add_text(text, colors) {
                self.need_update = true;
            }
        }
    }

    pub fn indicator_mut(&mut self, name: &str) -> &mut IndicatorState {
        self.indicators
            .entry(name.to_string())
            .or_insert_with(IndicatorState::new)
    }

    /// Record the difference between the local clock and the server's
    /// prompt timestamp. Latched on the first prompt only; later
    /// prompts jitter with network delay and would make countdowns
    /// wobble.
    pub fn latch_server_offset(&mut self, server_time: i64) {
        if self.offset_latched {
            return;
        }
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        self.server_time_offset = now - server_time as f64;
        self.offset_latched = true;
    }

    pub fn request_ticker(&mut self, countdown: &str, generation: u64, secondary: bool) {
        self.ticker_requests.push(TickerRequest {
            countdown: countdown.to_string(),
            generation,
            secondary,
        });
    }

    pub fn take_ticker_requests(&mut self) -> Vec<TickerRequest> {
        std::mem::take(&mut self.ticker_requests)
    }

    pub fn take_pending_urls(&mut self) -> Vec<String> {
        std::mem::take(&mut self.pending_urls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_latches_once() {
        let mut state = UiState::new();
        state.latch_server_offset(0);
        let first = state.server_time_offset;
        state.latch_server_offset(1_000_000_000);
        assert_eq!(state.server_time_offset, first);
    }

    #[test]
    fn append_reports_unbound_streams() {
        let mut state = UiState::new();
        assert!(!state.append("lnet", "hi", vec![]));
        state.windows.insert("lnet".into(), TextWindowState::new(100));
        assert!(state.append("lnet", "hi", vec![]));
        assert!(state.need_update);
    }

    #[test]
    fn state_debug_dump_covers_every_surface() {
        let mut state = UiState::new();
        state.windows.insert("main".into(), TextWindowState::new(10));
        let dump = format!("{:?}", state);
        assert!(dump.contains("roundtime"));
        assert!(dump.contains("main"));
    }

    #[test]
    fn ticker_outbox_drains() {
        let mut state = UiState::new();
        state.request_ticker("roundtime", 3, false);
        let reqs = state.take_ticker_requests();
        assert_eq!(reqs.len(), 1);
        assert_eq!(reqs[0].generation, 3);
        assert!(state.take_ticker_requests().is_empty());
    }
}
