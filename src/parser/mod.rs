//! Protocol line handling.
//!
//! Each line from the server is scanned for inline tags. Styling and
//! stream-routing tags are consumed here and drive the color-span
//! tracker and the stream register; state-bearing tags are handed to
//! the projector. Plain text between tags is flushed at routing
//! boundaries and routed to its destination window or room fragment.

pub mod links;
pub mod projector;
pub mod spans;
pub mod token;

use anyhow::Result;
use chrono::Local;
use regex::Regex;
use std::sync::LazyLock;

use crate::config::Config;
use crate::highlight::Highlighter;
use crate::inventory;
use crate::room::RoomFragment;
use crate::state::UiState;
use spans::{ColorSpan, ColorSpanTracker, PresetMap};
use token::{TagKind, TagScanner};

/// Decoded before any other text handling; spans shift left by the
/// shrinkage at each decoded position.
const ENTITIES: [(&str, &str); 5] = [
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&apos;", "'"),
    ("&amp;", "&"),
];

/// Streams that carry user-facing text even without a bound window.
static PASSTHROUGH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:death|logons|thoughts|voln|familiar|room objs|room players|bounty|roomName|roomDesc)$")
        .expect("passthrough regex")
});

static FALLBACK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:death|logons|thoughts|voln|familiar)$").expect("fallback regex")
});

static PROMPT_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[.*?\]>").expect("prompt marker regex"));

static STUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*You are stunned for ([0-9]+) rounds?").expect("stun regex"));

static NSYS_SKIP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^You have.*?(?:case of uncontrollable convulsions|case of sporadic convulsions|strange case of muscle twitching)")
        .expect("nsys skip regex")
});

static NSYS_RANK3_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^You have.*? very difficult time with muscle control").expect("nsys3 regex")
});

static NSYS_RANK2_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^You have.*? constant muscle spasms").expect("nsys2 regex"));

static NSYS_RANK1_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^You have.*? developed slurred speech").expect("nsys1 regex"));

static LNET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\[.+?\]-[A-Za-z]+:[A-Z][a-z]+: "|^\[server\]: "#).expect("lnet regex")
});

static SERVER_SUPPRESS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^\[server\]: "(?:kill|connect)"#).expect("suppress regex"));

static DEATH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s\*\s(The death cry of )?([A-Z][a-z]+) (?:just bit the dust!|echoes in your mind!)")
        .expect("death regex")
});

static LOGON_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s\*\s([A-Z][a-z]+) (joins the adventure\.|returns home from a hard day of adventuring\.|has disconnected\.)")
        .expect("logon regex")
});

static ROOM_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<style id="roomName" />(\[.*?\] \(.*?\)|\[.*?\])"#).expect("room name regex")
});

static RAISE_OTHER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^As .+? begins to chant, your spirit is drawn closer to your body")
        .expect("raise other regex")
});

static SHADOW_VALLEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Just as you think the falling will never end, you crash through an ethereal barrier")
        .expect("shadow valley regex")
});

/// Opening prose of each raise-dead ritual; all of them stun for the
/// same fixed length.
const RAISE_DEAD_PREFIXES: [&str; 12] = [
    "Deep and resonating, you feel the chant that falls from your lips",
    "Moisture beads upon your skin and you feel your eyes cloud over",
    "Lifting your finger, you begin to chant and draw a series of conjoined circles",
    "Crouching beside the prone form of",
    "Murmuring softly, you call upon your connection with the Destroyer",
    "Rich and lively, the scent of wild flowers",
    "Breathing slowly, you extend your senses towards the world around you",
    "Your surroundings grow dim...you lapse into a state of awareness only",
    "Murmuring softly, a mournful chant slips from your lips",
    "Emptying all breathe from your body",
    "Thin at first, a fine layer of rime tickles your hands",
    "Wrapped in an aura of chill, you close your eyes and softly begin to chant",
];

fn is_raise_dead(text: &str) -> bool {
    RAISE_DEAD_PREFIXES.iter().any(|p| text.starts_with(p))
        || (text.starts_with("As you begin to chant") && text.contains("dusty parchment"))
        || RAISE_OTHER_RE.is_match(text)
}

/// Per-session line parser. Owns the styling scopes and the stream
/// register that persist across lines.
pub struct LineHandler {
    presets: PresetMap,
    highlighter: Highlighter,
    bounty: Regex,
    tracker: ColorSpanTracker,
    current_stream: Option<String>,
    /// set by the roomDesc style, consumed by the next main-window text
    is_room: bool,
    /// movement seen but no compass yet; room recompose waits
    new_room: bool,
    /// inside an <output class="mono"> block
    mono_pending: bool,
    skip_nsys: bool,
    inv_response: String,
}

impl LineHandler {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(LineHandler {
            presets: config.preset_map(),
            highlighter: config.build_highlighter()?,
            bounty: config.bounty_regex()?,
            tracker: ColorSpanTracker::new(),
            current_stream: None,
            is_room: false,
            new_room: false,
            mono_pending: false,
            skip_nsys: false,
            inv_response: String::new(),
        })
    }

    /// Swap in reloaded settings without touching parse state.
    pub fn apply_config(&mut self, config: &Config) -> Result<()> {
        self.presets = config.preset_map();
        self.highlighter = config.build_highlighter()?;
        self.bounty = config.bounty_regex()?;
        Ok(())
    }

    pub fn handle_line(&mut self, state: &mut UiState, raw: &str) {
        if raw.is_empty() {
            if self.current_stream.is_none() {
                self.flush_prompt(state);
                state.append_main("", Vec::new());
            }
            return;
        }

        let mut line = raw.to_string();

        if self.bounty.is_match(&line) {
            line = format!("Bounty: {line}");
            self.current_stream = Some("logons".to_string());
            if let Some(window) = state.windows.get_mut("logons") {
                window.clear();
            }
            self.route_text(state, line.clone());
            self.current_stream = None;
        }

        if line.starts_with("<output class=\"mono\"") || self.mono_pending {
            self.mono_pending = true;
            if line.starts_with("You seem to be in one piece") {
                projector::clear_injuries(state);
                self.mono_pending = false;
            }
        }

        if line.contains("Your worn items are") || !self.inv_response.is_empty() {
            self.inv_response.push_str(&line);
            self.inv_response.push('\n');
            if line.contains("<popStream/>") {
                let lines = inventory::format_inventory(&self.inv_response);
                if let Some(window) = state.windows.get_mut("inv_container") {
                    window.clear();
                    for text in lines {
                        window.add_text(&text, Vec::new());
                    }
                }
                state.mark_dirty();
                self.inv_response.clear();
            }
        }

        if line.contains("<nav rm=") {
            self.new_room = true;
            state.room.clear_fragments();
        }

        let mut scanner = TagScanner::new(&line);
        while let Some(tok) = scanner.next_tag() {
            match &tok.kind {
                TagKind::PushBold => self.tracker.open_bold(tok.start, &self.presets),
                TagKind::PopBold => self.tracker.close_bold(tok.start),
                TagKind::PresetOpen { id } => {
                    self.tracker.open_preset(id, tok.start, &self.presets)
                }
                TagKind::PresetClose => self.tracker.close_preset(tok.start),
                TagKind::ColorOpen { fg, bg, underline } => self.tracker.open_color(
                    fg.clone(),
                    bg.clone(),
                    *underline,
                    tok.start,
                ),
                TagKind::ColorClose => self.tracker.close_color(tok.start),
                TagKind::Style { id } => {
                    self.tracker.set_style(id, tok.start, &self.presets);
                    if id == "roomDesc" {
                        state.room.description = None;
                        self.is_room = true;
                        let rewritten = links::annotate(scanner.remainder());
                        scanner.replace_remainder(rewritten);
                    }
                }
                TagKind::Resource => {
                    // The room title rides after the resource tag; route
                    // it to the name fragment without consuming it.
                    if let Some(caps) = ROOM_NAME_RE.captures(scanner.remainder()) {
                        let title = caps[1].to_string();
                        let saved = self.current_stream.take();
                        self.current_stream = Some("roomName".to_string());
                        self.route_text(state, title);
                        self.current_stream = saved;
                    }
                }
                TagKind::PushStream { id } => {
                    // The stream switches before pending text flushes,
                    // so text queued ahead of the push lands in the
                    // pushed stream. Lich emits its own pushes at the
                    // start of the line, which relies on this order.
                    self.current_stream = Some(id.clone());
                    if id == "room objs" {
                        let rewritten = links::annotate(scanner.remainder());
                        scanner.replace_remainder(rewritten);
                    }
                    let text = scanner.take_text();
                    self.route_text(state, text);
                }
                TagKind::PopStream => {
                    let text = scanner.take_text();
                    self.route_text(state, text);
                    self.current_stream = None;
                }
                TagKind::Compass { .. } => {
                    self.new_room = false;
                    projector::project(state, &tok, &line);
                }
                _ => projector::project(state, &tok, &line),
            }
        }
        scanner.finish_text();
        let text = scanner.take_text();
        self.route_text(state, text);
        self.tracker.end_of_line();
    }

    fn flush_prompt(&mut self, state: &mut UiState) {
        if state.need_prompt {
            state.need_prompt = false;
            let prompt = state.prompt_text.clone();
            state.append_main(&prompt, Vec::new());
        }
    }

    /// Route one flushed text segment to its destination.
    fn route_text(&mut self, state: &mut UiState, text: String) {
        let mut text = text;
        for (entity, replacement) in ENTITIES {
            let mut search = 0;
            while let Some(found) = text[search..].find(entity) {
                let pos = search + found;
                text.replace_range(pos..pos + entity.len(), replacement);
                self.tracker.shift_after(pos, entity.len() - 1);
                search = pos + 1;
            }
        }

        if PROMPT_MARKER_RE.is_match(&text) {
            state.need_prompt = false;
        } else if let Some(caps) = STUN_RE.captures(&text) {
            let rounds: f64 = caps[1].parse().unwrap_or(0.0);
            projector::start_stun(state, rounds * 5.0);
        } else if is_raise_dead(&text) {
            projector::start_stun(state, 30.6);
        } else if SHADOW_VALLEY_RE.is_match(&text) {
            projector::start_stun(state, 16.2);
        } else if NSYS_SKIP_RE.is_match(&text) {
            // the wound tag carries the real severity, the prose does not
            self.skip_nsys = true;
        } else if self.skip_nsys {
            self.skip_nsys = false;
        } else if let Some(rank) = nsys_rank(&text) {
            if state.indicator_mut("nsys").update(rank) {
                state.mark_dirty();
            }
        }

        let mut colors = self.tracker.take_segment(text.len());

        let eligible = match &self.current_stream {
            None => true,
            Some(stream) => {
                state.windows.contains_key(stream) || PASSTHROUGH_RE.is_match(stream)
            }
        };
        if eligible {
            colors.extend(self.highlighter.apply(&text));
        }

        if text.is_empty() {
            return;
        }

        match self.current_stream.clone() {
            Some(mut stream) => {
                if stream == "thoughts" && LNET_RE.is_match(&text) {
                    stream = "lnet".to_string();
                    self.current_stream = Some(stream.clone());
                }
                if state.windows.contains_key(&stream) {
                    let (text, colors) = match stream.as_str() {
                        "death" => reformat_death(text, colors),
                        "logons" => reformat_logon(text, colors),
                        _ => (text, colors),
                    };
                    if !SERVER_SUPPRESS_RE.is_match(&text) {
                        state.append(&stream, &text, colors);
                    }
                } else if FALLBACK_RE.is_match(&stream) {
                    if let Some((fg, bg)) = self.presets.get(stream.as_str()) {
                        colors.push(ColorSpan {
                            start: 0,
                            end: text.len(),
                            fg: fg.clone(),
                            bg: bg.clone(),
                            underline: false,
                        });
                    }
                    self.flush_prompt(state);
                    state.append_main(&text, colors);
                } else if stream == "room objs" && text.contains("You also see") {
                    state.room.also_see = Some(RoomFragment::new(text, colors));
                } else if stream == "room players" {
                    state.room.players = Some(RoomFragment::new(text, colors));
                } else if stream == "room exits" {
                    state.room.exits = Some(RoomFragment::new(text, colors));
                } else if stream == "roomName" {
                    state.room.name = Some(RoomFragment::new(text, colors));
                }
            }
            None => {
                self.flush_prompt(state);
                state.append_main(&text, colors.clone());

                if self.is_room {
                    self.is_room = false;
                    let desc = text.split("You also").next().unwrap_or("").to_string();
                    state.room.description = Some(RoomFragment::new(desc, colors));
                }

                if !self.new_room {
                    if let Some((room_text, room_colors)) = state.room.take_if_changed() {
                        if let Some(window) = state.windows.get_mut("room") {
                            window.clear();
                            window.add_text(&room_text, room_colors);
                        }
                        state.mark_dirty();
                    }
                }
            }
        }
    }
}

fn nsys_rank(text: &str) -> Option<u8> {
    if NSYS_RANK3_RE.is_match(text) {
        Some(3)
    } else if NSYS_RANK2_RE.is_match(text) {
        Some(2)
    } else if NSYS_RANK1_RE.is_match(text) {
        Some(1)
    } else {
        None
    }
}

fn timestamp() -> String {
    Local::now().format("%l:%M%P").to_string().trim_start().to_string()
}

/// " * Bob just bit the dust!" becomes "Bob 3:12pm" with the event
/// colored red; spans shift back past the stripped prefix and clamp
/// to the name.
fn reformat_death(text: String, colors: Vec<ColorSpan>) -> (String, Vec<ColorSpan>) {
    let Some(caps) = DEATH_RE.captures(&text) else {
        return (text, colors);
    };
    let front = 3 + caps.get(1).map_or(0, |m| m.len());
    let name = caps[2].to_string();
    reanchor_event(name, front, "ff0000", colors)
}

fn reformat_logon(text: String, colors: Vec<ColorSpan>) -> (String, Vec<ColorSpan>) {
    let Some(caps) = LOGON_RE.captures(&text) else {
        return (text, colors);
    };
    let name = caps[1].to_string();
    let fg = match &caps[2] {
        "joins the adventure." => "007700",
        "has disconnected." => "aa7733",
        _ => "777700",
    };
    reanchor_event(name, 3, fg, colors)
}

fn reanchor_event(
    name: String,
    front: usize,
    fg: &str,
    mut colors: Vec<ColorSpan>,
) -> (String, Vec<ColorSpan>) {
    let text = format!("{} {}", name, timestamp());
    for span in colors.iter_mut() {
        span.start = span.start.saturating_sub(front);
        span.end = span.end.min(name.len());
    }
    colors.retain(|s| s.start < s.end);
    colors.push(ColorSpan {
        start: name.len() + 1,
        end: text.len(),
        fg: Some(fg.to_string()),
        bg: None,
        underline: false,
    });
    (text, colors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widgets::TextWindowState;

    fn handler() -> LineHandler {
        let config: Config = toml::from_str(
            r#"
            [connection]

            [presets]
            monsterbold = { fg = "ffff00" }
            speech = { fg = "66ff66" }
            thoughts = { fg = "ff80ff" }
            link = { fg = "44aaff" }
            roomName = { fg = "ffffff" }
            "#,
        )
        .expect("test config");
        LineHandler::new(&config).expect("handler")
    }

    fn state() -> UiState {
        let mut state = UiState::new();
        state.windows.insert("main".into(), TextWindowState::new(500));
        state.windows.insert("room".into(), TextWindowState::new(50));
        state
    }

    fn main_lines(state: &UiState) -> Vec<String> {
        state.windows["main"]
            .iter_lines()
            .map(|(t, _)| t.clone())
            .collect()
    }

    #[test]
    fn plain_line_reaches_main_unstyled() {
        let mut h = handler();
        let mut s = state();
        h.handle_line(&mut s, "A silvery mist swirls about you.");
        let lines = main_lines(&s);
        assert_eq!(lines, vec!["A silvery mist swirls about you."]);
        assert!(s.windows["main"].iter_lines().all(|(_, c)| c.is_empty()));
    }

    #[test]
    fn bold_span_colored_by_preset() {
        let mut h = handler();
        let mut s = state();
        h.handle_line(&mut s, "<pushBold/>a kobold<popBold/> hits you.");
        let (text, colors) = s.windows["main"].iter_lines().next().unwrap().clone();
        assert_eq!(text, "a kobold hits you.");
        assert_eq!(colors.len(), 1);
        assert_eq!(colors[0].start, 0);
        assert_eq!(colors[0].end, 8);
        assert_eq!(colors[0].fg.as_deref(), Some("ffff00"));
    }

    #[test]
    fn entity_decode_shifts_spans() {
        let mut h = handler();
        let mut s = state();
        h.handle_line(
            &mut s,
            "He says, &quot;Look <pushBold/>out<popBold/>!&quot;",
        );
        let (text, colors) = s.windows["main"].iter_lines().next().unwrap().clone();
        assert_eq!(text, "He says, \"Look out!\"");
        assert_eq!(colors[0].start, 15);
        assert_eq!(colors[0].end, 18);
    }

    #[test]
    fn text_ahead_of_push_lands_in_pushed_stream() {
        let mut h = handler();
        let mut s = state();
        s.windows.insert("lnet".into(), TextWindowState::new(50));
        h.handle_line(
            &mut s,
            "stray<pushStream id='lnet'/>chatter<popStream/>",
        );
        assert!(main_lines(&s).is_empty());
        let lines: Vec<_> = s.windows["lnet"]
            .iter_lines()
            .map(|(t, _)| t.clone())
            .collect();
        assert_eq!(lines, vec!["stray", "chatter"]);
    }

    #[test]
    fn unknown_stream_without_window_is_dropped() {
        let mut h = handler();
        let mut s = state();
        h.handle_line(
            &mut s,
            "<pushStream id='percWindow'/>some scroll churn<popStream/>",
        );
        assert!(main_lines(&s).is_empty());
    }

    #[test]
    fn passthrough_stream_falls_back_to_main_with_tint() {
        let mut h = handler();
        let mut s = state();
        h.handle_line(
            &mut s,
            "<pushStream id='thoughts'/>You hear the thoughts of Bob.<popStream/>",
        );
        let (text, colors) = s.windows["main"].iter_lines().next().unwrap().clone();
        assert_eq!(text, "You hear the thoughts of Bob.");
        assert!(colors
            .iter()
            .any(|c| c.fg.as_deref() == Some("ff80ff") && c.start == 0 && c.end == text.len()));
    }

    #[test]
    fn thoughts_reroute_to_lnet_window() {
        let mut h = handler();
        let mut s = state();
        s.windows.insert("lnet".into(), TextWindowState::new(50));
        h.handle_line(
            &mut s,
            "<pushStream id='thoughts'/>[Merchant]-GSIV:Bob: \"selling stuff\"<popStream/>",
        );
        assert_eq!(s.windows["lnet"].line_count(), 1);
        assert!(main_lines(&s).is_empty());
    }

    #[test]
    fn stun_line_arms_the_countdown() {
        let mut h = handler();
        let mut s = state();
        h.handle_line(&mut s, "You are stunned for 3 rounds!");
        let reqs = s.take_ticker_requests();
        assert_eq!(reqs.len(), 1);
        assert_eq!(reqs[0].countdown, "stunned");
        assert!(s.countdowns["stunned"].value() >= 14);
    }

    #[test]
    fn room_fragments_compose_into_room_window() {
        let mut h = handler();
        let mut s = state();
        h.handle_line(&mut s, "<nav rm='123'/>");
        h.handle_line(
            &mut s,
            "<resource picture=\"0\"/><style id=\"roomName\" />[Town Square, Small Park]<style id=\"\"/>",
        );
        h.handle_line(
            &mut s,
            "<component id='room objs'>  You also see a wooden bench.</component>",
        );
        h.handle_line(
            &mut s,
            "<component id='room players'>Also here: Bob.</component>",
        );
        h.handle_line(&mut s, "<compass><dir value=\"n\"/></compass>");
        h.handle_line(&mut s, "A quiet corner of the park.");
        let room: Vec<String> = s.windows["room"]
            .iter_lines()
            .map(|(t, _)| t.clone())
            .collect();
        assert_eq!(
            room,
            vec![
                "[Town Square, Small Park]",
                "You also see a wooden bench.",
                "Also here: Bob.",
            ]
        );
    }

    #[test]
    fn logons_are_reformatted_with_timestamp() {
        let mut h = handler();
        let mut s = state();
        s.windows.insert("logons".into(), TextWindowState::new(50));
        h.handle_line(
            &mut s,
            "<pushStream id='logons'/> * Bob joins the adventure.<popStream/>",
        );
        let (text, colors) = s.windows["logons"].iter_lines().next().unwrap().clone();
        assert!(text.starts_with("Bob "));
        assert!(colors
            .iter()
            .any(|c| c.start == 4 && c.fg.as_deref() == Some("007700")));
    }

    #[test]
    fn server_kill_lines_are_suppressed() {
        let mut h = handler();
        let mut s = state();
        s.windows.insert("lnet".into(), TextWindowState::new(50));
        h.handle_line(
            &mut s,
            "<pushStream id='thoughts'/>[server]: \"kill 1234\"<popStream/>",
        );
        assert_eq!(s.windows["lnet"].line_count(), 0);
        assert!(main_lines(&s).is_empty());
    }

    #[test]
    fn scopes_do_not_leak_across_lines() {
        let mut h = handler();
        let mut s = state();
        h.handle_line(&mut s, "<pushBold/>unbalanced");
        h.handle_line(&mut s, "next line<popBold/>");
        let lines: Vec<_> = s.windows["main"].iter_lines().collect();
        assert!(lines[1].1.is_empty());
    }

    #[test]
    fn prompt_deferral_flushes_before_next_text() {
        let mut h = handler();
        let mut s = state();
        h.handle_line(&mut s, "<prompt time=\"1700000000\">&gt;</prompt>");
        h.handle_line(&mut s, "<prompt time=\"1700000001\">&gt;</prompt>");
        h.handle_line(&mut s, "You swing!");
        let lines = main_lines(&s);
        assert_eq!(lines, vec![">", ">", "You swing!"]);
    }
}
