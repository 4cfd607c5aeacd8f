//! Tag-to-state projection.
//!
//! Takes classified tags that carry game state (vitals, hands, timers,
//! injuries, dialogs) and applies them to [`UiState`]. Purely textual
//! tags (styling and stream routing) never reach this module; the line
//! handler consumes those itself.

use regex::Regex;
use std::sync::LazyLock;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::inventory;
use crate::parser::token::{Hand, TagKind, TagToken};
use crate::spells::SpellPanel;
use crate::state::UiState;

static PROGRESS_INNER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<progressBar[^>]*>").expect("inner progress regex"));

/// N/M out of progressBar text like "health 114/114"
static FRACTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s(-?[0-9]+)/([0-9]+)").expect("fraction regex"));

const COMPASS_DIRS: [&str; 11] = [
    "up", "down", "out", "n", "ne", "e", "se", "s", "sw", "w", "nw",
];

const INJURY_PARTS: [&str; 14] = [
    "back", "leftHand", "rightHand", "head", "rightArm", "abdomen", "leftEye", "leftArm",
    "chest", "rightLeg", "neck", "leftLeg", "nsys", "rightEye",
];

fn now_f64() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Apply one state-bearing tag. `line` is the full raw line the tag
/// came from, needed by the container dialogs that reference content
/// outside the tag itself.
pub fn project(state: &mut UiState, token: &TagToken, line: &str) {
    match &token.kind {
        TagKind::Prompt { time, text } => prompt(state, time, text),
        TagKind::Spell { name } => spell(state, name),
        TagKind::Hand { side, item } => hand(state, *side, item),
        TagKind::RoundTime { value } => {
            set_countdown(state, "roundtime", *value as f64, false);
        }
        TagKind::CastTime { value } => {
            set_countdown(state, "roundtime", *value as f64, true);
        }
        TagKind::Compass { dirs } => compass(state, dirs),
        TagKind::ProgressBar { id, value, text } => progress(state, id, *value, text),
        TagKind::DialogData { id } => dialog(state, id, &token.raw),
        TagKind::ClearStream { id } => {
            let id = id.clone();
            if let Some(window) = state.windows.get_mut(&id) {
                window.clear();
                window.add_text(" ", Vec::new());
            }
            state.mark_dirty();
        }
        TagKind::ClearContainer { id } if id == "stow" => stow(state, line),
        TagKind::StreamWindow { id, subtitle } => {
            if id == "room" {
                let title = subtitle
                    .as_deref()
                    .and_then(|s| s.strip_prefix(" - "))
                    .unwrap_or_default()
                    .to_string();
                state.indicator_mut("room").set_label(title);
                state.mark_dirty();
            }
        }
        TagKind::Indicator { name, visible } => indicator(state, name, *visible),
        TagKind::InjuryImage { part, name } => injury(state, part, name),
        TagKind::LaunchUrl { url } => state.pending_urls.push(url.clone()),
        _ => {}
    }
}

fn prompt(state: &mut UiState, time: &str, text: &str) {
    if let Ok(server_time) = time.parse::<i64>() {
        state.latch_server_offset(server_time);
    }
    let base = text.strip_suffix("&gt;").unwrap_or(text);
    let new_prompt = format!("{base}>");
    if state.prompt_text != new_prompt {
        state.need_prompt = false;
        state.prompt_text = new_prompt.clone();
        state.append_main(&new_prompt, Vec::new());
    } else {
        state.need_prompt = true;
    }
}

fn spell(state: &mut UiState, name: &str) {
    state.prepared_spell = name.to_string();
    let active = if name == "None" { 0 } else { 1 };
    let ind = state.indicator_mut("spell");
    let changed = ind.set_label(name) | ind.update(active);
    if changed {
        state.mark_dirty();
    }
}

fn hand(state: &mut UiState, side: Hand, item: &str) {
    let in_hand = inventory::title_case(item);
    let (field, key) = match side {
        Hand::Left => (&mut state.left_hand, "left"),
        Hand::Right => (&mut state.right_hand, "right"),
    };
    *field = in_hand.clone();
    let active = if in_hand == "Empty" { 0 } else { 1 };
    let ind = state.indicator_mut(key);
    ind.set_label(in_hand);
    ind.update(active);
    state.mark_dirty();
}

fn set_countdown(state: &mut UiState, key: &str, end_time: f64, secondary: bool) {
    let offset = state.server_time_offset;
    let Some(cd) = state.countdowns.get_mut(key) else {
        return;
    };
    let generation = if secondary {
        cd.set_secondary_end_time(end_time)
    } else {
        cd.set_end_time(end_time)
    };
    cd.refresh(offset);
    state.request_ticker(key, generation, secondary);
    state.mark_dirty();
}

/// Stun lengths arrive as prose, not tags, so the end time is built
/// from the local clock shifted back into server time.
pub fn start_stun(state: &mut UiState, seconds: f64) {
    let end = now_f64() - state.server_time_offset + seconds;
    set_countdown(state, "stunned", end, false);
}

fn compass(state: &mut UiState, dirs: &[String]) {
    for dir in COMPASS_DIRS {
        let open = dirs.iter().any(|d| d == dir);
        state
            .indicator_mut(&format!("compass:{dir}"))
            .update(open as u8);
    }
    state.mark_dirty();
}

fn progress(state: &mut UiState, id: &str, value: i64, text: &str) {
    let (key, value, max) = match id {
        "encumlevel" => (
            "encumbrance",
            if text == "Overloaded" { 110 } else { value },
            110,
        ),
        "pbarStance" => ("stance", value, 100),
        "mindState" => ("mind", if text == "saturated" { 110 } else { value }, 110),
        _ => {
            let Some(caps) = FRACTION_RE.captures(text) else {
                return;
            };
            let current = caps[1].parse().unwrap_or(0);
            let max = caps[2].parse().unwrap_or(0);
            (id, current, max)
        }
    };
    if let Some(bar) = state.progress.get_mut(key) {
        if bar.update(value, max) {
            state.mark_dirty();
        }
    }
}

/// Dialogs carry nested progressBars (the minivitals bar group) and
/// the four effect lists for the spells panel.
fn dialog(state: &mut UiState, id: &str, raw: &str) {
    for m in PROGRESS_INNER_RE.find_iter(raw) {
        if let TagKind::ProgressBar { id, value, text } = crate::parser::token::classify(m.as_str())
        {
            progress(state, &id, value, &text);
        }
    }
    if SpellPanel::handles(id) {
        let lines = state.spell_panel.update(id, raw);
        if let Some(window) = state.windows.get_mut("spell_container") {
            window.clear();
            for (text, colors) in lines {
                window.add_text(&text, colors);
            }
        }
        state.mark_dirty();
    }
}

fn stow(state: &mut UiState, line: &str) {
    let lines = inventory::format_stow(line);
    if let Some(window) = state.windows.get_mut("item_container") {
        window.clear();
        for text in lines {
            window.add_text(&text, Vec::new());
        }
    }
    state.mark_dirty();
}

fn indicator(state: &mut UiState, name: &str, visible: bool) {
    let offset = state.server_time_offset;
    if let Some(cd) = state.countdowns.get_mut(name) {
        cd.active = Some(visible);
        cd.refresh(offset);
        state.mark_dirty();
    }
    state.indicator_mut(&format!("other:{name}")).update(visible as u8);
    state.mark_dirty();
}

fn injury(state: &mut UiState, part: &str, image: &str) {
    if part == "nsys" {
        let rank = image
            .chars()
            .find(|c| c.is_ascii_digit())
            .and_then(|c| c.to_digit(10))
            .unwrap_or(0) as u8;
        if state.indicator_mut("nsys").update(rank) {
            state.mark_dirty();
        }
        return;
    }
    let severity = match image {
        "Injury1" => 1,
        "Injury2" => 2,
        "Injury3" => 3,
        "Scar1" => 4,
        "Scar2" => 5,
        "Scar3" => 6,
        _ => 0,
    };
    let key = format!("injury:{part}");
    let matching: Vec<String> = state
        .indicators
        .keys()
        .filter(|k| k.contains(&key))
        .cloned()
        .collect();
    for name in matching {
        if state.indicator_mut(&name).update(severity) {
            state.mark_dirty();
        }
    }
}

/// "You seem to be in one piece" resets every wound indicator.
pub fn clear_injuries(state: &mut UiState) {
    for part in INJURY_PARTS {
        let key = format!("injury:{part}");
        let matching: Vec<String> = state
            .indicators
            .keys()
            .filter(|k| k.contains(&key))
            .cloned()
            .collect();
        for name in matching {
            if state.indicator_mut(&name).update(0) {
                state.mark_dirty();
            }
        }
    }
    if state.indicator_mut("nsys").update(0) {
        state.mark_dirty();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::token::classify;
    use crate::widgets::TextWindowState;

    fn token(raw: &str) -> TagToken {
        TagToken {
            raw: raw.to_string(),
            start: 0,
            kind: classify(raw),
        }
    }

    fn state() -> UiState {
        let mut state = UiState::new();
        state.windows.insert("main".into(), TextWindowState::new(100));
        state
    }

    #[test]
    fn prompt_change_emits_line_and_latches() {
        let mut state = state();
        let raw = "<prompt time=\"1700000000\">&gt;</prompt>";
        project(&mut state, &token(raw), raw);
        assert_eq!(state.prompt_text, ">");
        assert!(!state.need_prompt);
        assert_eq!(state.windows["main"].line_count(), 1);
        // same prompt again defers instead of repeating
        project(&mut state, &token(raw), raw);
        assert!(state.need_prompt);
        assert_eq!(state.windows["main"].line_count(), 1);
    }

    #[test]
    fn roundtime_requests_a_ticker() {
        let mut state = state();
        let raw = "<roundTime value='1700000005'/>";
        project(&mut state, &token(raw), raw);
        let reqs = state.take_ticker_requests();
        assert_eq!(reqs.len(), 1);
        assert_eq!(reqs[0].countdown, "roundtime");
        assert!(!reqs[0].secondary);
        let raw = "<castTime value='1700000008'/>";
        project(&mut state, &token(raw), raw);
        assert!(state.take_ticker_requests()[0].secondary);
    }

    #[test]
    fn compass_flips_all_eleven_directions() {
        let mut state = state();
        let raw = r#"<compass><dir value="n"/><dir value="e"/></compass>"#;
        project(&mut state, &token(raw), raw);
        assert!(state.indicators["compass:n"].is_active());
        assert!(state.indicators["compass:e"].is_active());
        for dir in ["up", "down", "out", "ne", "se", "s", "sw", "w", "nw"] {
            assert!(!state.indicators[&format!("compass:{dir}")].is_active());
        }
    }

    #[test]
    fn encumbrance_overload_pins_the_bar() {
        let mut state = state();
        let raw = "<progressBar id='encumlevel' value='34' text='Overloaded'/>";
        project(&mut state, &token(raw), raw);
        let bar = &state.progress["encumbrance"];
        assert_eq!(bar.current(), 110);
        assert_eq!(bar.max(), 110);
    }

    #[test]
    fn generic_progress_reads_the_fraction() {
        let mut state = state();
        let raw = "<progressBar id='health' value='88' text='health 98/112'/>";
        project(&mut state, &token(raw), raw);
        let bar = &state.progress["health"];
        assert_eq!(bar.current(), 98);
        assert_eq!(bar.max(), 112);
    }

    #[test]
    fn minivitals_dialog_updates_nested_bars() {
        let mut state = state();
        let raw = "<dialogData id='minivitals'><progressBar id='mana' value='70' text='mana 70/100'/></dialogData>";
        project(&mut state, &token(raw), raw);
        assert_eq!(state.progress["mana"].current(), 70);
    }

    #[test]
    fn hands_title_case_and_track_empty() {
        let mut state = state();
        let raw = "<right>broadsword of doom</right>";
        project(&mut state, &token(raw), raw);
        assert_eq!(state.right_hand, "Broadsword Of Doom");
        assert!(state.indicators["right"].is_active());
        let raw = "<left>Empty</left>";
        project(&mut state, &token(raw), raw);
        assert!(!state.indicators["left"].is_active());
    }

    #[test]
    fn stun_indicator_marks_countdown_active() {
        let mut state = state();
        let raw = "<indicator id='IconSTUNNED' visible='y'/>";
        project(&mut state, &token(raw), raw);
        assert_eq!(state.countdowns["stunned"].active, Some(true));
        assert!(state.indicators["other:stunned"].is_active());
    }

    #[test]
    fn injury_images_fan_out_and_reset() {
        let mut state = state();
        state.indicator_mut("injury:head").update(0);
        let raw = "<image id='head' name='Injury2'/>";
        project(&mut state, &token(raw), raw);
        assert_eq!(state.indicators["injury:head"].value(), 2);
        let raw = "<image id='nsys' name='Nsys3'/>";
        project(&mut state, &token(raw), raw);
        assert_eq!(state.indicators["nsys"].value(), 3);
        clear_injuries(&mut state);
        assert_eq!(state.indicators["injury:head"].value(), 0);
        assert_eq!(state.indicators["nsys"].value(), 0);
    }
}
