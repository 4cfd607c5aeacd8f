//! Active effects panel.
//!
//! The game pushes four effect lists (spells, cooldowns, buffs,
//! debuffs) as dialogData elements. Each update replaces one list;
//! the panel re-renders all four as dot-leader rows whose background
//! fill length tracks the remaining duration percentage.

use regex::Regex;
use std::sync::LazyLock;

use crate::data::spell_shade;
use crate::parser::spans::ColorSpan;

/// percent / name / remaining-time triples inside a dialogData list
static EFFECT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"value='(.*?)' text="(.*?)".*?value='(.*?)'"#).expect("effect regex")
});

const PANEL_WIDTH: usize = 32;

#[derive(Debug, Clone)]
struct Effect {
    percent: i64,
    name: String,
    time: String,
}

#[derive(Debug, Clone, Default)]
pub struct SpellPanel {
    active: Vec<Effect>,
    cooldowns: Vec<Effect>,
    buffs: Vec<Effect>,
    debuffs: Vec<Effect>,
}

impl SpellPanel {
    pub fn new() -> Self {
        Self::default()
    }

    /// True for the dialogData ids this panel consumes.
    pub fn handles(id: &str) -> bool {
        matches!(id, "Active Spells" | "Cooldowns" | "Buffs" | "Debuffs")
    }

    /// Replace one category from a raw dialogData element and return
    /// the re-rendered panel lines.
    pub fn update(&mut self, id: &str, raw: &str) -> Vec<(String, Vec<ColorSpan>)> {
        let effects: Vec<Effect> = EFFECT_RE
            .captures_iter(raw)
            .map(|caps| Effect {
                percent: caps[1].parse().unwrap_or(0),
                name: caps[2].to_string(),
                time: caps[3].to_string(),
            })
            .collect();
        match id {
            "Active Spells" => self.active = effects,
            "Cooldowns" => self.cooldowns = effects,
            "Buffs" => self.buffs = effects,
            "Debuffs" => self.debuffs = effects,
            _ => {}
        }
        self.render()
    }

    pub fn render(&self) -> Vec<(String, Vec<ColorSpan>)> {
        let mut lines = Vec::new();
        let sections = [
            ("Spells:", &self.active, "No spells found."),
            ("Cooldowns:", &self.cooldowns, "No cooldowns found."),
            ("Buffs:", &self.buffs, "No buffs found."),
            ("Debuffs:", &self.debuffs, "No debuffs found."),
        ];
        for (header, effects, empty_note) in sections {
            lines.push((format!(" {header}"), Vec::new()));
            if effects.is_empty() {
                lines.push((format!("  {empty_note}"), Vec::new()));
                continue;
            }
            for effect in effects.iter() {
                // too long to fit the panel, and always present
                if effect.name.contains("Nature's Touch Arcane Reflexes")
                    || effect.name.contains("Ensorcell")
                {
                    continue;
                }
                lines.push(render_effect(effect));
            }
        }
        lines
    }
}

fn render_effect(effect: &Effect) -> (String, Vec<ColorSpan>) {
    let dots = PANEL_WIDTH.saturating_sub(effect.name.len() + effect.time.len());
    let text = format!(" {}{}{}", effect.name, ".".repeat(dots), effect.time);
    let mut colors = Vec::new();
    if let Some(shade) = spell_shade(&effect.name) {
        let bar = ((text.len() as i64 * effect.percent) / 100)
            .clamp(3, text.len() as i64) as usize;
        colors.push(ColorSpan {
            start: 2,
            end: bar,
            fg: None,
            bg: Some(shade.to_string()),
            underline: false,
        });
    }
    (text, colors)
}
