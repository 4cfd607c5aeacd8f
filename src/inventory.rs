//! Container and worn-inventory summaries.
//!
//! The stow container line arrives when the game clears and refills
//! the stow dialog; the worn-items list arrives as a multi-line
//! response to the inventory verb. Both are condensed into short
//! title-cased listings for their side panels.

use regex::Regex;
use std::sync::LazyLock;

static ANCHOR_ITEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"noun="[^"]*">(.*?)</a>"#).expect("anchor item regex"));

static STOW_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<a exist="[^"]*" noun="[^"]*">(.*?)</a>"#).expect("stow name regex"));

static STOW_ITEM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<inv id='stow'>.*?<a exist="[^"]*" noun="[^"]*">(.*?)</a>.*?</inv>"#)
        .expect("stow item regex")
});

static VIAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)vial.*").expect("vial regex"));

const STOW_LIMIT: usize = 25;
const WORN_LIMIT: usize = 11;

/// Capitalizes each space- or underscore-separated word.
pub fn title_case(s: &str) -> String {
    s.split(|c| c == ' ' || c == '_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Summarize a stow container refresh into panel lines. The first
/// anchor in the stow list is the container itself, not contents.
pub fn format_stow(line: &str) -> Vec<String> {
    let name = STOW_NAME_RE
        .captures_iter(line)
        .next()
        .map(|caps| title_case(&caps[1]))
        .unwrap_or_else(|| "Container".to_string());

    let mut items: Vec<String> = STOW_ITEM_RE
        .captures_iter(line)
        .skip(1)
        .map(|caps| caps[1].to_string())
        .collect();
    items.sort_by_key(|item| item.to_lowercase());

    let overflow = items.len() > STOW_LIMIT + 1;
    if overflow {
        items.truncate(STOW_LIMIT);
    }

    let mut out = vec![format!("{name}: ")];
    for item in &items {
        let item = title_case(item);
        out.push(format!("  {} ", VIAL_RE.replace(&item, "vial")));
    }
    if overflow {
        out.push("  ...and other stuff".to_string());
    }
    out
}

/// Summarize the buffered worn-items response. Long item names keep
/// their last two words so the panel column stays narrow.
pub fn format_inventory(lines: &str) -> Vec<String> {
    let mut items: Vec<String> = ANCHOR_ITEM_RE
        .captures_iter(lines)
        .map(|caps| {
            let words: Vec<&str> = caps[1].split_whitespace().collect();
            let short = if words.len() > 1 {
                words[words.len() - 2..].join(" ")
            } else {
                caps[1].to_string()
            };
            title_case(short.replace("some", "").trim())
        })
        .collect();
    items.sort();

    let mut out = vec!["Inventory:".to_string()];
    for (index, item) in items.iter().enumerate() {
        if index >= WORN_LIMIT {
            out.push("...and other stuff".to_string());
            break;
        }
        out.push(item.clone());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stow_names_container_and_sorts_items() {
        let line = concat!(
            r#"<clearContainer id="stow"/><a exist="1" noun="backpack">sturdy backpack</a>"#,
            r#"<inv id='stow'><a exist="1" noun="backpack">sturdy backpack</a></inv>"#,
            r#"<inv id='stow'><a exist="2" noun="rose">white rose</a></inv>"#,
            r#"<inv id='stow'><a exist="3" noun="vial">crystal vial of blessed water</a></inv>"#,
        );
        let out = format_stow(line);
        assert_eq!(out[0], "Sturdy Backpack: ");
        assert_eq!(out[1], "  Crystal vial ");
        assert_eq!(out[2], "  White Rose ");
    }

    #[test]
    fn stow_overflow_truncates() {
        let items: String = (0..30)
            .map(|i| format!(r#"<inv id='stow'><a exist="{i}" noun="rock">rock {i:02}</a></inv>"#))
            .collect();
        let line = format!(r#"<a exist="0" noun="sack">old sack</a>{items}"#);
        let out = format_stow(&line);
        // header + 25 items + overflow marker
        assert_eq!(out.len(), 27);
        assert_eq!(out.last().unwrap(), "  ...and other stuff");
    }

    #[test]
    fn worn_items_are_shortened_and_capped() {
        let lines = concat!(
            r#"Your worn items are: <a exist="1" noun="cloak">a heavy hooded crimson wool cloak</a>, "#,
            r#"<a exist="2" noun="boots">some scuffed leather boots</a>"#,
        );
        let out = format_inventory(lines);
        assert_eq!(out[0], "Inventory:");
        assert!(out.contains(&"Wool Cloak".to_string()));
        assert!(out.contains(&"Leather Boots".to_string()));
    }
}
