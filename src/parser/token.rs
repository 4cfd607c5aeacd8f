use regex::Regex;
use std::sync::LazyLock;

/// Matches the next inline tag. Tags with a known open/close pair are
/// matched as a whole balanced element first (their content can contain
/// nested '>' characters, e.g. the prompt's "&gt;"), everything else falls
/// through to the minimal generic match.
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"<prompt.*?prompt>|<spell.*?spell>|<right.*?right>|<left.*?left>|<inv.*?inv>|<compass.*?compass>|<dialogData.*?dialogData>|<.*?>",
    )
    .expect("tag regex")
});

static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([A-Za-z_][A-Za-z0-9_]*)=(?:'([^']*)'|"([^"]*)")"#).expect("attr regex")
});

static DIR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<dir value="([^"]+)""#).expect("dir regex"));

/// Which hand a <left>/<right> tag updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hand {
    Left,
    Right,
}

/// Structured classification of one tag. Each variant carries the parsed
/// attributes the projector needs; anything the protocol sends that we
/// recognize but ignore is `Inert`, everything else is `Unknown`.
#[derive(Debug, Clone, PartialEq)]
pub enum TagKind {
    Prompt { time: String, text: String },
    Spell { name: String },
    Hand { side: Hand, item: String },
    RoundTime { value: i64 },
    CastTime { value: i64 },
    Compass { dirs: Vec<String> },
    ProgressBar { id: String, value: i64, text: String },
    DialogData { id: String },
    PushBold,
    PopBold,
    PresetOpen { id: String },
    PresetClose,
    ColorOpen { fg: Option<String>, bg: Option<String>, underline: bool },
    ColorClose,
    Style { id: String },
    Resource,
    PushStream { id: String },
    PopStream,
    ClearStream { id: String },
    ClearContainer { id: String },
    StreamWindow { id: String, subtitle: Option<String> },
    Indicator { name: String, visible: bool },
    InjuryImage { part: String, name: String },
    LaunchUrl { url: String },
    Inert,
    Unknown,
}

/// One consumed tag: its raw text, the plain-text offset it occupied, and
/// its classification.
#[derive(Debug, Clone)]
pub struct TagToken {
    pub raw: String,
    pub start: usize,
    pub kind: TagKind,
}

pub fn attr(raw: &str, name: &str) -> Option<String> {
    for caps in ATTR_RE.captures_iter(raw) {
        if &caps[1] == name {
            return caps
                .get(2)
                .or_else(|| caps.get(3))
                .map(|m| m.as_str().to_string());
        }
    }
    None
}

/// Text between the first '>' and the closing tag of a balanced element.
fn inner_text(raw: &str, name: &str) -> String {
    let close = format!("</{}>", name);
    match (raw.find('>'), raw.rfind(&close)) {
        (Some(open), Some(end)) if open + 1 <= end => raw[open + 1..end].to_string(),
        _ => String::new(),
    }
}

fn tag_name(raw: &str) -> (&str, bool) {
    let body = raw.trim_start_matches('<');
    let closing = body.starts_with('/');
    let body = body.trim_start_matches('/');
    let end = body
        .find(|c: char| !c.is_ascii_alphanumeric())
        .unwrap_or(body.len());
    (&body[..end], closing)
}

pub fn classify(raw: &str) -> TagKind {
    let (name, closing) = tag_name(raw);
    if closing {
        return match name {
            "preset" => TagKind::PresetClose,
            "color" => TagKind::ColorClose,
            "b" => TagKind::PopBold,
            "component" | "compDef" => TagKind::PopStream,
            "a" | "d" | "menu" | "dialogData" | "inv" | "output" => TagKind::Inert,
            _ => TagKind::Unknown,
        };
    }
    match name {
        "prompt" => match attr(raw, "time") {
            Some(time) => TagKind::Prompt {
                time,
                text: inner_text(raw, "prompt"),
            },
            None => TagKind::Unknown,
        },
        "spell" => TagKind::Spell {
            name: inner_text(raw, "spell"),
        },
        "right" => TagKind::Hand {
            side: Hand::Right,
            item: inner_text(raw, "right"),
        },
        "left" => TagKind::Hand {
            side: Hand::Left,
            item: inner_text(raw, "left"),
        },
        "roundTime" => match attr(raw, "value").and_then(|v| v.parse().ok()) {
            Some(value) => TagKind::RoundTime { value },
            None => TagKind::Unknown,
        },
        "castTime" => match attr(raw, "value").and_then(|v| v.parse().ok()) {
            Some(value) => TagKind::CastTime { value },
            None => TagKind::Unknown,
        },
        "compass" => TagKind::Compass {
            dirs: DIR_RE
                .captures_iter(raw)
                .map(|c| c[1].to_string())
                .collect(),
        },
        "progressBar" => match attr(raw, "id") {
            Some(id) => TagKind::ProgressBar {
                id,
                value: attr(raw, "value")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(0),
                text: attr(raw, "text").unwrap_or_default(),
            },
            None => TagKind::Unknown,
        },
        "dialogData" => match attr(raw, "id") {
            Some(id) => TagKind::DialogData { id },
            None => TagKind::Inert,
        },
        "pushBold" | "b" => TagKind::PushBold,
        "popBold" => TagKind::PopBold,
        "preset" => match attr(raw, "id") {
            Some(id) => TagKind::PresetOpen { id },
            None => TagKind::Unknown,
        },
        "color" => TagKind::ColorOpen {
            fg: attr(raw, "fg").map(|v| v.to_lowercase()),
            bg: attr(raw, "bg").map(|v| v.to_lowercase()),
            underline: attr(raw, "ul").map(|v| v.to_lowercase()) == Some("true".to_string()),
        },
        "style" => TagKind::Style {
            id: attr(raw, "id").unwrap_or_default(),
        },
        "resource" => TagKind::Resource,
        "pushStream" | "component" | "compDef" => match attr(raw, "id") {
            Some(id) => TagKind::PushStream { id },
            None => TagKind::Inert,
        },
        "popStream" => TagKind::PopStream,
        "clearStream" => match attr(raw, "id") {
            Some(id) => TagKind::ClearStream { id },
            None => TagKind::Unknown,
        },
        "clearContainer" => match attr(raw, "id") {
            Some(id) => TagKind::ClearContainer { id },
            None => TagKind::Unknown,
        },
        "streamWindow" => match attr(raw, "id") {
            Some(id) => TagKind::StreamWindow {
                id,
                subtitle: attr(raw, "subtitle"),
            },
            None => TagKind::Unknown,
        },
        "indicator" => {
            let id = attr(raw, "id").unwrap_or_default();
            let visible = attr(raw, "visible").as_deref() == Some("y");
            match id.strip_prefix("Icon") {
                Some(rest) if !rest.is_empty() => TagKind::Indicator {
                    name: rest.to_lowercase(),
                    visible,
                },
                _ => TagKind::Unknown,
            }
        }
        "image" => match (attr(raw, "id"), attr(raw, "name")) {
            (Some(part), Some(name)) => TagKind::InjuryImage { part, name },
            _ => TagKind::Unknown,
        },
        "LaunchURL" => match attr(raw, "src") {
            Some(url) => TagKind::LaunchUrl { url },
            None => TagKind::Unknown,
        },
        "a" | "d" | "menu" | "mi" | "nav" | "label" | "skin" | "output" | "inv" | "container"
        | "exposeContainer" | "dropDownBox" => TagKind::Inert,
        _ => TagKind::Unknown,
    }
}

/// Scans one line for inline tags with an index cursor over an immutable
/// buffer, accumulating the plain text between tags. The buffer can be
/// swapped out mid-scan when the link-annotation pass rewrites the
/// unconsumed remainder.
pub struct TagScanner {
    buf: String,
    pos: usize,
    text: String,
    also_see_adjusted: bool,
}

impl TagScanner {
    pub fn new(line: &str) -> Self {
        TagScanner {
            buf: line.to_string(),
            pos: 0,
            text: String::new(),
            also_see_adjusted: false,
        }
    }

    /// Locate, classify and consume the next tag. Plain text before it is
    /// appended to the accumulator; the token's `start` is the text offset
    /// where the tag sat.
    pub fn next_tag(&mut self) -> Option<TagToken> {
        let m = TAG_RE.find(&self.buf[self.pos..])?;
        let (tag_start, tag_end) = (self.pos + m.start(), self.pos + m.end());
        self.text.push_str(&self.buf[self.pos..tag_start]);
        self.pos = tag_end;

        // Historical artifact of upstream formatting: "  You also see" lines
        // arrive with two extra leading spaces which the reference frontend
        // strips, shifting every later offset back by two.
        if !self.also_see_adjusted && self.text.starts_with("  You also see") {
            self.text.drain(..2);
            self.also_see_adjusted = true;
        }

        let raw = m.as_str().to_string();
        let kind = classify(&raw);
        Some(TagToken {
            start: self.text.len(),
            raw,
            kind,
        })
    }

    /// Append everything after the last consumed tag to the accumulator.
    pub fn finish_text(&mut self) {
        let rest = self.buf[self.pos..].to_string();
        self.text.push_str(&rest);
        self.pos = self.buf.len();
        if self.also_see_adjusted {
            let trimmed = self.text.trim_end().len();
            self.text.truncate(trimmed);
        }
    }

    /// Flush the accumulated plain text (at a stream-routing boundary).
    pub fn take_text(&mut self) -> String {
        std::mem::take(&mut self.text)
    }

    /// The unconsumed portion of the line.
    pub fn remainder(&self) -> &str {
        &self.buf[self.pos..]
    }

    /// Replace the unconsumed remainder, used by the link-annotation pass.
    pub fn replace_remainder(&mut self, rewritten: String) {
        self.buf = rewritten;
        self.pos = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan_all(line: &str) -> (Vec<TagToken>, String) {
        let mut scanner = TagScanner::new(line);
        let mut tags = Vec::new();
        while let Some(tag) = scanner.next_tag() {
            tags.push(tag);
        }
        scanner.finish_text();
        (tags, scanner.take_text())
    }

    #[test]
    fn plain_line_yields_no_tags() {
        let (tags, text) = scan_all("A silvery mist swirls about you.");
        assert!(tags.is_empty());
        assert_eq!(text, "A silvery mist swirls about you.");
    }

    #[test]
    fn prompt_matches_balanced_not_minimal() {
        let (tags, text) = scan_all("<prompt time=\"1234567890\">&gt;</prompt>");
        assert_eq!(tags.len(), 1);
        assert_eq!(
            tags[0].kind,
            TagKind::Prompt {
                time: "1234567890".to_string(),
                text: "&gt;".to_string()
            }
        );
        assert!(text.is_empty());
    }

    #[test]
    fn bold_tags_record_text_offsets() {
        let (tags, text) = scan_all("<pushBold/>Bob<popBold/> hits you.");
        assert_eq!(text, "Bob hits you.");
        assert_eq!(tags[0].kind, TagKind::PushBold);
        assert_eq!(tags[0].start, 0);
        assert_eq!(tags[1].kind, TagKind::PopBold);
        assert_eq!(tags[1].start, 3);
    }

    #[test]
    fn inv_element_content_is_discarded() {
        let (tags, text) = scan_all("before<inv id='stow'>hidden</inv>after");
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].kind, TagKind::Inert);
        assert_eq!(text, "beforeafter");
    }

    #[test]
    fn compass_collects_directions() {
        let (tags, _) = scan_all(r#"<compass><dir value="n"/><dir value="e"/></compass>"#);
        assert_eq!(
            tags[0].kind,
            TagKind::Compass {
                dirs: vec!["n".to_string(), "e".to_string()]
            }
        );
    }

    #[test]
    fn also_see_prefix_back_adjusts_offsets() {
        let (tags, text) =
            scan_all("<component id='room objs'>  You also see a <a exist=\"1\" noun=\"rat\">rat</a>.</component>");
        assert_eq!(text, "You also see a rat.");
        // The <a> open tag lands after "You also see a ", not two bytes later.
        let a_open = tags
            .iter()
            .find(|t| t.raw.starts_with("<a "))
            .expect("anchor tag");
        assert_eq!(a_open.start, "You also see a ".len());
    }

    #[test]
    fn attribute_quoting_both_styles() {
        assert_eq!(attr("<preset id='speech'>", "id").as_deref(), Some("speech"));
        assert_eq!(
            attr("<preset id=\"speech\">", "id").as_deref(),
            Some("speech")
        );
        assert_eq!(attr("<preset id='speech'>", "nope"), None);
    }

    #[test]
    fn unknown_tag_classifies_unknown() {
        assert_eq!(classify("<frobnicate x='1'/>"), TagKind::Unknown);
    }
}
