use regex::{Captures, Regex};
use std::sync::LazyLock;

static ANCHOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(<[ad](?: [^>]*)?>.*?</[ad]>)").expect("anchor regex"));

static BOLD_SPAN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<pushBold\s*/>.*?<popBold\s*/>").expect("bold span regex"));

static B_SPAN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<b\s*>.*?</b\s*>").expect("b span regex"));

static LINK_PRESET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<preset id='link'>(.*?)</preset>").expect("link preset regex"));

static PRESET_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</?preset([^>]*)>").expect("preset tag regex"));

/// Wrap every <a>/<d> element in a synthetic `preset id='link'` so links
/// pick up the link preset color, then strip the wrapper again wherever the
/// surrounding context already owns the styling: inside monsterbold or <b>
/// spans, and inside any other preset.
pub fn annotate(line: &str) -> String {
    let line = ANCHOR_RE.replace_all(line, "<preset id='link'>$1</preset>");

    // Bolded links use the bold formatting alone, so drop the wrappers that
    // fell inside a bold span.
    let line = BOLD_SPAN_RE.replace_all(&line, |caps: &Captures| {
        LINK_PRESET_RE
            .replace_all(&caps[0], "$1")
            .into_owned()
    });
    let line = B_SPAN_RE.replace_all(&line, |caps: &Captures| {
        LINK_PRESET_RE
            .replace_all(&caps[0], "$1")
            .into_owned()
    });

    // Links inside another preset follow that preset's color: walk the
    // preset tags with an integer used as a stack of booleans (1 = real
    // preset, keep what is nested; 0 = our synthetic link preset). Nesting
    // deeper than the integer's width would take a misbehaving script.
    let mut stack: u64 = 0;
    let line = PRESET_TAG_RE.replace_all(&line, |caps: &Captures| {
        let tag = &caps[0];
        let attrs = &caps[1];
        if tag.as_bytes()[1] == b'p' {
            // Opening tag: push a bit.
            let was_empty = stack == 0;
            stack <<= 1;
            if was_empty || attrs != " id='link'" {
                stack |= 1;
                tag.to_string()
            } else {
                String::new()
            }
        } else if stack == 0 {
            // Stack underflow: leave the unmatched close alone.
            tag.to_string()
        } else if stack & 1 == 1 {
            stack >>= 1;
            tag.to_string()
        } else {
            stack >>= 1;
            String::new()
        }
    });

    line.into_owned()
}
