//! User-configured text highlighting.
//!
//! Rules with no regex metacharacters are compiled into one
//! Aho-Corasick automaton and matched in a single pass; everything
//! else is scanned per-rule with the regex engine, resuming after
//! each match so a rule never overlaps itself.

use aho_corasick::AhoCorasick;
use anyhow::{Context, Result};
use regex::Regex;

use crate::parser::spans::ColorSpan;

#[derive(Debug, Clone)]
pub struct HighlightStyle {
    pub fg: Option<String>,
    pub bg: Option<String>,
    pub underline: bool,
}

#[derive(Debug)]
struct RegexRule {
    pattern: Regex,
    style: HighlightStyle,
}

#[derive(Debug, Default)]
pub struct Highlighter {
    regex_rules: Vec<RegexRule>,
    literal_matcher: Option<AhoCorasick>,
    literal_styles: Vec<HighlightStyle>,
}

fn is_literal(pattern: &str) -> bool {
    !pattern
        .chars()
        .any(|c| r"\.+*?()|[]{}^$".contains(c))
}

impl Highlighter {
    /// Build from (pattern, style) pairs. A malformed pattern fails the
    /// whole build so a config typo surfaces at load time rather than
    /// silently dropping one rule.
    pub fn build<'a, I>(rules: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, HighlightStyle)>,
    {
        let mut literals: Vec<String> = Vec::new();
        let mut literal_styles = Vec::new();
        let mut regex_rules = Vec::new();
        for (pattern, style) in rules {
            if is_literal(pattern) {
                literals.push(pattern.to_string());
                literal_styles.push(style);
            } else {
                let pattern = Regex::new(pattern)
                    .with_context(|| format!("bad highlight pattern: {pattern}"))?;
                regex_rules.push(RegexRule { pattern, style });
            }
        }
        let literal_matcher = if literals.is_empty() {
            None
        } else {
            Some(AhoCorasick::new(&literals)?)
        };
        Ok(Highlighter {
            regex_rules,
            literal_matcher,
            literal_styles,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.regex_rules.is_empty() && self.literal_matcher.is_none()
    }

    /// Produce one span per match over `text`. Different rules may
    /// overlap each other; span resolution at render time sorts that
    /// out.
    pub fn apply(&self, text: &str) -> Vec<ColorSpan> {
        let mut out = Vec::new();
        if let Some(matcher) = &self.literal_matcher {
            // Overlap across rules is fine; within one rule, matching
            // resumes after the previous match's end, same as the
            // regex path below.
            let mut resume = vec![0usize; self.literal_styles.len()];
            for m in matcher.find_overlapping_iter(text) {
                let rule = m.pattern().as_usize();
                if m.start() < resume[rule] {
                    continue;
                }
                resume[rule] = m.end();
                let style = &self.literal_styles[rule];
                out.push(ColorSpan {
                    start: m.start(),
                    end: m.end(),
                    fg: style.fg.clone(),
                    bg: style.bg.clone(),
                    underline: style.underline,
                });
            }
        }
        for rule in &self.regex_rules {
            let mut pos = 0;
            while pos <= text.len() {
                let Some(m) = rule.pattern.find_at(text, pos) else {
                    break;
                };
                if m.end() > m.start() {
                    out.push(ColorSpan {
                        start: m.start(),
                        end: m.end(),
                        fg: rule.style.fg.clone(),
                        bg: rule.style.bg.clone(),
                        underline: rule.style.underline,
                    });
                    pos = m.end();
                } else {
                    // zero-width match, step past it
                    pos = m.end() + text[m.end()..].chars().next().map_or(1, char::len_utf8);
                }
            }
        }
        out
    }
}
