use crate::parser::spans::ColorSpan;
use std::collections::VecDeque;

/// A scrollback text window holding wrapped lines with their color spans.
///
/// Text is wrapped at add time against the window's current width, the way
/// a curses pad would; spans are split per wrapped line so each stored line
/// is independent. Newlines inside added text break lines without consuming
/// a span offset, and a single leading space on a continuation is absorbed
/// (indent artifact of the upstream wire format).
#[derive(Debug, Clone)]
pub struct TextWindowState {
    lines: VecDeque<(String, Vec<ColorSpan>)>,
    max_lines: usize,
    width: usize,
    /// Lines back from the live end; 0 = following live output.
    pub scroll_offset: usize,
}

/// One render-ready run of characters with its resolved style.
#[derive(Debug, Clone, PartialEq)]
pub struct StyledRun {
    pub text: String,
    pub fg: Option<String>,
    pub bg: Option<String>,
    pub underline: bool,
}

impl TextWindowState {
    pub fn new(max_lines: usize) -> Self {
        TextWindowState {
            lines: VecDeque::new(),
            max_lines: max_lines.max(1),
            width: 80,
            scroll_offset: 0,
        }
    }

    pub fn set_width(&mut self, width: usize) {
        self.width = width.max(4);
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Append text (possibly multi-line) with its color spans, wrapping to
    /// the window width. Returns whether the visible state changed.
    pub fn add_text(&mut self, text: &str, spans: Vec<ColorSpan>) -> bool {
        if text.is_empty() {
            self.push_line(String::new(), Vec::new());
            return true;
        }
        let mut rest = text.to_string();
        let mut spans = spans;
        let mut first = true;
        while !rest.is_empty() {
            if !first {
                if let Some(stripped) = rest.strip_prefix('\n') {
                    rest = stripped.to_string();
                    // Newlines cost nothing against span offsets.
                    if rest.is_empty() {
                        break;
                    }
                }
                if let Some(stripped) = rest.strip_prefix(' ') {
                    rest = stripped.to_string();
                    for h in spans.iter_mut() {
                        h.start = h.start.saturating_sub(1);
                        h.end = h.end.saturating_sub(1);
                    }
                }
            }
            first = false;

            let cut = split_point(&rest, self.width);
            let line: String = rest.drain(..cut).collect();
            let consumed = line.len();

            let mut line_colors = Vec::new();
            for h in spans.iter_mut() {
                if h.start < consumed {
                    let mut part = h.clone();
                    part.end = part.end.min(consumed);
                    if part.end > part.start {
                        line_colors.push(part);
                    }
                }
                h.start = h.start.saturating_sub(consumed);
                h.end = h.end.saturating_sub(consumed);
            }
            spans.retain(|h| h.end > h.start);

            self.push_line(line, line_colors);
        }
        true
    }

    fn push_line(&mut self, line: String, colors: Vec<ColorSpan>) {
        self.lines.push_back((line, colors));
        while self.lines.len() > self.max_lines {
            self.lines.pop_front();
            self.scroll_offset = self.scroll_offset.saturating_sub(1);
        }
    }

    pub fn clear(&mut self) -> bool {
        let had_lines = !self.lines.is_empty();
        self.lines.clear();
        self.scroll_offset = 0;
        had_lines
    }

    pub fn scroll_up(&mut self, n: usize) {
        let max_back = self.lines.len().saturating_sub(1);
        self.scroll_offset = (self.scroll_offset + n).min(max_back);
    }

    pub fn scroll_down(&mut self, n: usize) {
        self.scroll_offset = self.scroll_offset.saturating_sub(n);
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll_offset = 0;
    }

    /// All stored lines, oldest first.
    pub fn iter_lines(&self) -> impl Iterator<Item = &(String, Vec<ColorSpan>)> {
        self.lines.iter()
    }

    /// The last `height` wrapped lines ending `scroll_offset` back from live.
    pub fn visible(&self, height: usize) -> impl Iterator<Item = &(String, Vec<ColorSpan>)> {
        let total = self.lines.len();
        let end = total.saturating_sub(self.scroll_offset);
        let start = end.saturating_sub(height);
        self.lines.iter().skip(start).take(end - start)
    }

    /// Resolve one stored line into styled runs. Where spans overlap, the
    /// narrowest span covering a run wins for fg, bg and underline
    /// independently.
    pub fn styled_runs(line: &str, colors: &[ColorSpan]) -> Vec<StyledRun> {
        let mut points = vec![0, line.len()];
        for h in colors {
            points.push(h.start.min(line.len()));
            points.push(h.end.min(line.len()));
        }
        points.sort_unstable();
        points.dedup();

        let mut runs = Vec::new();
        for pair in points.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if a >= b {
                continue;
            }
            let mut covering: Vec<&ColorSpan> = colors
                .iter()
                .filter(|h| h.start <= a && h.end >= b)
                .collect();
            covering.sort_by_key(|h| h.width());
            runs.push(StyledRun {
                text: line[a..b].to_string(),
                fg: covering.iter().find_map(|h| h.fg.clone()),
                bg: covering.iter().find_map(|h| h.bg.clone()),
                underline: covering.iter().any(|h| h.underline),
            });
        }
        runs
    }
}

/// Byte index to cut the next wrapped line at: longest prefix within the
/// wrap limit ending before whitespace, hard-cut at the limit otherwise.
fn split_point(s: &str, width: usize) -> usize {
    let limit = width.saturating_sub(1).max(2);
    if let Some(nl) = s.find('\n') {
        if nl <= limit {
            return nl;
        }
    }
    if s.len() <= limit {
        return s.len();
    }
    let mut cut = None;
    for (idx, ch) in s.char_indices() {
        if idx > limit {
            break;
        }
        if idx >= 2 && ch == ' ' {
            cut = Some(idx);
        }
    }
    cut.unwrap_or_else(|| {
        // Hard cut on a char boundary at or below the limit; a wide
        // leading char can push the cut to 0, so step forward past it
        // rather than stall without consuming anything.
        let mut idx = limit;
        while idx > 0 && !s.is_char_boundary(idx) {
            idx -= 1;
        }
        if idx == 0 {
            idx = s.char_indices().nth(1).map_or(s.len(), |(i, _)| i);
        }
        idx
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(start: usize, end: usize, fg: &str) -> ColorSpan {
        ColorSpan {
            start,
            end,
            fg: Some(fg.to_string()),
            bg: None,
            underline: false,
        }
    }

    #[test]
    fn plain_text_is_one_unstyled_run() {
        let runs = TextWindowState::styled_runs("Bob hits you.", &[]);
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].text, "Bob hits you.");
        assert!(runs[0].fg.is_none() && runs[0].bg.is_none());
    }

    #[test]
    fn shortest_span_wins() {
        let spans = vec![span(0, 10, "aaaaaa"), span(2, 5, "bbbbbb")];
        let runs = TextWindowState::styled_runs("0123456789", &spans);
        let of = |text: &str| {
            runs.iter()
                .find(|r| r.text == text)
                .map(|r| r.fg.clone().unwrap())
        };
        assert_eq!(of("01").as_deref(), Some("aaaaaa"));
        assert_eq!(of("234").as_deref(), Some("bbbbbb"));
        assert_eq!(of("56789").as_deref(), Some("aaaaaa"));
    }

    #[test]
    fn wrap_splits_spans_per_line() {
        let mut win = TextWindowState::new(50);
        win.set_width(11);
        // "a deadly little kobold" wraps at width 11; span covers "deadly little"
        win.add_text("a deadly little kobold", vec![span(2, 15, "ff0000")]);
        let lines: Vec<_> = win.visible(10).collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].0, "a deadly");
        assert_eq!(lines[0].1, vec![span(2, 8, "ff0000")]);
        assert_eq!(lines[1].0, "little");
        // continuation space absorbed: span starts at 0 and covers "little"
        assert_eq!(lines[1].1, vec![span(0, 6, "ff0000")]);
        assert_eq!(lines[2].0, "kobold");
        assert!(lines[2].1.is_empty());
    }

    #[test]
    fn wide_leading_char_in_narrow_window_still_wraps() {
        let mut win = TextWindowState::new(10);
        win.set_width(4);
        win.add_text("\u{1d11e}abc", Vec::new());
        let lines: Vec<_> = win.visible(10).map(|(t, _)| t.clone()).collect();
        assert_eq!(lines, vec!["\u{1d11e}", "abc"]);
    }

    #[test]
    fn newline_costs_no_span_offset() {
        let mut win = TextWindowState::new(50);
        win.set_width(80);
        // Composed room block: name\ndesc, span over desc uses offsets that
        // ignore the newline.
        win.add_text("Town Square\nYou see cobbles.", vec![span(11, 27, "00ff00")]);
        let lines: Vec<_> = win.visible(10).collect();
        assert_eq!(lines[0].0, "Town Square");
        assert_eq!(lines[1].0, "You see cobbles.");
        assert_eq!(lines[1].1, vec![span(0, 16, "00ff00")]);
    }

    #[test]
    fn buffer_trims_to_max() {
        let mut win = TextWindowState::new(3);
        for i in 0..5 {
            win.add_text(&format!("line {}", i), Vec::new());
        }
        assert_eq!(win.line_count(), 3);
        assert_eq!(win.visible(3).next().unwrap().0, "line 2");
    }
}
