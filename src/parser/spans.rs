use std::collections::HashMap;

/// One styled range over the plain-text offsets of a line segment.
///
/// Offsets are byte offsets into the assembled text. Multiple overlapping
/// spans are legal; precedence is resolved at render time where the span
/// with the smallest width wins for fg, bg and underline independently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorSpan {
    pub start: usize,
    pub end: usize,
    pub fg: Option<String>,
    pub bg: Option<String>,
    pub underline: bool,
}

impl ColorSpan {
    pub fn width(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn has_color(&self) -> bool {
        self.fg.is_some() || self.bg.is_some()
    }
}

/// A preset is a named (fg, bg) pair loaded from configuration.
pub type PresetMap = HashMap<String, (Option<String>, Option<String>)>;

#[derive(Debug, Clone)]
struct OpenScope {
    start: usize,
    fg: Option<String>,
    bg: Option<String>,
    underline: bool,
}

impl OpenScope {
    fn at(start: usize) -> Self {
        OpenScope {
            start,
            fg: None,
            bg: None,
            underline: false,
        }
    }

    fn close(self, end: usize) -> ColorSpan {
        ColorSpan {
            start: self.start,
            end,
            fg: self.fg,
            bg: self.bg,
            underline: self.underline,
        }
    }
}

/// Tracks the currently open styling scopes of a line and finalizes them
/// into flat color spans.
///
/// Bold, preset and explicit-color scopes are stacks; the style scope is
/// sticky (one at a time, replaced on open). Bold and preset scopes only
/// emit a span on close when they carry a color; explicit color scopes
/// always emit. Closing with nothing open is a silent no-op.
#[derive(Debug, Default)]
pub struct ColorSpanTracker {
    open_bold: Vec<OpenScope>,
    open_preset: Vec<OpenScope>,
    open_color: Vec<OpenScope>,
    open_style: Option<OpenScope>,
    finished: Vec<ColorSpan>,
}

impl ColorSpanTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// <pushBold/> or <b> - tinted by the monsterbold preset if configured
    pub fn open_bold(&mut self, start: usize, presets: &PresetMap) {
        let mut scope = OpenScope::at(start);
        if let Some((fg, bg)) = presets.get("monsterbold") {
            scope.fg = fg.clone();
            scope.bg = bg.clone();
        }
        self.open_bold.push(scope);
    }

    /// <popBold/> or </b>
    pub fn close_bold(&mut self, end: usize) {
        if let Some(scope) = self.open_bold.pop() {
            let span = scope.close(end);
            if span.has_color() {
                self.finished.push(span);
            }
        }
    }

    /// <preset id='speech'> - unknown ids still open a colorless scope so
    /// the stack stays balanced
    pub fn open_preset(&mut self, id: &str, start: usize, presets: &PresetMap) {
        let mut scope = OpenScope::at(start);
        if let Some((fg, bg)) = presets.get(id) {
            scope.fg = fg.clone();
            scope.bg = bg.clone();
        }
        self.open_preset.push(scope);
    }

    /// </preset>
    pub fn close_preset(&mut self, end: usize) {
        if let Some(scope) = self.open_preset.pop() {
            let span = scope.close(end);
            if span.has_color() {
                self.finished.push(span);
            }
        }
    }

    /// <color fg='#ffffff' bg='#000000' ul='true'> - attribute values arrive
    /// already lower-cased from the tokenizer
    pub fn open_color(
        &mut self,
        fg: Option<String>,
        bg: Option<String>,
        underline: bool,
        start: usize,
    ) {
        let mut scope = OpenScope::at(start);
        scope.fg = fg;
        scope.bg = bg;
        scope.underline = underline;
        self.open_color.push(scope);
    }

    /// </color> - always emits, colored or not
    pub fn close_color(&mut self, end: usize) {
        if let Some(scope) = self.open_color.pop() {
            self.finished.push(scope.close(end));
        }
    }

    /// <style id='roomName'> - sticky scope. A nonempty id replaces any open
    /// style (emitting the old one when it covers text and has color); an
    /// empty id closes the current style the same way.
    pub fn set_style(&mut self, id: &str, start: usize, presets: &PresetMap) {
        if let Some(prev) = self.open_style.take() {
            let span = prev.close(start);
            if span.start < span.end && span.has_color() {
                self.finished.push(span);
            }
        }
        if !id.is_empty() {
            let mut scope = OpenScope::at(start);
            if let Some((fg, bg)) = presets.get(id) {
                scope.fg = fg.clone();
                scope.bg = bg.clone();
            }
            self.open_style = Some(scope);
        }
    }

    pub fn style_open(&self) -> bool {
        self.open_style.is_some()
    }

    /// Adjust offsets after entity decoding removed `shrink` bytes at `pos`.
    pub fn shift_after(&mut self, pos: usize, shrink: usize) {
        for span in self.finished.iter_mut() {
            if span.start > pos {
                span.start -= shrink;
            }
            if span.end > pos {
                span.end -= shrink;
            }
        }
        if let Some(style) = self.open_style.as_mut() {
            if style.start > pos {
                style.start -= shrink;
            }
        }
    }

    /// Drain the spans for one flushed text segment of `len` bytes: every
    /// finished span, a segment-wide slice of the sticky style, and a whole
    /// overlay for each still-open explicit color scope. Open scopes
    /// re-anchor to 0 so they keep tinting the next segment.
    pub fn take_segment(&mut self, len: usize) -> Vec<ColorSpan> {
        let mut spans = std::mem::take(&mut self.finished);
        if let Some(style) = self.open_style.as_mut() {
            let mut span = style.clone().close(len);
            span.start = span.start.min(len);
            spans.push(span);
            style.start = 0;
        }
        for scope in self.open_color.iter() {
            let mut span = scope.clone().close(len);
            span.start = 0;
            spans.push(span);
        }
        for scope in self
            .open_bold
            .iter_mut()
            .chain(self.open_preset.iter_mut())
        {
            scope.start = 0;
        }
        spans
    }

    /// Line-end finalize: unbalanced bold/preset scopes are dropped without
    /// emitting so they cannot leak into the next line. Style and explicit
    /// color scopes persist across lines by protocol design.
    pub fn end_of_line(&mut self) {
        self.open_bold.clear();
        self.open_preset.clear();
    }

    #[cfg(test)]
    pub fn open_scope_count(&self) -> usize {
        self.open_bold.len() + self.open_preset.len() + self.open_color.len()
    }
}
