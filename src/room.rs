//! Room view assembly.
//!
//! The game delivers a room as separate fragments (title, description,
//! objects, players, exits) on independent streams. They are captured
//! here and recomposed into one block whenever any of them changes.

use crate::parser::spans::ColorSpan;

/// One captured piece of the room, with the color spans that arrived
/// attached to it.
#[derive(Debug, Clone, Default)]
pub struct RoomFragment {
    pub text: String,
    pub colors: Vec<ColorSpan>,
}

impl RoomFragment {
    pub fn new(text: impl Into<String>, colors: Vec<ColorSpan>) -> Self {
        RoomFragment {
            text: text.into(),
            colors,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RoomView {
    pub name: Option<RoomFragment>,
    pub description: Option<RoomFragment>,
    pub also_see: Option<RoomFragment>,
    pub players: Option<RoomFragment>,
    pub exits: Option<RoomFragment>,
    last_len: usize,
}

impl RoomView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget every fragment; called when the character moves so
    /// stale objects and players never linger into the next room.
    pub fn clear_fragments(&mut self) {
        self.name = None;
        self.description = None;
        self.also_see = None;
        self.players = None;
        self.exits = None;
    }

    /// Concatenate the captured fragments into the display block.
    ///
    /// Line layout: title, then description with the "also see"
    /// sentence appended, then players, then exits. Span offsets are
    /// measured over the fragment text only; the separating newlines
    /// contribute nothing, which keeps every fragment's spans valid by
    /// a plain shift of the accumulated fragment length.
    pub fn compose(&self) -> (String, Vec<ColorSpan>) {
        let sections: [&[&Option<RoomFragment>]; 4] = [
            &[&self.name],
            &[&self.description, &self.also_see],
            &[&self.players],
            &[&self.exits],
        ];

        let mut text = String::new();
        let mut colors: Vec<ColorSpan> = Vec::new();
        let mut offset = 0usize;

        for section in sections {
            let mut section_text = String::new();
            for frag in section.iter().filter_map(|f| f.as_ref()) {
                section_text.push_str(&frag.text);
                let len = frag.text.len();
                for span in &frag.colors {
                    if span.start >= len {
                        continue;
                    }
                    let mut span = span.clone();
                    span.end = span.end.min(len);
                    span.start += offset;
                    span.end += offset;
                    colors.push(span);
                }
                offset += len;
            }
            if section_text.is_empty() {
                continue;
            }
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(&section_text);
        }
        (text, colors)
    }

    /// Compose, and hand back the block only when its serialized
    /// length differs from the previous composition. Length rather
    /// than content is compared; a same-length edit is rare enough in
    /// practice that the cheaper check wins. The spans count toward
    /// the length so a color-only recomposition still redraws.
    pub fn take_if_changed(&mut self) -> Option<(String, Vec<ColorSpan>)> {
        let (text, colors) = self.compose();
        let len = colors.iter().fold(text.len(), |acc, span| {
            acc + span.width()
                + span.fg.as_deref().map_or(0, str::len)
                + span.bg.as_deref().map_or(0, str::len)
        });
        if len == self.last_len {
            return None;
        }
        self.last_len = len;
        Some((text, colors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(start: usize, end: usize, fg: &str) -> ColorSpan {
        ColorSpan {
            start,
            end,
            fg: Some(fg.into()),
            bg: None,
            underline: false,
        }
    }

    #[test]
    fn composes_in_display_order() {
        let mut room = RoomView::new();
        room.name = Some(RoomFragment::new("[Town Square]", vec![]));
        room.description = Some(RoomFragment::new("Cobbles underfoot.", vec![]));
        room.also_see = Some(RoomFragment::new("  You also see a rat.", vec![]));
        room.players = Some(RoomFragment::new("Also here: Bob.", vec![]));
        room.exits = Some(RoomFragment::new("Obvious paths: north.", vec![]));
        let (text, _) = room.compose();
        assert_eq!(
            text,
            "[Town Square]\nCobbles underfoot.  You also see a rat.\nAlso here: Bob.\nObvious paths: north."
        );
    }

    #[test]
    fn newlines_do_not_shift_spans() {
        let mut room = RoomView::new();
        room.name = Some(RoomFragment::new("[Town Square]", vec![span(1, 12, "gold")]));
        room.description = Some(RoomFragment::new("Cobbles.", vec![span(0, 8, "white")]));
        let (text, colors) = room.compose();
        assert_eq!(text, "[Town Square]\nCobbles.");
        assert_eq!(colors[0].start, 1);
        assert_eq!(colors[0].end, 12);
        // description starts at offset 13 in span space, not 14
        assert_eq!(colors[1].start, 13);
        assert_eq!(colors[1].end, 21);
    }

    #[test]
    fn out_of_range_spans_are_dropped_or_clamped() {
        let mut room = RoomView::new();
        room.name = Some(RoomFragment::new(
            "Square",
            vec![span(6, 9, "gold"), span(2, 40, "white")],
        ));
        let (_, colors) = room.compose();
        assert_eq!(colors.len(), 1);
        assert_eq!(colors[0].start, 2);
        assert_eq!(colors[0].end, 6);
    }

    #[test]
    fn redraw_only_when_length_differs() {
        let mut room = RoomView::new();
        room.name = Some(RoomFragment::new("[Town Square]", vec![]));
        assert!(room.take_if_changed().is_some());
        assert!(room.take_if_changed().is_none());
        // same length, different content: intentionally skipped
        room.name = Some(RoomFragment::new("[Town Sqeare]", vec![]));
        assert!(room.take_if_changed().is_none());
        room.name = Some(RoomFragment::new("[North Gate]", vec![]));
        assert!(room.take_if_changed().is_some());
    }

    #[test]
    fn color_only_change_still_redraws() {
        let mut room = RoomView::new();
        room.name = Some(RoomFragment::new("[Town Square]", vec![]));
        assert!(room.take_if_changed().is_some());
        room.name = Some(RoomFragment::new("[Town Square]", vec![span(1, 12, "gold")]));
        assert!(room.take_if_changed().is_some());
        assert!(room.take_if_changed().is_none());
    }

    #[test]
    fn movement_clears_all_fragments() {
        let mut room = RoomView::new();
        room.name = Some(RoomFragment::new("[Town Square]", vec![]));
        room.players = Some(RoomFragment::new("Also here: Bob.", vec![]));
        room.clear_fragments();
        let (text, _) = room.compose();
        assert!(text.is_empty());
    }
}
