//! Command line editing state.

/// Single-line editor with history recall. Cursor positions are byte
/// offsets kept on char boundaries.
#[derive(Debug, Default)]
pub struct InputState {
    buffer: String,
    cursor: usize,
    history: Vec<String>,
    history_pos: Option<usize>,
    stash: String,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn insert(&mut self, ch: char) {
        self.buffer.insert(self.cursor, ch);
        self.cursor += ch.len_utf8();
    }

    pub fn backspace(&mut self) {
        if let Some(prev) = self.prev_boundary() {
            self.buffer.remove(prev);
            self.cursor = prev;
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.buffer.len() {
            self.buffer.remove(self.cursor);
        }
    }

    pub fn move_left(&mut self) {
        if let Some(prev) = self.prev_boundary() {
            self.cursor = prev;
        }
    }

    pub fn move_right(&mut self) {
        if self.cursor < self.buffer.len() {
            let step = self.buffer[self.cursor..]
                .chars()
                .next()
                .map_or(1, char::len_utf8);
            self.cursor += step;
        }
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.buffer.len();
    }

    fn prev_boundary(&self) -> Option<usize> {
        if self.cursor == 0 {
            return None;
        }
        let mut idx = self.cursor - 1;
        while !self.buffer.is_char_boundary(idx) {
            idx -= 1;
        }
        Some(idx)
    }

    /// Take the current line for submission and append it to history.
    pub fn submit(&mut self) -> String {
        let line = std::mem::take(&mut self.buffer);
        self.cursor = 0;
        self.history_pos = None;
        if !line.is_empty() && self.history.last() != Some(&line) {
            self.history.push(line.clone());
        }
        line
    }

    pub fn history_prev(&mut self) {
        if self.history.is_empty() {
            return;
        }
        let next_pos = match self.history_pos {
            None => {
                self.stash = self.buffer.clone();
                self.history.len() - 1
            }
            Some(0) => 0,
            Some(pos) => pos - 1,
        };
        self.history_pos = Some(next_pos);
        self.buffer = self.history[next_pos].clone();
        self.cursor = self.buffer.len();
    }

    pub fn history_next(&mut self) {
        let Some(pos) = self.history_pos else {
            return;
        };
        if pos + 1 < self.history.len() {
            self.history_pos = Some(pos + 1);
            self.buffer = self.history[pos + 1].clone();
        } else {
            self.history_pos = None;
            self.buffer = std::mem::take(&mut self.stash);
        }
        self.cursor = self.buffer.len();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edits_track_the_cursor() {
        let mut input = InputState::new();
        for ch in "look".chars() {
            input.insert(ch);
        }
        input.move_left();
        input.backspace();
        assert_eq!(input.buffer(), "lok");
        input.move_end();
        input.insert('!');
        assert_eq!(input.buffer(), "lok!");
    }

    #[test]
    fn history_recalls_and_restores_draft() {
        let mut input = InputState::new();
        for ch in "north".chars() {
            input.insert(ch);
        }
        input.submit();
        for ch in "dr".chars() {
            input.insert(ch);
        }
        input.history_prev();
        assert_eq!(input.buffer(), "north");
        input.history_next();
        assert_eq!(input.buffer(), "dr");
    }

    #[test]
    fn duplicate_history_entries_collapse() {
        let mut input = InputState::new();
        for _ in 0..2 {
            for ch in "look".chars() {
                input.insert(ch);
            }
            input.submit();
        }
        input.history_prev();
        assert_eq!(input.buffer(), "look");
        input.history_prev();
        assert_eq!(input.buffer(), "look");
    }
}
