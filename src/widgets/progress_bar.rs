/// Bounded quantity with a label: health, mana, stamina, spirit,
/// encumbrance, stance, mind.
#[derive(Debug, Clone)]
pub struct ProgressBarState {
    pub label: String,
    current: i64,
    max: i64,
}

impl ProgressBarState {
    pub fn new(label: impl Into<String>) -> Self {
        ProgressBarState {
            label: label.into(),
            current: 0,
            max: 100,
        }
    }

    /// Set both the current value and the maximum. Returns whether
    /// anything changed, so callers can skip redundant redraws.
    pub fn update(&mut self, current: i64, max: i64) -> bool {
        if self.current == current && self.max == max {
            return false;
        }
        self.current = current;
        self.max = max;
        true
    }

    pub fn current(&self) -> i64 {
        self.current
    }

    pub fn max(&self) -> i64 {
        self.max
    }

    /// Fill ratio clamped to 0.0..=1.0 for rendering.
    pub fn ratio(&self) -> f64 {
        if self.max <= 0 {
            return 0.0;
        }
        (self.current as f64 / self.max as f64).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_is_idempotent() {
        let mut bar = ProgressBarState::new("stance");
        assert!(bar.update(40, 100));
        assert!(!bar.update(40, 100));
        assert!(bar.update(100, 100));
    }

    #[test]
    fn ratio_clamps_overfill() {
        let mut bar = ProgressBarState::new("encumbrance");
        bar.update(110, 110);
        assert_eq!(bar.ratio(), 1.0);
        bar.update(150, 110);
        assert_eq!(bar.ratio(), 1.0);
        bar.update(-5, 110);
        assert_eq!(bar.ratio(), 0.0);
    }
}
