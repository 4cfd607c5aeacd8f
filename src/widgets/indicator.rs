/// A named boolean-or-leveled status element: hand contents, compass
/// directions, body-part injuries, status icons. Holds the last-known
/// level; callers redraw off the change reports from the setters.
#[derive(Debug, Clone, Default)]
pub struct IndicatorState {
    pub label: String,
    value: u8,
}

impl IndicatorState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_label(label: impl Into<String>) -> Self {
        IndicatorState {
            label: label.into(),
            value: 0,
        }
    }

    /// Update the level (0 = off). Returns whether the value changed.
    pub fn update(&mut self, value: u8) -> bool {
        if self.value == value {
            return false;
        }
        self.value = value;
        true
    }

    pub fn set_label(&mut self, label: impl Into<String>) -> bool {
        let label = label.into();
        if self.label == label {
            return false;
        }
        self.label = label;
        true
    }

    pub fn value(&self) -> u8 {
        self.value
    }

    pub fn is_active(&self) -> bool {
        self.value > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_reports_change_once() {
        let mut ind = IndicatorState::new();
        assert!(ind.update(1));
        assert!(!ind.update(1));
        assert!(ind.update(0));
        assert!(!ind.is_active());
    }

    #[test]
    fn label_change_reported() {
        let mut ind = IndicatorState::with_label("Town Square");
        assert!(!ind.set_label("Town Square"));
        assert!(ind.set_label("North Gate"));
    }
}
