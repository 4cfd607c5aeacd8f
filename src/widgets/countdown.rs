use std::time::{SystemTime, UNIX_EPOCH};

/// Roundtime-style timer counting down toward a server-supplied epoch
/// second. Each deadline assignment bumps a generation counter; the
/// background ticker that was spawned for an older deadline compares
/// its captured generation before every write and exits when it has
/// been superseded, so two tickers never fight over the same display.
#[derive(Debug, Clone, Default)]
pub struct CountdownState {
    pub label: String,
    end_time: f64,
    secondary_end_time: f64,
    generation: u64,
    secondary_generation: u64,
    value: i64,
    secondary_value: i64,
    /// Some(true)/Some(false) once an indicator has reported; None
    /// until then. Distinguishes "stunned" from "never stunned".
    pub active: Option<bool>,
}

fn now_f64() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

fn remaining(end: f64, now: f64, offset: f64) -> i64 {
    // The fifth of a second shaves off the tick that would otherwise
    // display as a lingering "1" after the server considers it done.
    ((end - now + offset - 0.2).ceil() as i64).max(0)
}

impl CountdownState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_label(label: impl Into<String>) -> Self {
        CountdownState {
            label: label.into(),
            ..Self::default()
        }
    }

    /// Install a new primary deadline. Returns the generation the
    /// ticker spawned for this deadline must carry.
    pub fn set_end_time(&mut self, end_time: f64) -> u64 {
        self.end_time = end_time;
        self.generation += 1;
        self.generation
    }

    /// Install a cast-time deadline overlapping the primary one.
    pub fn set_secondary_end_time(&mut self, end_time: f64) -> u64 {
        self.secondary_end_time = end_time;
        self.secondary_generation += 1;
        self.secondary_generation
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn secondary_generation(&self) -> u64 {
        self.secondary_generation
    }

    pub fn value(&self) -> i64 {
        self.value
    }

    pub fn secondary_value(&self) -> i64 {
        self.secondary_value
    }

    /// Recompute both displayed values against the wall clock plus the
    /// latched server offset. Returns whether either changed.
    pub fn refresh(&mut self, offset: f64) -> bool {
        self.refresh_at(now_f64(), offset)
    }

    pub(crate) fn refresh_at(&mut self, now: f64, offset: f64) -> bool {
        let value = remaining(self.end_time, now, offset);
        let secondary = remaining(self.secondary_end_time, now, offset);
        let changed = value != self.value || secondary != self.secondary_value;
        self.value = value;
        self.secondary_value = secondary;
        changed
    }

    pub fn done(&self) -> bool {
        self.value == 0 && self.secondary_value == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_deadline_gets_a_fresh_generation() {
        let mut cd = CountdownState::new();
        let g1 = cd.set_end_time(100.0);
        let g2 = cd.set_end_time(100.0);
        assert_ne!(g1, g2);
        assert_eq!(cd.generation(), g2);
    }

    #[test]
    fn remaining_rounds_up_and_floors_at_zero() {
        let mut cd = CountdownState::new();
        cd.set_end_time(1005.0);
        assert!(cd.refresh_at(1000.0, 0.0));
        assert_eq!(cd.value(), 5);
        // 0.3s left minus the 0.2 allowance still shows 1
        assert!(cd.refresh_at(1004.7, 0.0));
        assert_eq!(cd.value(), 1);
        assert!(cd.refresh_at(1010.0, 0.0));
        assert_eq!(cd.value(), 0);
        assert!(!cd.refresh_at(1011.0, 0.0));
        assert!(cd.done());
    }

    #[test]
    fn server_offset_shifts_the_deadline() {
        let mut cd = CountdownState::new();
        cd.set_end_time(1000.0);
        cd.refresh_at(1000.0, 3.0);
        assert_eq!(cd.value(), 3);
    }

    #[test]
    fn secondary_deadline_is_independent() {
        let mut cd = CountdownState::new();
        cd.set_end_time(1004.0);
        let g = cd.set_secondary_end_time(1008.0);
        assert_eq!(g, 1);
        cd.refresh_at(1000.0, 0.0);
        assert_eq!(cd.value(), 4);
        assert_eq!(cd.secondary_value(), 8);
    }
}
