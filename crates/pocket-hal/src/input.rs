use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Button {
    Confirm,
    ModeNext,
    Navigate,
    DisplayPowerToggle,
}

impl Button {
    pub const ALL: [Button; 4] = [
        Button::Confirm,
        Button::ModeNext,
        Button::Navigate,
        Button::DisplayPowerToggle,
    ];

    fn slot(self) -> usize {
        match self {
            Button::Confirm => 0,
            Button::ModeNext => 1,
            Button::Navigate => 2,
            Button::DisplayPowerToggle => 3,
        }
    }
}

/// Timestamp debounce, one window per input line.
///
/// An edge is accepted when at least `window_ms` has passed since the last
/// accepted edge on the same line. Never sleeps.
#[derive(Debug, Clone)]
pub struct Debouncer {
    window_ms: u64,
    last_accepted: [Option<u64>; 4],
}

impl Debouncer {
    pub fn new(window_ms: u64) -> Self {
        Self { window_ms, last_accepted: [None; 4] }
    }

    pub fn accept(&mut self, button: Button, now_ms: u64) -> bool {
        let slot = &mut self.last_accepted[button.slot()];
        if let Some(last) = *slot {
            if now_ms.saturating_sub(last) < self.window_ms {
                return false;
            }
        }
        *slot = Some(now_ms);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounce_inside_window_is_rejected() {
        let mut d = Debouncer::new(150);
        assert!(d.accept(Button::Confirm, 1_000));
        assert!(!d.accept(Button::Confirm, 1_020));
        assert!(!d.accept(Button::Confirm, 1_149));
        assert!(d.accept(Button::Confirm, 1_150));
    }

    #[test]
    fn lines_are_independent() {
        let mut d = Debouncer::new(150);
        assert!(d.accept(Button::Confirm, 0));
        assert!(d.accept(Button::ModeNext, 10));
        assert!(!d.accept(Button::Confirm, 10));
    }
}
