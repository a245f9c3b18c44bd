#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Led {
    Success,
    Warning,
    Error,
    Mode,
}

pub trait StatusLeds {
    fn set(&mut self, led: Led, on: bool);
    fn get(&self, led: Led) -> bool;

    /// When disabled every LED is held off.
    fn set_enabled(&mut self, enabled: bool);

    fn toggle(&mut self, led: Led) {
        let on = self.get(led);
        self.set(led, !on);
    }
}

/// Four discrete indicator LEDs kept in memory.
#[derive(Debug, Clone, Default)]
pub struct LedBank {
    enabled: bool,
    lit: [bool; 4],
}

impl LedBank {
    pub fn new(enabled: bool) -> Self {
        Self { enabled, lit: [false; 4] }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    fn slot(led: Led) -> usize {
        match led {
            Led::Success => 0,
            Led::Warning => 1,
            Led::Error => 2,
            Led::Mode => 3,
        }
    }
}

impl StatusLeds for LedBank {
    fn set(&mut self, led: Led, on: bool) {
        self.lit[Self::slot(led)] = on && self.enabled;
    }

    fn get(&self, led: Led) -> bool {
        self.lit[Self::slot(led)]
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.lit = [false; 4];
        }
    }
}
