pub const FULL_SPEED_HZ: u32 = 240_000_000;
pub const POWER_SAVE_HZ: u32 = 40_000_000;

pub trait CpuControl {
    fn frequency_hz(&self) -> u32;
    fn set_frequency_hz(&mut self, hz: u32);
}

/// Host stand-in that only remembers the requested clock.
#[derive(Debug, Clone)]
pub struct FixedCpu {
    hz: u32,
}

impl Default for FixedCpu {
    fn default() -> Self {
        Self { hz: FULL_SPEED_HZ }
    }
}

impl CpuControl for FixedCpu {
    fn frequency_hz(&self) -> u32 {
        self.hz
    }

    fn set_frequency_hz(&mut self, hz: u32) {
        tracing::debug!(hz, "cpu frequency requested");
        self.hz = hz;
    }
}

pub fn frequency_for(power_save: bool) -> u32 {
    if power_save { POWER_SAVE_HZ } else { FULL_SPEED_HZ }
}
