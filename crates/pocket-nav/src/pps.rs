//! Pulse-per-second interval tracking on a wrapping microsecond counter.

/// Modular difference `now - earlier` on a counter `bits` wide.
pub fn ticks_diff(now: u32, earlier: u32, bits: u32) -> u32 {
    let mask = if bits >= 32 { u32::MAX } else { (1u32 << bits) - 1 };
    now.wrapping_sub(earlier) & mask
}

#[derive(Debug, Clone)]
pub struct PpsTracker {
    counter_bits: u32,
    last_edge_us: Option<u32>,
}

impl Default for PpsTracker {
    fn default() -> Self {
        Self::new(32)
    }
}

impl PpsTracker {
    pub fn new(counter_bits: u32) -> Self {
        Self { counter_bits: counter_bits.clamp(1, 32), last_edge_us: None }
    }

    /// Record a rising edge. Returns the interval once two edges have been seen.
    pub fn on_rising_edge(&mut self, now_us: u32) -> Option<u32> {
        let interval = self.last_edge_us.map(|prev| ticks_diff(now_us, prev, self.counter_bits));
        self.last_edge_us = Some(now_us);
        interval
    }
}
