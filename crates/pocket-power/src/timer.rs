/// One-shot timer polled from the main loop. Every arm or disarm bumps the
/// generation, so an expiry queued before a re-arm is recognizably stale.
#[derive(Debug, Clone, Default)]
pub struct OneShot {
    deadline_ms: Option<u64>,
    generation: u32,
}

impl OneShot {
    pub fn arm(&mut self, now_ms: u64, after_ms: u64) -> u32 {
        self.generation = self.generation.wrapping_add(1);
        self.deadline_ms = Some(now_ms.saturating_add(after_ms));
        self.generation
    }

    pub fn disarm(&mut self) {
        if self.deadline_ms.take().is_some() {
            self.generation = self.generation.wrapping_add(1);
        }
    }

    pub fn is_armed(&self) -> bool {
        self.deadline_ms.is_some()
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn deadline_ms(&self) -> Option<u64> {
        self.deadline_ms
    }

    /// Fire once when the deadline has passed.
    pub fn poll(&mut self, now_ms: u64) -> Option<u32> {
        match self.deadline_ms {
            Some(d) if now_ms >= d => {
                self.deadline_ms = None;
                Some(self.generation)
            }
            _ => None,
        }
    }

    pub fn is_current(&self, generation: u32) -> bool {
        generation == self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_once_at_deadline() {
        let mut t = OneShot::default();
        let g = t.arm(100, 50);
        assert_eq!(t.poll(149), None);
        assert_eq!(t.poll(150), Some(g));
        assert_eq!(t.poll(500), None);
        assert!(!t.is_armed());
    }

    #[test]
    fn rearm_makes_old_expiry_stale() {
        let mut t = OneShot::default();
        let g1 = t.arm(0, 10);
        let fired = t.poll(10).unwrap();
        assert_eq!(fired, g1);
        t.arm(10, 10);
        assert!(!t.is_current(fired));
    }

    #[test]
    fn disarm_invalidates_pending() {
        let mut t = OneShot::default();
        let g = t.arm(0, 10);
        t.disarm();
        assert_eq!(t.poll(100), None);
        assert!(!t.is_current(g));
    }
}
