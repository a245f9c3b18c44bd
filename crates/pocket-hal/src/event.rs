use std::collections::VecDeque;

use crate::input::Button;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Falling edge on a button line, stamped at the edge.
    Button { button: Button, at_ms: u64 },
    /// PPS rising edge, stamped with the wrapping microsecond counter.
    PpsEdge { at_us: u32 },
    /// Inactivity timer fired. `generation` identifies the arming.
    IdleTimeout { generation: u32 },
    /// Prolonged-inactivity timer fired.
    DeepSleepTimeout { generation: u32 },
}

#[derive(Debug, Default)]
pub struct EventQueue {
    events: VecDeque<Event>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: Event) {
        self.events.push_back(event);
    }

    pub fn pop(&mut self) -> Option<Event> {
        self.events.pop_front()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drains_in_arrival_order() {
        let mut q = EventQueue::new();
        q.push(Event::PpsEdge { at_us: 1 });
        q.push(Event::IdleTimeout { generation: 3 });
        assert_eq!(q.len(), 2);
        assert_eq!(q.pop(), Some(Event::PpsEdge { at_us: 1 }));
        assert_eq!(q.pop(), Some(Event::IdleTimeout { generation: 3 }));
        assert!(q.is_empty());
    }
}
