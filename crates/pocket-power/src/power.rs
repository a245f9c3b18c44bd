use serde::Deserialize;
use tracing::{debug, info};

use pocket_hal::event::{Event, EventQueue};
use pocket_hal::input::Button;

use crate::timer::OneShot;

fn default_idle_timeout_ms() -> u64 { 30_000 }
fn default_deep_sleep_timeout_ms() -> u64 { 300_000 }
fn default_fast_poll_ms() -> u64 { 1_000 }
fn default_slow_poll_ms() -> u64 { 30_000 }
fn default_wake_line() -> Button { Button::DisplayPowerToggle }

#[derive(Debug, Clone, Deserialize)]
pub struct PowerConfig {
    /// Filled from the `device.screen_timeout_ms` setting at startup.
    #[serde(skip, default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,
    #[serde(default = "default_deep_sleep_timeout_ms")]
    pub deep_sleep_timeout_ms: u64,
    #[serde(default = "default_fast_poll_ms")]
    pub fast_poll_ms: u64,
    #[serde(default = "default_slow_poll_ms")]
    pub slow_poll_ms: u64,
    /// Skip Idle and go straight to deep sleep on inactivity.
    #[serde(default)]
    pub deep_sleep_on_idle: bool,
    /// Line armed for wake on timer-driven deep sleep.
    #[serde(default = "default_wake_line")]
    pub wake_line: Button,
}

impl Default for PowerConfig {
    fn default() -> Self {
        Self {
            idle_timeout_ms: default_idle_timeout_ms(),
            deep_sleep_timeout_ms: default_deep_sleep_timeout_ms(),
            fast_poll_ms: default_fast_poll_ms(),
            slow_poll_ms: default_slow_poll_ms(),
            deep_sleep_on_idle: false,
            wake_line: default_wake_line(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerState {
    Active,
    Idle,
    /// Terminal for this process.
    DeepSleep,
}

/// What the controller switches.
pub trait PowerPeripherals {
    fn display_power(&mut self, on: bool);
    fn gps_power_off(&mut self);
    fn arm_wake(&mut self, line: Button);
}

/// Sole writer of [`PowerState`].
#[derive(Debug, Clone)]
pub struct PowerController {
    cfg: PowerConfig,
    state: PowerState,
    idle_timer: OneShot,
    sleep_timer: OneShot,
    poll_interval_ms: u64,
}

impl PowerController {
    pub fn new(cfg: PowerConfig, now_ms: u64) -> Self {
        let mut idle_timer = OneShot::default();
        idle_timer.arm(now_ms, cfg.idle_timeout_ms);
        let poll_interval_ms = cfg.fast_poll_ms;
        Self { cfg, state: PowerState::Active, idle_timer, sleep_timer: OneShot::default(), poll_interval_ms }
    }

    pub fn state(&self) -> PowerState {
        self.state
    }

    pub fn config(&self) -> &PowerConfig {
        &self.cfg
    }

    /// Current GPS poll cadence.
    pub fn poll_interval_ms(&self) -> u64 {
        self.poll_interval_ms
    }

    pub fn is_halted(&self) -> bool {
        self.state == PowerState::DeepSleep
    }

    /// Earliest pending timer deadline, for sleeping the loop.
    pub fn next_deadline_ms(&self) -> Option<u64> {
        match (self.idle_timer.deadline_ms(), self.sleep_timer.deadline_ms()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Queue expiries of both timers.
    pub fn poll_timers(&mut self, now_ms: u64, queue: &mut EventQueue) {
        if let Some(generation) = self.idle_timer.poll(now_ms) {
            queue.push(Event::IdleTimeout { generation });
        }
        if let Some(generation) = self.sleep_timer.poll(now_ms) {
            queue.push(Event::DeepSleepTimeout { generation });
        }
    }

    /// Apply a timer event. Stale generations and events that do not fit
    /// the current state are ignored. Returns whether the state changed.
    pub fn handle_event(&mut self, event: &Event, now_ms: u64, p: &mut dyn PowerPeripherals) -> bool {
        let before = self.state;
        match *event {
            Event::IdleTimeout { generation } if self.idle_timer.is_current(generation) => {
                self.enter_idle(now_ms, p);
            }
            Event::DeepSleepTimeout { generation } if self.sleep_timer.is_current(generation) => {
                if self.state == PowerState::Idle {
                    self.enter_deep_sleep(self.cfg.wake_line, p);
                }
            }
            Event::IdleTimeout { .. } | Event::DeepSleepTimeout { .. } => {
                debug!(?event, "stale timer event");
            }
            _ => {}
        }
        self.state != before
    }

    /// Any accepted button press. Returns true when the press woke the
    /// device from Idle; such a press is consumed.
    pub fn handle_user_interaction(&mut self, now_ms: u64, p: &mut dyn PowerPeripherals) -> bool {
        match self.state {
            PowerState::Active => {
                self.idle_timer.arm(now_ms, self.cfg.idle_timeout_ms);
                false
            }
            PowerState::Idle => {
                self.exit_idle(now_ms, p);
                true
            }
            PowerState::DeepSleep => false,
        }
    }

    /// No-op unless Active.
    pub fn enter_idle(&mut self, now_ms: u64, p: &mut dyn PowerPeripherals) {
        if self.state != PowerState::Active {
            return;
        }
        if self.cfg.deep_sleep_on_idle {
            self.enter_deep_sleep(self.cfg.wake_line, p);
            return;
        }
        self.idle_timer.disarm();
        p.display_power(false);
        self.poll_interval_ms = self.cfg.slow_poll_ms;
        if !self.sleep_timer.is_armed() {
            self.sleep_timer.arm(now_ms, self.cfg.deep_sleep_timeout_ms);
        }
        self.state = PowerState::Idle;
        info!(poll_ms = self.poll_interval_ms, "power: idle");
    }

    pub fn exit_idle(&mut self, now_ms: u64, p: &mut dyn PowerPeripherals) {
        if self.state != PowerState::Idle {
            return;
        }
        self.sleep_timer.disarm();
        p.display_power(true);
        self.poll_interval_ms = self.cfg.fast_poll_ms;
        self.idle_timer.arm(now_ms, self.cfg.idle_timeout_ms);
        self.state = PowerState::Active;
        info!(poll_ms = self.poll_interval_ms, "power: active");
    }

    /// Power everything down and arm wake on `line`. There is no way back
    /// within this process.
    pub fn enter_deep_sleep(&mut self, line: Button, p: &mut dyn PowerPeripherals) {
        if self.state == PowerState::DeepSleep {
            return;
        }
        self.idle_timer.disarm();
        self.sleep_timer.disarm();
        p.display_power(false);
        p.gps_power_off();
        p.arm_wake(line);
        self.state = PowerState::DeepSleep;
        info!(wake = ?line, "power: deep sleep");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Rig {
        display_on: Option<bool>,
        gps_off: bool,
        wake: Option<Button>,
    }

    impl PowerPeripherals for Rig {
        fn display_power(&mut self, on: bool) { self.display_on = Some(on); }
        fn gps_power_off(&mut self) { self.gps_off = true; }
        fn arm_wake(&mut self, line: Button) { self.wake = Some(line); }
    }

    fn cfg() -> PowerConfig {
        PowerConfig { idle_timeout_ms: 1_000, deep_sleep_timeout_ms: 5_000, ..Default::default() }
    }

    // Poll timers and apply whatever they queued.
    fn advance(pc: &mut PowerController, now: u64, rig: &mut Rig) {
        let mut q = EventQueue::new();
        pc.poll_timers(now, &mut q);
        while let Some(ev) = q.pop() {
            pc.handle_event(&ev, now, rig);
        }
    }

    #[test]
    fn idle_after_timeout() {
        let mut rig = Rig::default();
        let mut pc = PowerController::new(cfg(), 0);
        advance(&mut pc, 999, &mut rig);
        assert_eq!(pc.state(), PowerState::Active);
        advance(&mut pc, 1_000, &mut rig);
        assert_eq!(pc.state(), PowerState::Idle);
        assert_eq!(rig.display_on, Some(false));
        assert_eq!(pc.poll_interval_ms(), 30_000);
    }

    #[test]
    fn interaction_wakes_and_resets_both_timers() {
        let mut rig = Rig::default();
        let mut pc = PowerController::new(cfg(), 0);
        advance(&mut pc, 1_000, &mut rig);
        assert!(pc.handle_user_interaction(3_000, &mut rig));
        assert_eq!(pc.state(), PowerState::Active);
        assert_eq!(rig.display_on, Some(true));
        assert_eq!(pc.poll_interval_ms(), 1_000);

        // the old deep sleep deadline (6000) no longer applies
        advance(&mut pc, 3_999, &mut rig);
        assert_eq!(pc.state(), PowerState::Active);
        advance(&mut pc, 4_000, &mut rig);
        assert_eq!(pc.state(), PowerState::Idle);
        advance(&mut pc, 8_999, &mut rig);
        assert_eq!(pc.state(), PowerState::Idle);
    }

    #[test]
    fn active_interaction_restarts_countdown() {
        let mut rig = Rig::default();
        let mut pc = PowerController::new(cfg(), 0);
        assert!(!pc.handle_user_interaction(900, &mut rig));
        advance(&mut pc, 1_500, &mut rig);
        assert_eq!(pc.state(), PowerState::Active);
        advance(&mut pc, 1_900, &mut rig);
        assert_eq!(pc.state(), PowerState::Idle);
    }

    #[test]
    fn deep_sleep_after_idle_plus_prolonged() {
        let mut rig = Rig::default();
        let mut pc = PowerController::new(cfg(), 0);
        advance(&mut pc, 1_000, &mut rig);
        advance(&mut pc, 5_999, &mut rig);
        assert_eq!(pc.state(), PowerState::Idle);
        advance(&mut pc, 6_000, &mut rig);
        assert_eq!(pc.state(), PowerState::DeepSleep);
        assert!(rig.gps_off);
        assert_eq!(rig.wake, Some(Button::DisplayPowerToggle));
        assert!(pc.is_halted());
        assert!(!pc.handle_user_interaction(7_000, &mut rig));
        assert_eq!(pc.next_deadline_ms(), None);
    }

    #[test]
    fn entering_idle_twice_arms_once() {
        let mut rig = Rig::default();
        let mut pc = PowerController::new(cfg(), 0);
        pc.enter_idle(100, &mut rig);
        let deadline = pc.next_deadline_ms();
        pc.enter_idle(2_000, &mut rig);
        assert_eq!(pc.next_deadline_ms(), deadline);
        assert_eq!(deadline, Some(5_100));
    }

    #[test]
    fn stale_idle_event_is_ignored() {
        let mut rig = Rig::default();
        let mut pc = PowerController::new(cfg(), 0);
        let mut q = EventQueue::new();
        pc.poll_timers(1_000, &mut q);
        // press lands before the queued expiry is drained
        pc.handle_user_interaction(1_001, &mut rig);
        let ev = q.pop().unwrap();
        assert!(!pc.handle_event(&ev, 1_002, &mut rig));
        assert_eq!(pc.state(), PowerState::Active);
    }

    #[test]
    fn deep_sleep_on_idle_skips_idle() {
        let mut rig = Rig::default();
        let mut pc = PowerController::new(PowerConfig { deep_sleep_on_idle: true, ..cfg() }, 0);
        advance(&mut pc, 1_000, &mut rig);
        assert_eq!(pc.state(), PowerState::DeepSleep);
    }

    #[test]
    fn user_deep_sleep_arms_requested_line() {
        let mut rig = Rig::default();
        let mut pc = PowerController::new(cfg(), 0);
        pc.enter_deep_sleep(Button::Confirm, &mut rig);
        assert_eq!(rig.wake, Some(Button::Confirm));
        assert_eq!(pc.state(), PowerState::DeepSleep);
    }
}
