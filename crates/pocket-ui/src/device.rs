//! One device: fix tracker, power controller and orchestrator behind a
//! single event queue.
//!
//! Edge sources and timers only enqueue. [`Device::step`] drains the queue
//! and applies every mutation in arrival order on the caller's context.

use anyhow::Result;
use tracing::{debug, info};

use pocket_hal::cpu::frequency_for;
use pocket_hal::event::{Event, EventQueue};
use pocket_hal::input::{Button, Debouncer};
use pocket_nav::nmea::FixTracker;
use pocket_power::{PowerController, PowerPeripherals, PowerState};

use crate::mode::DisplayMode;
use crate::orchestrator::Orchestrator;
use crate::Hw;

// Power controller's view of the board.
struct PowerLink<'h, 'a> {
    hw: &'h mut Hw<'a>,
    gps_off: &'h mut bool,
}

impl PowerPeripherals for PowerLink<'_, '_> {
    fn display_power(&mut self, on: bool) {
        if on {
            self.hw.display.power_on();
        } else {
            self.hw.display.power_off();
        }
    }

    fn gps_power_off(&mut self) {
        *self.gps_off = true;
    }

    fn arm_wake(&mut self, line: Button) {
        self.hw.wake.arm_wake(line);
    }
}

pub struct Device {
    tracker: FixTracker,
    power: PowerController,
    ui: Orchestrator,
    debouncer: Debouncer,
    queue: EventQueue,
    gps_off: bool,
}

impl Device {
    pub fn new(tracker: FixTracker, power: PowerController, ui: Orchestrator, debounce_ms: u64) -> Self {
        Self {
            tracker,
            power,
            ui,
            debouncer: Debouncer::new(debounce_ms),
            queue: EventQueue::new(),
            gps_off: false,
        }
    }

    pub fn tracker(&self) -> &FixTracker {
        &self.tracker
    }

    /// For the GNSS poller; the tracker stays the only writer of the fix.
    pub fn tracker_mut(&mut self) -> &mut FixTracker {
        &mut self.tracker
    }

    pub fn power(&self) -> &PowerController {
        &self.power
    }

    pub fn ui(&self) -> &Orchestrator {
        &self.ui
    }

    pub fn push(&mut self, event: Event) {
        self.queue.push(event);
    }

    pub fn is_halted(&self) -> bool {
        self.power.is_halted()
    }

    /// Set once deep sleep has powered the receiver down.
    pub fn gps_power_off_requested(&self) -> bool {
        self.gps_off
    }

    /// Apply persisted settings to the peripherals and show the first screen.
    /// A wake from deep sleep skips the splash.
    pub fn boot(&mut self, now_ms: u64, hw: &mut Hw<'_>) {
        hw.display.power_on();
        hw.display.set_contrast(hw.settings.contrast());
        hw.display.set_inverted(hw.settings.inverted());

        let power_save = hw.settings.power_save();
        hw.cpu.set_frequency_hz(frequency_for(power_save));
        hw.leds.set_enabled(hw.settings.led_enabled());

        let woke = hw.wake.woke_from_deep_sleep();
        info!(woke, power_save, "device boot");

        let fix = self.tracker.snapshot();
        self.ui.enter_mode(DisplayMode::GpsDisplay, &fix, now_ms, hw);
        if !woke {
            self.ui.show_splash(now_ms);
            self.ui.render(&fix, now_ms, hw);
        }
    }

    /// One main loop cycle: queue timer expiries, drain the queue, repaint.
    pub fn step(&mut self, now_ms: u64, hw: &mut Hw<'_>) -> Result<()> {
        self.power.poll_timers(now_ms, &mut self.queue);
        while let Some(event) = self.queue.pop() {
            self.dispatch(event, now_ms, hw)?;
            if self.power.is_halted() {
                self.queue = EventQueue::new();
                return Ok(());
            }
        }
        if self.power.state() == PowerState::Active {
            let fix = self.tracker.snapshot();
            self.ui.render(&fix, now_ms, hw);
        }
        Ok(())
    }

    fn dispatch(&mut self, event: Event, now_ms: u64, hw: &mut Hw<'_>) -> Result<()> {
        match event {
            Event::PpsEdge { at_us } => self.tracker.on_pps_edge(at_us),
            Event::IdleTimeout { .. } | Event::DeepSleepTimeout { .. } => {
                let mut link = PowerLink { hw: &mut *hw, gps_off: &mut self.gps_off };
                self.power.handle_event(&event, now_ms, &mut link);
            }
            Event::Button { button, at_ms } => {
                if !self.debouncer.accept(button, at_ms) {
                    debug!(?button, "bounce rejected");
                    return Ok(());
                }
                self.on_button(button, now_ms, hw)?;
            }
        }
        Ok(())
    }

    fn on_button(&mut self, button: Button, now_ms: u64, hw: &mut Hw<'_>) -> Result<()> {
        let mut link = PowerLink { hw: &mut *hw, gps_off: &mut self.gps_off };
        if self.power.handle_user_interaction(now_ms, &mut link) {
            debug!(?button, "press consumed by wake");
            return Ok(());
        }
        if button == Button::DisplayPowerToggle {
            info!("display power button: deep sleep requested");
            self.power.enter_deep_sleep(Button::DisplayPowerToggle, &mut link);
            return Ok(());
        }
        let fix = self.tracker.snapshot();
        self.ui.handle_button(button, &fix, now_ms, hw)
    }
}
