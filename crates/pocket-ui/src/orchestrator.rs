//! Display-mode state machine.
//!
//! Owns the current [`DisplayMode`] and everything that only lives inside a
//! mode: the distance points, the settings cursor, the map viewport. Timed
//! pages (GPS detail, notices, splash) sit on top of the mode screen until
//! they expire; nothing here sleeps.

use anyhow::Result;
use tracing::{debug, info};

use pocket_hal::input::Button;
use pocket_hal::leds::Led;
use pocket_nav::distance::{ConfirmOutcome, DistanceCalculator};
use pocket_nav::map::VectorMap;
use pocket_nav::nmea::Fix;

use crate::leds::indicate_fix;
use crate::mode::DisplayMode;
use crate::screens;
use crate::settings_menu::SettingsMenu;
use crate::Hw;

pub const DETAIL_PAGE_MS: u64 = 2_500;
pub const NOTICE_MS: u64 = 2_000;
pub const SPLASH_MS: u64 = 1_500;

#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub name: String,
    pub version: String,
    pub boot_count: u32,
    /// How the settings store came up (loaded, created, recovered...).
    pub settings_state: String,
}

#[derive(Debug, Clone, PartialEq)]
enum Page {
    Splash,
    Notice(Vec<String>),
    GpsDetail,
    AboutData,
}

#[derive(Debug, Clone)]
struct Overlay {
    page: Page,
    until_ms: u64,
}

pub struct Orchestrator {
    mode: DisplayMode,
    distance: DistanceCalculator,
    menu: SettingsMenu,
    map: VectorMap,
    info: DeviceInfo,
    overlay: Option<Overlay>,
}

impl Orchestrator {
    pub fn new(map: VectorMap, info: DeviceInfo) -> Self {
        Self {
            mode: DisplayMode::default(),
            distance: DistanceCalculator::new(),
            menu: SettingsMenu::default(),
            map,
            info,
            overlay: None,
        }
    }

    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    pub fn distance(&self) -> &DistanceCalculator {
        &self.distance
    }

    pub fn map(&self) -> &VectorMap {
        &self.map
    }

    pub fn menu(&self) -> &SettingsMenu {
        &self.menu
    }

    pub fn info(&self) -> &DeviceInfo {
        &self.info
    }

    /// True while a timed page covers the mode screen.
    pub fn overlay_active(&self, now_ms: u64) -> bool {
        self.overlay.as_ref().is_some_and(|o| now_ms < o.until_ms)
    }

    pub fn show_splash(&mut self, now_ms: u64) {
        self.show(Page::Splash, now_ms, SPLASH_MS);
    }

    pub fn notice(&mut self, lines: &[&str], now_ms: u64) {
        let lines = lines.iter().map(|l| l.to_string()).collect();
        self.show(Page::Notice(lines), now_ms, NOTICE_MS);
    }

    fn show(&mut self, page: Page, now_ms: u64, for_ms: u64) {
        debug!(?page, for_ms, "overlay");
        self.overlay = Some(Overlay { page, until_ms: now_ms + for_ms });
    }

    /// Advance to the next mode and enter it.
    pub fn cycle_mode(&mut self, fix: &Fix, now_ms: u64, hw: &mut Hw<'_>) -> DisplayMode {
        let next = self.mode.next();
        self.enter_mode(next, fix, now_ms, hw);
        next
    }

    /// Switch to `mode` and repaint. Mode-local state is left alone, so
    /// re-entering shows where things were.
    pub fn enter_mode(&mut self, mode: DisplayMode, fix: &Fix, now_ms: u64, hw: &mut Hw<'_>) {
        if mode != self.mode {
            info!(from = ?self.mode, to = ?mode, "display mode");
        }
        self.mode = mode;
        self.overlay = None;
        hw.leds.set(Led::Mode, mode != DisplayMode::GpsDisplay);
        self.render(fix, now_ms, hw);
    }

    /// Dispatch a debounced button press for the current mode.
    pub fn handle_button(&mut self, button: Button, fix: &Fix, now_ms: u64, hw: &mut Hw<'_>) -> Result<()> {
        match button {
            Button::ModeNext => {
                self.cycle_mode(fix, now_ms, hw);
                return Ok(());
            }
            Button::Confirm => self.on_confirm(fix, now_ms, hw)?,
            Button::Navigate => self.on_navigate(now_ms),
            Button::DisplayPowerToggle => {
                debug!("display power button reached the orchestrator; ignored");
                return Ok(());
            }
        }
        self.render(fix, now_ms, hw);
        Ok(())
    }

    fn on_confirm(&mut self, fix: &Fix, now_ms: u64, hw: &mut Hw<'_>) -> Result<()> {
        match self.mode {
            DisplayMode::DistanceCalc => match self.distance.confirm(fix) {
                ConfirmOutcome::NoFix => self.notice(&["No GPS fix", "Try again later"], now_ms),
                ConfirmOutcome::Reset => self.notice(&["Points reset", "Set new Point A"], now_ms),
                ConfirmOutcome::PointASet(_) | ConfirmOutcome::Measured { .. } => self.overlay = None,
            },
            DisplayMode::Settings => self.menu.apply(hw)?,
            DisplayMode::MapDisplay => {
                if fix.has_position_data() {
                    self.map.recenter(fix.position());
                }
            }
            DisplayMode::GpsDisplay | DisplayMode::About => {}
        }
        Ok(())
    }

    fn on_navigate(&mut self, now_ms: u64) {
        match self.mode {
            DisplayMode::GpsDisplay => self.show(Page::GpsDetail, now_ms, DETAIL_PAGE_MS),
            DisplayMode::About => self.show(Page::AboutData, now_ms, DETAIL_PAGE_MS),
            DisplayMode::Settings => self.menu.select_next(),
            DisplayMode::MapDisplay => {
                let zoom = self.map.step_zoom();
                info!(zoom, "map zoom");
            }
            DisplayMode::DistanceCalc => {}
        }
    }

    /// Repaint: the live overlay if any, otherwise the mode screen.
    pub fn render(&mut self, fix: &Fix, now_ms: u64, hw: &mut Hw<'_>) {
        if !self.overlay_active(now_ms) {
            self.overlay = None;
        }
        indicate_fix(&mut *hw.leds, fix);

        let d = &mut *hw.display;
        d.clear();
        match self.overlay.as_ref().map(|o| &o.page) {
            Some(Page::Splash) => screens::splash(d, &self.info),
            Some(Page::Notice(lines)) => screens::text_block(d, lines),
            Some(Page::GpsDetail) => screens::gps_detail(d, fix),
            Some(Page::AboutData) => screens::about_data(d, &self.info, &self.map),
            None => match self.mode {
                DisplayMode::GpsDisplay => {
                    screens::gps(d, fix);
                    hw.leds.toggle(Led::Mode);
                }
                DisplayMode::MapDisplay => screens::map(d, &mut self.map, fix),
                DisplayMode::DistanceCalc => screens::distance(d, &self.distance),
                DisplayMode::Settings => self.menu.render(d, &*hw.settings),
                DisplayMode::About => screens::about(d, &self.info, hw.cpu.frequency_hz()),
            },
        }
        d.present();
    }
}
