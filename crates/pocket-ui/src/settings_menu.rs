use anyhow::{Context, Result};
use serde_json::json;
use tracing::info;

use pocket_hal::cpu::frequency_for;
use pocket_hal::display::Display;
use pocket_hal::settings::{SettingsStore, CONTRAST_MAX, DEVICE, LCD};

use crate::Hw;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingOption {
    Contrast,
    Invert,
    PowerSave,
    Leds,
}

impl SettingOption {
    pub const ALL: [SettingOption; 4] =
        [SettingOption::Contrast, SettingOption::Invert, SettingOption::PowerSave, SettingOption::Leds];

    pub fn label(self) -> &'static str {
        match self {
            SettingOption::Contrast => "Contrast",
            SettingOption::Invert => "Invert",
            SettingOption::PowerSave => "Power Save",
            SettingOption::Leds => "LEDs",
        }
    }

    fn value_line(self, s: &dyn SettingsStore) -> String {
        let on_off = |b: bool| if b { "On" } else { "Off" };
        match self {
            SettingOption::Contrast => format!("Contrast: {}", s.contrast()),
            SettingOption::Invert => format!("Invert: {}", on_off(s.inverted())),
            SettingOption::PowerSave => format!("PWR Save: {}", on_off(s.power_save())),
            SettingOption::Leds => format!("LEDs: {}", on_off(s.led_enabled())),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SettingsMenu {
    index: usize,
}

impl SettingsMenu {
    pub fn selected(&self) -> SettingOption {
        SettingOption::ALL[self.index]
    }

    pub fn select_next(&mut self) {
        self.index = (self.index + 1) % SettingOption::ALL.len();
    }

    /// Title, a three-line window around the cursor, and the value of the
    /// selected option on the bottom line.
    pub fn render(&self, display: &mut dyn Display, settings: &dyn SettingsStore) {
        display.draw_text(0, 0, "Settings");
        let start = self.index.saturating_sub(1);
        let end = (start + 3).min(SettingOption::ALL.len());
        for (row, i) in (start..end).enumerate() {
            let marker = if i == self.index { ">" } else { " " };
            let y = (row as i32 + 1) * 16;
            display.draw_text(0, y, &format!("{}{}", marker, SettingOption::ALL[i].label()));
        }
        display.draw_text(0, 56, &self.selected().value_line(settings));
    }

    /// Apply the selected option.
    pub fn apply(&self, hw: &mut Hw<'_>) -> Result<()> {
        let option = self.selected();
        match option {
            SettingOption::Contrast => {
                let next = hw.settings.contrast() % CONTRAST_MAX + 1;
                hw.settings.set("contrast", json!(next), Some(LCD)).context("store contrast")?;
                hw.display.set_contrast(next);
            }
            SettingOption::Invert => {
                let next = !hw.settings.inverted();
                hw.settings.set("invert", json!(next), Some(LCD)).context("store invert")?;
                hw.display.set_inverted(next);
            }
            SettingOption::PowerSave => {
                let next = !hw.settings.power_save();
                hw.settings.set("power_save", json!(next), Some(DEVICE)).context("store power_save")?;
                hw.cpu.set_frequency_hz(frequency_for(next));
            }
            SettingOption::Leds => {
                let next = !hw.settings.led_enabled();
                hw.settings.set("led_enabled", json!(next), Some(DEVICE)).context("store led_enabled")?;
                hw.leds.set_enabled(next);
            }
        }
        info!(option = option.label(), "setting applied");
        Ok(())
    }
}
