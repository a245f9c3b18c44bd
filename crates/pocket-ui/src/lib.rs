pub mod device;
pub mod leds;
pub mod mode;
pub mod orchestrator;
pub mod screens;
pub mod settings_menu;

use pocket_hal::cpu::CpuControl;
use pocket_hal::display::Display;
use pocket_hal::leds::StatusLeds;
use pocket_hal::settings::SettingsStore;
use pocket_hal::wake::WakeSource;

pub use device::Device;
pub use mode::DisplayMode;
pub use orchestrator::{DeviceInfo, Orchestrator};

/// Borrowed board peripherals for one call.
pub struct Hw<'a> {
    pub display: &'a mut dyn Display,
    pub settings: &'a mut dyn SettingsStore,
    pub cpu: &'a mut dyn CpuControl,
    pub leds: &'a mut dyn StatusLeds,
    pub wake: &'a mut dyn WakeSource,
}
