//! Inactivity timers and the Active / Idle / DeepSleep controller.

pub mod doctor;
pub mod power;
pub mod timer;

pub use power::{PowerConfig, PowerController, PowerPeripherals, PowerState};
