pub mod cpu;
pub mod display;
pub mod event;
pub mod input;
pub mod leds;
pub mod settings;
pub mod wake;

mod error;

pub use error::{HalError, Result};
