use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::input::Button;
use crate::{HalError, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetainedState {
    pub boot_count: u32,
    pub deep_sleep_armed: bool,
    pub wake_line: Option<Button>,
}

pub trait RetainedMemory {
    fn read(&self) -> Option<RetainedState>;
    fn write(&mut self, state: &RetainedState) -> Result<()>;
}

pub trait WakeSource {
    /// Arm wake-up on `line` ahead of deep sleep.
    fn arm_wake(&mut self, line: Button);
    /// Whether the current boot is a wake from deep sleep.
    fn woke_from_deep_sleep(&self) -> bool;
}

/// JSON file standing in for RTC slow memory on the host.
#[derive(Debug, Clone)]
pub struct FileRetained {
    path: PathBuf,
}

impl FileRetained {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }
}

impl RetainedMemory for FileRetained {
    fn read(&self) -> Option<RetainedState> {
        let body = std::fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str(&body) {
            Ok(s) => Some(s),
            Err(e) => {
                warn!(path = %self.path.display(), "retained memory corrupt: {}", e);
                None
            }
        }
    }

    fn write(&mut self, state: &RetainedState) -> Result<()> {
        let body = serde_json::to_string(state)?;
        std::fs::write(&self.path, body)
            .map_err(|source| HalError::Write { path: self.path.clone(), source })
    }
}

#[derive(Debug, Clone, Default)]
pub struct VolatileRetained {
    state: Option<RetainedState>,
}

impl RetainedMemory for VolatileRetained {
    fn read(&self) -> Option<RetainedState> {
        self.state.clone()
    }

    fn write(&mut self, state: &RetainedState) -> Result<()> {
        self.state = Some(state.clone());
        Ok(())
    }
}

/// Wake bookkeeping on top of retained memory.
///
/// `boot` must run once at startup: it bumps the boot counter, records
/// whether this boot is a wake, and disarms the flag for the next cycle.
pub struct RetainedWake<M: RetainedMemory> {
    mem: M,
    state: RetainedState,
    woke: bool,
}

impl<M: RetainedMemory> RetainedWake<M> {
    pub fn boot(mut mem: M) -> Self {
        let mut state = mem.read().unwrap_or_default();
        let woke = state.deep_sleep_armed;
        state.boot_count = state.boot_count.wrapping_add(1);
        state.deep_sleep_armed = false;
        if let Err(e) = mem.write(&state) {
            warn!("failed to update retained memory: {}", e);
        }
        info!(boot = state.boot_count, woke, "boot cycle");
        Self { mem, state, woke }
    }

    pub fn boot_count(&self) -> u32 {
        self.state.boot_count
    }

    pub fn wake_line(&self) -> Option<Button> {
        self.state.wake_line
    }
}

impl<M: RetainedMemory> WakeSource for RetainedWake<M> {
    fn arm_wake(&mut self, line: Button) {
        self.state.deep_sleep_armed = true;
        self.state.wake_line = Some(line);
        debug!(?line, "wake armed");
        if let Err(e) = self.mem.write(&self.state) {
            warn!("failed to arm wake: {}", e);
        }
    }

    fn woke_from_deep_sleep(&self) -> bool {
        self.woke
    }
}
