use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::{HalError, Result};

pub const LCD: &str = "lcd";
pub const DEVICE: &str = "device";

pub const CONTRAST_MAX: u8 = 15;

pub fn defaults() -> Value {
    json!({
        LCD: {
            "contrast": 1,
            "invert": false,
            "rotate": 0,
        },
        DEVICE: {
            "power_save": false,
            "screen_timeout_ms": 30000,
            "led_enabled": true,
        },
    })
}

pub trait SettingsStore {
    /// Look a key up in `section`, or at the top level when `section` is None.
    fn get(&self, key: &str, section: Option<&str>) -> Option<Value>;

    /// Update a key and persist. Persist failures are logged, not returned.
    fn set(&mut self, key: &str, value: Value, section: Option<&str>) -> Result<()>;

    fn contrast(&self) -> u8 {
        self.get("contrast", Some(LCD))
            .and_then(|v| v.as_u64())
            .map(|c| c.clamp(1, CONTRAST_MAX as u64) as u8)
            .unwrap_or(1)
    }

    fn inverted(&self) -> bool {
        flag(self.get("invert", Some(LCD)))
    }

    fn power_save(&self) -> bool {
        flag(self.get("power_save", Some(DEVICE)))
    }

    fn led_enabled(&self) -> bool {
        self.get("led_enabled", Some(DEVICE)).map(|v| flag(Some(v))).unwrap_or(true)
    }

    fn screen_timeout_ms(&self) -> u64 {
        self.get("screen_timeout_ms", Some(DEVICE))
            .and_then(|v| v.as_u64())
            .unwrap_or(30_000)
    }
}

// Older documents store 0/1 for booleans; accept both.
fn flag(v: Option<Value>) -> bool {
    match v {
        Some(Value::Bool(b)) => b,
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0) != 0,
        _ => false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreState {
    /// Read from disk.
    Loaded,
    /// No file existed; defaults were written.
    Created,
    /// File was unreadable or corrupt; defaults in use.
    Recovered,
    /// No backing file.
    Volatile,
}

#[derive(Debug, Clone)]
pub struct JsonSettings {
    path: Option<PathBuf>,
    doc: Value,
    state: StoreState,
}

impl JsonSettings {
    pub fn in_memory() -> Self {
        Self { path: None, doc: defaults(), state: StoreState::Volatile }
    }

    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();

        if !path.exists() {
            info!(path = %path.display(), "settings file not found, creating with defaults");
            let mut s = Self { path: Some(path), doc: defaults(), state: StoreState::Created };
            s.persist();
            return s;
        }

        match read_doc(&path) {
            Ok(doc) => {
                info!(path = %path.display(), "user settings loaded");
                Self { path: Some(path), doc, state: StoreState::Loaded }
            }
            Err(e) => {
                warn!("settings unusable, using defaults: {}", e);
                let mut s = Self { path: Some(path), doc: defaults(), state: StoreState::Recovered };
                s.persist();
                s
            }
        }
    }

    pub fn state(&self) -> StoreState {
        self.state
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn reset(&mut self) {
        self.doc = defaults();
        self.persist();
        info!("settings reset to defaults");
    }

    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else { return Ok(()) };
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .map_err(|source| HalError::Write { path: dir.to_path_buf(), source })?;
        }
        let body = serde_json::to_string_pretty(&self.doc)?;
        std::fs::write(path, body).map_err(|source| HalError::Write { path: path.clone(), source })
    }

    fn persist(&mut self) {
        if let Err(e) = self.save() {
            warn!("failed to save settings: {}", e);
        }
    }
}

fn read_doc(path: &Path) -> Result<Value> {
    let body = std::fs::read_to_string(path)
        .map_err(|source| HalError::Read { path: path.to_path_buf(), source })?;
    let doc: Value = serde_json::from_str(&body)
        .map_err(|source| HalError::Decode { path: path.to_path_buf(), source })?;
    if !doc.is_object() {
        return Err(HalError::MissingSection("<root>".into()));
    }
    Ok(doc)
}

impl SettingsStore for JsonSettings {
    fn get(&self, key: &str, section: Option<&str>) -> Option<Value> {
        let lookup = |doc: &Value| match section {
            Some(s) => doc.get(s).and_then(|sec| sec.get(key)).cloned(),
            None => doc.get(key).cloned(),
        };
        lookup(&self.doc).or_else(|| lookup(&defaults()))
    }

    fn set(&mut self, key: &str, value: Value, section: Option<&str>) -> Result<()> {
        let root = self.doc.as_object_mut().ok_or_else(|| HalError::MissingSection("<root>".into()))?;
        match section {
            Some(s) => {
                if !root.contains_key(s) && defaults().get(s).is_some() {
                    root.insert(s.to_string(), Value::Object(Default::default()));
                }
                let sec = root
                    .get_mut(s)
                    .and_then(Value::as_object_mut)
                    .ok_or_else(|| HalError::MissingSection(s.to_string()))?;
                sec.insert(key.to_string(), value);
            }
            None => {
                root.insert(key.to_string(), value);
            }
        }
        self.persist();
        Ok(())
    }
}
