use anyhow::{Context, Result};
use serde::Deserialize;

use pocket_nav::gnss::GnssConfig;
use pocket_nav::map::MapConfig;
use pocket_power::PowerConfig;

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub gnss: GnssConfig,
    #[serde(default)]
    pub power: PowerConfig,
    #[serde(default)]
    pub display: DisplayCfg,
    #[serde(default)]
    pub map: MapConfig,
    #[serde(default)]
    pub storage: StorageCfg,
    #[serde(default)]
    pub input: InputCfg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RenderMode {
    /// Print each changed frame to stdout.
    #[default]
    Ascii,
    None,
}

#[derive(Debug, Deserialize)]
pub struct DisplayCfg {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default)]
    pub render: RenderMode,
}

fn default_width() -> u32 { 128 }
fn default_height() -> u32 { 64 }

impl Default for DisplayCfg {
    fn default() -> Self {
        Self { width: default_width(), height: default_height(), render: RenderMode::default() }
    }
}

#[derive(Debug, Deserialize)]
pub struct StorageCfg {
    #[serde(default = "default_settings_path")]
    pub settings_path: String,
    /// Stands in for RTC memory across deep sleep.
    #[serde(default = "default_retained_path")]
    pub retained_path: String,
}

fn default_settings_path() -> String { "user_settings.json".into() }
fn default_retained_path() -> String { "retained.json".into() }

impl Default for StorageCfg {
    fn default() -> Self {
        Self { settings_path: default_settings_path(), retained_path: default_retained_path() }
    }
}

#[derive(Debug, Deserialize)]
pub struct InputCfg {
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_debounce_ms() -> u64 { 150 }

impl Default for InputCfg {
    fn default() -> Self {
        Self { debounce_ms: default_debounce_ms() }
    }
}

pub fn load_config(path: &str) -> Result<Config> {
    let s = std::fs::read_to_string(path).with_context(|| format!("read config {}", path))?;
    toml::from_str(&s).context("parse config toml")
}
