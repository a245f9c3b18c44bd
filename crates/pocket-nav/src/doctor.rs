use anyhow::{Context, Result};

use crate::gnss::{GnssConfig, SourceKind};
use crate::map::{self, MapConfig, MAX_ZOOM};

pub fn check_gnss(cfg: &GnssConfig) -> Result<()> {
    match cfg.source {
        SourceKind::NmeaSerial => {
            let dev = cfg.nmea_device.as_deref().unwrap_or("");
            anyhow::ensure!(!dev.is_empty(), "gnss.nmea_device required for nmea-serial");
            anyhow::ensure!(
                [4800, 9600, 19200, 38400, 57600, 115200].contains(&cfg.baud),
                "gnss.baud {} is not a standard NMEA rate",
                cfg.baud
            );
        }
        SourceKind::NmeaFile => {
            let path = cfg.nmea_file.as_deref().unwrap_or("");
            anyhow::ensure!(!path.is_empty(), "gnss.nmea_file required for nmea-file");
            std::fs::metadata(path).with_context(|| format!("gnss.nmea_file {}", path))?;
        }
        SourceKind::Disabled => {}
    }
    anyhow::ensure!(cfg.max_lines_per_poll >= 1, "gnss.max_lines_per_poll must be >= 1");
    anyhow::ensure!(
        cfg.read_timeout_ms >= 1 && cfg.read_timeout_ms <= 1000,
        "gnss.read_timeout_ms should be 1..1000"
    );
    anyhow::ensure!(
        cfg.pps_counter_bits >= 16 && cfg.pps_counter_bits <= 32,
        "gnss.pps_counter_bits should be 16..32"
    );
    Ok(())
}

/// Returns the number of usable features.
pub fn check_map(cfg: &MapConfig) -> Result<usize> {
    anyhow::ensure!(
        cfg.base_size_deg > 0.0 && cfg.base_size_deg / MAX_ZOOM <= 180.0,
        "map.base_size_deg out of range"
    );
    anyhow::ensure!(cfg.recenter_threshold_m >= 0.0, "map.recenter_threshold_m negative");
    match cfg.geojson.as_deref() {
        Some(path) => {
            let features = map::load_features(path).with_context(|| format!("map.geojson {}", path))?;
            anyhow::ensure!(!features.is_empty(), "map.geojson {} has no drawable features", path);
            Ok(features.len())
        }
        None => Ok(0),
    }
}
