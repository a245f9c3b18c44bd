use anyhow::Result;

use crate::power::PowerConfig;

pub fn check_power(cfg: &PowerConfig) -> Result<()> {
    anyhow::ensure!(cfg.idle_timeout_ms >= 1_000, "device.screen_timeout_ms too short (< 1 s)");
    anyhow::ensure!(
        cfg.deep_sleep_timeout_ms >= cfg.idle_timeout_ms,
        "power.deep_sleep_timeout_ms should not be shorter than the screen timeout"
    );
    anyhow::ensure!(cfg.fast_poll_ms >= 100, "power.fast_poll_ms too small");
    anyhow::ensure!(
        cfg.slow_poll_ms >= cfg.fast_poll_ms,
        "power.slow_poll_ms must be >= power.fast_poll_ms"
    );
    Ok(())
}
