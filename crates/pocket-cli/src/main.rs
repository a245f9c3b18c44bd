mod config;
mod host;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

use pocket_hal::cpu::FixedCpu;
use pocket_hal::event::Event;
use pocket_hal::leds::LedBank;
use pocket_hal::settings::{JsonSettings, SettingsStore};
use pocket_hal::wake::{FileRetained, RetainedWake};
use pocket_nav::gnss::GnssSource;
use pocket_nav::map::{self, VectorMap};
use pocket_nav::nmea::FixTracker;
use pocket_nav::pps::PpsTracker;
use pocket_nav::doctor as nav_doctor;
use pocket_power::{doctor as power_doctor, PowerController};
use pocket_ui::{Device, DeviceInfo, Hw, Orchestrator};

use config::{load_config, Config};
use host::{Clock, PollSchedule, TerminalDisplay};

const DEVICE_NAME: &str = "Pocket GPS";
// Upper bound on one main loop turn when nothing arrives.
const LOOP_TICK_MS: u64 = 50;

#[derive(Debug, Parser)]
#[command(name = "pocket", version, about = "Pocket GPS - handheld GNSS firmware host harness")]
struct Cli {
    #[arg(long)]
    config: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate the config before running.
    Doctor,
    /// Run the device loop; buttons are read from stdin (c, m, n, p).
    Run,
    Map { #[command(subcommand)] cmd: MapCmd },
    Settings { #[command(subcommand)] cmd: SettingsCmd },
}

#[derive(Debug, Subcommand)]
enum MapCmd {
    /// Feature counts per geometry type and overall bounds.
    Inspect,
}

#[derive(Debug, Subcommand)]
enum SettingsCmd {
    /// Print the effective settings.
    Show,
    /// Overwrite the settings file with defaults.
    Reset,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let cfg = load_config(&cli.config)?;

    match cli.cmd {
        Command::Doctor => doctor(&cfg)?,
        Command::Run => run(&cfg).await?,
        Command::Map { cmd } => map_cmd(&cfg, cmd)?,
        Command::Settings { cmd } => settings_cmd(&cfg, cmd),
    }
    Ok(())
}

fn doctor(cfg: &Config) -> Result<()> {
    info!("doctor: starting");

    nav_doctor::check_gnss(&cfg.gnss)?;
    let features = nav_doctor::check_map(&cfg.map)?;

    // Only read an existing settings file; a missing one means defaults.
    let settings = if std::path::Path::new(&cfg.storage.settings_path).exists() {
        JsonSettings::load(&cfg.storage.settings_path)
    } else {
        JsonSettings::in_memory()
    };
    let mut power = cfg.power.clone();
    power.idle_timeout_ms = settings.screen_timeout_ms();
    power_doctor::check_power(&power)?;

    anyhow::ensure!(
        cfg.display.width >= 64 && cfg.display.height >= 32,
        "display {}x{} too small for the screen layouts",
        cfg.display.width,
        cfg.display.height
    );
    anyhow::ensure!(cfg.input.debounce_ms <= 1_000, "input.debounce_ms above 1 s");

    info!(features, "doctor: OK");
    Ok(())
}

fn map_cmd(cfg: &Config, cmd: MapCmd) -> Result<()> {
    match cmd {
        MapCmd::Inspect => {
            let path = cfg.map.geojson.as_deref().context("no map.geojson configured")?;
            let features = map::load_features(path).with_context(|| format!("load map {}", path))?;

            let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
            let mut bounds = None;
            for f in &features {
                *counts.entry(f.geometry.kind()).or_default() += 1;
                if let Some(b) = f.geometry.bounds() {
                    bounds = Some(bounds.map_or(b, |acc: pocket_nav::geo::BBox| acc.union(&b)));
                }
            }

            println!("features: {}", features.len());
            for (kind, n) in counts {
                println!("  {:<16} {}", kind, n);
            }
            match bounds {
                Some(b) => println!(
                    "bbox: lon {:.6}..{:.6} lat {:.6}..{:.6}",
                    b.min_lon, b.max_lon, b.min_lat, b.max_lat
                ),
                None => println!("bbox: none"),
            }
            Ok(())
        }
    }
}

fn settings_cmd(cfg: &Config, cmd: SettingsCmd) {
    let mut settings = JsonSettings::load(&cfg.storage.settings_path);
    if let SettingsCmd::Reset = cmd {
        settings.reset();
    }
    if let Some(path) = settings.path() {
        println!("file: {}", path.display());
    }
    println!("contrast: {}", settings.contrast());
    println!("invert: {}", settings.inverted());
    println!("power_save: {}", settings.power_save());
    println!("led_enabled: {}", settings.led_enabled());
    println!("screen_timeout_ms: {}", settings.screen_timeout_ms());
}

async fn run(cfg: &Config) -> Result<()> {
    info!("run: starting");
    let clock = Clock::new();

    let mut wake = RetainedWake::boot(FileRetained::new(&cfg.storage.retained_path));
    let mut settings = JsonSettings::load(&cfg.storage.settings_path);
    let mut display = TerminalDisplay::new(cfg.display.width, cfg.display.height, cfg.display.render);
    let mut cpu = FixedCpu::default();
    let mut leds = LedBank::new(true);

    let mut power_cfg = cfg.power.clone();
    power_cfg.idle_timeout_ms = settings.screen_timeout_ms();

    let info = DeviceInfo {
        name: DEVICE_NAME.into(),
        version: env!("CARGO_PKG_VERSION").into(),
        boot_count: wake.boot_count(),
        settings_state: format!("{:?}", settings.state()),
    };
    let map = VectorMap::load_or_empty(cfg.map.clone());
    let tracker = FixTracker::new(cfg.gnss.gsv_policy).with_pps(PpsTracker::new(cfg.gnss.pps_counter_bits));

    let now = clock.now_ms();
    let mut device = Device::new(
        tracker,
        PowerController::new(power_cfg, now),
        Orchestrator::new(map, info),
        cfg.input.debounce_ms,
    );

    let mut gnss = match GnssSource::open(&cfg.gnss) {
        Ok(src) => src,
        Err(e) => {
            warn!("GNSS unavailable, continuing without it: {:#}", e);
            GnssSource::disabled()
        }
    };

    let (tx, mut rx) = mpsc::channel::<Event>(64);
    tokio::spawn(host::stdin_buttons(tx.clone(), clock));
    if cfg.gnss.simulate_pps {
        tokio::spawn(host::simulated_pps(tx.clone(), clock));
    }
    drop(tx);

    {
        let mut hw = Hw { display: &mut display, settings: &mut settings, cpu: &mut cpu, leds: &mut leds, wake: &mut wake };
        device.boot(now, &mut hw);
    }

    let read_timeout = Duration::from_millis(cfg.gnss.read_timeout_ms);
    let mut gnss_schedule = PollSchedule::default();

    loop {
        let mut hw = Hw { display: &mut display, settings: &mut settings, cpu: &mut cpu, leds: &mut leds, wake: &mut wake };
        let cycle = async {
            while let Ok(ev) = rx.try_recv() {
                device.push(ev);
            }
            let now = clock.now_ms();
            if gnss_schedule.due(now, device.power().poll_interval_ms()) {
                gnss.poll(device.tracker_mut(), cfg.gnss.max_lines_per_poll, read_timeout).await;
                gnss_schedule.mark(now);
            }
            device.step(clock.now_ms(), &mut hw)?;
            if device.gps_power_off_requested() {
                gnss.power_off();
            }
            Ok::<(), anyhow::Error>(())
        };
        if let Err(e) = cycle.await {
            warn!("main loop cycle failed: {:#}", e);
        }

        if device.is_halted() {
            info!(retained = %cfg.storage.retained_path, "deep sleep: halting until wake");
            break;
        }

        // Wake no later than the next power timer.
        let tick_ms = device
            .power()
            .next_deadline_ms()
            .map_or(LOOP_TICK_MS, |d| d.saturating_sub(clock.now_ms()).min(LOOP_TICK_MS));
        tokio::select! {
            Some(ev) = rx.recv() => device.push(ev),
            _ = tokio::time::sleep(Duration::from_millis(tick_ms)) => {}
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
        }
    }

    let (decoded, dropped) = device.tracker().counters();
    info!(decoded, dropped, "NMEA sentences");
    Ok(())
}
