use anyhow::{Context, Result};
use serde::Deserialize;
use std::io::Cursor;
use std::time::Duration;
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncSeekExt, BufReader};
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::{debug, info, warn};

use crate::nmea::{FixTracker, GsvPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    NmeaSerial,
    NmeaFile,
    #[default]
    Disabled,
}

fn default_baud() -> u32 { 9600 }
fn default_read_timeout_ms() -> u64 { 50 }
fn default_max_lines() -> usize { 32 }
fn default_pps_bits() -> u32 { 32 }

#[derive(Debug, Clone, Deserialize)]
pub struct GnssConfig {
    #[serde(default)]
    pub source: SourceKind,
    pub nmea_device: Option<String>,
    #[serde(default = "default_baud")]
    pub baud: u32,
    pub nmea_file: Option<String>,
    /// Rewind the replay file at EOF.
    #[serde(default)]
    pub loop_file: bool,
    /// Longest wait for one line before a poll gives up.
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    #[serde(default = "default_max_lines")]
    pub max_lines_per_poll: usize,
    #[serde(default)]
    pub gsv_policy: GsvPolicy,
    /// Generate a PPS edge every second from the host clock.
    #[serde(default)]
    pub simulate_pps: bool,
    #[serde(default = "default_pps_bits")]
    pub pps_counter_bits: u32,
}

impl Default for GnssConfig {
    fn default() -> Self {
        Self {
            source: SourceKind::Disabled,
            nmea_device: None,
            baud: default_baud(),
            nmea_file: None,
            loop_file: false,
            read_timeout_ms: default_read_timeout_ms(),
            max_lines_per_poll: default_max_lines(),
            gsv_policy: GsvPolicy::default(),
            simulate_pps: false,
            pps_counter_bits: default_pps_bits(),
        }
    }
}

enum Transport {
    Stream(Box<dyn AsyncBufRead + Unpin + Send>),
    File { reader: BufReader<File>, looping: bool },
    Disabled,
}

/// Line-oriented NMEA transport.
///
/// Bytes of a line still in flight when a read times out stay in `pending`
/// and the next read continues that line.
pub struct GnssSource {
    transport: Transport,
    pending: Vec<u8>,
}

impl GnssSource {
    pub fn open(cfg: &GnssConfig) -> Result<Self> {
        match cfg.source {
            SourceKind::NmeaSerial => {
                let dev = cfg.nmea_device.as_deref().context("gnss.nmea_device not set")?;
                Self::serial(dev, cfg.baud)
            }
            SourceKind::NmeaFile => {
                let path = cfg.nmea_file.as_deref().context("gnss.nmea_file not set")?;
                Self::file(path, cfg.loop_file)
            }
            SourceKind::Disabled => Ok(Self::disabled()),
        }
    }

    pub fn serial(dev: &str, baud: u32) -> Result<Self> {
        let port: SerialStream = tokio_serial::new(dev, baud).open_native_async()
            .with_context(|| format!("open serial {}", dev))?;
        info!(dev, baud, "GNSS serial open");
        Ok(Self::stream(port))
    }

    pub fn file(path: &str, looping: bool) -> Result<Self> {
        let f = std::fs::File::open(path).with_context(|| format!("open nmea file {}", path))?;
        let f = File::from_std(f);
        info!(path, looping, "GNSS replay file open");
        Ok(Self::with(Transport::File { reader: BufReader::new(f), looping }))
    }

    pub fn replay(bytes: impl Into<Vec<u8>>) -> Self {
        Self::stream(Cursor::new(bytes.into()))
    }

    /// Any byte stream, e.g. a pipe from a receiver simulator.
    pub fn stream<R: AsyncRead + Unpin + Send + 'static>(reader: R) -> Self {
        Self::with(Transport::Stream(Box::new(BufReader::new(reader))))
    }

    pub fn disabled() -> Self {
        Self::with(Transport::Disabled)
    }

    fn with(transport: Transport) -> Self {
        Self { transport, pending: Vec::with_capacity(96) }
    }

    pub fn is_disabled(&self) -> bool {
        matches!(self.transport, Transport::Disabled)
    }

    /// Drop the transport; later polls read nothing.
    pub fn power_off(&mut self) {
        if !self.is_disabled() {
            info!("GNSS transport powered off");
        }
        self.transport = Transport::Disabled;
        self.pending.clear();
    }

    /// Next raw line without the trailing newline, or `None` when nothing
    /// more is available. Safe to cancel: a partial line is kept.
    pub async fn next_line(&mut self) -> std::io::Result<Option<Vec<u8>>> {
        let buf = &mut self.pending;
        let n = match &mut self.transport {
            Transport::Stream(r) => r.read_until(b'\n', buf).await?,
            Transport::File { reader, looping } => {
                let n = reader.read_until(b'\n', buf).await?;
                if n == 0 && *looping && buf.is_empty() {
                    // EOF: rewind
                    reader.seek(std::io::SeekFrom::Start(0)).await?;
                    reader.read_until(b'\n', buf).await?
                } else {
                    n
                }
            }
            Transport::Disabled => 0,
        };
        if n == 0 && buf.is_empty() {
            return Ok(None);
        }
        let mut line = std::mem::take(buf);
        while matches!(line.last(), Some(b'\n' | b'\r')) {
            line.pop();
        }
        Ok(Some(line))
    }

    /// Drain available lines into `tracker`, at most `max_lines`, waiting at
    /// most `timeout` for each. Transport errors end the poll.
    pub async fn poll(&mut self, tracker: &mut FixTracker, max_lines: usize, timeout: Duration) -> usize {
        let mut fed = 0;
        while fed < max_lines {
            match tokio::time::timeout(timeout, self.next_line()).await {
                Ok(Ok(Some(line))) => {
                    tracker.feed_line(&line);
                    fed += 1;
                }
                Ok(Ok(None)) => break,
                Ok(Err(e)) => {
                    warn!("GNSS read failed: {}", e);
                    break;
                }
                Err(_) => {
                    if !self.pending.is_empty() {
                        debug!(bytes = self.pending.len(), "partial NMEA line carried over");
                    }
                    break;
                }
            }
        }
        if fed > 0 {
            debug!(lines = fed, "GNSS poll");
        }
        fed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nmea::FixStatus;
    use std::io::Write;
    use tokio::io::AsyncWriteExt;

    const RMC: &str = "$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A";
    const GGA: &str = "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47";

    fn tick() -> Duration {
        Duration::from_millis(20)
    }

    #[tokio::test]
    async fn replay_feeds_every_line() {
        let mut src = GnssSource::replay(format!("{RMC}\r\n{GGA}\r\n"));
        let mut t = FixTracker::new(GsvPolicy::default());
        assert_eq!(src.poll(&mut t, 16, tick()).await, 2);
        assert_eq!(t.fix().status, FixStatus::Valid);
        assert_eq!(t.fix().sats, 8);
        assert_eq!(src.poll(&mut t, 16, tick()).await, 0);
    }

    #[tokio::test]
    async fn poll_respects_line_budget() {
        let body = format!("{RMC}\n").repeat(5);
        let mut src = GnssSource::replay(body);
        let mut t = FixTracker::default();
        assert_eq!(src.poll(&mut t, 3, tick()).await, 3);
        assert_eq!(src.poll(&mut t, 3, tick()).await, 2);
    }

    #[tokio::test]
    async fn garbage_lines_do_not_stop_the_poll() {
        let mut src = GnssSource::replay(format!("\u{00ff}\u{00fe}\nnoise\n{GGA}\n").into_bytes());
        let mut t = FixTracker::default();
        assert_eq!(src.poll(&mut t, 16, tick()).await, 3);
        assert_eq!(t.fix().status, FixStatus::Partial);
        assert_eq!(t.counters().1, 2);
    }

    #[tokio::test]
    async fn powered_off_source_reads_nothing() {
        let mut src = GnssSource::replay(format!("{RMC}\n"));
        src.power_off();
        assert!(src.is_disabled());
        let mut t = FixTracker::default();
        assert_eq!(src.poll(&mut t, 16, tick()).await, 0);
    }

    #[tokio::test]
    async fn looping_file_rewinds_at_eof() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(tmp, "{RMC}").unwrap();
        let path = tmp.path().to_str().unwrap().to_string();

        let mut src = GnssSource::file(&path, true).unwrap();
        let mut t = FixTracker::default();
        assert_eq!(src.poll(&mut t, 3, tick()).await, 3);

        let mut once = GnssSource::file(&path, false).unwrap();
        assert_eq!(once.poll(&mut t, 3, tick()).await, 1);
    }

    #[tokio::test]
    async fn line_split_across_polls_is_decoded_once_complete() {
        let (mut receiver, port) = tokio::io::duplex(256);
        let mut src = GnssSource::stream(port);
        let mut t = FixTracker::default();

        receiver.write_all(&RMC.as_bytes()[..30]).await.unwrap();
        assert_eq!(src.poll(&mut t, 4, tick()).await, 0);
        assert_eq!(t.fix().status, FixStatus::NoFix);

        receiver.write_all(&RMC.as_bytes()[30..]).await.unwrap();
        receiver.write_all(b"\r\n").await.unwrap();
        assert_eq!(src.poll(&mut t, 4, tick()).await, 1);
        assert_eq!(t.fix().status, FixStatus::Valid);
        assert_eq!(t.counters(), (1, 0));
    }

    #[tokio::test]
    async fn last_line_without_newline_is_still_read() {
        let mut src = GnssSource::replay(RMC);
        let mut t = FixTracker::default();
        assert_eq!(src.poll(&mut t, 4, tick()).await, 1);
        assert_eq!(t.fix().status, FixStatus::Valid);
    }

    #[test]
    fn open_requires_device_for_serial() {
        let cfg = GnssConfig { source: SourceKind::NmeaSerial, ..Default::default() };
        assert!(GnssSource::open(&cfg).is_err());
        assert!(GnssSource::open(&GnssConfig::default()).unwrap().is_disabled());
    }

    #[test]
    fn config_parses_kebab_case() {
        let cfg: GnssConfig = toml::from_str(
            "source = \"nmea-file\"\nnmea_file = \"a.nmea\"\ngsv_policy = \"accumulate\"",
        )
        .unwrap();
        assert_eq!(cfg.source, SourceKind::NmeaFile);
        assert_eq!(cfg.gsv_policy, GsvPolicy::Accumulate);
        assert_eq!(cfg.baud, 9600);
    }
}
