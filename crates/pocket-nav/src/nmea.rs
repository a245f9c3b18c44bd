//! NMEA 0183 decoding into a single best-effort [`Fix`].
//!
//! Understood sentences: RMC, GGA, GSV (GP or GN talker). A trailing `*hh`
//! checksum is stripped and not verified.
//!
//! Fields are overwritten one sentence at a time and are never zeroed after
//! a failed decode, so a `Fix` can mix values from different epochs. Readers
//! must tolerate that. Latitude and longitude are always written together.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use time::{Date, Month, PrimitiveDateTime, Time};
use tracing::{debug, warn};

use crate::geo::Waypoint;
use crate::pps::PpsTracker;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum FixStatus {
    #[default]
    NoFix,
    Partial,
    Valid,
}

impl FixStatus {
    pub fn label(self) -> &'static str {
        match self {
            FixStatus::NoFix => "No Fix",
            FixStatus::Partial => "Partial",
            FixStatus::Valid => "Valid",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SatelliteInView {
    pub id: u16,
    pub elevation: Option<u8>,
    pub azimuth: Option<u16>,
    pub snr: Option<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Fix {
    pub status: FixStatus,
    pub lat: f64,
    pub lon: f64,
    pub alt_m: f32,
    pub sats: u8,
    pub hdop: Option<f32>,
    /// `HH:MM:SS`
    pub utc_time: Option<String>,
    /// `YYYY-MM-DD`
    pub utc_date: Option<String>,
    pub pps_interval_us: Option<u32>,
    pub sats_in_view: Vec<SatelliteInView>,
    /// Count announced by GSV, independent of how many entries were decoded.
    pub sats_in_view_count: Option<u8>,
    /// Validity flag of the last RMC; `None` until one arrives.
    pub rmc_valid: Option<bool>,
}

impl Fix {
    /// Any positional field differs from its default.
    pub fn has_position_data(&self) -> bool {
        self.lat != 0.0 || self.lon != 0.0 || self.alt_m != 0.0 || self.sats != 0
    }

    pub fn is_valid(&self) -> bool {
        self.status == FixStatus::Valid
    }

    pub fn position(&self) -> Waypoint {
        Waypoint { lat: self.lat, lon: self.lon }
    }

    pub fn utc_datetime(&self) -> Option<PrimitiveDateTime> {
        let t = self.utc_time.as_deref()?;
        let d = self.utc_date.as_deref()?;

        let mut hms = t.split(':').map(|p| p.parse::<u8>().ok());
        let time = Time::from_hms(hms.next()??, hms.next()??, hms.next()??).ok()?;

        let mut ymd = d.split('-');
        let year: i32 = ymd.next()?.parse().ok()?;
        let month = Month::try_from(ymd.next()?.parse::<u8>().ok()?).ok()?;
        let day: u8 = ymd.next()?.parse().ok()?;
        let date = Date::from_calendar_date(year, month, day).ok()?;

        Some(PrimitiveDateTime::new(date, time))
    }
}

/// What to do with the satellites-in-view list across GSV cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GsvPolicy {
    /// Clear when message 1 of a new cycle arrives.
    #[default]
    ResetPerCycle,
    /// Append forever.
    Accumulate,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecodeError {
    #[error("{kind} truncated: {fields} fields")]
    Truncated { kind: &'static str, fields: usize },

    #[error("{field}: not a number: {value:?}")]
    InvalidNumber { field: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decoded {
    Updated,
    ExplicitNoFix,
    Ignored,
}

/// Sole writer of the [`Fix`].
#[derive(Debug, Default)]
pub struct FixTracker {
    fix: Fix,
    gsv_policy: GsvPolicy,
    pps: PpsTracker,
    decoded: u64,
    dropped: u64,
}

impl FixTracker {
    pub fn new(gsv_policy: GsvPolicy) -> Self {
        Self { gsv_policy, ..Default::default() }
    }

    pub fn with_pps(mut self, pps: PpsTracker) -> Self {
        self.pps = pps;
        self
    }

    pub fn fix(&self) -> &Fix {
        &self.fix
    }

    pub fn snapshot(&self) -> Fix {
        self.fix.clone()
    }

    /// (decoded, dropped) sentence counters.
    pub fn counters(&self) -> (u64, u64) {
        (self.decoded, self.dropped)
    }

    /// Feed one raw line from the receiver. Never fails the caller.
    pub fn feed_line(&mut self, raw: &[u8]) {
        if !raw.is_ascii() {
            debug!(len = raw.len(), "dropping non-ASCII line");
            self.dropped += 1;
            return;
        }
        let Ok(line) = std::str::from_utf8(raw) else { return };
        let line = line.trim();
        if !line.starts_with('$') {
            debug!("invalid NMEA sentence: {:?}", line);
            self.dropped += 1;
            return;
        }

        let body = line.split('*').next().unwrap_or(line);
        let fields: Vec<&str> = body.split(',').collect();

        let outcome = match self.decode(&fields) {
            Ok(o) => {
                if o != Decoded::Ignored {
                    self.decoded += 1;
                }
                o
            }
            Err(e) => {
                warn!("error processing GPS data: {} (raw {:?})", e, line);
                self.dropped += 1;
                Decoded::Ignored
            }
        };

        if outcome != Decoded::ExplicitNoFix
            && self.fix.status == FixStatus::NoFix
            && self.fix.has_position_data()
        {
            debug!("fix status promoted to Partial");
            self.fix.status = FixStatus::Partial;
        }
    }

    /// Rising edge on the PPS line.
    pub fn on_pps_edge(&mut self, at_us: u32) {
        if let Some(interval) = self.pps.on_rising_edge(at_us) {
            debug!(interval_us = interval, "PPS interval");
            self.fix.pps_interval_us = Some(interval);
        }
    }

    fn decode(&mut self, fields: &[&str]) -> Result<Decoded, DecodeError> {
        let head = fields[0];
        if head.len() != 6 || !(head.starts_with("$GP") || head.starts_with("$GN")) {
            debug!("ignoring sentence {}", head);
            return Ok(Decoded::Ignored);
        }
        match &head[3..] {
            "RMC" => self.decode_rmc(fields),
            "GGA" => self.decode_gga(fields),
            "GSV" => self.decode_gsv(fields),
            _ => Ok(Decoded::Ignored),
        }
    }

    fn decode_rmc(&mut self, f: &[&str]) -> Result<Decoded, DecodeError> {
        if f.len() < 7 {
            return Err(DecodeError::Truncated { kind: "RMC", fields: f.len() });
        }
        if f[2] != "A" {
            self.fix.status = FixStatus::NoFix;
            self.fix.rmc_valid = Some(false);
            return Ok(Decoded::ExplicitNoFix);
        }
        self.fix.status = FixStatus::Valid;
        self.fix.rmc_valid = Some(true);

        if let Some(t) = fixed_width(f[1]) {
            self.fix.utc_time = Some(format!("{}:{}:{}", &t[..2], &t[2..4], &t[4..6]));
        }
        if let Some(d) = f.get(9).and_then(|d| fixed_width(d)) {
            self.fix.utc_date = Some(format!("20{}-{}-{}", &d[4..6], &d[2..4], &d[..2]));
        }

        match (convert_degrees_minutes(f[3]), convert_degrees_minutes(f[5])) {
            (Some(lat), Some(lon)) => {
                self.fix.lat = if f[4] == "S" { -lat } else { lat };
                self.fix.lon = if f[6] == "W" { -lon } else { lon };
            }
            _ => debug!("RMC position unusable: {:?} {:?}", f[3], f[5]),
        }
        Ok(Decoded::Updated)
    }

    fn decode_gga(&mut self, f: &[&str]) -> Result<Decoded, DecodeError> {
        if f.len() < 10 {
            return Err(DecodeError::Truncated { kind: "GGA", fields: f.len() });
        }
        // Parse everything before touching the fix.
        let sats: u8 = number("gga.sats", f[7])?.unwrap_or(0);
        let hdop: Option<f32> = number("gga.hdop", f[8])?;
        let alt: f32 = number("gga.alt", f[9])?.unwrap_or(0.0);

        self.fix.sats = sats;
        self.fix.alt_m = alt;
        if hdop.is_some() {
            self.fix.hdop = hdop;
        }
        Ok(Decoded::Updated)
    }

    fn decode_gsv(&mut self, f: &[&str]) -> Result<Decoded, DecodeError> {
        if f.len() < 4 {
            return Err(DecodeError::Truncated { kind: "GSV", fields: f.len() });
        }
        let msg_num: u8 = number("gsv.msg_num", f[2])?.unwrap_or(0);
        let count: Option<u8> = number("gsv.count", f[3])?;

        let mut sats = Vec::with_capacity(4);
        for group in f[4..].chunks(4) {
            let Some(id) = number::<u16>("gsv.id", group[0])? else { continue };
            sats.push(SatelliteInView {
                id,
                elevation: number("gsv.elevation", group.get(1).copied().unwrap_or(""))?,
                azimuth: number("gsv.azimuth", group.get(2).copied().unwrap_or(""))?,
                snr: number("gsv.snr", group.get(3).copied().unwrap_or(""))?,
            });
        }

        if self.gsv_policy == GsvPolicy::ResetPerCycle && msg_num == 1 {
            self.fix.sats_in_view.clear();
        }
        self.fix.sats_in_view.extend(sats);
        if count.is_some() {
            self.fix.sats_in_view_count = count;
        }
        Ok(Decoded::Updated)
    }
}

/// `DDMM.MMMM` / `DDDMM.MMMM` to decimal degrees (unsigned).
///
/// Degrees are every integer digit but the last two; the last two integer
/// digits plus the fraction are minutes. Malformed input yields `None`.
pub fn convert_degrees_minutes(s: &str) -> Option<f64> {
    let s = s.trim();
    let (int_part, frac) = s.split_once('.')?;
    let digits = |p: &str| p.bytes().all(|b| b.is_ascii_digit());
    if int_part.len() < 3 || !digits(int_part) || !digits(frac) {
        return None;
    }
    let (deg, min) = int_part.split_at(int_part.len() - 2);
    let degrees: f64 = deg.parse().ok()?;
    let minutes: f64 = format!("{}.{}", min, frac).parse().ok()?;
    Some(degrees + minutes / 60.0)
}

// At least six leading ASCII digits (hhmmss / ddmmyy).
fn fixed_width(s: &str) -> Option<&str> {
    (s.len() >= 6 && s.as_bytes()[..6].iter().all(u8::is_ascii_digit)).then_some(s)
}

fn number<T: FromStr>(field: &'static str, s: &str) -> Result<Option<T>, DecodeError> {
    if s.is_empty() {
        return Ok(None);
    }
    s.parse()
        .map(Some)
        .map_err(|_| DecodeError::InvalidNumber { field, value: s.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;

    const RMC_VALID: &[u8] = b"$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A\r\n";
    const RMC_SW: &[u8] = b"$GPRMC,225446,A,4916.45,S,12311.12,W,000.5,054.7,191194,020.3,E*68";
    const RMC_VOID: &[u8] = b"$GPRMC,225446,V,,,,,,,191194,,*3C";
    const GGA: &[u8] = b"$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47";

    fn tracker() -> FixTracker {
        FixTracker::new(GsvPolicy::ResetPerCycle)
    }

    #[test]
    fn degrees_minutes_conversion() {
        let v = convert_degrees_minutes("4916.45").unwrap();
        assert!((v - 49.274_166_7).abs() < 1e-4);
        let v = convert_degrees_minutes("12311.12").unwrap();
        assert!((v - (123.0 + 11.12 / 60.0)).abs() < 1e-9);
    }

    #[test]
    fn degrees_minutes_rejects_malformed() {
        for bad in ["", "   ", "4916", "16.45", "49a6.45", "4916.4.5", "-4916.45"] {
            assert_eq!(convert_degrees_minutes(bad), None, "{bad:?}");
        }
    }

    #[test]
    fn valid_rmc_sets_position_time_and_date() {
        let mut t = tracker();
        t.feed_line(RMC_VALID);
        let fix = t.fix();
        assert_eq!(fix.status, FixStatus::Valid);
        assert!((fix.lat - (48.0 + 7.038 / 60.0)).abs() < 1e-9);
        assert!((fix.lon - (11.0 + 31.0 / 60.0)).abs() < 1e-9);
        assert_eq!(fix.utc_time.as_deref(), Some("12:35:19"));
        assert_eq!(fix.utc_date.as_deref(), Some("2094-03-23"));
    }

    #[test]
    fn hemisphere_letters_set_sign() {
        let mut t = tracker();
        t.feed_line(RMC_SW);
        assert_eq!(t.fix().status, FixStatus::Valid);
        assert!(t.fix().lat < 0.0);
        assert!(t.fix().lon < 0.0);
        assert!((t.fix().lat + 49.274_166_7).abs() < 1e-4);
    }

    #[test]
    fn gn_talker_is_accepted() {
        let mut t = tracker();
        t.feed_line(b"$GNRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,,");
        assert_eq!(t.fix().status, FixStatus::Valid);
    }

    #[test]
    fn invalid_rmc_forces_no_fix_regardless_of_history() {
        let mut t = tracker();
        t.feed_line(RMC_VALID);
        t.feed_line(GGA);
        assert_eq!(t.fix().status, FixStatus::Valid);
        t.feed_line(RMC_VOID);
        assert_eq!(t.fix().status, FixStatus::NoFix);
        // stale position is kept
        assert!(t.fix().lat > 48.0);
    }

    #[test]
    fn rmc_flag_is_unknown_until_first_rmc() {
        let mut t = tracker();
        t.feed_line(GGA);
        assert_eq!(t.fix().rmc_valid, None);
        t.feed_line(RMC_VOID);
        assert_eq!(t.fix().rmc_valid, Some(false));
        t.feed_line(RMC_VALID);
        assert_eq!(t.fix().rmc_valid, Some(true));
    }

    #[test]
    fn later_sentence_promotes_no_fix_to_partial() {
        let mut t = tracker();
        t.feed_line(RMC_VALID);
        t.feed_line(RMC_VOID);
        t.feed_line(GGA);
        assert_eq!(t.fix().status, FixStatus::Partial);
    }

    #[test]
    fn gga_alone_gives_partial() {
        let mut t = tracker();
        t.feed_line(GGA);
        let fix = t.fix();
        assert_eq!(fix.status, FixStatus::Partial);
        assert_eq!(fix.sats, 8);
        assert_eq!(fix.hdop, Some(0.9));
        assert!((fix.alt_m - 545.4).abs() < 1e-3);
    }

    #[test]
    fn gga_without_hdop_keeps_previous_hdop() {
        let mut t = tracker();
        t.feed_line(GGA);
        t.feed_line(b"$GPGGA,123520,4807.038,N,01131.000,E,1,07,,540.0,M,46.9,M,,");
        assert_eq!(t.fix().hdop, Some(0.9));
        assert_eq!(t.fix().sats, 7);
    }

    #[test]
    fn non_numeric_gga_leaves_fix_untouched() {
        let mut t = tracker();
        t.feed_line(GGA);
        let before = t.snapshot();
        t.feed_line(b"$GPGGA,123519,4807.038,N,01131.000,E,1,xx,0.9,12.0,M,46.9,M,,");
        assert_eq!(t.fix(), &before);
        assert_eq!(t.counters().1, 1);
    }

    #[test]
    fn truncated_sentences_are_dropped() {
        let mut t = tracker();
        t.feed_line(b"$GPRMC,123519,A,4807");
        t.feed_line(b"$GPGGA,1,2");
        assert_eq!(t.fix(), &Fix::default());
        assert_eq!(t.counters(), (0, 2));
    }

    #[test]
    fn non_dollar_lines_never_mutate() {
        let mut t = tracker();
        t.feed_line(GGA);
        let before = t.snapshot();
        t.feed_line(b"GPRMC,225446,V,,,,,,,191194,,");
        t.feed_line(b"garbage\r\n");
        t.feed_line(b"");
        assert_eq!(t.fix(), &before);
    }

    #[test]
    fn non_ascii_lines_are_dropped() {
        let mut t = tracker();
        t.feed_line(b"$GPGGA,123519,\xff\xfe,N");
        assert_eq!(t.fix(), &Fix::default());
    }

    #[test]
    fn malformed_coordinate_keeps_previous_position() {
        let mut t = tracker();
        t.feed_line(RMC_VALID);
        let lat = t.fix().lat;
        t.feed_line(b"$GPRMC,123520,A,48x7.038,N,01131.000,E,022.4,084.4,230394,,");
        assert_eq!(t.fix().lat, lat);
        assert_eq!(t.fix().utc_time.as_deref(), Some("12:35:20"));
    }

    const GSV_1: &[u8] = b"$GPGSV,2,1,08,01,40,083,46,02,17,308,41,12,07,344,39,14,22,228,45*75";
    const GSV_2: &[u8] = b"$GPGSV,2,2,08,15,10,100,,18,,,,,,,,,,,*7A";

    #[test]
    fn gsv_cycle_is_collected() {
        let mut t = tracker();
        t.feed_line(GSV_1);
        t.feed_line(GSV_2);
        let fix = t.fix();
        assert_eq!(fix.sats_in_view_count, Some(8));
        assert_eq!(fix.sats_in_view.len(), 6);
        assert_eq!(
            fix.sats_in_view[0],
            SatelliteInView { id: 1, elevation: Some(40), azimuth: Some(83), snr: Some(46) }
        );
        assert_eq!(fix.sats_in_view[4].snr, None);
        assert_eq!(
            fix.sats_in_view[5],
            SatelliteInView { id: 18, elevation: None, azimuth: None, snr: None }
        );
    }

    #[test]
    fn gsv_reset_policy_starts_over_each_cycle() {
        let mut t = tracker();
        for _ in 0..3 {
            t.feed_line(GSV_1);
            t.feed_line(GSV_2);
        }
        assert_eq!(t.fix().sats_in_view.len(), 6);
    }

    #[test]
    fn gsv_accumulate_policy_keeps_appending() {
        let mut t = FixTracker::new(GsvPolicy::Accumulate);
        for _ in 0..3 {
            t.feed_line(GSV_1);
            t.feed_line(GSV_2);
        }
        assert_eq!(t.fix().sats_in_view.len(), 18);
    }

    #[test]
    fn utc_datetime_combines_time_and_date() {
        let mut t = tracker();
        t.feed_line(RMC_SW);
        let dt = t.fix().utc_datetime().unwrap();
        assert_eq!(dt.year(), 2094);
        assert_eq!(dt.month(), Month::November);
        assert_eq!(dt.hour(), 22);
    }

    #[test]
    fn pps_edges_update_interval() {
        let mut t = tracker();
        t.on_pps_edge(5_000);
        assert_eq!(t.fix().pps_interval_us, None);
        t.on_pps_edge(1_005_012);
        assert_eq!(t.fix().pps_interval_us, Some(1_000_012));
    }
}
