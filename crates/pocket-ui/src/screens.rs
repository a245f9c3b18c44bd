use pocket_hal::display::{Display, GLYPH_W};
use pocket_nav::distance::{DistanceCalculator, DistanceState};
use pocket_nav::map::VectorMap;
use pocket_nav::nmea::{Fix, FixStatus};

use crate::orchestrator::DeviceInfo;

/// Main GPS page: status line, then position and quality once anything is
/// known.
pub fn gps(d: &mut dyn Display, fix: &Fix) {
    d.draw_text(0, 0, &format!("Fix: {}", fix.status.label()));
    if fix.status == FixStatus::NoFix {
        d.draw_text(0, 30, "Waiting for fix...");
        return;
    }
    d.draw_text(0, 20, &format!("Lat: {:.6}", fix.lat));
    d.draw_text(0, 30, &format!("Lon: {:.6}", fix.lon));
    d.draw_text(0, 40, &format!("Alt: {:.1}m", fix.alt_m));
    d.draw_text(0, 50, &format!("Sats: {}", fix.sats));
}

/// Time, satellites in view and PPS interval.
pub fn gps_detail(d: &mut dyn Display, fix: &Fix) {
    match (fix.utc_datetime(), &fix.utc_time) {
        (Some(dt), _) => {
            d.draw_text(0, 0, &format!("Time: {:02}:{:02}:{:02}", dt.hour(), dt.minute(), dt.second()));
            d.draw_text(0, 9, &format!("Date: {}", dt.date()));
        }
        (None, Some(t)) => d.draw_text(0, 0, &format!("Time: {}", t)),
        (None, None) => d.draw_text(0, 0, "Time: --"),
    }
    let in_view = fix.sats_in_view_count.map(usize::from).unwrap_or(fix.sats_in_view.len());
    d.draw_text(0, 24, &format!("In view: {}", in_view));
    if let Some(hdop) = fix.hdop {
        d.draw_text(0, 36, &format!("HDOP: {:.1}", hdop));
    }
    if let Some(pps) = fix.pps_interval_us {
        d.draw_text(0, 48, &format!("PPS: {}us", pps));
    }
}

pub fn distance(d: &mut dyn Display, calc: &DistanceCalculator) {
    let lines: [String; 3] = match (calc.state(), calc.distance_m()) {
        (DistanceState::HasBoth, Some(m)) => {
            ["Distance:".into(), format!("{:.2} m", m), "SET to reset".into()]
        }
        (DistanceState::HasA, _) => ["Point A set".into(), "Set Point B".into(), "Press SET".into()],
        _ => ["Distance Mode".into(), "Set Point A".into(), "Press SET".into()],
    };
    text_block(d, &lines);
}

/// Features, user marker and zoom label. Without position only a wait
/// message is shown.
pub fn map(d: &mut dyn Display, map: &mut VectorMap, fix: &Fix) {
    if !map.has_data() {
        map.render(d);
        return;
    }
    if fix.status == FixStatus::NoFix {
        d.draw_text(0, 30, "Waiting for fix...");
        return;
    }
    let here = fix.position();
    map.update_viewport(here);
    map.render(d);
    map.render_user_location(d, here);

    let label = format!("x{}", map.zoom());
    let x = d.width() as i32 - label.len() as i32 * GLYPH_W;
    d.draw_text(x.max(0), 0, &label);
}

pub fn about(d: &mut dyn Display, info: &DeviceInfo, cpu_hz: u32) {
    d.draw_text(0, 0, &info.name);
    d.draw_text(0, 9, &format!("v{}", info.version));
    d.draw_text(0, 20, &format!("CPU: {} MHz", cpu_hz / 1_000_000));
    d.draw_text(0, 30, &format!("Boots: {}", info.boot_count));
    d.draw_text(0, 50, "Press NAV for more");
}

pub fn about_data(d: &mut dyn Display, info: &DeviceInfo, map: &VectorMap) {
    d.draw_text(0, 0, "Device Data");
    d.draw_text(0, 20, &format!("Map: {} features", map.features().len()));
    d.draw_text(0, 30, &format!("Zoom: x{}", map.zoom()));
    d.draw_text(0, 40, &format!("Settings: {}", info.settings_state));
}

pub fn splash(d: &mut dyn Display, info: &DeviceInfo) {
    d.draw_text(0, 9, &info.name);
    let right = d.width() as i32 - 18;
    for y in 30..40 {
        d.draw_line(10, y, right, y);
    }
    d.draw_text(10, 45, "Booting...");
}

/// Up to three lines at the fixed text rows.
pub fn text_block<S: AsRef<str>>(d: &mut dyn Display, lines: &[S]) {
    for (line, y) in lines.iter().zip([0, 16, 24]) {
        d.draw_text(0, y, line.as_ref());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pocket_hal::display::FrameBuffer;

    #[test]
    fn no_fix_hides_stale_coordinates() {
        let mut fb = FrameBuffer::new(128, 64);
        let fix = Fix { lat: 48.1, lon: 11.5, ..Default::default() };
        gps(&mut fb, &fix);
        assert!(fb.shows("Fix: No Fix"));
        assert!(fb.shows("Waiting for fix..."));
        assert!(!fb.shows("Lat:"));
    }

    #[test]
    fn partial_fix_shows_position_rows() {
        let mut fb = FrameBuffer::new(128, 64);
        let fix = Fix { status: FixStatus::Partial, lat: 48.1173, sats: 8, ..Default::default() };
        gps(&mut fb, &fix);
        assert!(fb.shows("Lat: 48.117300"));
        assert!(fb.shows("Sats: 8"));
    }

    #[test]
    fn detail_page_prefers_announced_count() {
        let mut fb = FrameBuffer::new(128, 64);
        let fix = Fix {
            utc_time: Some("12:35:19".into()),
            utc_date: Some("2094-03-23".into()),
            sats_in_view_count: Some(11),
            pps_interval_us: Some(1_000_002),
            ..Default::default()
        };
        gps_detail(&mut fb, &fix);
        assert!(fb.shows("Time: 12:35:19"));
        assert!(fb.shows("Date: 2094-03-23"));
        assert!(fb.shows("In view: 11"));
        assert!(fb.shows("PPS: 1000002us"));
    }

    #[test]
    fn detail_page_without_date_shows_raw_time() {
        let mut fb = FrameBuffer::new(128, 64);
        let fix = Fix { utc_time: Some("08:01:02".into()), ..Default::default() };
        gps_detail(&mut fb, &fix);
        assert!(fb.shows("Time: 08:01:02"));
        assert!(!fb.shows("Date:"));
    }
}
