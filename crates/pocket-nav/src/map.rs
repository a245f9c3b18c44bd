//! Static vector map: GeoJSON features projected onto the panel.
//!
//! Features load once at startup and never change. Each repaint reprojects
//! them against a viewport box centered on the current position; the box is
//! recomputed only after a real move or a zoom change.

use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info, warn};

use pocket_hal::display::Display;

use crate::geo::{distance_m, BBox, Waypoint};

pub const MIN_ZOOM: f64 = 0.1;
pub const MAX_ZOOM: f64 = 10.0;
const MARKER_HALF: i32 = 2;

#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("read map data {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("parse map data: {0}")]
    Parse(#[from] serde_json::Error),
}

/// GeoJSON position; any third (altitude) element is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(try_from = "Vec<f64>")]
pub struct LonLat {
    pub lon: f64,
    pub lat: f64,
}

impl TryFrom<Vec<f64>> for LonLat {
    type Error = String;

    fn try_from(v: Vec<f64>) -> Result<Self, Self::Error> {
        match v.as_slice() {
            [lon, lat, ..] => Ok(LonLat { lon: *lon, lat: *lat }),
            _ => Err(format!("position needs 2 numbers, got {}", v.len())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Point(LonLat),
    LineString(Vec<LonLat>),
    Polygon(Vec<Vec<LonLat>>),
    MultiLineString(Vec<Vec<LonLat>>),
    MultiPolygon(Vec<Vec<Vec<LonLat>>>),
}

impl Geometry {
    pub fn kind(&self) -> &'static str {
        match self {
            Geometry::Point(_) => "Point",
            Geometry::LineString(_) => "LineString",
            Geometry::Polygon(_) => "Polygon",
            Geometry::MultiLineString(_) => "MultiLineString",
            Geometry::MultiPolygon(_) => "MultiPolygon",
        }
    }

    /// Every strip to draw, with whether it is a closed ring.
    fn strips(&self) -> Vec<(&[LonLat], bool)> {
        match self {
            Geometry::Point(p) => vec![(std::slice::from_ref(p), false)],
            Geometry::LineString(line) => vec![(line.as_slice(), false)],
            Geometry::MultiLineString(lines) => lines.iter().map(|l| (l.as_slice(), false)).collect(),
            Geometry::Polygon(rings) => rings.iter().map(|r| (r.as_slice(), true)).collect(),
            Geometry::MultiPolygon(polys) => polys
                .iter()
                .flat_map(|rings| rings.iter().map(|r| (r.as_slice(), true)))
                .collect(),
        }
    }

    fn vertices(&self) -> impl Iterator<Item = &LonLat> + '_ {
        self.strips().into_iter().flat_map(|(s, _)| s.iter())
    }

    /// Conservative cull: true if any vertex lies inside `bbox`.
    pub fn touches(&self, bbox: &BBox) -> bool {
        self.vertices().any(|p| bbox.contains(p.lon, p.lat))
    }

    pub fn bounds(&self) -> Option<BBox> {
        self.vertices().fold(None, |acc, p| {
            let pt = BBox { min_lon: p.lon, min_lat: p.lat, max_lon: p.lon, max_lat: p.lat };
            Some(acc.map_or(pt, |b: BBox| b.union(&pt)))
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapFeature {
    pub geometry: Geometry,
}

#[derive(Deserialize)]
struct RawCollection {
    #[serde(default)]
    features: Vec<RawFeature>,
}

#[derive(Deserialize)]
struct RawFeature {
    geometry: Option<serde_json::Value>,
}

/// Parse a GeoJSON FeatureCollection. Features with a missing or unsupported
/// geometry are skipped.
pub fn parse_features(body: &str) -> Result<Vec<MapFeature>, MapError> {
    let raw: RawCollection = serde_json::from_str(body)?;
    let mut out = Vec::with_capacity(raw.features.len());
    for (i, f) in raw.features.into_iter().enumerate() {
        let Some(g) = f.geometry else { continue };
        match serde_json::from_value::<Geometry>(g) {
            Ok(geometry) => out.push(MapFeature { geometry }),
            Err(e) => warn!(feature = i, "skipping feature: {}", e),
        }
    }
    Ok(out)
}

pub fn load_features(path: impl AsRef<Path>) -> Result<Vec<MapFeature>, MapError> {
    let path = path.as_ref();
    let body = std::fs::read_to_string(path)
        .map_err(|source| MapError::Read { path: path.display().to_string(), source })?;
    parse_features(&body)
}

fn default_base_size_deg() -> f64 { 0.1 }
fn default_recenter_threshold_m() -> f64 { 25.0 }

#[derive(Debug, Clone, Deserialize)]
pub struct MapConfig {
    pub geojson: Option<String>,
    /// Viewport side at zoom 1, degrees.
    #[serde(default = "default_base_size_deg")]
    pub base_size_deg: f64,
    /// Move needed before the viewport follows, meters.
    #[serde(default = "default_recenter_threshold_m")]
    pub recenter_threshold_m: f64,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            geojson: None,
            base_size_deg: default_base_size_deg(),
            recenter_threshold_m: default_recenter_threshold_m(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapViewport {
    pub bbox: BBox,
    pub zoom: f64,
}

/// Map `(lat, lon)` to a pixel inside `width x height`.
///
/// Linear in the bbox, north up, scaled by zoom, then clamped on screen.
pub fn project(lat: f64, lon: f64, vp: &MapViewport, width: u32, height: u32) -> (i32, i32) {
    let b = &vp.bbox;
    let fx = fraction(lon, b.min_lon, b.max_lon);
    let fy = 1.0 - fraction(lat, b.min_lat, b.max_lat);

    let x = (fx * width as f64 * vp.zoom) as i64;
    let y = (fy * height as f64 * vp.zoom) as i64;

    let max_x = width.saturating_sub(1) as i64;
    let max_y = height.saturating_sub(1) as i64;
    (x.clamp(0, max_x) as i32, y.clamp(0, max_y) as i32)
}

fn fraction(v: f64, lo: f64, hi: f64) -> f64 {
    let span = hi - lo;
    if span.abs() < f64::EPSILON { 0.0 } else { (v - lo) / span }
}

pub struct VectorMap {
    features: Vec<MapFeature>,
    cfg: MapConfig,
    zoom: f64,
    viewport: MapViewport,
    anchor: Option<Waypoint>,
    anchor_zoom: Option<f64>,
}

impl VectorMap {
    pub fn new(features: Vec<MapFeature>, cfg: MapConfig) -> Self {
        Self {
            features,
            cfg,
            zoom: 1.0,
            viewport: MapViewport { bbox: BBox::WORLD, zoom: 1.0 },
            anchor: None,
            anchor_zoom: None,
        }
    }

    /// Load from `cfg.geojson`; any failure leaves the map empty.
    pub fn load_or_empty(cfg: MapConfig) -> Self {
        let features = match cfg.geojson.as_deref() {
            Some(path) => match load_features(path) {
                Ok(f) => {
                    info!(path, features = f.len(), "map data loaded");
                    f
                }
                Err(e) => {
                    warn!("failed to load map data: {}", e);
                    Vec::new()
                }
            },
            None => Vec::new(),
        };
        Self::new(features, cfg)
    }

    pub fn features(&self) -> &[MapFeature] {
        &self.features
    }

    pub fn has_data(&self) -> bool {
        !self.features.is_empty()
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn set_zoom(&mut self, zoom: f64) -> f64 {
        self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        self.zoom
    }

    /// 1 -> 2 -> 4 -> 8 -> 1
    pub fn step_zoom(&mut self) -> f64 {
        let next = self.zoom * 2.0;
        self.set_zoom(if next > MAX_ZOOM { 1.0 } else { next })
    }

    pub fn viewport(&self) -> &MapViewport {
        &self.viewport
    }

    /// Recompute the viewport if `center` moved past the threshold or the
    /// zoom changed since the last recomputation. Returns whether it did.
    pub fn update_viewport(&mut self, center: Waypoint) -> bool {
        let moved = self
            .anchor
            .map_or(true, |a| distance_m(a, center) > self.cfg.recenter_threshold_m);
        let rezoomed = self.anchor_zoom != Some(self.zoom);
        if !moved && !rezoomed {
            return false;
        }
        self.recenter(center);
        true
    }

    pub fn recenter(&mut self, center: Waypoint) {
        let size = self.cfg.base_size_deg / self.zoom;
        self.viewport = MapViewport { bbox: BBox::around(center, size), zoom: self.zoom };
        self.anchor = Some(center);
        self.anchor_zoom = Some(self.zoom);
        debug!(lat = center.lat, lon = center.lon, zoom = self.zoom, "viewport recomputed");
    }

    /// Draw every feature touching the viewport. Returns how many were drawn.
    pub fn render(&self, display: &mut dyn Display) -> usize {
        if self.features.is_empty() {
            display.draw_text(0, 28, "No data");
            return 0;
        }
        let (w, h) = (display.width(), display.height());
        let mut drawn = 0;
        for f in self.features.iter().filter(|f| f.geometry.touches(&self.viewport.bbox)) {
            for (strip, closed) in f.geometry.strips() {
                let pts: Vec<(i32, i32)> = strip
                    .iter()
                    .map(|p| project(p.lat, p.lon, &self.viewport, w, h))
                    .collect();
                draw_strip(display, &pts, closed);
            }
            drawn += 1;
        }
        drawn
    }

    /// Fixed-size triangle on the projected position.
    pub fn render_user_location(&self, display: &mut dyn Display, pos: Waypoint) {
        let (x, y) = project(pos.lat, pos.lon, &self.viewport, display.width(), display.height());
        let m = MARKER_HALF;
        display.draw_line(x, y - m, x - m, y + m);
        display.draw_line(x - m, y + m, x + m, y + m);
        display.draw_line(x + m, y + m, x, y - m);
    }
}

fn draw_strip(display: &mut dyn Display, pts: &[(i32, i32)], closed: bool) {
    match pts {
        [] => {}
        [(x, y)] => display.draw_pixel(*x, *y),
        _ => {
            for seg in pts.windows(2) {
                display.draw_line(seg[0].0, seg[0].1, seg[1].0, seg[1].1);
            }
            let (first, last) = (pts[0], pts[pts.len() - 1]);
            if closed && first != last {
                display.draw_line(last.0, last.1, first.0, first.1);
            }
        }
    }
}
