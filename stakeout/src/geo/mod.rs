//! Geographic coordinate math.
//!
//! Pure functions over `[longitude, latitude]` pairs in decimal degrees
//! (WGS84, spherical Earth model). No state, no validation: NaN inputs
//! propagate NaN outputs.

mod feature;
mod nearest;

pub use feature::{Feature, Geometry, GeometryError, GeometryType, RawGeometry};
pub use nearest::{
    nearest_point_on_geometry, nearest_point_on_line_string, nearest_point_on_polygon_boundary,
};

use std::fmt;

use serde::{Deserialize, Serialize};

/// Mean Earth radius in meters (WGS84).
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Default cap for the on-screen guide line toward distant targets.
pub const DEFAULT_GUIDE_LINE_MAX_M: f64 = 500.0;

/// Slack allowed when deciding whether a line exceeds its cap (1 µm).
const CLAMP_TOLERANCE_M: f64 = 1e-6;

/// A `[longitude, latitude]` pair in decimal degrees.
///
/// Serializes as a two-element array, matching GeoJSON positions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct LngLat {
    /// Longitude in degrees.
    pub lng: f64,
    /// Latitude in degrees.
    pub lat: f64,
}

impl LngLat {
    /// Create a new coordinate pair.
    #[inline]
    pub const fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    /// Returns true if both components are finite.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.lng.is_finite() && self.lat.is_finite()
    }
}

impl From<[f64; 2]> for LngLat {
    fn from(pair: [f64; 2]) -> Self {
        Self::new(pair[0], pair[1])
    }
}

impl From<LngLat> for [f64; 2] {
    fn from(p: LngLat) -> Self {
        [p.lng, p.lat]
    }
}

impl From<(f64, f64)> for LngLat {
    fn from((lng, lat): (f64, f64)) -> Self {
        Self::new(lng, lat)
    }
}

impl fmt::Display for LngLat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:.7}, {:.7}]", self.lng, self.lat)
    }
}

/// Great-circle distance between two points in meters.
///
/// Symmetric in its arguments and always non-negative for finite input.
pub fn haversine_distance(a: LngLat, b: LngLat) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lng - a.lng).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);

    // Rounding can push h a hair past 1.0 for antipodal points. f64::min
    // would swallow a NaN here, so compare explicitly.
    let h = if h > 1.0 { 1.0 } else { h };
    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}

/// Initial great-circle bearing from `from` toward `to`.
///
/// Returns degrees in `0..360`, where 0 = North, 90 = East.
pub fn initial_bearing(from: LngLat, to: LngLat) -> f64 {
    let lat1 = from.lat.to_radians();
    let lat2 = to.lat.to_radians();
    let dlon = (to.lng - from.lng).to_radians();

    let y = dlon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();

    normalize_bearing(y.atan2(x).to_degrees())
}

/// Point reached by travelling `distance_m` from `from` along `bearing_deg`.
pub fn destination(from: LngLat, bearing_deg: f64, distance_m: f64) -> LngLat {
    let delta = distance_m / EARTH_RADIUS_M;
    let theta = bearing_deg.to_radians();
    let lat1 = from.lat.to_radians();
    let lon1 = from.lng.to_radians();

    let lat2 = (lat1.sin() * delta.cos() + lat1.cos() * delta.sin() * theta.cos()).asin();
    let lon2 = lon1
        + (theta.sin() * delta.sin() * lat1.cos()).atan2(delta.cos() - lat1.sin() * lat2.sin());

    LngLat::new(normalize_longitude(lon2.to_degrees()), lat2.to_degrees())
}

/// Cap the length of a line from `start` toward `end`.
///
/// If `end` lies further than `max_m` from `start`, returns the point on the
/// great circle toward `end` exactly `max_m` from `start`. Otherwise returns
/// `end` unchanged.
pub fn clamp_line_length(start: LngLat, end: LngLat, max_m: f64) -> LngLat {
    let distance = haversine_distance(start, end);
    if distance <= max_m + CLAMP_TOLERANCE_M {
        return end;
    }
    destination(start, initial_bearing(start, end), max_m)
}

fn normalize_bearing(deg: f64) -> f64 {
    let b = deg % 360.0;
    if b < 0.0 {
        b + 360.0
    } else {
        b
    }
}

fn normalize_longitude(deg: f64) -> f64 {
    if (-180.0..=180.0).contains(&deg) {
        deg
    } else {
        (deg + 540.0).rem_euclid(360.0) - 180.0
    }
}
