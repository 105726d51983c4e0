//! One stakeout session toward one target.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::geo::{
    clamp_line_length, haversine_distance, initial_bearing, nearest_point_on_geometry, Feature,
    Geometry, LngLat,
};

/// What the navigation widget renders for one location fix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NavigationUpdate {
    /// Where the user is.
    pub current_location: LngLat,
    /// Nearest point on the target geometry.
    pub target_location: LngLat,
    /// Great-circle distance to `target_location` in meters.
    pub direct_distance_m: f64,
    /// Initial bearing toward `target_location`, degrees from north.
    pub bearing_deg: f64,
    /// End of the on-screen guide line; equals `target_location` unless the
    /// target is further away than the guide line cap.
    pub guide_line_end: LngLat,
}

/// State of an active stakeout.
///
/// The target is fixed for the session's lifetime. Everything derived from
/// the current location is recomputed by [`relocate`](Self::relocate), so it
/// never lags behind the last accepted fix.
#[derive(Debug, Clone)]
pub struct NavigationSession {
    target: Feature,
    geometry: Geometry,
    current_location: LngLat,
    nearest_target_point: Option<LngLat>,
    direct_distance_m: Option<f64>,
    bearing_deg: Option<f64>,
    started_at: Instant,
    updates_applied: u64,
}

impl NavigationSession {
    /// Start a session at `location`, computing the initial nearest point.
    pub fn new(target: Feature, geometry: Geometry, location: LngLat, started_at: Instant) -> Self {
        let mut session = Self {
            target,
            geometry,
            current_location: location,
            nearest_target_point: None,
            direct_distance_m: None,
            bearing_deg: None,
            started_at,
            updates_applied: 0,
        };
        session.recompute();
        session
    }

    /// Move to `location` and recompute.
    ///
    /// Returns false if the geometry yields no nearest point, in which case
    /// the derived fields stay empty.
    pub fn relocate(&mut self, location: LngLat) -> bool {
        self.current_location = location;
        self.updates_applied += 1;
        self.recompute()
    }

    /// The update to render for the current state, if the target resolved.
    pub fn update(&self, guide_line_max_m: f64) -> Option<NavigationUpdate> {
        let target_location = self.nearest_target_point?;
        Some(NavigationUpdate {
            current_location: self.current_location,
            target_location,
            direct_distance_m: self.direct_distance_m?,
            bearing_deg: self.bearing_deg?,
            guide_line_end: clamp_line_length(
                self.current_location,
                target_location,
                guide_line_max_m,
            ),
        })
    }

    pub fn target(&self) -> &Feature {
        &self.target
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn current_location(&self) -> LngLat {
        self.current_location
    }

    /// Closest point on the target, `None` for degenerate geometry.
    pub fn nearest_target_point(&self) -> Option<LngLat> {
        self.nearest_target_point
    }

    pub fn direct_distance_m(&self) -> Option<f64> {
        self.direct_distance_m
    }

    pub fn bearing_deg(&self) -> Option<f64> {
        self.bearing_deg
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Time since the session started, measured against `now`.
    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started_at)
    }

    /// Location fixes applied since the session started.
    pub fn updates_applied(&self) -> u64 {
        self.updates_applied
    }

    fn recompute(&mut self) -> bool {
        match nearest_point_on_geometry(&self.geometry, self.current_location) {
            Some(nearest) => {
                self.nearest_target_point = Some(nearest);
                self.direct_distance_m = Some(haversine_distance(self.current_location, nearest));
                self.bearing_deg = Some(initial_bearing(self.current_location, nearest));
                true
            }
            None => {
                self.nearest_target_point = None;
                self.direct_distance_m = None;
                self.bearing_deg = None;
                false
            }
        }
    }
}
