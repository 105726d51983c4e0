//! Session lifecycle: activation, location updates, stop.

use std::sync::Arc;

use tokio::time::Instant;

use super::session::{NavigationSession, NavigationUpdate};
use super::ActivationError;
use crate::alerts::{self, Notifier};
use crate::config::SharedPerformanceConfig;
use crate::geo::{Feature, GeometryError, GeometryType, LngLat};
use crate::location::{resolve_or_fallback, LocationSource};
use crate::throttle::Throttle;

/// Label used in alerts when a feature has no usable geometry type.
const UNKNOWN_GEOMETRY: &str = "unknown";

/// What a successful activation set up.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivationSummary {
    pub geometry_type: GeometryType,
    /// Location the session started from.
    pub start_location: LngLat,
    /// Initial nearest point; `None` for degenerate geometry.
    pub nearest_target_point: Option<LngLat>,
    pub direct_distance_m: Option<f64>,
    /// Whether an already active session was stopped to make room.
    pub replaced_previous: bool,
}

/// Owns the (at most one) stakeout session and feeds its updates through a
/// throttle.
///
/// "Active" is exactly `session.is_some()`; there is no separate flag.
pub struct NavigationController {
    session: Option<NavigationSession>,
    throttle: Throttle<NavigationUpdate>,
    location_source: Arc<dyn LocationSource>,
    notifier: Arc<dyn Notifier>,
    config: SharedPerformanceConfig,
}

impl std::fmt::Debug for NavigationController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NavigationController")
            .field("session", &self.session)
            .field("throttle", &self.throttle)
            .field("location_source", &self.location_source.name())
            .finish_non_exhaustive()
    }
}

impl NavigationController {
    /// Create an inactive controller.
    pub fn new(
        throttle: Throttle<NavigationUpdate>,
        location_source: Arc<dyn LocationSource>,
        notifier: Arc<dyn Notifier>,
        config: SharedPerformanceConfig,
    ) -> Self {
        Self {
            session: None,
            throttle,
            location_source,
            notifier,
            config,
        }
    }

    /// Start navigating toward `feature`.
    ///
    /// Returns false, after alerting the user, when nothing is selected or
    /// the geometry type is not supported. See [`try_activate`](Self::try_activate).
    pub fn activate_for_feature(&mut self, feature: Option<&Feature>, current: Option<LngLat>) -> bool {
        self.try_activate(feature, current).is_ok()
    }

    /// Start navigating toward `feature`, reporting why activation failed.
    ///
    /// Without a finite `current`, the location comes from the injected
    /// source, or the fallback coordinate if it has none. An active session is stopped
    /// first.
    pub fn try_activate(
        &mut self,
        feature: Option<&Feature>,
        current: Option<LngLat>,
    ) -> Result<ActivationSummary, ActivationError> {
        let Some(feature) = feature else {
            tracing::debug!("stakeout requested with no feature selected");
            self.notifier.notify(alerts::no_feature_selected());
            return Err(ActivationError::NoFeatureSelected);
        };

        let geometry = match feature.geometry() {
            Ok(geometry) => geometry,
            Err(GeometryError::Unsupported(kind)) => {
                return Err(self.reject(ActivationError::UnsupportedGeometry(kind)));
            }
            Err(e) => {
                tracing::debug!(error = %e, "feature has no usable geometry");
                return Err(self.reject(ActivationError::MissingGeometry));
            }
        };

        let replaced_previous = self.stop();

        let explicit = current.filter(|location| {
            let usable = location.is_finite();
            if !usable {
                tracing::debug!(location = %location, "ignoring non-finite start location");
            }
            usable
        });
        let location = explicit.unwrap_or_else(|| resolve_or_fallback(&*self.location_source));
        let session = NavigationSession::new(
            feature.clone(),
            geometry,
            location,
            Instant::now().into_std(),
        );

        let summary = ActivationSummary {
            geometry_type: session.geometry().geometry_type(),
            start_location: location,
            nearest_target_point: session.nearest_target_point(),
            direct_distance_m: session.direct_distance_m(),
            replaced_previous,
        };

        tracing::info!(
            geometry_type = %summary.geometry_type,
            start = %location,
            distance_m = ?summary.direct_distance_m,
            "stakeout started"
        );

        // A new session starts a fresh cooling window
        self.throttle.reset();
        let initial = session.update(self.config.guide_line_max_m());
        self.session = Some(session);

        self.notifier
            .notify(alerts::stakeout_started().with_duration(self.config.alert_duration()));

        if let Some(update) = initial {
            self.throttle.submit(update);
        }

        Ok(summary)
    }

    /// Feed a new location fix into the active session.
    ///
    /// Does nothing while inactive. Fixes that yield no nearest point, and
    /// non-finite fixes, are dropped without reaching the throttle.
    pub fn update_current_location(&mut self, lng: f64, lat: f64) {
        let Some(session) = self.session.as_mut() else {
            return;
        };

        let location = LngLat::new(lng, lat);
        if !location.is_finite() {
            tracing::debug!(lng, lat, "ignoring non-finite location");
            return;
        }

        if !session.relocate(location) {
            tracing::trace!(location = %location, "no nearest point on target, update dropped");
            return;
        }

        let Some(update) = session.update(self.config.guide_line_max_m()) else {
            return;
        };

        tracing::trace!(
            location = %location,
            distance_m = update.direct_distance_m,
            bearing_deg = update.bearing_deg,
            "navigation recomputed"
        );
        self.throttle.submit(update);
    }

    /// End the active session.
    ///
    /// The pending update, if any, is delivered so the widget does not keep
    /// a stale frame. Returns whether a session was active.
    pub fn stop(&mut self) -> bool {
        let Some(session) = self.session.take() else {
            return false;
        };

        let flushed = self.throttle.flush();
        tracing::info!(
            updates = session.updates_applied(),
            elapsed_ms = session.elapsed(Instant::now().into_std()).as_millis() as u64,
            flushed,
            "stakeout stopped"
        );

        self.notifier
            .notify(alerts::stakeout_stopped().with_duration(self.config.alert_duration()));
        true
    }

    /// Tear down: stop any session and cancel residual throttle state.
    pub fn cleanup(&mut self) {
        self.stop();
        self.throttle.reset();
    }

    /// Whether a session is active.
    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// The active session.
    pub fn session(&self) -> Option<&NavigationSession> {
        self.session.as_ref()
    }

    /// The update the widget should currently show, computed fresh.
    pub fn snapshot(&self) -> Option<NavigationUpdate> {
        self.session
            .as_ref()?
            .update(self.config.guide_line_max_m())
    }

    /// The throttle updates flow through.
    pub fn throttle(&self) -> &Throttle<NavigationUpdate> {
        &self.throttle
    }

    fn reject(&self, error: ActivationError) -> ActivationError {
        let kind = match &error {
            ActivationError::UnsupportedGeometry(kind) => kind.as_str(),
            _ => UNKNOWN_GEOMETRY,
        };
        tracing::warn!(geometry_type = kind, "stakeout not available for feature");
        self.notifier.notify(alerts::unsupported_feature(kind));
        error
    }
}
