//! Simulated GPS for exercising navigation without a device.
//!
//! [`WalkSimulator`] walks in a straight great-circle line toward a target
//! at constant speed and publishes each position to a [`SharedLocation`],
//! which can be injected wherever a [`LocationSource`] is expected.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::geo::{destination, haversine_distance, initial_bearing, LngLat};
use crate::location::{LocationSource, SharedLocation};

/// Default walking speed (m/s).
pub const DEFAULT_WALK_SPEED_MPS: f64 = 1.4;

/// Distance at which the walker counts as arrived.
pub const DEFAULT_ARRIVAL_RADIUS_M: f64 = 0.5;

/// How a simulation run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationOutcome {
    /// The walker reached the target.
    Arrived,
    /// The run was cancelled first.
    Cancelled,
}

/// Walks from a start position toward a target.
#[derive(Debug, Clone)]
pub struct WalkSimulator {
    position: LngLat,
    target: LngLat,
    speed_mps: f64,
    arrival_radius_m: f64,
    published: SharedLocation,
}

impl WalkSimulator {
    /// Create a walker at `start` heading for `target` at walking speed.
    pub fn new(start: LngLat, target: LngLat) -> Self {
        let published = SharedLocation::new();
        published.set(start);
        Self {
            position: start,
            target,
            speed_mps: DEFAULT_WALK_SPEED_MPS,
            arrival_radius_m: DEFAULT_ARRIVAL_RADIUS_M,
            published,
        }
    }

    /// Set the speed in meters per second. Non-positive speeds stop the walker.
    pub fn with_speed(mut self, speed_mps: f64) -> Self {
        self.speed_mps = speed_mps.max(0.0);
        self
    }

    /// Set the arrival radius in meters.
    pub fn with_arrival_radius(mut self, radius_m: f64) -> Self {
        self.arrival_radius_m = radius_m.max(0.0);
        self
    }

    /// Change the target mid-walk.
    pub fn retarget(&mut self, target: LngLat) {
        self.target = target;
    }

    /// Handle that always holds the walker's latest position.
    pub fn location_handle(&self) -> SharedLocation {
        self.published.clone()
    }

    /// Current position.
    pub fn position(&self) -> LngLat {
        self.position
    }

    /// Target position.
    pub fn target(&self) -> LngLat {
        self.target
    }

    /// Remaining distance to the target in meters.
    pub fn remaining_m(&self) -> f64 {
        haversine_distance(self.position, self.target)
    }

    /// Whether the walker is within the arrival radius.
    pub fn has_arrived(&self) -> bool {
        self.remaining_m() <= self.arrival_radius_m
    }

    /// Advance by `dt` and return the new position. Never overshoots.
    pub fn step(&mut self, dt: Duration) -> LngLat {
        let remaining = self.remaining_m();
        let travel = self.speed_mps * dt.as_secs_f64();

        self.position = if travel >= remaining {
            self.target
        } else {
            destination(
                self.position,
                initial_bearing(self.position, self.target),
                travel,
            )
        };

        self.published.set(self.position);
        self.position
    }

    /// Step every `tick` until arrival or cancellation, reporting each fix.
    pub async fn run<F>(
        &mut self,
        tick: Duration,
        shutdown: CancellationToken,
        mut on_fix: F,
    ) -> SimulationOutcome
    where
        F: FnMut(LngLat),
    {
        let mut ticker = tokio::time::interval(tick);
        // First tick completes immediately
        ticker.tick().await;

        loop {
            if self.has_arrived() {
                tracing::debug!(position = %self.position, "simulated walker arrived");
                return SimulationOutcome::Arrived;
            }

            tokio::select! {
                _ = shutdown.cancelled() => return SimulationOutcome::Cancelled,
                _ = ticker.tick() => {
                    let fix = self.step(tick);
                    on_fix(fix);
                }
            }
        }
    }
}

impl LocationSource for WalkSimulator {
    fn current_location(&self) -> Option<LngLat> {
        Some(self.position)
    }

    fn name(&self) -> &str {
        "simulator"
    }
}
