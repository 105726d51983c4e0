//! Battery-adaptive GPS update rates.
//!
//! A plain lookup table from battery level to GPS update interval. The
//! chosen interval is written into the shared configuration, from where
//! throttles pick it up at their next scheduling decision.

use std::time::Duration;

use super::{ConfigKey, ConfigValue, SharedPerformanceConfig};

/// Interval used while charging, regardless of level.
const CHARGING_INTERVAL: Duration = Duration::from_millis(1000);

/// Snapshot of the device battery.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatteryStatus {
    /// Charge level from 0.0 (empty) to 1.0 (full).
    pub level: f32,
    /// Whether the device is on external power.
    pub charging: bool,
}

impl BatteryStatus {
    /// Create a status, clamping `level` into `0.0..=1.0`.
    pub fn new(level: f32, charging: bool) -> Self {
        let level = if level.is_nan() {
            0.0
        } else {
            level.clamp(0.0, 1.0)
        };
        Self { level, charging }
    }
}

/// One row of the rate table: applies when the level is strictly above
/// `min_level`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateTier {
    /// Level that must be exceeded for this tier to apply.
    pub min_level: f32,
    /// GPS update interval for this tier.
    pub interval: Duration,
}

/// Lookup table mapping battery state to GPS update interval.
#[derive(Debug, Clone)]
pub struct BatteryAdaptiveRates {
    /// Tiers ordered from highest `min_level` to lowest.
    tiers: Vec<RateTier>,
    /// Interval when no tier matches (critically low battery).
    critical: Duration,
}

impl Default for BatteryAdaptiveRates {
    fn default() -> Self {
        Self::new(
            vec![
                RateTier {
                    min_level: 0.5,
                    interval: Duration::from_millis(1000),
                },
                RateTier {
                    min_level: 0.2,
                    interval: Duration::from_millis(2000),
                },
                RateTier {
                    min_level: 0.1,
                    interval: Duration::from_millis(5000),
                },
            ],
            Duration::from_millis(10_000),
        )
    }
}

impl BatteryAdaptiveRates {
    /// Build a table. Tiers are sorted by descending `min_level`.
    pub fn new(mut tiers: Vec<RateTier>, critical: Duration) -> Self {
        tiers.sort_by(|a, b| b.min_level.total_cmp(&a.min_level));
        Self { tiers, critical }
    }

    /// Interval for the given battery state.
    pub fn interval_for(&self, status: BatteryStatus) -> Duration {
        if status.charging {
            return CHARGING_INTERVAL;
        }
        self.tiers
            .iter()
            .find(|tier| status.level > tier.min_level)
            .map(|tier| tier.interval)
            .unwrap_or(self.critical)
    }

    /// Write the interval for `status` into `config`.
    ///
    /// Does nothing when battery adaptation is disabled. Returns the new
    /// interval if the stored value changed.
    pub fn apply(&self, status: BatteryStatus, config: &SharedPerformanceConfig) -> Option<Duration> {
        if !config.battery_adaptive() {
            return None;
        }

        let interval = self.interval_for(status);
        let ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);

        match config.set_value(ConfigKey::GpsUpdateInterval, ConfigValue::Millis(ms)) {
            Ok(true) => {
                tracing::info!(
                    level = status.level,
                    charging = status.charging,
                    interval_ms = ms,
                    "battery state changed GPS update interval"
                );
                Some(interval)
            }
            Ok(false) => None,
            Err(e) => {
                tracing::warn!(error = %e, "battery rate table produced an invalid interval");
                None
            }
        }
    }
}
