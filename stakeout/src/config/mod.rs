//! Performance configuration shared across update consumers.
//!
//! Settings are addressed by dotted paths (`gps.updateInterval`,
//! `layers.batchInterval`, ...) so UI code can read and write them as a
//! key-value store, while Rust callers use the typed [`PerformanceConfig`]
//! fields directly.
//!
//! [`SharedPerformanceConfig`] is the runtime handle. Every change is
//! broadcast on a watch channel; throttles read their interval from it at
//! each scheduling decision, so a change takes effect with the next
//! decision rather than retroactively.
//!
//! # Example
//!
//! ```
//! use stakeout::config::{DataClass, SharedPerformanceConfig};
//! use std::time::Duration;
//!
//! let config = SharedPerformanceConfig::default();
//! assert_eq!(config.interval_for(DataClass::GpsPosition), Duration::from_millis(1000));
//!
//! config.set("gps.updateInterval", "2000").unwrap();
//! assert_eq!(config.interval_for(DataClass::GpsPosition), Duration::from_secs(2));
//! ```

mod battery;

pub use battery::{BatteryAdaptiveRates, BatteryStatus, RateTier};

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;

use crate::geo::DEFAULT_GUIDE_LINE_MAX_M;

// ==================== Defaults ====================

/// Default GPS position update interval (1 Hz).
pub const DEFAULT_GPS_UPDATE_INTERVAL_MS: u64 = 1000;

/// Default interval for batched layer operations.
pub const DEFAULT_LAYER_BATCH_INTERVAL_MS: u64 = 100;

/// Default display time for informational alerts.
pub const DEFAULT_ALERT_DURATION_MS: u64 = 3000;

/// Upper bound accepted for any interval or duration setting.
pub const MAX_INTERVAL_MS: u64 = 60_000;

/// Classes of rate-limited data, each with its own interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataClass {
    /// Device or simulated position fixes.
    GpsPosition,
    /// Map layer add/remove/update batches.
    LayerBatch,
}

impl DataClass {
    /// Configuration key holding this class's interval.
    pub fn key(&self) -> ConfigKey {
        match self {
            DataClass::GpsPosition => ConfigKey::GpsUpdateInterval,
            DataClass::LayerBatch => ConfigKey::LayerBatchInterval,
        }
    }
}

/// Addressable configuration settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    GpsUpdateInterval,
    LayerBatchInterval,
    GuideLineMaxMeters,
    AlertDuration,
    BatteryAdaptive,
}

impl ConfigKey {
    /// All known keys.
    pub const ALL: [ConfigKey; 5] = [
        ConfigKey::GpsUpdateInterval,
        ConfigKey::LayerBatchInterval,
        ConfigKey::GuideLineMaxMeters,
        ConfigKey::AlertDuration,
        ConfigKey::BatteryAdaptive,
    ];

    /// Dotted path used by key-value callers.
    pub fn path(&self) -> &'static str {
        match self {
            ConfigKey::GpsUpdateInterval => "gps.updateInterval",
            ConfigKey::LayerBatchInterval => "layers.batchInterval",
            ConfigKey::GuideLineMaxMeters => "stakeout.guideLineMaxMeters",
            ConfigKey::AlertDuration => "alerts.durationMs",
            ConfigKey::BatteryAdaptive => "battery.adaptive",
        }
    }

    /// Look up a key by its dotted path.
    pub fn from_path(path: &str) -> Result<Self, ConfigError> {
        Self::ALL
            .into_iter()
            .find(|k| k.path() == path)
            .ok_or_else(|| ConfigError::UnknownKey(path.to_string()))
    }

    /// Parse and validate a raw string value for this key.
    pub fn parse_value(&self, raw: &str) -> Result<ConfigValue, ConfigError> {
        let raw = raw.trim();
        let invalid = |reason: &str| ConfigError::InvalidValue {
            key: self.path().to_string(),
            value: raw.to_string(),
            reason: reason.to_string(),
        };

        let value = match self {
            ConfigKey::GpsUpdateInterval
            | ConfigKey::LayerBatchInterval
            | ConfigKey::AlertDuration => {
                let ms: u64 = raw
                    .parse()
                    .map_err(|_| invalid("expected whole milliseconds"))?;
                ConfigValue::Millis(ms)
            }
            ConfigKey::GuideLineMaxMeters => {
                let m: f64 = raw.parse().map_err(|_| invalid("expected meters"))?;
                ConfigValue::Meters(m)
            }
            ConfigKey::BatteryAdaptive => match raw.to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => ConfigValue::Flag(true),
                "false" | "no" | "off" | "0" => ConfigValue::Flag(false),
                _ => return Err(invalid("expected true or false")),
            },
        };

        self.validate(value)?;
        Ok(value)
    }

    fn validate(&self, value: ConfigValue) -> Result<(), ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidValue {
            key: self.path().to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        };

        match (self, value) {
            (
                ConfigKey::GpsUpdateInterval
                | ConfigKey::LayerBatchInterval
                | ConfigKey::AlertDuration,
                ConfigValue::Millis(ms),
            ) => {
                if ms == 0 || ms > MAX_INTERVAL_MS {
                    return Err(invalid("must be between 1 and 60000 ms"));
                }
            }
            (ConfigKey::GuideLineMaxMeters, ConfigValue::Meters(m)) => {
                if !m.is_finite() || m <= 0.0 {
                    return Err(invalid("must be a positive distance"));
                }
            }
            (ConfigKey::BatteryAdaptive, ConfigValue::Flag(_)) => {}
            _ => return Err(invalid("wrong value type for key")),
        }
        Ok(())
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path())
    }
}

/// A typed configuration value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigValue {
    Millis(u64),
    Meters(f64),
    Flag(bool),
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Millis(ms) => write!(f, "{}", ms),
            ConfigValue::Meters(m) => write!(f, "{}", m),
            ConfigValue::Flag(b) => write!(f, "{}", b),
        }
    }
}

/// Errors from reading or changing configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No setting exists at this path.
    #[error("unknown configuration key: {0}")]
    UnknownKey(String),

    /// The value could not be parsed or is out of range.
    #[error("invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    /// The configuration file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid INI.
    #[error("failed to parse configuration: {0}")]
    Parse(String),
}

/// Typed performance settings.
#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceConfig {
    /// Minimum spacing between GPS-driven UI updates.
    pub gps_update_interval: Duration,

    /// Minimum spacing between layer batch flushes.
    pub layer_batch_interval: Duration,

    /// Cap on the drawn guide line toward a distant target, in meters.
    pub guide_line_max_m: f64,

    /// Display time for informational alerts.
    pub alert_duration: Duration,

    /// Whether battery level may override the GPS interval.
    pub battery_adaptive: bool,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            gps_update_interval: Duration::from_millis(DEFAULT_GPS_UPDATE_INTERVAL_MS),
            layer_batch_interval: Duration::from_millis(DEFAULT_LAYER_BATCH_INTERVAL_MS),
            guide_line_max_m: DEFAULT_GUIDE_LINE_MAX_M,
            alert_duration: Duration::from_millis(DEFAULT_ALERT_DURATION_MS),
            battery_adaptive: true,
        }
    }
}

impl PerformanceConfig {
    /// Interval for a data class.
    pub fn interval_for(&self, class: DataClass) -> Duration {
        match class {
            DataClass::GpsPosition => self.gps_update_interval,
            DataClass::LayerBatch => self.layer_batch_interval,
        }
    }

    /// Read a setting.
    pub fn get(&self, key: ConfigKey) -> ConfigValue {
        match key {
            ConfigKey::GpsUpdateInterval => ConfigValue::Millis(as_millis(self.gps_update_interval)),
            ConfigKey::LayerBatchInterval => {
                ConfigValue::Millis(as_millis(self.layer_batch_interval))
            }
            ConfigKey::GuideLineMaxMeters => ConfigValue::Meters(self.guide_line_max_m),
            ConfigKey::AlertDuration => ConfigValue::Millis(as_millis(self.alert_duration)),
            ConfigKey::BatteryAdaptive => ConfigValue::Flag(self.battery_adaptive),
        }
    }

    /// Write a validated setting. Returns whether the value changed.
    pub fn apply(&mut self, key: ConfigKey, value: ConfigValue) -> Result<bool, ConfigError> {
        key.validate(value)?;
        if self.get(key) == value {
            return Ok(false);
        }

        match (key, value) {
            (ConfigKey::GpsUpdateInterval, ConfigValue::Millis(ms)) => {
                self.gps_update_interval = Duration::from_millis(ms)
            }
            (ConfigKey::LayerBatchInterval, ConfigValue::Millis(ms)) => {
                self.layer_batch_interval = Duration::from_millis(ms)
            }
            (ConfigKey::AlertDuration, ConfigValue::Millis(ms)) => {
                self.alert_duration = Duration::from_millis(ms)
            }
            (ConfigKey::GuideLineMaxMeters, ConfigValue::Meters(m)) => self.guide_line_max_m = m,
            (ConfigKey::BatteryAdaptive, ConfigValue::Flag(b)) => self.battery_adaptive = b,
            // validate() rejects mismatched pairs
            _ => return Ok(false),
        }
        Ok(true)
    }

    /// Parse INI text on top of the defaults.
    ///
    /// ```ini
    /// [gps]
    /// update_interval_ms = 1000
    ///
    /// [layers]
    /// batch_interval_ms = 100
    ///
    /// [stakeout]
    /// guide_line_max_m = 500
    ///
    /// [alerts]
    /// duration_ms = 3000
    ///
    /// [battery]
    /// adaptive = true
    /// ```
    ///
    /// Unknown sections and keys are ignored; invalid values are errors.
    pub fn from_ini_str(text: &str) -> Result<Self, ConfigError> {
        let ini = ini::Ini::load_from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        let mut config = Self::default();

        for (section, name, key) in INI_KEYS {
            let Some(raw) = ini.section(Some(*section)).and_then(|s| s.get(*name)) else {
                continue;
            };
            let value = key.parse_value(raw)?;
            config.apply(*key, value)?;
        }

        Ok(config)
    }

    /// Load configuration from an INI file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ini_str(&text)
    }

    /// Load from `path`, or from [`default_config_path`] when `None`.
    ///
    /// A missing default file yields the defaults; an explicitly named file
    /// must exist.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::load(path);
        }

        match default_config_path() {
            Some(path) if path.is_file() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }
}

/// Per-user configuration file, `~/.stakeout/config.ini`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".stakeout").join("config.ini"))
}

/// INI (section, key) locations for each setting.
const INI_KEYS: &[(&str, &str, ConfigKey)] = &[
    ("gps", "update_interval_ms", ConfigKey::GpsUpdateInterval),
    ("layers", "batch_interval_ms", ConfigKey::LayerBatchInterval),
    ("stakeout", "guide_line_max_m", ConfigKey::GuideLineMaxMeters),
    ("alerts", "duration_ms", ConfigKey::AlertDuration),
    ("battery", "adaptive", ConfigKey::BatteryAdaptive),
];

fn as_millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Clonable runtime handle to the performance configuration.
///
/// All clones share one value. Readers get a consistent snapshot; writers
/// notify every subscriber.
#[derive(Debug, Clone)]
pub struct SharedPerformanceConfig {
    tx: Arc<watch::Sender<PerformanceConfig>>,
}

impl Default for SharedPerformanceConfig {
    fn default() -> Self {
        Self::new(PerformanceConfig::default())
    }
}

impl SharedPerformanceConfig {
    /// Wrap a configuration for sharing.
    pub fn new(config: PerformanceConfig) -> Self {
        let (tx, _rx) = watch::channel(config);
        Self { tx: Arc::new(tx) }
    }

    /// Copy of the current configuration.
    pub fn snapshot(&self) -> PerformanceConfig {
        self.tx.borrow().clone()
    }

    /// Current interval for a data class.
    pub fn interval_for(&self, class: DataClass) -> Duration {
        self.tx.borrow().interval_for(class)
    }

    /// Current guide line cap in meters.
    pub fn guide_line_max_m(&self) -> f64 {
        self.tx.borrow().guide_line_max_m
    }

    /// Current informational alert duration.
    pub fn alert_duration(&self) -> Duration {
        self.tx.borrow().alert_duration
    }

    /// Whether battery-adaptive rates are enabled.
    pub fn battery_adaptive(&self) -> bool {
        self.tx.borrow().battery_adaptive
    }

    /// Read a setting by dotted path.
    pub fn get(&self, path: &str) -> Result<ConfigValue, ConfigError> {
        let key = ConfigKey::from_path(path)?;
        Ok(self.tx.borrow().get(key))
    }

    /// Parse and write a setting by dotted path.
    ///
    /// Returns the stored value. Subscribers are only notified if the value
    /// actually changed.
    pub fn set(&self, path: &str, raw: &str) -> Result<ConfigValue, ConfigError> {
        let key = ConfigKey::from_path(path)?;
        let value = key.parse_value(raw)?;
        self.set_value(key, value)?;
        Ok(value)
    }

    /// Write a typed setting. Returns whether the value changed.
    pub fn set_value(&self, key: ConfigKey, value: ConfigValue) -> Result<bool, ConfigError> {
        key.validate(value)?;

        let mut result = Ok(false);
        self.tx.send_if_modified(|config| {
            result = config.apply(key, value);
            matches!(result, Ok(true))
        });

        if matches!(result, Ok(true)) {
            tracing::debug!(key = %key, value = %value, "performance setting changed");
        }
        result
    }

    /// Replace the whole configuration.
    pub fn replace(&self, config: PerformanceConfig) {
        self.tx.send_if_modified(|current| {
            if *current == config {
                false
            } else {
                *current = config;
                true
            }
        });
    }

    /// Receive every subsequent change.
    pub fn subscribe(&self) -> watch::Receiver<PerformanceConfig> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = PerformanceConfig::default();
        assert_eq!(config.interval_for(DataClass::GpsPosition), Duration::from_millis(1000));
        assert_eq!(config.interval_for(DataClass::LayerBatch), Duration::from_millis(100));
        assert_eq!(config.guide_line_max_m, 500.0);
        assert_eq!(config.alert_duration, Duration::from_secs(3));
        assert!(config.battery_adaptive);
    }

    #[test]
    fn test_key_paths_roundtrip() {
        for key in ConfigKey::ALL {
            assert_eq!(ConfigKey::from_path(key.path()).unwrap(), key);
        }
        assert!(matches!(
            ConfigKey::from_path("gps.nope"),
            Err(ConfigError::UnknownKey(_))
        ));
    }

    #[test]
    fn test_data_class_keys() {
        assert_eq!(DataClass::GpsPosition.key().path(), "gps.updateInterval");
        assert_eq!(DataClass::LayerBatch.key().path(), "layers.batchInterval");
    }

    #[test]
    fn test_parse_value_validation() {
        let key = ConfigKey::GpsUpdateInterval;
        assert_eq!(key.parse_value(" 250 ").unwrap(), ConfigValue::Millis(250));
        assert!(key.parse_value("0").is_err());
        assert!(key.parse_value("60001").is_err());
        assert!(key.parse_value("fast").is_err());

        let meters = ConfigKey::GuideLineMaxMeters;
        assert_eq!(meters.parse_value("750.5").unwrap(), ConfigValue::Meters(750.5));
        assert!(meters.parse_value("-1").is_err());
        assert!(meters.parse_value("NaN").is_err());

        let flag = ConfigKey::BatteryAdaptive;
        assert_eq!(flag.parse_value("off").unwrap(), ConfigValue::Flag(false));
        assert!(flag.parse_value("maybe").is_err());
    }

    #[test]
    fn test_apply_rejects_mismatched_type() {
        let mut config = PerformanceConfig::default();
        let err = config
            .apply(ConfigKey::GpsUpdateInterval, ConfigValue::Flag(true))
            .unwrap_err();
        assert!(err.to_string().contains("gps.updateInterval"));
    }

    #[test]
    fn test_shared_set_and_get() {
        let shared = SharedPerformanceConfig::default();
        shared.set("layers.batchInterval", "250").unwrap();

        assert_eq!(shared.get("layers.batchInterval").unwrap(), ConfigValue::Millis(250));
        assert_eq!(shared.interval_for(DataClass::LayerBatch), Duration::from_millis(250));
        // Clones share state
        let clone = shared.clone();
        clone.set("gps.updateInterval", "5000").unwrap();
        assert_eq!(shared.interval_for(DataClass::GpsPosition), Duration::from_secs(5));
    }

    #[test]
    fn test_subscribers_see_changes_only() {
        let shared = SharedPerformanceConfig::default();
        let mut rx = shared.subscribe();
        assert!(!rx.has_changed().unwrap());

        // Same value: no notification
        assert!(!shared.set_value(ConfigKey::GpsUpdateInterval, ConfigValue::Millis(1000)).unwrap());
        assert!(!rx.has_changed().unwrap());

        assert!(shared.set_value(ConfigKey::GpsUpdateInterval, ConfigValue::Millis(2000)).unwrap());
        assert!(rx.has_changed().unwrap());
        assert_eq!(
            rx.borrow_and_update().gps_update_interval,
            Duration::from_millis(2000)
        );
    }

    #[test]
    fn test_invalid_set_leaves_value() {
        let shared = SharedPerformanceConfig::default();
        assert!(shared.set("gps.updateInterval", "0").is_err());
        assert_eq!(shared.interval_for(DataClass::GpsPosition), Duration::from_millis(1000));
    }

    #[test]
    fn test_from_ini_str() {
        let config = PerformanceConfig::from_ini_str(
            "[gps]\nupdate_interval_ms = 2000\n\n[stakeout]\nguide_line_max_m = 250\n\n[battery]\nadaptive = false\n\n[unrelated]\nfoo = bar\n",
        )
        .unwrap();

        assert_eq!(config.gps_update_interval, Duration::from_secs(2));
        assert_eq!(config.layer_batch_interval, Duration::from_millis(100));
        assert_eq!(config.guide_line_max_m, 250.0);
        assert!(!config.battery_adaptive);
    }

    #[test]
    fn test_from_ini_str_invalid_value() {
        let err = PerformanceConfig::from_ini_str("[layers]\nbatch_interval_ms = soon\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "layers.batchInterval"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[alerts]\nduration_ms = 4500").unwrap();

        let config = PerformanceConfig::load(file.path()).unwrap();
        assert_eq!(config.alert_duration, Duration::from_millis(4500));
    }

    #[test]
    fn test_load_missing_file() {
        let err = PerformanceConfig::load(Path::new("/nonexistent/stakeout.ini")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_load_or_default_requires_explicit_file() {
        let err = PerformanceConfig::load_or_default(Some(Path::new("/nonexistent/stakeout.ini")))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_default_config_path_location() {
        if let Some(path) = default_config_path() {
            assert!(path.ends_with(".stakeout/config.ini"));
        }
    }

    #[test]
    fn test_replace_notifies() {
        let shared = SharedPerformanceConfig::default();
        let mut rx = shared.subscribe();

        shared.replace(PerformanceConfig::default());
        assert!(!rx.has_changed().unwrap());

        shared.replace(PerformanceConfig {
            guide_line_max_m: 100.0,
            ..Default::default()
        });
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().guide_line_max_m, 100.0);
    }
}
