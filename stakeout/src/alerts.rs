//! User-facing stakeout notifications.
//!
//! Pure presentation: each navigation event maps to one transient
//! [`Alert`]. Nothing here feeds back into navigation logic.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

/// Display time for warnings.
pub const WARNING_DURATION: Duration = Duration::from_secs(5);

/// Default display time for informational alerts.
pub const INFO_DURATION: Duration = Duration::from_secs(3);

/// How prominently an alert is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
}

impl Severity {
    /// Get a short description for display.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Navigation events that produce an alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlertKind {
    /// The selected feature's geometry type cannot be navigated to.
    UnsupportedFeature { geometry_type: String },
    /// Stakeout was requested with nothing selected.
    NoFeatureSelected,
    /// A session started.
    StakeOutStarted,
    /// A session ended.
    StakeOutStopped,
}

/// A transient, auto-dismissing notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub kind: AlertKind,
    pub severity: Severity,
    pub message: String,
    /// How long the toast stays visible.
    pub duration: Duration,
}

impl Alert {
    /// Override the display duration.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity, self.message)
    }
}

/// Alert for a geometry type stakeout does not support.
pub fn unsupported_feature(geometry_type: &str) -> Alert {
    Alert {
        kind: AlertKind::UnsupportedFeature {
            geometry_type: geometry_type.to_string(),
        },
        severity: Severity::Warning,
        message: format!(
            "Stakeout is not available for {} features. Select a point, line or polygon.",
            geometry_type
        ),
        duration: WARNING_DURATION,
    }
}

/// Alert for stakeout requested without a selected feature.
pub fn no_feature_selected() -> Alert {
    Alert {
        kind: AlertKind::NoFeatureSelected,
        severity: Severity::Warning,
        message: "Select a feature on the map to start stakeout.".to_string(),
        duration: WARNING_DURATION,
    }
}

/// Alert for a session that just started.
pub fn stakeout_started() -> Alert {
    Alert {
        kind: AlertKind::StakeOutStarted,
        severity: Severity::Info,
        message: "Stakeout started. Follow the arrow to the target.".to_string(),
        duration: INFO_DURATION,
    }
}

/// Alert for a session that just ended.
pub fn stakeout_stopped() -> Alert {
    Alert {
        kind: AlertKind::StakeOutStopped,
        severity: Severity::Info,
        message: "Stakeout stopped.".to_string(),
        duration: INFO_DURATION,
    }
}

/// Displays alerts, typically as a toast.
pub trait Notifier: Send + Sync {
    /// Show `alert`. Must not block.
    fn notify(&self, alert: Alert);
}

impl<N: Notifier + ?Sized> Notifier for Arc<N> {
    fn notify(&self, alert: Alert) {
        (**self).notify(alert)
    }
}

/// Notifier that writes alerts to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, alert: Alert) {
        match alert.severity {
            Severity::Warning => tracing::warn!(
                duration_ms = alert.duration.as_millis() as u64,
                "{}",
                alert.message
            ),
            Severity::Info => tracing::info!(
                duration_ms = alert.duration.as_millis() as u64,
                "{}",
                alert.message
            ),
        }
    }
}

/// Notifier that keeps every alert, for tests and harnesses.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    alerts: Mutex<Vec<Alert>>,
}

impl RecordingNotifier {
    /// Create an empty, shareable notifier.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Copy of every alert received.
    pub fn alerts(&self) -> Vec<Alert> {
        self.alerts.lock().clone()
    }

    /// Kinds of every alert received, in order.
    pub fn kinds(&self) -> Vec<AlertKind> {
        self.alerts.lock().iter().map(|a| a.kind.clone()).collect()
    }

    /// Forget everything received so far.
    pub fn clear(&self) {
        self.alerts.lock().clear();
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, alert: Alert) {
        self.alerts.lock().push(alert);
    }
}
