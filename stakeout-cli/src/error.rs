//! CLI error type.

use std::fmt;

use stakeout::config::ConfigError;
use stakeout::geo::GeometryError;
use stakeout::navigation::ActivationError;
use stakeout::throttle::ThrottleError;

/// Errors surfaced to the user by CLI commands.
#[derive(Debug)]
pub enum CliError {
    /// Reading the target feature failed.
    ReadTarget { path: String, source: std::io::Error },
    /// The target is not a feature.
    Feature(GeometryError),
    /// The configuration file could not be loaded.
    Config(ConfigError),
    /// An unknown key or bad argument was given.
    Usage(String),
    /// Stakeout refused the target.
    Activation(ActivationError),
    /// The target has a supported type but no usable coordinates.
    DegenerateTarget,
    /// The async runtime could not be started.
    Runtime(std::io::Error),
    /// The throttle could not be created.
    Throttle(ThrottleError),
    /// Installing the Ctrl-C handler failed.
    SignalHandler(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::ReadTarget { path, source } => {
                write!(f, "Failed to read target '{}': {}", path, source)
            }
            CliError::Feature(e) => write!(f, "Invalid target feature: {}", e),
            CliError::Config(e) => write!(f, "Configuration error: {}", e),
            CliError::Usage(msg) => write!(f, "{}", msg),
            CliError::Activation(e) => write!(f, "Cannot start stakeout: {}", e),
            CliError::DegenerateTarget => {
                write!(f, "Target geometry has no usable coordinates")
            }
            CliError::Runtime(e) => write!(f, "Failed to start async runtime: {}", e),
            CliError::Throttle(e) => write!(f, "Failed to create update throttle: {}", e),
            CliError::SignalHandler(msg) => write!(f, "Failed to set signal handler: {}", msg),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::ReadTarget { source, .. } => Some(source),
            CliError::Feature(e) => Some(e),
            CliError::Config(e) => Some(e),
            CliError::Activation(e) => Some(e),
            CliError::Runtime(e) => Some(e),
            CliError::Throttle(e) => Some(e),
            CliError::Usage(_) | CliError::DegenerateTarget | CliError::SignalHandler(_) => None,
        }
    }
}

impl From<GeometryError> for CliError {
    fn from(e: GeometryError) -> Self {
        CliError::Feature(e)
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e)
    }
}

impl From<ActivationError> for CliError {
    fn from(e: ActivationError) -> Self {
        CliError::Activation(e)
    }
}

impl From<ThrottleError> for CliError {
    fn from(e: ThrottleError) -> Self {
        CliError::Throttle(e)
    }
}
