//! Logging setup for binaries built on this crate.
//!
//! Installs a `tracing` subscriber that writes to stderr and, optionally, to
//! a log file through a non-blocking `tracing-appender` writer. The filter
//! comes from `RUST_LOG` when set, otherwise from the configured default.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "info";

/// Errors installing the subscriber.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log file path: {0}")]
    InvalidPath(PathBuf),

    #[error("failed to create log directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to install subscriber: {0}")]
    Init(String),
}

/// Where and how much to log.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Filter directives used when `RUST_LOG` is unset.
    pub default_filter: String,
    /// Optional file receiving a copy of every event, without ANSI colors.
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default_filter: DEFAULT_FILTER.to_string(),
            file: None,
        }
    }
}

impl LoggingConfig {
    /// Also log to `path`.
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Use `filter` when `RUST_LOG` is unset.
    pub fn with_default_filter(mut self, filter: impl Into<String>) -> Self {
        self.default_filter = filter.into();
        self
    }
}

/// Keeps the file writer flushing. Drop it only at shutdown.
#[must_use = "dropping the guard stops file logging"]
pub struct LoggingGuard {
    _file: Option<WorkerGuard>,
}

/// Install the global subscriber.
pub fn init_logging(config: &LoggingConfig) -> Result<LoggingGuard, LoggingError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.default_filter))
        .map_err(|e| LoggingError::Init(e.to_string()))?;

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_timer(LocalTime::rfc_3339())
        .with_target(false);

    let (file_layer, file_guard) = match &config.file {
        Some(path) => {
            let (dir, name) = split_log_path(path)?;
            std::fs::create_dir_all(&dir).map_err(|source| LoggingError::CreateDir {
                path: dir.clone(),
                source,
            })?;

            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_timer(LocalTime::rfc_3339())
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| LoggingError::Init(e.to_string()))?;

    Ok(LoggingGuard { _file: file_guard })
}

// Bare file names log into the working directory.
fn split_log_path(path: &Path) -> Result<(PathBuf, PathBuf), LoggingError> {
    let name = path
        .file_name()
        .ok_or_else(|| LoggingError::InvalidPath(path.to_path_buf()))?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    Ok((dir, PathBuf::from(name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_nested_path() {
        let (dir, name) = split_log_path(Path::new("/var/log/stakeout/run.log")).unwrap();
        assert_eq!(dir, PathBuf::from("/var/log/stakeout"));
        assert_eq!(name, PathBuf::from("run.log"));
    }

    #[test]
    fn test_split_bare_file_name() {
        let (dir, name) = split_log_path(Path::new("run.log")).unwrap();
        assert_eq!(dir, PathBuf::from("."));
        assert_eq!(name, PathBuf::from("run.log"));
    }

    #[test]
    fn test_split_rejects_directory_like_path() {
        assert!(matches!(
            split_log_path(Path::new("/")),
            Err(LoggingError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_config_builder() {
        let config = LoggingConfig::default()
            .with_default_filter("stakeout=debug")
            .with_file("out.log");
        assert_eq!(config.default_filter, "stakeout=debug");
        assert_eq!(config.file, Some(PathBuf::from("out.log")));
    }
}
