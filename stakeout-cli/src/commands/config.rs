//! Configuration CLI commands.
//!
//! Provides `config get`, `config list` and `config path` for inspecting the
//! performance settings the simulator would run with.

use std::path::PathBuf;

use clap::Subcommand;
use stakeout::config::{default_config_path, ConfigKey, PerformanceConfig};

use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Get a configuration value
    Get {
        /// Setting path (e.g., gps.updateInterval)
        key: String,

        /// Configuration file to read instead of the default
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// List all configuration settings
    List {
        /// Configuration file to read instead of the default
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Show the default configuration file path
    Path,
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands) -> Result<(), CliError> {
    match command {
        ConfigCommands::Get { key, config } => run_get(&key, config),
        ConfigCommands::List { config } => run_list(config),
        ConfigCommands::Path => run_path(),
    }
}

fn run_get(key: &str, path: Option<PathBuf>) -> Result<(), CliError> {
    let config_key = ConfigKey::from_path(key).map_err(|_| {
        CliError::Usage(format!(
            "Unknown configuration key '{}'. Use 'stakeout config list' to see available keys.",
            key
        ))
    })?;

    let config = PerformanceConfig::load_or_default(path.as_deref())?;
    println!("{}", config.get(config_key));
    Ok(())
}

fn run_list(path: Option<PathBuf>) -> Result<(), CliError> {
    let config = PerformanceConfig::load_or_default(path.as_deref())?;

    let width = ConfigKey::ALL
        .iter()
        .map(|k| k.path().len())
        .max()
        .unwrap_or(0);
    for key in ConfigKey::ALL {
        println!("{:<width$} = {}", key.path(), config.get(key), width = width);
    }
    Ok(())
}

fn run_path() -> Result<(), CliError> {
    match default_config_path() {
        Some(path) => {
            println!("{}", path.display());
            Ok(())
        }
        None => Err(CliError::Usage(
            "Could not determine home directory".to_string(),
        )),
    }
}
