//! StakeOut CLI - simulated-GPS harness
//!
//! Drives the StakeOut navigation library end to end without a device:
//! a simulated walker feeds location fixes into the navigation controller,
//! and every throttled update is printed as it would reach the UI.

mod commands;
mod error;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use stakeout::logging::{init_logging, LoggingConfig};

use commands::config::ConfigCommands;
use commands::simulate::SimulateArgs;

#[derive(Debug, Parser)]
#[command(name = "stakeout", version, about = "Navigate to a map feature with simulated GPS")]
struct Cli {
    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Walk a simulated GPS toward a target feature
    Simulate(SimulateArgs),

    /// Inspect performance configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() {
    let cli = Cli::parse();

    let mut logging = LoggingConfig::default();
    if cli.verbose {
        logging = logging.with_default_filter("debug");
    }
    if let Some(path) = &cli.log_file {
        logging = logging.with_file(path);
    }

    // Keep the guard alive so the file writer flushes on exit
    let guard = match init_logging(&logging) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Warning: {}", e);
            None
        }
    };

    let result = match cli.command {
        Commands::Simulate(args) => commands::simulate::run(args),
        Commands::Config { command } => commands::config::run(command),
    };

    if let Err(e) = result {
        tracing::debug!(error = ?e, "command failed");
        eprintln!("Error: {}", e);
        drop(guard);
        std::process::exit(1);
    }
}
