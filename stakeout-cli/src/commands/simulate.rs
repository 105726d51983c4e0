//! Simulate command - walk a simulated GPS toward a target feature.
//!
//! Every fix goes through the same controller and throttle an app would
//! use; each update that makes it through the throttle is printed.

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use tokio_util::sync::CancellationToken;

use stakeout::alerts::TracingNotifier;
use stakeout::config::{
    BatteryAdaptiveRates, BatteryStatus, DataClass, PerformanceConfig, SharedPerformanceConfig,
};
use stakeout::geo::{Feature, LngLat};
use stakeout::location::DEFAULT_FALLBACK_LOCATION;
use stakeout::navigation::{NavigationController, NavigationUpdate};
use stakeout::simulator::{SimulationOutcome, WalkSimulator, DEFAULT_WALK_SPEED_MPS};
use stakeout::throttle::{IntervalSource, Throttle};

use crate::error::CliError;

/// Arguments for the simulate command.
#[derive(Debug, Args)]
pub struct SimulateArgs {
    /// GeoJSON feature or geometry file, or '-' for stdin
    #[arg(long)]
    pub target: String,

    /// Start position as "lng,lat" (defaults to the fallback location)
    #[arg(long, value_parser = parse_lng_lat, allow_hyphen_values = true)]
    pub start: Option<LngLat>,

    /// Walking speed in meters per second
    #[arg(long, default_value_t = DEFAULT_WALK_SPEED_MPS)]
    pub speed: f64,

    /// Simulated GPS fix interval in milliseconds
    #[arg(long, default_value_t = 200)]
    pub tick_ms: u64,

    /// Performance configuration file (INI)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Battery level between 0.0 and 1.0, for adaptive GPS rates
    #[arg(long)]
    pub battery: Option<f32>,

    /// Treat the battery as charging
    #[arg(long)]
    pub charging: bool,

    /// Print updates as JSON lines
    #[arg(long)]
    pub json: bool,
}

/// Run the simulate command.
pub fn run(args: SimulateArgs) -> Result<(), CliError> {
    if args.tick_ms == 0 {
        return Err(CliError::Usage("--tick-ms must be greater than 0".to_string()));
    }

    let feature = Feature::from_json(&read_target(&args.target)?)?;
    let config = SharedPerformanceConfig::new(PerformanceConfig::load_or_default(
        args.config.as_deref(),
    )?);

    if let Some(level) = args.battery {
        let status = BatteryStatus::new(level, args.charging);
        match BatteryAdaptiveRates::default().apply(status, &config) {
            Some(interval) => println!("Battery {:.0}%: GPS interval {:?}", status.level * 100.0, interval),
            None => println!(
                "Battery {:.0}%: GPS interval unchanged ({:?})",
                status.level * 100.0,
                config.interval_for(DataClass::GpsPosition)
            ),
        }
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;

    runtime.block_on(simulate(args, feature, config))
}

async fn simulate(
    args: SimulateArgs,
    feature: Feature,
    config: SharedPerformanceConfig,
) -> Result<(), CliError> {
    let start = args.start.unwrap_or(DEFAULT_FALLBACK_LOCATION);
    let tick = Duration::from_millis(args.tick_ms);
    let json = args.json;

    // Target is set once the controller knows the nearest point
    let mut walker = WalkSimulator::new(start, start).with_speed(args.speed);

    let throttle = Throttle::<NavigationUpdate>::new(
        "navigation",
        IntervalSource::from_config(config.clone(), DataClass::GpsPosition),
        Arc::new(move |update: NavigationUpdate| print_update(&update, json)),
    )?;

    let mut controller = NavigationController::new(
        throttle,
        Arc::new(walker.location_handle()),
        Arc::new(TracingNotifier),
        config.clone(),
    );

    let summary = controller.try_activate(Some(&feature), None)?;
    let nearest = summary
        .nearest_target_point
        .ok_or(CliError::DegenerateTarget)?;
    walker.retarget(nearest);

    println!("StakeOut Simulation v{}", stakeout::VERSION);
    println!("========================");
    println!();
    if let Some(name) = feature.property_str("name") {
        println!("Target:    {} ({})", name, summary.geometry_type);
    } else {
        println!("Target:    {}", summary.geometry_type);
    }
    println!("Start:     {}", start);
    println!("Nearest:   {}", nearest);
    println!("Distance:  {:.1} m", summary.direct_distance_m.unwrap_or_default());
    println!(
        "Speed:     {:.1} m/s, fix every {} ms, update every {:?}",
        args.speed,
        args.tick_ms,
        config.interval_for(DataClass::GpsPosition)
    );
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let shutdown = CancellationToken::new();
    let shutdown_handler = shutdown.clone();
    ctrlc::set_handler(move || {
        println!();
        println!("Received shutdown signal, stopping...");
        shutdown_handler.cancel();
    })
    .map_err(|e| CliError::SignalHandler(e.to_string()))?;

    let outcome = walker
        .run(tick, shutdown, |fix| {
            controller.update_current_location(fix.lng, fix.lat)
        })
        .await;

    controller.stop();
    let stats = controller.throttle().stats();
    controller.cleanup();

    println!();
    println!("Session Summary");
    println!("───────────────");
    match outcome {
        SimulationOutcome::Arrived => println!("  Result:    arrived at target"),
        SimulationOutcome::Cancelled => {
            println!("  Result:    stopped {:.1} m from target", walker.remaining_m())
        }
    }
    println!("  Fixes:     {}", stats.submitted);
    println!(
        "  Displayed: {} ({} immediate, {} deferred, {} flushed)",
        stats.delivered(),
        stats.delivered_immediately,
        stats.delivered_deferred,
        stats.flushed
    );
    println!("  Coalesced: {}", stats.dropped);

    Ok(())
}

fn print_update(update: &NavigationUpdate, json: bool) {
    if json {
        match serde_json::to_string(update) {
            Ok(line) => println!("{}", line),
            Err(e) => tracing::warn!(error = %e, "failed to encode update"),
        }
        return;
    }

    println!(
        "{:>9.1} m  bearing {:>5.1}°  at {}",
        update.direct_distance_m, update.bearing_deg, update.current_location
    );
}

fn read_target(target: &str) -> Result<String, CliError> {
    let read_err = |source| CliError::ReadTarget {
        path: target.to_string(),
        source,
    };

    if target == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .map_err(read_err)?;
        Ok(text)
    } else {
        std::fs::read_to_string(target).map_err(read_err)
    }
}

/// Parse "lng,lat" into a coordinate.
pub fn parse_lng_lat(s: &str) -> Result<LngLat, String> {
    let (lng, lat) = s
        .split_once(',')
        .ok_or_else(|| format!("expected \"lng,lat\", got '{}'", s))?;

    let lng: f64 = lng
        .trim()
        .parse()
        .map_err(|_| format!("invalid longitude '{}'", lng.trim()))?;
    let lat: f64 = lat
        .trim()
        .parse()
        .map_err(|_| format!("invalid latitude '{}'", lat.trim()))?;

    if !(-180.0..=180.0).contains(&lng) || !(-90.0..=90.0).contains(&lat) {
        return Err(format!("coordinate out of range: {},{}", lng, lat));
    }

    Ok(LngLat::new(lng, lat))
}
