//! StakeOut - navigate to a selected map feature
//!
//! This library guides a user from their current location to the nearest
//! point of a target feature (point, line or polygon), rate-limits the
//! resulting stream of navigation updates before it reaches the UI, and
//! raises transient notifications for session events.
//!
//! # Modules
//!
//! - [`geo`] - distance, bearing and nearest-point math; GeoJSON-like features
//! - [`navigation`] - the session controller
//! - [`throttle`] - last-write-wins update throttling
//! - [`config`] - shared performance settings and battery-adaptive rates
//! - [`location`] - injected location sources
//! - [`alerts`] - user notifications
//! - [`simulator`] - simulated walking GPS
//! - [`logging`] - subscriber setup for binaries

pub mod alerts;
pub mod config;
pub mod geo;
pub mod location;
pub mod logging;
pub mod navigation;
pub mod simulator;
pub mod throttle;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
