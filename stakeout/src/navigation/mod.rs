//! Stakeout navigation.
//!
//! Guides the user from the current location to the nearest point of a
//! selected target feature. A [`NavigationController`] holds at most one
//! [`NavigationSession`]; every accepted location fix recomputes the nearest
//! point, distance and bearing and pushes a [`NavigationUpdate`] through a
//! [`Throttle`](crate::throttle::Throttle) toward the UI.
//!
//! # Failure handling
//!
//! Nothing here panics or propagates errors across the UI boundary:
//!
//! | Situation | Result |
//! |-----------|--------|
//! | No feature selected | `false` + warning alert |
//! | Unsupported geometry type | `false` + warning alert, no session |
//! | Malformed coordinates | session starts, updates silently dropped |
//! | No location available | fallback coordinate, logged at `warn` |
//!
//! # Example
//!
//! ```ignore
//! use stakeout::navigation::NavigationController;
//!
//! let mut nav = NavigationController::new(throttle, location, notifier, config);
//! if nav.activate_for_feature(Some(&feature), None) {
//!     nav.update_current_location(14.2231, 46.6264);
//! }
//! nav.stop();
//! ```

mod controller;
mod session;

pub use controller::{ActivationSummary, NavigationController};
pub use session::{NavigationSession, NavigationUpdate};

use thiserror::Error;

/// Why a feature could not be activated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActivationError {
    /// Activation was requested with nothing selected.
    #[error("no feature selected")]
    NoFeatureSelected,

    /// The feature's geometry type cannot be navigated to.
    #[error("unsupported geometry type: {0}")]
    UnsupportedGeometry(String),

    /// The feature carries no geometry at all.
    #[error("feature has no geometry")]
    MissingGeometry,
}
