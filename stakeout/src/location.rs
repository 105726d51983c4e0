//! Sources of the device's current location.
//!
//! Navigation asks a single injected [`LocationSource`] where the user is.
//! Callers decide what stands behind it: a positioning module, a GPS
//! simulator, the last fix reported by a device bridge, or several of these
//! tried in order through a [`FallbackChain`].

use std::sync::Arc;

use parking_lot::RwLock;

use crate::geo::LngLat;

/// Location used when no source can provide one.
///
/// A fixed point near Klagenfurt, Austria.
pub const DEFAULT_FALLBACK_LOCATION: LngLat = LngLat::new(14.222929599999969, 46.62632869999987);

/// Provides the current location on demand.
pub trait LocationSource: Send + Sync {
    /// Current location, or `None` if this source has no fix.
    fn current_location(&self) -> Option<LngLat>;

    /// Short name for logs.
    fn name(&self) -> &str {
        "location"
    }
}

impl<S: LocationSource + ?Sized> LocationSource for Arc<S> {
    fn current_location(&self) -> Option<LngLat> {
        (**self).current_location()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// A source that never has a fix.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoLocation;

impl LocationSource for NoLocation {
    fn current_location(&self) -> Option<LngLat> {
        None
    }

    fn name(&self) -> &str {
        "none"
    }
}

/// A source that always reports the same location.
#[derive(Debug, Clone, Copy)]
pub struct FixedLocation(pub LngLat);

impl LocationSource for FixedLocation {
    fn current_location(&self) -> Option<LngLat> {
        Some(self.0)
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

/// Last known location, written by whatever receives device fixes.
///
/// Clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct SharedLocation {
    last: Arc<RwLock<Option<LngLat>>>,
}

impl SharedLocation {
    /// Create an empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new fix.
    pub fn set(&self, location: LngLat) {
        *self.last.write() = Some(location);
    }

    /// Forget the last fix.
    pub fn clear(&self) {
        *self.last.write() = None;
    }
}

impl LocationSource for SharedLocation {
    fn current_location(&self) -> Option<LngLat> {
        *self.last.read()
    }

    fn name(&self) -> &str {
        "shared"
    }
}

/// Tries sources in order; the first one with a fix wins.
#[derive(Default, Clone)]
pub struct FallbackChain {
    sources: Vec<Arc<dyn LocationSource>>,
}

impl std::fmt::Debug for FallbackChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.sources.iter().map(|s| s.name().to_string()))
            .finish()
    }
}

impl FallbackChain {
    /// Create an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a source with lower priority than those already added.
    pub fn then(mut self, source: impl LocationSource + 'static) -> Self {
        self.sources.push(Arc::new(source));
        self
    }

    /// Number of sources in the chain.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Whether the chain has no sources.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl LocationSource for FallbackChain {
    fn current_location(&self) -> Option<LngLat> {
        self.sources.iter().find_map(|source| {
            let location = source.current_location();
            if location.is_some() {
                tracing::trace!(source = source.name(), "location resolved");
            }
            location
        })
    }

    fn name(&self) -> &str {
        "chain"
    }
}

/// Location from `source`, or [`DEFAULT_FALLBACK_LOCATION`] if it has none.
pub fn resolve_or_fallback(source: &dyn LocationSource) -> LngLat {
    source.current_location().unwrap_or_else(|| {
        tracing::warn!(
            source = source.name(),
            fallback = %DEFAULT_FALLBACK_LOCATION,
            "no location available, using fallback coordinate"
        );
        DEFAULT_FALLBACK_LOCATION
    })
}
