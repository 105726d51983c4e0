//! Tokio-driven throttle.
//!
//! [`Throttle`] owns a [`ThrottleCore`] behind a mutex and arms a
//! `tokio::time::sleep` task whenever the core asks for a timer. Each armed
//! timer carries a generation number; flushing, cancelling or re-arming bumps
//! the generation, so a timer that fires late is ignored instead of
//! delivering twice.
//!
//! Deliveries are serialized by a separate delivery lock, held from the
//! moment an update leaves the core until the sink returns. Once `flush`,
//! `cancel` or `reset` returns, no update taken before the call is still
//! on its way to the sink.

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::{Mutex, ReentrantMutex};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::machine::{SubmitOutcome, ThrottleCore, ThrottleState, ThrottleStats, TimerOutcome};
use super::{IntervalSource, ThrottleError, UpdateSink};

struct Inner<T> {
    core: ThrottleCore<T>,
    timer: Option<JoinHandle<()>>,
    generation: u64,
}

impl<T> Inner<T> {
    fn disarm(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

struct Shared<T> {
    name: &'static str,
    inner: Mutex<Inner<T>>,
    // Always taken before `inner`. Reentrant so a sink may submit.
    delivery: ReentrantMutex<()>,
    sink: Arc<dyn UpdateSink<T>>,
    interval: IntervalSource,
    runtime: Handle,
}

impl<T> Drop for Shared<T> {
    fn drop(&mut self) {
        self.inner.get_mut().disarm();
    }
}

/// Rate-limits a stream of updates into a sink.
///
/// Cloning yields another handle to the same throttle.
///
/// # Example
///
/// ```no_run
/// use stakeout::throttle::{IntervalSource, Throttle};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # async fn demo() {
/// let throttle = Throttle::<(f64, f64)>::new(
///     "gps",
///     IntervalSource::Fixed(Duration::from_millis(1000)),
///     Arc::new(|fix: (f64, f64)| println!("fix {:?}", fix)),
/// )
/// .unwrap();
///
/// throttle.submit((14.22, 46.62)); // delivered now
/// throttle.submit((14.23, 46.62)); // held, delivered after the interval
/// throttle.flush();                // or delivered right away
/// # }
/// ```
pub struct Throttle<T: Send + 'static> {
    shared: Arc<Shared<T>>,
}

impl<T: Send + 'static> Clone for Throttle<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Send + 'static> std::fmt::Debug for Throttle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.shared.inner.lock();
        f.debug_struct("Throttle")
            .field("name", &self.shared.name)
            .field("state", &inner.core.state())
            .field("pending", &inner.core.has_pending())
            .field("stats", &inner.core.stats())
            .finish_non_exhaustive()
    }
}

impl<T: Send + 'static> Throttle<T> {
    /// Create a throttle on the current tokio runtime.
    ///
    /// `name` only appears in logs.
    pub fn new(
        name: &'static str,
        interval: IntervalSource,
        sink: Arc<dyn UpdateSink<T>>,
    ) -> Result<Self, ThrottleError> {
        let runtime = Handle::try_current().map_err(|_| ThrottleError::NoRuntime)?;
        Ok(Self::with_runtime(runtime, name, interval, sink))
    }

    /// Create a throttle whose timers run on `runtime`.
    pub fn with_runtime(
        runtime: Handle,
        name: &'static str,
        interval: IntervalSource,
        sink: Arc<dyn UpdateSink<T>>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                name,
                inner: Mutex::new(Inner {
                    core: ThrottleCore::new(),
                    timer: None,
                    generation: 0,
                }),
                delivery: ReentrantMutex::new(()),
                sink,
                interval,
                runtime,
            }),
        }
    }

    /// Offer an update.
    ///
    /// Delivered synchronously if the cooling window has elapsed, otherwise
    /// parked (replacing any older pending update) until the window ends.
    pub fn submit(&self, update: T) {
        let interval = self.shared.interval.current();
        let now = Instant::now().into_std();

        let _delivering = self.shared.delivery.lock();
        let deliver = {
            let mut inner = self.shared.inner.lock();
            match inner.core.submit(update, now, interval) {
                SubmitOutcome::Deliver { update, rearm_in } => {
                    self.arm(&mut inner, rearm_in);
                    Some(update)
                }
                SubmitOutcome::Queued { replaced, flush_in } => {
                    tracing::trace!(
                        throttle = self.shared.name,
                        replaced,
                        flush_in_ms = flush_in.as_millis() as u64,
                        "update held"
                    );
                    self.arm(&mut inner, flush_in);
                    None
                }
            }
        };

        if let Some(update) = deliver {
            self.shared.sink.deliver(update);
        }
    }

    /// Deliver any pending update now and disarm the timer.
    ///
    /// Returns whether an update was delivered.
    pub fn flush(&self) -> bool {
        let now = Instant::now().into_std();
        let _delivering = self.shared.delivery.lock();
        let pending = {
            let mut inner = self.shared.inner.lock();
            inner.disarm();
            inner.core.flush(now)
        };

        match pending {
            Some(update) => {
                tracing::debug!(throttle = self.shared.name, "flushed pending update");
                self.shared.sink.deliver(update);
                true
            }
            None => false,
        }
    }

    /// Discard any pending update and disarm the timer.
    ///
    /// Returns whether an update was discarded.
    pub fn cancel(&self) -> bool {
        let _delivering = self.shared.delivery.lock();
        let mut inner = self.shared.inner.lock();
        inner.disarm();
        inner.core.cancel()
    }

    /// Cancel and forget the cooling window so the next update is immediate.
    pub fn reset(&self) {
        let _delivering = self.shared.delivery.lock();
        let mut inner = self.shared.inner.lock();
        inner.disarm();
        inner.core.reset();
    }

    /// Current state.
    pub fn state(&self) -> ThrottleState {
        self.shared.inner.lock().core.state()
    }

    /// Whether an update is waiting for delivery.
    pub fn has_pending(&self) -> bool {
        self.shared.inner.lock().core.has_pending()
    }

    /// Whether a timer task is armed.
    pub fn timer_armed(&self) -> bool {
        self.shared
            .inner
            .lock()
            .timer
            .as_ref()
            .is_some_and(|t| !t.is_finished())
    }

    /// Counters since creation.
    pub fn stats(&self) -> ThrottleStats {
        self.shared.inner.lock().core.stats()
    }

    /// The interval the next scheduling decision would use.
    pub fn interval(&self) -> Duration {
        self.shared.interval.current()
    }

    fn arm(&self, inner: &mut Inner<T>, delay: Duration) {
        inner.disarm();
        let generation = inner.generation;
        let weak: Weak<Shared<T>> = Arc::downgrade(&self.shared);

        inner.timer = Some(self.shared.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(shared) = weak.upgrade() {
                Throttle { shared }.on_timer(generation);
            }
        }));
    }

    fn on_timer(&self, generation: u64) {
        let interval = self.shared.interval.current();
        let now = Instant::now().into_std();

        let _delivering = self.shared.delivery.lock();
        let deliver = {
            let mut inner = self.shared.inner.lock();
            if inner.generation != generation {
                return;
            }
            // This task is the armed timer; it is finishing, not aborted
            inner.timer = None;

            match inner.core.on_timer(now, interval) {
                TimerOutcome::Deliver { update, rearm_in } => {
                    self.arm(&mut inner, rearm_in);
                    Some(update)
                }
                TimerOutcome::Wait { wait } => {
                    self.arm(&mut inner, wait);
                    None
                }
                TimerOutcome::Idle => None,
            }
        };

        if let Some(update) = deliver {
            tracing::trace!(throttle = self.shared.name, "delivered deferred update");
            self.shared.sink.deliver(update);
        }
    }
}
