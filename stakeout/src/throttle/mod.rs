//! Update throttling.
//!
//! Device GPS can report several fixes per second; re-rendering the
//! navigation widget for each one is wasted work. A throttle coalesces the
//! stream so consumers see at most one update per interval, always the most
//! recent one.
//!
//! - [`ThrottleCore`] is the clock-free state machine.
//! - [`Throttle`] drives it with tokio timers and pushes into an [`UpdateSink`].
//! - [`IntervalSource`] decides the interval at each scheduling decision,
//!   either fixed or read from the shared performance configuration.

mod machine;
mod driver;

pub use machine::{SubmitOutcome, ThrottleCore, ThrottleState, ThrottleStats, TimerOutcome};
pub use driver::Throttle;

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;

use crate::config::{DataClass, SharedPerformanceConfig};

/// Errors constructing a throttle.
#[derive(Debug, Error)]
pub enum ThrottleError {
    /// `Throttle::new` was called outside a tokio runtime.
    #[error("no tokio runtime available for throttle timers")]
    NoRuntime,
}

/// Receives updates that made it through a throttle.
pub trait UpdateSink<T>: Send + Sync {
    /// Called with each delivered update, outside the throttle's state lock.
    /// Deliveries from one throttle never overlap.
    fn deliver(&self, update: T);
}

impl<T, F> UpdateSink<T> for F
where
    F: Fn(T) + Send + Sync,
{
    fn deliver(&self, update: T) {
        self(update)
    }
}

/// Where a throttle gets its interval from.
#[derive(Debug, Clone)]
pub enum IntervalSource {
    /// A constant interval.
    Fixed(Duration),

    /// The interval configured for a data class, read on every decision.
    Config {
        config: SharedPerformanceConfig,
        class: DataClass,
    },
}

impl IntervalSource {
    /// Interval source backed by the shared configuration.
    pub fn from_config(config: SharedPerformanceConfig, class: DataClass) -> Self {
        IntervalSource::Config { config, class }
    }

    /// The interval in effect right now.
    pub fn current(&self) -> Duration {
        match self {
            IntervalSource::Fixed(interval) => *interval,
            IntervalSource::Config { config, class } => config.interval_for(*class),
        }
    }
}

/// Sink that keeps every delivered update, for tests and harnesses.
#[derive(Debug)]
pub struct RecordingSink<T> {
    updates: Mutex<Vec<T>>,
}

impl<T> Default for RecordingSink<T> {
    fn default() -> Self {
        Self {
            updates: Mutex::new(Vec::new()),
        }
    }
}

impl<T> RecordingSink<T> {
    /// Create an empty, shareable sink.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Number of updates received.
    pub fn len(&self) -> usize {
        self.updates.lock().len()
    }

    /// Whether nothing was received.
    pub fn is_empty(&self) -> bool {
        self.updates.lock().is_empty()
    }

    /// Remove and return everything received so far.
    pub fn take(&self) -> Vec<T> {
        std::mem::take(&mut *self.updates.lock())
    }
}

impl<T: Clone> RecordingSink<T> {
    /// Copy of everything received so far.
    pub fn updates(&self) -> Vec<T> {
        self.updates.lock().clone()
    }

    /// Most recent update.
    pub fn last(&self) -> Option<T> {
        self.updates.lock().last().cloned()
    }
}

impl<T: Send> UpdateSink<T> for RecordingSink<T> {
    fn deliver(&self, update: T) {
        self.updates.lock().push(update);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::sleep;

    const INTERVAL: Duration = Duration::from_millis(1000);

    fn fixed_throttle(sink: Arc<RecordingSink<&'static str>>) -> Throttle<&'static str> {
        Throttle::new("test", IntervalSource::Fixed(INTERVAL), sink).unwrap()
    }

    #[test]
    fn test_new_outside_runtime_fails() {
        let sink = RecordingSink::<u32>::new();
        let result = Throttle::<u32>::new("test", IntervalSource::Fixed(INTERVAL), sink);
        assert!(matches!(result, Err(ThrottleError::NoRuntime)));
    }

    #[test]
    fn test_interval_source_reads_config() {
        let config = SharedPerformanceConfig::default();
        let source = IntervalSource::from_config(config.clone(), DataClass::LayerBatch);
        assert_eq!(source.current(), Duration::from_millis(100));

        config.set("layers.batchInterval", "40").unwrap();
        assert_eq!(source.current(), Duration::from_millis(40));
    }

    #[test]
    fn test_closure_sink() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let captured = Arc::clone(&seen);
        let sink = move |n: u32| captured.lock().push(n);

        sink.deliver(7);
        assert_eq!(*seen.lock(), vec![7]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_delivers_first_and_last_only() {
        let sink = RecordingSink::new();
        let throttle = fixed_throttle(Arc::clone(&sink));

        throttle.submit("first");
        sleep(Duration::from_millis(4)).await;
        throttle.submit("middle");
        sleep(Duration::from_millis(4)).await;
        throttle.submit("last");

        assert_eq!(sink.updates(), vec!["first"]);
        assert_eq!(throttle.state(), ThrottleState::Cooling);

        sleep(Duration::from_millis(1100)).await;

        assert_eq!(sink.updates(), vec!["first", "last"]);
        let stats = throttle.stats();
        assert_eq!(stats.submitted, 3);
        assert_eq!(stats.delivered(), 2);
        assert_eq!(stats.dropped, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_returns_to_idle_after_quiet_window() {
        let sink = RecordingSink::new();
        let throttle = fixed_throttle(Arc::clone(&sink));

        throttle.submit("only");
        sleep(Duration::from_millis(1500)).await;

        assert_eq!(throttle.state(), ThrottleState::Idle);
        assert!(!throttle.timer_armed());

        throttle.submit("next");
        assert_eq!(sink.updates(), vec!["only", "next"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_delivers_once_and_cancels_timer() {
        let sink = RecordingSink::new();
        let throttle = fixed_throttle(Arc::clone(&sink));

        throttle.submit("a");
        sleep(Duration::from_millis(10)).await;
        throttle.submit("b");
        assert!(throttle.has_pending());

        assert!(throttle.flush());
        assert_eq!(sink.updates(), vec!["a", "b"]);
        assert!(!throttle.timer_armed());
        assert_eq!(throttle.state(), ThrottleState::Idle);

        // The timer that would have delivered "b" must not fire
        sleep(Duration::from_millis(3000)).await;
        assert_eq!(sink.updates(), vec!["a", "b"]);
        assert!(!throttle.flush());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_discards_pending() {
        let sink = RecordingSink::new();
        let throttle = fixed_throttle(Arc::clone(&sink));

        throttle.submit("a");
        throttle.submit("b");
        assert!(throttle.cancel());

        sleep(Duration::from_millis(3000)).await;
        assert_eq!(sink.updates(), vec!["a"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_config_change_applies_to_next_decision() {
        let config = SharedPerformanceConfig::default();
        let sink = RecordingSink::<u32>::new();
        let throttle = Throttle::<u32>::new(
            "gps",
            IntervalSource::from_config(config.clone(), DataClass::GpsPosition),
            sink.clone(),
        )
        .unwrap();

        throttle.submit(1u32);
        config.set("gps.updateInterval", "200").unwrap();
        assert_eq!(throttle.interval(), Duration::from_millis(200));

        // In-flight 1000 ms timer is not shortened, but the next submit
        // sees the 200 ms window as elapsed
        sleep(Duration::from_millis(250)).await;
        throttle.submit(2u32);
        assert_eq!(sink.updates(), vec![1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_steady_stream_is_rate_limited() {
        let sink = RecordingSink::<u32>::new();
        let throttle = Throttle::<u32>::new(
            "gps",
            IntervalSource::Fixed(Duration::from_millis(1000)),
            sink.clone(),
        )
        .unwrap();

        // 5 Hz for 3 seconds
        for i in 0..15u32 {
            throttle.submit(i);
            sleep(Duration::from_millis(200)).await;
        }
        sleep(Duration::from_millis(1500)).await;

        let delivered = sink.updates();
        assert!(delivered.len() <= 5, "too many deliveries: {delivered:?}");
        assert_eq!(delivered.first(), Some(&0));
        assert_eq!(delivered.last(), Some(&14));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_flush_waits_for_in_flight_delivery() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&events);
        let throttle = Throttle::<u32>::new(
            "slow",
            IntervalSource::Fixed(Duration::from_millis(10)),
            Arc::new(move |n: u32| {
                recorded.lock().push(format!("start {n}"));
                if n == 2 {
                    std::thread::sleep(Duration::from_millis(150));
                }
                recorded.lock().push(format!("end {n}"));
            }),
        )
        .unwrap();

        throttle.submit(1);
        throttle.submit(2);

        // The timer fires after 10 ms and is still inside the sink
        sleep(Duration::from_millis(60)).await;
        let flushed = throttle.flush();
        events.lock().push("flushed".to_string());

        assert!(!flushed);
        assert_eq!(
            *events.lock(),
            vec!["start 1", "end 1", "start 2", "end 2", "flushed"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_throttle_stops_timer() {
        let sink = RecordingSink::new();
        let throttle = fixed_throttle(Arc::clone(&sink));

        throttle.submit("a");
        throttle.submit("b");
        drop(throttle);

        sleep(Duration::from_millis(3000)).await;
        assert_eq!(sink.updates(), vec!["a"]);
    }
}
