//! Timer-free throttle state machine.
//!
//! [`ThrottleCore`] decides what to do with each update given the current
//! time and interval, and tells the caller when it next needs a timer
//! callback. It never sleeps and never reads the clock itself, so every
//! transition can be driven deterministically.

use std::fmt;
use std::time::{Duration, Instant};

/// Externally visible throttle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleState {
    /// No timer armed; the next update may be processed immediately.
    Idle,

    /// An update was processed recently; a timer is armed and further
    /// updates are held in the pending slot.
    Cooling,
}

impl ThrottleState {
    /// Get a short description for display.
    pub fn as_str(&self) -> &'static str {
        match self {
            ThrottleState::Idle => "Idle",
            ThrottleState::Cooling => "Cooling",
        }
    }
}

impl fmt::Display for ThrottleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Counters describing what a throttle has done with its input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ThrottleStats {
    /// Updates offered to the throttle.
    pub submitted: u64,
    /// Updates delivered as soon as they arrived.
    pub delivered_immediately: u64,
    /// Updates delivered when the cooling window elapsed.
    pub delivered_deferred: u64,
    /// Updates delivered by an explicit flush.
    pub flushed: u64,
    /// Pending updates overwritten or discarded before delivery.
    pub dropped: u64,
}

impl ThrottleStats {
    /// Total updates handed to the sink.
    pub fn delivered(&self) -> u64 {
        self.delivered_immediately + self.delivered_deferred + self.flushed
    }
}

/// Result of offering an update to the throttle.
#[derive(Debug, PartialEq)]
pub enum SubmitOutcome<T> {
    /// Deliver `update` now and arm a timer for `rearm_in`.
    Deliver { update: T, rearm_in: Duration },

    /// The update was parked in the pending slot; arm a timer for `flush_in`.
    Queued {
        /// Whether an older pending update was overwritten.
        replaced: bool,
        flush_in: Duration,
    },
}

/// Result of a timer callback.
#[derive(Debug, PartialEq)]
pub enum TimerOutcome<T> {
    /// Deliver the pending update and arm a timer for `rearm_in`.
    Deliver { update: T, rearm_in: Duration },

    /// Nothing pending; the throttle is idle and needs no timer.
    Idle,

    /// The cooling window has not elapsed yet (interval grew since the
    /// timer was armed); arm a timer for `wait`.
    Wait { wait: Duration },
}

/// Last-write-wins throttle with a single pending slot.
///
/// # State Machine
///
/// ```text
///            submit, window elapsed
///   Idle ---------------------------> Cooling
///    ^                                 |  ^
///    |  timer, nothing pending         |  | submit within window: overwrite
///    +---------------------------------+  | pending, re-arm for remaining time
///    |                                    |
///    |  flush / cancel                    | timer, pending: deliver, re-arm
///    +------------------------------------+
/// ```
///
/// At most one update is ever pending; intermediate updates between two
/// deliveries are dropped, never queued.
#[derive(Debug)]
pub struct ThrottleCore<T> {
    state: ThrottleState,
    pending: Option<T>,
    last_processed: Option<Instant>,
    stats: ThrottleStats,
}

impl<T> Default for ThrottleCore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ThrottleCore<T> {
    /// Create an idle throttle with nothing processed yet.
    pub fn new() -> Self {
        Self {
            state: ThrottleState::Idle,
            pending: None,
            last_processed: None,
            stats: ThrottleStats::default(),
        }
    }

    /// Offer an update at time `now`.
    ///
    /// If at least `interval` has passed since the last processed update
    /// (or nothing was processed yet) the update is returned for immediate
    /// delivery. Otherwise it replaces whatever was pending.
    pub fn submit(&mut self, update: T, now: Instant, interval: Duration) -> SubmitOutcome<T> {
        self.stats.submitted += 1;

        match self.remaining(now, interval) {
            None => {
                // A pending update older than this one is superseded
                if self.pending.take().is_some() {
                    self.stats.dropped += 1;
                }
                self.last_processed = Some(now);
                self.state = ThrottleState::Cooling;
                self.stats.delivered_immediately += 1;
                SubmitOutcome::Deliver {
                    update,
                    rearm_in: interval,
                }
            }
            Some(flush_in) => {
                let replaced = self.pending.replace(update).is_some();
                if replaced {
                    self.stats.dropped += 1;
                }
                self.state = ThrottleState::Cooling;
                SubmitOutcome::Queued { replaced, flush_in }
            }
        }
    }

    /// Handle a timer callback at time `now`.
    pub fn on_timer(&mut self, now: Instant, interval: Duration) -> TimerOutcome<T> {
        if self.pending.is_none() {
            self.state = ThrottleState::Idle;
            return TimerOutcome::Idle;
        }

        if let Some(wait) = self.remaining(now, interval) {
            self.state = ThrottleState::Cooling;
            return TimerOutcome::Wait { wait };
        }

        match self.pending.take() {
            Some(update) => {
                self.last_processed = Some(now);
                self.state = ThrottleState::Cooling;
                self.stats.delivered_deferred += 1;
                TimerOutcome::Deliver {
                    update,
                    rearm_in: interval,
                }
            }
            None => {
                self.state = ThrottleState::Idle;
                TimerOutcome::Idle
            }
        }
    }

    /// Take the pending update for immediate delivery, bypassing the timer.
    ///
    /// The caller must disarm its timer; the throttle returns to `Idle`.
    pub fn flush(&mut self, now: Instant) -> Option<T> {
        self.state = ThrottleState::Idle;
        let update = self.pending.take()?;
        self.last_processed = Some(now);
        self.stats.flushed += 1;
        Some(update)
    }

    /// Discard the pending update and return to `Idle`.
    ///
    /// Returns whether an update was discarded.
    pub fn cancel(&mut self) -> bool {
        self.state = ThrottleState::Idle;
        let discarded = self.pending.take().is_some();
        if discarded {
            self.stats.dropped += 1;
        }
        discarded
    }

    /// Forget the last processed time so the next update is immediate.
    pub fn reset(&mut self) {
        self.cancel();
        self.last_processed = None;
    }

    /// Current state.
    pub fn state(&self) -> ThrottleState {
        self.state
    }

    /// The update waiting for the cooling window to elapse, if any.
    pub fn pending(&self) -> Option<&T> {
        self.pending.as_ref()
    }

    /// Whether an update is waiting.
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// When the last update was handed out.
    pub fn last_processed(&self) -> Option<Instant> {
        self.last_processed
    }

    /// Counters since creation.
    pub fn stats(&self) -> ThrottleStats {
        self.stats
    }

    // Time left in the cooling window, or None if it has elapsed.
    fn remaining(&self, now: Instant, interval: Duration) -> Option<Duration> {
        let last = self.last_processed?;
        let elapsed = now.saturating_duration_since(last);
        if elapsed >= interval {
            None
        } else {
            Some(interval - elapsed)
        }
    }
}
