//! Wall-clock arithmetic for the scheduler.
//!
//! Fire times are persisted as absolute epoch seconds so they survive
//! relaunches; the platform timer only ever sees a relative wait computed
//! from the stored value at arm time.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;

/// Upper bound on the timer tolerance window.
pub const MAX_TOLERANCE: Duration = Duration::from_secs(30 * 60);

/// Source of wall-clock time as epoch seconds.
pub trait Clock: Send + Sync {
    /// Returns the current time as seconds since the Unix epoch.
    fn now_unix(&self) -> f64;
}

/// The real system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix(&self) -> f64 {
        SystemTime::now().duration_since(UNIX_EPOCH).map_or(0.0, |d| d.as_secs_f64())
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<f64>,
}

impl ManualClock {
    /// Creates a clock frozen at `now_unix`.
    #[must_use]
    pub const fn new(now_unix: f64) -> Self { Self { now: Mutex::new(now_unix) } }

    /// Moves the clock forward by `by`.
    pub fn advance(&self, by: Duration) { *self.now.lock() += by.as_secs_f64(); }

    /// Jumps the clock to `now_unix`.
    pub fn set(&self, now_unix: f64) { *self.now.lock() = now_unix; }
}

impl Clock for ManualClock {
    fn now_unix(&self) -> f64 { *self.now.lock() }
}

/// Returns the absolute time of the next fire: `now + interval`.
#[must_use]
pub fn compute_next_fire_time(now_unix: f64, interval: Duration) -> f64 {
    now_unix + interval.as_secs_f64()
}

/// Returns how long to wait until `stored_unix`, or `None` to fire immediately.
///
/// `None` covers a fire time at or before `now` (the app was closed or
/// asleep through it) and non-finite stored values.
#[must_use]
pub fn time_until_fire(stored_unix: f64, now_unix: f64) -> Option<Duration> {
    let remaining = stored_unix - now_unix;
    if remaining.is_finite() && remaining > 0.0 {
        Duration::try_from_secs_f64(remaining).ok()
    } else {
        None
    }
}

/// Returns the coalescing tolerance for a timer: 10% of the interval,
/// capped at [`MAX_TOLERANCE`].
#[must_use]
pub fn tolerance_for(interval: Duration) -> Duration { (interval / 10).min(MAX_TOLERANCE) }
