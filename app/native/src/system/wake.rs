//! Sleep detection.
//!
//! While the machine sleeps the monotonic clock stops (or slows) but the wall
//! clock keeps going. Comparing both across a short poll reveals the gap.

use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use tokio::task::JoinHandle;

use super::{SystemEvent, SystemEvents};

/// Default time between wall clock samples.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default unexplained wall clock advance that counts as a wake.
pub const DEFAULT_JUMP_THRESHOLD: Duration = Duration::from_secs(30);

/// Returns `true` when the wall clock advanced more than `threshold` beyond
/// the monotonic elapsed time.
///
/// A wall clock that moved backwards is not a wake.
#[must_use]
pub fn detect_gap(wall_elapsed: Duration, monotonic_elapsed: Duration, threshold: Duration) -> bool {
    wall_elapsed.saturating_sub(monotonic_elapsed) > threshold
}

/// Emits [`SystemEvent::Wake`] when a sleep gap is detected.
#[derive(Debug, Clone)]
pub struct WakeDetector {
    poll_interval: Duration,
    threshold: Duration,
}

impl Default for WakeDetector {
    fn default() -> Self { Self::new(DEFAULT_POLL_INTERVAL, DEFAULT_JUMP_THRESHOLD) }
}

impl WakeDetector {
    #[must_use]
    pub const fn new(poll_interval: Duration, threshold: Duration) -> Self {
        Self { poll_interval, threshold }
    }

    /// Starts polling and emits wake events into `events`.
    #[must_use]
    pub fn spawn(self, events: Arc<SystemEvents>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.poll_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            let mut last_wall = SystemTime::now();
            let mut last_mono = Instant::now();

            loop {
                ticker.tick().await;

                let wall = SystemTime::now();
                let mono = Instant::now();
                let wall_elapsed = wall.duration_since(last_wall).unwrap_or_default();
                let mono_elapsed = mono.duration_since(last_mono);

                if detect_gap(wall_elapsed, mono_elapsed, self.threshold) {
                    tracing::info!(
                        slept_secs = wall_elapsed.saturating_sub(mono_elapsed).as_secs(),
                        "system: wake detected"
                    );
                    events.emit(SystemEvent::Wake);
                }

                last_wall = wall;
                last_mono = mono;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const fn secs(s: u64) -> Duration { Duration::from_secs(s) }

    #[test]
    fn test_detect_gap_ignores_normal_ticks() {
        assert!(!detect_gap(secs(5), secs(5), secs(30)));
        assert!(!detect_gap(secs(34), secs(5), secs(30)));
    }

    #[test]
    fn test_detect_gap_flags_sleep() {
        assert!(detect_gap(secs(3600), secs(5), secs(30)));
        assert!(detect_gap(secs(36), secs(5), secs(30)));
    }

    #[test]
    fn test_detect_gap_ignores_backwards_wall_clock() {
        assert!(!detect_gap(Duration::ZERO, secs(5), secs(30)));
    }
}
