//! Cancellable one-shot timer.
//!
//! The scheduler never uses a repeating timer: every fire persists a fresh
//! absolute timestamp and then arms a new one-shot. Each arm bumps a
//! generation counter that is handed to the callback, so the owner can
//! discard a fire that was already queued when the timer was replaced.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;

/// A timer that runs a callback once after a delay.
///
/// Arming replaces (and cancels) any previously armed callback.
/// Dropping the timer cancels the outstanding callback.
#[derive(Debug, Default)]
pub struct OneShotTimer {
    generation: u64,
    armed: Option<JoinHandle<()>>,
    tolerance: Duration,
}

impl OneShotTimer {
    /// Creates a disarmed timer.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Arms the timer to run `on_fire(generation)` after `after`.
    ///
    /// The returned future is awaited on the timer task, so a callback may
    /// wait for room on a bounded channel instead of dropping the fire.
    ///
    /// `tolerance` is the window the fire may slip by for power-saving
    /// coalescing. The tokio driver already fires at the earliest tick after
    /// the deadline, so it is recorded for diagnostics only.
    ///
    /// Must be called from within a tokio runtime. Returns the generation
    /// of the new arm.
    pub fn arm<F, Fut>(&mut self, after: Duration, tolerance: Duration, on_fire: F) -> u64
    where
        F: FnOnce(u64) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.cancel();

        self.generation += 1;
        self.tolerance = tolerance;
        let generation = self.generation;

        self.armed = Some(tokio::spawn(async move {
            tokio::time::sleep(after).await;
            on_fire(generation).await;
        }));

        generation
    }

    /// Cancels the armed callback. Returns `true` if one was pending.
    pub fn cancel(&mut self) -> bool {
        match self.armed.take() {
            Some(handle) => {
                let pending = !handle.is_finished();
                handle.abort();
                pending
            }
            None => false,
        }
    }

    /// Forgets the current arm after its callback has run.
    pub fn disarm(&mut self) { self.armed = None; }

    /// Returns `true` while a callback is waiting to run.
    #[must_use]
    pub fn is_armed(&self) -> bool { self.armed.as_ref().is_some_and(|handle| !handle.is_finished()) }

    /// Returns the generation of the most recent arm.
    #[must_use]
    pub const fn generation(&self) -> u64 { self.generation }

    /// Returns the tolerance of the most recent arm.
    #[must_use]
    pub const fn tolerance(&self) -> Duration { self.tolerance }

    /// Returns `true` if `generation` belongs to the most recent arm.
    #[must_use]
    pub const fn is_current(&self, generation: u64) -> bool { generation == self.generation }
}

impl Drop for OneShotTimer {
    fn drop(&mut self) { self.cancel(); }
}
