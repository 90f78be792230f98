//! System signals that require the wallpaper to be painted again.
//!
//! Waking from sleep can reset per-display wallpaper state, and spaces that
//! were not active when the wallpaper changed keep the old image. Both arrive
//! here as [`SystemEvent`]s and fan out to subscribers.

mod wake;

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
pub use wake::{DEFAULT_JUMP_THRESHOLD, DEFAULT_POLL_INTERVAL, WakeDetector, detect_gap};

/// A system signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SystemEvent {
    /// The machine woke from sleep.
    Wake,
    /// The active space or desktop changed.
    ActiveSpaceChanged,
}

type Callback = Arc<dyn Fn() + Send + Sync>;

/// Subscription hub for [`SystemEvent`]s.
#[derive(Clone, Default)]
pub struct SystemEvents {
    wake: Arc<RwLock<Vec<Callback>>>,
    space_change: Arc<RwLock<Vec<Callback>>>,
}

impl SystemEvents {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Runs `callback` every time the machine wakes.
    pub fn on_wake(&self, callback: impl Fn() + Send + Sync + 'static) {
        self.wake.write().push(Arc::new(callback));
    }

    /// Runs `callback` every time the active space changes.
    pub fn on_active_space_change(&self, callback: impl Fn() + Send + Sync + 'static) {
        self.space_change.write().push(Arc::new(callback));
    }

    /// Delivers `event` to its subscribers. Returns how many were called.
    pub fn emit(&self, event: SystemEvent) -> usize {
        let callbacks: Vec<Callback> = match event {
            SystemEvent::Wake => self.wake.read().clone(),
            SystemEvent::ActiveSpaceChanged => self.space_change.read().clone(),
        };

        tracing::debug!(?event, subscribers = callbacks.len(), "system: event emitted");

        for callback in &callbacks {
            callback();
        }
        callbacks.len()
    }
}

impl std::fmt::Debug for SystemEvents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemEvents")
            .field("wake", &self.wake.read().len())
            .field("space_change", &self.space_change.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn test_emit_routes_to_matching_subscribers() {
        let events = SystemEvents::new();
        let wakes = Arc::new(AtomicUsize::new(0));
        let spaces = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&wakes);
        events.on_wake(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let counter = Arc::clone(&spaces);
        events.on_active_space_change(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(events.emit(SystemEvent::Wake), 1);
        assert_eq!(events.emit(SystemEvent::Wake), 1);
        assert_eq!(events.emit(SystemEvent::ActiveSpaceChanged), 1);

        assert_eq!(wakes.load(Ordering::SeqCst), 2);
        assert_eq!(spaces.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_emit_without_subscribers_is_noop() {
        let events = SystemEvents::new();

        assert_eq!(events.emit(SystemEvent::ActiveSpaceChanged), 0);
    }

    #[test]
    fn test_clones_share_subscribers() {
        let events = SystemEvents::new();
        let clone = events.clone();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);

        clone.on_wake(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        events.emit(SystemEvent::Wake);

        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
