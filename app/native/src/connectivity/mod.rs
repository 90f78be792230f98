//! Network reachability monitor.
//!
//! A [`ReachabilityProbe`] is sampled periodically. Raw samples pass through a
//! [`TransitionFilter`] that drops repeats and requires a new status to hold
//! for a quiet period before it is published. Subscribers are invoked once per
//! published transition, never per raw sample.

mod probe;

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
pub use probe::{DEFAULT_PROBE_HOST, DEFAULT_PROBE_TIMEOUT, ReachabilityProbe, TcpProbe};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Default time between probes.
pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_secs(5);

/// Default time a new status must hold before it is published.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_secs(2);

/// Two-valued network status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum ConnectivityStatus {
    Connected,
    Disconnected,
}

impl ConnectivityStatus {
    #[must_use]
    pub const fn is_connected(self) -> bool { matches!(self, Self::Connected) }
}

impl std::fmt::Display for ConnectivityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
        })
    }
}

// ============================================================================
// Transition filter
// ============================================================================

/// De-duplicates and debounces raw reachability samples.
///
/// The first sample is published as-is. After that, a differing sample must
/// be observed continuously for at least the debounce period; a sample equal
/// to the published status in between cancels the pending change.
#[derive(Debug, Clone)]
pub struct TransitionFilter {
    debounce: Duration,
    published: Option<ConnectivityStatus>,
    pending: Option<(ConnectivityStatus, Instant)>,
}

impl TransitionFilter {
    #[must_use]
    pub const fn new(debounce: Duration) -> Self {
        Self { debounce, published: None, pending: None }
    }

    /// Returns the last published status.
    #[must_use]
    pub const fn published(&self) -> Option<ConnectivityStatus> { self.published }

    /// Feeds one raw sample taken at `now`. Returns the status to publish, if
    /// this sample completes a transition.
    pub fn observe(&mut self, raw: ConnectivityStatus, now: Instant) -> Option<ConnectivityStatus> {
        let Some(published) = self.published else {
            self.published = Some(raw);
            return Some(raw);
        };

        if raw == published {
            if self.pending.take().is_some() {
                tracing::debug!(status = %raw, "connectivity: transient change dropped");
            }
            return None;
        }

        let since = match self.pending {
            Some((status, since)) if status == raw => since,
            _ => {
                self.pending = Some((raw, now));
                now
            }
        };

        if now.saturating_duration_since(since) >= self.debounce {
            self.pending = None;
            self.published = Some(raw);
            return Some(raw);
        }

        None
    }

    /// Returns when a pending transition becomes publishable.
    #[must_use]
    pub fn pending_deadline(&self) -> Option<Instant> {
        self.pending.map(|(_, since)| since + self.debounce)
    }
}

// ============================================================================
// Monitor
// ============================================================================

type Subscriber = Arc<dyn Fn(ConnectivityStatus) + Send + Sync>;

/// Polls a probe and notifies subscribers of genuine transitions.
pub struct ConnectivityMonitor {
    probe: Arc<dyn ReachabilityProbe>,
    probe_interval: Duration,
    debounce: Duration,
    subscribers: Arc<Mutex<Vec<Subscriber>>>,
}

impl ConnectivityMonitor {
    #[must_use]
    pub fn new(probe: Arc<dyn ReachabilityProbe>) -> Self {
        Self {
            probe,
            probe_interval: DEFAULT_PROBE_INTERVAL,
            debounce: DEFAULT_DEBOUNCE,
            subscribers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    #[must_use]
    pub fn with_probe_interval(mut self, interval: Duration) -> Self {
        self.probe_interval = interval;
        self
    }

    #[must_use]
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Registers `callback` to run once per published transition.
    ///
    /// Callbacks run on the monitor task and must not block.
    pub fn subscribe(&self, callback: impl Fn(ConnectivityStatus) + Send + Sync + 'static) {
        self.subscribers.lock().push(Arc::new(callback));
    }

    /// Starts polling on the current tokio runtime.
    #[must_use]
    pub fn spawn(self) -> ConnectivityWatcher {
        // Until the first sample lands, assume the worst.
        let (status_tx, status_rx) = watch::channel(ConnectivityStatus::Disconnected);
        let Self { probe, probe_interval, debounce, subscribers } = self;
        let notify = Arc::clone(&subscribers);

        let task = tokio::spawn(async move {
            let mut filter = TransitionFilter::new(debounce);

            loop {
                let raw = probe.probe().await;
                let now = Instant::now();
                tracing::trace!(status = %raw, "connectivity: sampled");

                if let Some(status) = filter.observe(raw, now) {
                    tracing::info!(%status, "connectivity: status changed");
                    status_tx.send_replace(status);

                    let callbacks: Vec<Subscriber> = notify.lock().clone();
                    for callback in callbacks {
                        callback(status);
                    }
                }

                let wake_at = filter
                    .pending_deadline()
                    .map_or(now + probe_interval, |deadline| deadline.min(now + probe_interval));
                tokio::time::sleep_until(wake_at).await;
            }
        });

        ConnectivityWatcher { status: status_rx, subscribers, task }
    }
}

/// A running [`ConnectivityMonitor`].
pub struct ConnectivityWatcher {
    status: watch::Receiver<ConnectivityStatus>,
    subscribers: Arc<Mutex<Vec<Subscriber>>>,
    task: JoinHandle<()>,
}

impl ConnectivityWatcher {
    /// Returns the last published status.
    #[must_use]
    pub fn status(&self) -> ConnectivityStatus { *self.status.borrow() }

    /// Returns a receiver that observes every published status.
    #[must_use]
    pub fn receiver(&self) -> watch::Receiver<ConnectivityStatus> { self.status.clone() }

    /// Registers another subscriber on the running monitor.
    pub fn subscribe(&self, callback: impl Fn(ConnectivityStatus) + Send + Sync + 'static) {
        self.subscribers.lock().push(Arc::new(callback));
    }

    /// Stops polling.
    pub fn stop(&self) { self.task.abort(); }
}

impl Drop for ConnectivityWatcher {
    fn drop(&mut self) { self.task.abort(); }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use async_trait::async_trait;

    use super::*;
    use ConnectivityStatus::{Connected, Disconnected};

    struct ScriptedProbe {
        samples: Mutex<VecDeque<ConnectivityStatus>>,
        last: Mutex<ConnectivityStatus>,
    }

    impl ScriptedProbe {
        fn new(samples: &[ConnectivityStatus]) -> Arc<Self> {
            Arc::new(Self {
                samples: Mutex::new(samples.iter().copied().collect()),
                last: Mutex::new(Disconnected),
            })
        }
    }

    #[async_trait]
    impl ReachabilityProbe for ScriptedProbe {
        async fn probe(&self) -> ConnectivityStatus {
            let mut last = self.last.lock();
            if let Some(next) = self.samples.lock().pop_front() {
                *last = next;
            }
            *last
        }
    }

    fn ms(millis: u64) -> Duration { Duration::from_millis(millis) }

    #[test]
    fn test_filter_publishes_first_sample_immediately() {
        let mut filter = TransitionFilter::new(ms(2000));
        let t0 = Instant::now();

        assert_eq!(filter.observe(Connected, t0), Some(Connected));
        assert_eq!(filter.published(), Some(Connected));
    }

    #[test]
    fn test_filter_drops_repeated_status() {
        let mut filter = TransitionFilter::new(ms(2000));
        let t0 = Instant::now();

        filter.observe(Connected, t0);

        assert_eq!(filter.observe(Connected, t0 + ms(5000)), None);
        assert_eq!(filter.observe(Connected, t0 + ms(10_000)), None);
    }

    #[test]
    fn test_filter_requires_change_to_hold_for_debounce() {
        let mut filter = TransitionFilter::new(ms(2000));
        let t0 = Instant::now();
        filter.observe(Connected, t0);

        assert_eq!(filter.observe(Disconnected, t0 + ms(1000)), None);
        assert_eq!(filter.pending_deadline(), Some(t0 + ms(3000)));
        assert_eq!(filter.observe(Disconnected, t0 + ms(2000)), None);
        assert_eq!(filter.observe(Disconnected, t0 + ms(3000)), Some(Disconnected));
        assert_eq!(filter.pending_deadline(), None);
    }

    #[test]
    fn test_filter_flap_cancels_pending_change() {
        let mut filter = TransitionFilter::new(ms(2000));
        let t0 = Instant::now();
        filter.observe(Connected, t0);

        filter.observe(Disconnected, t0 + ms(1000));
        assert_eq!(filter.observe(Connected, t0 + ms(1500)), None);
        assert_eq!(filter.pending_deadline(), None);

        // The quiet period restarts from the next differing sample.
        assert_eq!(filter.observe(Disconnected, t0 + ms(3500)), None);
        assert_eq!(filter.observe(Disconnected, t0 + ms(5500)), Some(Disconnected));
    }

    #[test]
    fn test_filter_zero_debounce_publishes_on_first_differing_sample() {
        let mut filter = TransitionFilter::new(Duration::ZERO);
        let t0 = Instant::now();
        filter.observe(Disconnected, t0);

        assert_eq!(filter.observe(Connected, t0 + ms(1)), Some(Connected));
    }

    #[tokio::test(start_paused = true)]
    async fn test_monitor_notifies_once_per_transition() {
        let probe = ScriptedProbe::new(&[
            Connected,
            Connected,
            Disconnected,
            Connected,
            Disconnected,
            Disconnected,
            Disconnected,
        ]);
        let monitor = ConnectivityMonitor::new(probe)
            .with_probe_interval(ms(1000))
            .with_debounce(ms(1500));

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        monitor.subscribe(move |status| sink.lock().push(status));

        let watcher = monitor.spawn();
        tokio::time::sleep(ms(20_000)).await;

        assert_eq!(*seen.lock(), vec![Connected, Disconnected]);
        assert_eq!(watcher.status(), Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_monitor_late_subscriber_receives_later_transitions() {
        let probe = ScriptedProbe::new(&[Disconnected, Disconnected, Connected, Connected, Connected]);
        let monitor = ConnectivityMonitor::new(probe)
            .with_probe_interval(ms(1000))
            .with_debounce(ms(1000));
        let watcher = monitor.spawn();
        tokio::time::sleep(ms(10)).await;

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        watcher.subscribe(move |status| sink.lock().push(status));

        tokio::time::sleep(ms(10_000)).await;

        assert_eq!(*seen.lock(), vec![Connected]);
    }
}
