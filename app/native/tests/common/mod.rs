//! Test doubles shared by the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use backdrop_lib::connectivity::{ConnectivityStatus, ReachabilityProbe};
use backdrop_lib::provider::{
    ApplyError, CredentialValidator, ErrorReporter, FireError, ImageProvider, ProviderError,
    WallpaperSetter,
};
use backdrop_lib::scheduler::{
    Interval, IntervalProfile, ManualClock, SchedulerActor, SchedulerDeps, SchedulerHandle,
    SchedulerOptions,
};
use backdrop_lib::store::{MemoryStore, Store};
use parking_lot::Mutex;
use tokio::sync::{Notify, Semaphore};

/// Fixed wall-clock start for every test.
pub const NOW: f64 = 1_700_000_000.0;

/// Hourly under the mock profile.
pub const MOCK_HOURLY_SECS: f64 = 60.0;

// ============================================================================
// Scheduler collaborators
// ============================================================================

/// Returns queued results in order, then fresh image paths.
#[derive(Default)]
pub struct ScriptedProvider {
    results: Mutex<VecDeque<Result<PathBuf, ProviderError>>>,
    calls: AtomicUsize,
    gate: Option<Arc<Semaphore>>,
    pub entered: Notify,
}

impl ScriptedProvider {
    pub fn new() -> Self { Self::default() }

    pub fn with_results(results: impl IntoIterator<Item = Result<PathBuf, ProviderError>>) -> Self {
        Self { results: Mutex::new(results.into_iter().collect()), ..Self::default() }
    }

    /// Blocks every fetch until a permit is added to `gate`.
    pub fn gated(gate: Arc<Semaphore>) -> Self { Self { gate: Some(gate), ..Self::default() } }

    pub fn calls(&self) -> usize { self.calls.load(Ordering::SeqCst) }
}

#[async_trait]
impl ImageProvider for ScriptedProvider {
    async fn fetch_next_image(&self) -> Result<PathBuf, ProviderError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.entered.notify_one();

        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate closed").forget();
        }

        self.results
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(PathBuf::from(format!("/tmp/backdrop-test/{call}.jpg"))))
    }
}

/// Records every applied and re-applied path.
#[derive(Default)]
pub struct RecordingSetter {
    pub applied: Mutex<Vec<PathBuf>>,
    pub reapplied: Mutex<Vec<PathBuf>>,
}

#[async_trait]
impl WallpaperSetter for RecordingSetter {
    async fn apply_wallpaper(&self, path: &Path) -> Result<(), ApplyError> {
        self.applied.lock().push(path.to_path_buf());
        Ok(())
    }

    async fn reapply_wallpaper(&self, path: &Path) -> Result<(), ApplyError> {
        self.reapplied.lock().push(path.to_path_buf());
        Ok(())
    }
}

/// Collects reported errors.
#[derive(Default)]
pub struct RecordingReporter {
    pub reported: Mutex<Vec<String>>,
}

impl ErrorReporter for RecordingReporter {
    fn report(&self, error: &FireError) { self.reported.lock().push(error.to_string()); }
}

/// A scheduler wired to test doubles.
pub struct SchedulerHarness {
    pub handle: SchedulerHandle,
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
    pub provider: Arc<ScriptedProvider>,
    pub setter: Arc<RecordingSetter>,
    pub reporter: Arc<RecordingReporter>,
}

impl SchedulerHarness {
    /// Spawns a scheduler using the mock profile, hourly cadence and no settle delay.
    pub fn spawn(store: MemoryStore, provider: ScriptedProvider) -> Self {
        Self::spawn_with_settle_delay(store, provider, Duration::ZERO)
    }

    pub fn spawn_with_settle_delay(store: MemoryStore, provider: ScriptedProvider, settle_delay: Duration) -> Self {
        let store = Arc::new(store);
        let clock = Arc::new(ManualClock::new(NOW));
        let provider = Arc::new(provider);
        let setter = Arc::new(RecordingSetter::default());
        let reporter = Arc::new(RecordingReporter::default());

        let handle = SchedulerActor::spawn(
            SchedulerDeps {
                store: store.clone(),
                clock: clock.clone(),
                provider: provider.clone(),
                setter: setter.clone(),
                reporter: reporter.clone(),
            },
            SchedulerOptions {
                profile: IntervalProfile::Mock,
                default_interval: Interval::Hourly,
                settle_delay,
            },
        );

        Self { handle, store, clock, provider, setter, reporter }
    }

    pub fn stored(&self, key: &str) -> Option<serde_json::Value> { self.store.get(key) }
}

// ============================================================================
// Credential collaborators
// ============================================================================

/// Answers validations from a table; unknown keys are rejected.
#[derive(Default)]
pub struct ScriptedValidator {
    outcomes: Mutex<HashMap<String, Result<(), ProviderError>>>,
    pub calls: Mutex<Vec<String>>,
}

impl ScriptedValidator {
    pub fn new() -> Self { Self::default() }

    pub fn with(self, credential: &str, outcome: Result<(), ProviderError>) -> Self {
        self.set(credential, outcome);
        self
    }

    pub fn set(&self, credential: &str, outcome: Result<(), ProviderError>) {
        self.outcomes.lock().insert(credential.to_string(), outcome);
    }

    pub fn calls(&self) -> Vec<String> { self.calls.lock().clone() }
}

#[async_trait]
impl CredentialValidator for ScriptedValidator {
    async fn validate_credential(&self, credential: &str) -> Result<(), ProviderError> {
        self.calls.lock().push(credential.to_string());
        self.outcomes.lock().get(credential).cloned().unwrap_or(Err(ProviderError::Unauthorized))
    }
}

// ============================================================================
// Connectivity
// ============================================================================

/// Reports whatever the test last set.
#[derive(Default)]
pub struct SwitchProbe {
    connected: AtomicBool,
}

impl SwitchProbe {
    pub fn set_connected(&self, connected: bool) { self.connected.store(connected, Ordering::SeqCst); }
}

#[async_trait]
impl ReachabilityProbe for SwitchProbe {
    async fn probe(&self) -> ConnectivityStatus {
        if self.connected.load(Ordering::SeqCst) {
            ConnectivityStatus::Connected
        } else {
            ConnectivityStatus::Disconnected
        }
    }
}
