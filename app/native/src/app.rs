//! Runtime wiring.
//!
//! [`Backdrop`] owns one instance of every subsystem, built from injected
//! collaborators. The connectivity monitor fans transitions out to the
//! credential engine and the scheduler; system events reach the scheduler
//! through [`SystemEvents`].
//!
//! On a `connected` transition the credential engine's parked validation is
//! retried first and awaited, then the scheduler's owed fire runs, so the fire
//! sees the freshest credential. A validation that parks on connectivity while
//! the monitor already reports `connected` gets no transition, so it is
//! retried on a fixed cadence instead.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::cache::{get_cache_subdir, get_state_file_path};
use crate::config::BackdropConfig;
use crate::connectivity::{ConnectivityMonitor, ConnectivityStatus, ConnectivityWatcher, ReachabilityProbe, TcpProbe};
use crate::credentials::{CredentialEngine, CredentialHandle, CredentialPool, CredentialSnapshot, CredentialStatus};
use crate::error::BackdropError;
use crate::ipc::{IpcQuery, IpcResponse};
use crate::provider::{
    CredentialSource, CredentialValidator, DesktopWallpaper, ErrorReporter, ImageProvider, PhotoQuery,
    TracingReporter, UnsplashClient, UnsplashImageProvider, WallpaperSetter,
};
use crate::scheduler::{Clock, SchedulerActor, SchedulerDeps, SchedulerHandle, SchedulerOptions, SchedulerSnapshot, SystemClock};
use crate::store::{JsonFileStore, Store};
use crate::system::{SystemEvent, SystemEvents, WakeDetector};

/// How long a status query waits for a busy scheduler.
const STATUS_TIMEOUT: Duration = Duration::from_secs(2);

/// How often a validation parked while connected is retried.
const PARKED_RETRY_INTERVAL: Duration = Duration::from_secs(60);

/// Cache subdirectory for downloaded images.
const DOWNLOADS_SUBDIR: &str = "wallpapers";

/// Combined view of every subsystem.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackdropStatus {
    /// `None` while a fire keeps the scheduler busy.
    pub scheduler: Option<SchedulerSnapshot>,
    /// Keys are masked.
    pub credentials: CredentialSnapshot,
    pub connectivity: ConnectivityStatus,
    /// User-facing hint for the credential status, if any.
    pub message: Option<&'static str>,
}

/// Builds a [`Backdrop`] from a configuration and optional collaborator
/// overrides. Unset collaborators get their production implementation.
#[derive(Default)]
pub struct BackdropBuilder {
    config: BackdropConfig,
    access_keys: Vec<String>,
    store: Option<Arc<dyn Store>>,
    clock: Option<Arc<dyn Clock>>,
    validator: Option<Arc<dyn CredentialValidator>>,
    provider: Option<Arc<dyn ImageProvider>>,
    setter: Option<Arc<dyn WallpaperSetter>>,
    reporter: Option<Arc<dyn ErrorReporter>>,
    probe: Option<Arc<dyn ReachabilityProbe>>,
    download_dir: Option<PathBuf>,
    wake_detection: bool,
}

impl BackdropBuilder {
    #[must_use]
    pub fn config(mut self, config: BackdropConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the ordered candidate pool.
    #[must_use]
    pub fn access_keys(mut self, keys: Vec<String>) -> Self {
        self.access_keys = keys;
        self
    }

    #[must_use]
    pub fn store(mut self, store: Arc<dyn Store>) -> Self {
        self.store = Some(store);
        self
    }

    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    #[must_use]
    pub fn validator(mut self, validator: Arc<dyn CredentialValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    #[must_use]
    pub fn image_provider(mut self, provider: Arc<dyn ImageProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    #[must_use]
    pub fn wallpaper_setter(mut self, setter: Arc<dyn WallpaperSetter>) -> Self {
        self.setter = Some(setter);
        self
    }

    #[must_use]
    pub fn error_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    #[must_use]
    pub fn probe(mut self, probe: Arc<dyn ReachabilityProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    #[must_use]
    pub fn download_dir(mut self, dir: PathBuf) -> Self {
        self.download_dir = Some(dir);
        self
    }

    /// Enables the wall clock gap detector that emits wake events.
    #[must_use]
    pub const fn wake_detection(mut self, enabled: bool) -> Self {
        self.wake_detection = enabled;
        self
    }

    /// Spawns every subsystem on the current tokio runtime.
    ///
    /// Returns once the credential engine has published its initial state.
    /// The scheduler starts in the background; a past-due fire runs before
    /// any connectivity transition is serviced.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool is empty, the state file cannot be
    /// opened, or the HTTP client cannot be created.
    pub async fn start(self) -> Result<Backdrop, BackdropError> {
        let config = self.config;

        let pool = CredentialPool::new(self.access_keys)
            .map_err(|err| BackdropError::CredentialError(err.to_string()))?;

        let store: Arc<dyn Store> = match self.store {
            Some(store) => store,
            None => Arc::new(
                JsonFileStore::open(get_state_file_path())
                    .map_err(|err| BackdropError::IoError(err.to_string()))?,
            ),
        };

        let needs_client = self.validator.is_none() || self.provider.is_none();
        let client = if needs_client {
            Some(
                UnsplashClient::new(config.provider.api_base.clone())
                    .map_err(|err| BackdropError::ConfigError(err.to_string()))?,
            )
        } else {
            None
        };

        let validator: Arc<dyn CredentialValidator> = match self.validator {
            Some(validator) => validator,
            None => Arc::new(require_client(client.as_ref())?.clone()),
        };

        // Credential engine
        let credentials = CredentialEngine::spawn(pool, Arc::clone(&store), validator);
        credentials.initialize().await?;

        // Scheduler
        let provider: Arc<dyn ImageProvider> = match self.provider {
            Some(provider) => provider,
            None => {
                let source: Arc<dyn CredentialSource> = Arc::new(credentials.clone());
                Arc::new(UnsplashImageProvider::new(
                    require_client(client.as_ref())?.clone(),
                    source,
                    self.download_dir.unwrap_or_else(|| get_cache_subdir(DOWNLOADS_SUBDIR)),
                    PhotoQuery {
                        query: config.provider.query.clone(),
                        orientation: config.provider.orientation.clone(),
                    },
                ))
            }
        };

        let deps = SchedulerDeps {
            store,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            provider,
            setter: self.setter.unwrap_or_else(|| Arc::new(DesktopWallpaper::new())),
            reporter: self.reporter.unwrap_or_else(|| Arc::new(TracingReporter)),
        };
        let options = SchedulerOptions {
            profile: config.scheduler.profile,
            default_interval: config.scheduler.interval,
            settle_delay: config.scheduler.settle_delay(),
        };
        let scheduler = SchedulerActor::spawn(deps, options);

        // System events
        let events = Arc::new(SystemEvents::new());
        {
            let scheduler = scheduler.clone();
            events.on_wake(move || {
                if let Err(err) = scheduler.system_wake() {
                    tracing::warn!(error = %err, "failed to forward wake to scheduler");
                }
            });
        }
        {
            let scheduler = scheduler.clone();
            events.on_active_space_change(move || {
                if let Err(err) = scheduler.active_space_changed() {
                    tracing::warn!(error = %err, "failed to forward space change to scheduler");
                }
            });
        }

        // Connectivity fan-out
        let probe = self.probe.unwrap_or_else(|| {
            Arc::new(TcpProbe::new(
                config.connectivity.probe_host.clone(),
                config.connectivity.probe_timeout(),
            ))
        });
        let monitor = ConnectivityMonitor::new(probe)
            .with_probe_interval(config.connectivity.probe_interval())
            .with_debounce(config.connectivity.debounce());

        let (status_tx, status_rx) = mpsc::unbounded_channel();
        monitor.subscribe(move |status| {
            let _ = status_tx.send(status);
        });
        let connectivity = monitor.spawn();

        let mut tasks = vec![tokio::spawn(fan_out(
            scheduler.clone(),
            credentials.clone(),
            status_rx,
            connectivity.receiver(),
        ))];

        if self.wake_detection {
            let detector = WakeDetector::new(config.wake.poll_interval(), config.wake.jump_threshold());
            tasks.push(detector.spawn(Arc::clone(&events)));
        }

        tracing::info!(pool_size = credentials.snapshot().pool_size, "backdrop started");

        Ok(Backdrop { scheduler, credentials, connectivity, events, tasks })
    }
}

fn require_client(client: Option<&UnsplashClient>) -> Result<&UnsplashClient, BackdropError> {
    client.ok_or_else(|| BackdropError::ConfigError("photo API client unavailable".to_string()))
}

/// Starts the scheduler, then forwards each connectivity transition.
async fn fan_out(
    scheduler: SchedulerHandle,
    credentials: CredentialHandle,
    mut statuses: mpsc::UnboundedReceiver<ConnectivityStatus>,
    connectivity: watch::Receiver<ConnectivityStatus>,
) {
    if let Err(err) = scheduler.start().await {
        tracing::error!(error = %err, "failed to start scheduler");
        return;
    }

    let mut parked_retry = tokio::time::interval(PARKED_RETRY_INTERVAL);
    parked_retry.set_missed_tick_behavior(MissedTickBehavior::Delay);
    parked_retry.tick().await;

    loop {
        tokio::select! {
            status = statuses.recv() => {
                let Some(status) = status else {
                    break;
                };
                if status.is_connected() {
                    retry_after_reconnect(&scheduler, &credentials).await;
                }
            }
            _ = parked_retry.tick() => {
                let connected = connectivity.borrow().is_connected();
                if connected && credentials.status() == CredentialStatus::NoConnectivity {
                    tracing::debug!("credential validation parked while connected, retrying");
                    retry_after_reconnect(&scheduler, &credentials).await;
                }
            }
        }
    }
}

/// Retries the credential engine's parked validation, then the owed fire.
async fn retry_after_reconnect(scheduler: &SchedulerHandle, credentials: &CredentialHandle) {
    match credentials.connectivity_restored().await {
        Ok(true) => tracing::debug!("credential validation retried after reconnect"),
        Ok(false) => {}
        Err(err) => tracing::warn!(error = %err, "credential engine unavailable"),
    }

    match scheduler.connectivity_restored().await {
        Ok(true) => tracing::debug!("owed wallpaper change ran after reconnect"),
        Ok(false) => {}
        Err(err) => tracing::warn!(error = %err, "scheduler unavailable"),
    }
}

/// A running Backdrop instance.
pub struct Backdrop {
    scheduler: SchedulerHandle,
    credentials: CredentialHandle,
    connectivity: ConnectivityWatcher,
    events: Arc<SystemEvents>,
    tasks: Vec<JoinHandle<()>>,
}

impl Backdrop {
    #[must_use]
    pub fn builder() -> BackdropBuilder { BackdropBuilder { wake_detection: true, ..BackdropBuilder::default() } }

    #[must_use]
    pub const fn scheduler(&self) -> &SchedulerHandle { &self.scheduler }

    #[must_use]
    pub const fn credentials(&self) -> &CredentialHandle { &self.credentials }

    #[must_use]
    pub fn connectivity(&self) -> ConnectivityStatus { self.connectivity.status() }

    /// Returns the hub system signals are delivered through.
    #[must_use]
    pub fn system_events(&self) -> Arc<SystemEvents> { Arc::clone(&self.events) }

    /// Collects a status report from every subsystem.
    pub async fn status(&self) -> BackdropStatus {
        let scheduler = match self.scheduler.snapshot_timeout(STATUS_TIMEOUT).await {
            Ok(snapshot) => Some(snapshot),
            Err(err) => {
                tracing::debug!(error = %err, "scheduler snapshot unavailable");
                None
            }
        };
        let credentials = self.credentials.snapshot();

        BackdropStatus {
            scheduler,
            message: credentials.status.user_message(),
            credentials: credentials.redacted(),
            connectivity: self.connectivity(),
        }
    }

    /// Answers one IPC query.
    pub async fn handle_query(&self, query: IpcQuery) -> IpcResponse {
        match query {
            IpcQuery::Ping => IpcResponse::success("pong"),
            IpcQuery::Status => IpcResponse::success(self.status().await),
            IpcQuery::SetInterval { interval } => match self.scheduler.set_interval(interval).await {
                Ok(()) => IpcResponse::success(self.status().await),
                Err(err) => IpcResponse::error(err.to_string()),
            },
            IpcQuery::Next => match self.scheduler.fire_now().await {
                Ok(outcome) => IpcResponse::success(outcome),
                Err(err) => IpcResponse::error(err.to_string()),
            },
            IpcQuery::Wake => IpcResponse::success(self.events.emit(SystemEvent::Wake)),
            IpcQuery::SpaceChanged => {
                IpcResponse::success(self.events.emit(SystemEvent::ActiveSpaceChanged))
            }
            IpcQuery::AddCredential { credential } => {
                match self.credentials.add_credential(credential).await {
                    Ok(status) => IpcResponse::success(AddCredentialReply {
                        status,
                        message: status.user_message(),
                    }),
                    Err(err) => IpcResponse::error(err.to_string()),
                }
            }
        }
    }

    /// Stops every subsystem.
    pub async fn shutdown(&self) {
        for task in &self.tasks {
            task.abort();
        }
        self.connectivity.stop();
        let _ = self.scheduler.shutdown().await;
        self.credentials.shutdown().await;
        tracing::info!("backdrop stopped");
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AddCredentialReply {
    status: CredentialStatus,
    message: Option<&'static str>,
}
