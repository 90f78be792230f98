//! Scheduler actor.
//!
//! The actor owns the schedule state and processes messages sequentially, so
//! timer fires, interval changes, connectivity signals and wake events never
//! interleave. A fire in progress holds the actor until it completes; signals
//! that arrive meanwhile queue up on the channel instead of blocking the
//! caller.
//!
//! Rescheduling always cancels the outstanding one-shot before arming a new
//! one, and every arm carries a generation number. A `TimerFired` message that
//! was already queued for a replaced timer is recognised by its stale
//! generation and dropped.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use super::clock::{Clock, compute_next_fire_time, time_until_fire, tolerance_for};
use super::handle::SchedulerHandle;
use super::interval::{Interval, IntervalProfile};
use super::messages::{ArmedTimer, FireOutcome, SchedulerMessage, SchedulerPhase, SchedulerSnapshot};
use super::state::ScheduleState;
use super::timer::OneShotTimer;
use crate::provider::{ErrorReporter, FailureKind, FireError, ImageProvider, WallpaperSetter};
use crate::store::Store;

/// Channel buffer size for the scheduler actor.
const CHANNEL_BUFFER_SIZE: usize = 64;

/// Default pause before the first fire after launch.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(3);

/// Collaborators injected into the scheduler.
#[derive(Clone)]
pub struct SchedulerDeps {
    pub store: Arc<dyn Store>,
    pub clock: Arc<dyn Clock>,
    pub provider: Arc<dyn ImageProvider>,
    pub setter: Arc<dyn WallpaperSetter>,
    pub reporter: Arc<dyn ErrorReporter>,
}

/// Tunables for the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerOptions {
    /// Maps symbolic intervals to durations.
    pub profile: IntervalProfile,
    /// Interval used until the user picks one.
    pub default_interval: Interval,
    /// Pause before the first fire after launch, letting the credential
    /// engine finish its initial validation.
    pub settle_delay: Duration,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            profile: IntervalProfile::default(),
            default_interval: Interval::default(),
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }
}

/// The actor that owns all scheduling state.
pub struct SchedulerActor {
    state: ScheduleState,
    phase: SchedulerPhase,
    timer: OneShotTimer,
    armed: Option<ArmedTimer>,
    fire_count: u64,
    started: bool,
    settle_pending: bool,
    deps: SchedulerDeps,
    options: SchedulerOptions,
    receiver: mpsc::Receiver<SchedulerMessage>,
    sender: mpsc::WeakSender<SchedulerMessage>,
}

impl SchedulerActor {
    /// Spawns the actor on the current tokio runtime and returns its handle.
    ///
    /// The actor stays idle until [`SchedulerHandle::start`] is called. It
    /// exits once every handle is dropped or on shutdown.
    #[must_use]
    pub fn spawn(deps: SchedulerDeps, options: SchedulerOptions) -> SchedulerHandle {
        let (sender, receiver) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        let state = ScheduleState::load(deps.store.as_ref(), options.default_interval);

        let actor = Self {
            state,
            phase: SchedulerPhase::Idle,
            timer: OneShotTimer::new(),
            armed: None,
            fire_count: 0,
            started: false,
            settle_pending: true,
            deps,
            options,
            receiver,
            sender: sender.downgrade(),
        };

        tokio::spawn(actor.run());

        SchedulerHandle::new(sender)
    }

    async fn run(mut self) {
        tracing::debug!("scheduler: actor message loop starting");

        while let Some(msg) = self.receiver.recv().await {
            tracing::trace!(message = msg.name(), "scheduler: handling message");

            if matches!(msg, SchedulerMessage::Shutdown) {
                self.timer.cancel();
                self.armed = None;
                self.phase = SchedulerPhase::Stopped;
                tracing::debug!("scheduler: received shutdown message");
                return;
            }

            self.handle_message(msg).await;
        }

        tracing::debug!("scheduler: channel closed, exiting");
    }

    async fn handle_message(&mut self, msg: SchedulerMessage) {
        match msg {
            SchedulerMessage::Start { respond_to } => {
                self.on_start().await;
                let _ = respond_to.send(());
            }
            SchedulerMessage::TimerFired { generation } => self.on_timer_fired(generation).await,
            SchedulerMessage::SetInterval { interval, respond_to } => {
                self.on_interval_selection_changed(interval);
                let _ = respond_to.send(());
            }
            SchedulerMessage::ConnectivityRestored { respond_to } => {
                let retried = self.on_connectivity_restored().await;
                let _ = respond_to.send(retried);
            }
            SchedulerMessage::FireNow { respond_to } => {
                let outcome = self.perform_fire().await;
                self.reschedule();
                let _ = respond_to.send(outcome);
            }
            SchedulerMessage::SystemWake => self.on_system_wake().await,
            SchedulerMessage::ActiveSpaceChanged => {
                self.reapply_last_wallpaper("active space change").await;
            }
            SchedulerMessage::Query { respond_to } => {
                let _ = respond_to.send(self.snapshot());
            }
            SchedulerMessage::Shutdown => {}
        }
    }

    // ========================================================================
    // Operations
    // ========================================================================

    async fn on_start(&mut self) {
        if self.started {
            tracing::debug!("scheduler: already started");
            return;
        }
        self.started = true;

        self.state = ScheduleState::load(self.deps.store.as_ref(), self.options.default_interval);
        let now = self.deps.clock.now_unix();
        let wait = self.state.next_fire_unix_time.and_then(|stored| time_until_fire(stored, now));

        match wait {
            Some(wait) => {
                tracing::info!(
                    interval = %self.state.interval,
                    wait_secs = wait.as_secs(),
                    "scheduler: resuming persisted schedule"
                );
                self.arm(wait);
            }
            None => {
                tracing::info!(
                    interval = %self.state.interval,
                    "scheduler: fire time past due, changing wallpaper now"
                );
                self.perform_fire().await;
                self.reschedule();
            }
        }
    }

    async fn on_timer_fired(&mut self, generation: u64) {
        if self.armed.is_none() || !self.timer.is_current(generation) {
            tracing::debug!(generation, "scheduler: ignoring stale timer fire");
            return;
        }

        self.timer.disarm();
        self.armed = None;
        self.perform_fire().await;
        self.reschedule();
    }

    fn on_interval_selection_changed(&mut self, interval: Interval) {
        tracing::info!(%interval, "scheduler: interval selection changed");
        self.state.set_interval(self.deps.store.as_ref(), interval);
        self.reschedule();
    }

    async fn on_connectivity_restored(&mut self) -> bool {
        if !self.state.last_failure_was_connectivity {
            return false;
        }

        tracing::info!("scheduler: connectivity restored, running owed retry");
        self.state.set_connectivity_failure(self.deps.store.as_ref(), false);
        self.perform_fire().await;
        self.reschedule();
        true
    }

    /// Re-applies the wallpaper and catches up with the wall clock.
    ///
    /// The timer sleeps on the monotonic clock, which stops while the machine
    /// is suspended, so the persisted fire time is checked again here.
    async fn on_system_wake(&mut self) {
        self.reapply_last_wallpaper("system wake").await;

        if !self.started {
            return;
        }
        let Some(next_fire) = self.state.next_fire_unix_time else {
            return;
        };

        match time_until_fire(next_fire, self.deps.clock.now_unix()) {
            Some(wait) => {
                tracing::debug!(wait_secs = wait.as_secs(), "scheduler: re-arming after wake");
                self.arm(wait);
            }
            None => {
                tracing::info!("scheduler: fire time passed during sleep, changing wallpaper now");
                self.timer.cancel();
                self.armed = None;
                self.perform_fire().await;
                self.reschedule();
            }
        }
    }

    async fn reapply_last_wallpaper(&self, reason: &str) {
        let Some(path) = self.state.last_wallpaper_path.clone() else {
            tracing::debug!(reason, "scheduler: no wallpaper to re-apply");
            return;
        };

        match self.deps.setter.reapply_wallpaper(&path).await {
            Ok(()) => tracing::debug!(reason, path = %path.display(), "scheduler: re-applied wallpaper"),
            Err(err) => self.deps.reporter.report(&FireError::Apply(err)),
        }
    }

    /// Runs one fire: fetch the next image and apply it.
    async fn perform_fire(&mut self) -> FireOutcome {
        self.phase = SchedulerPhase::Firing;
        self.fire_count += 1;

        if self.settle_pending {
            self.settle_pending = false;
            if !self.options.settle_delay.is_zero() {
                tracing::debug!(
                    delay_ms = self.options.settle_delay.as_millis(),
                    "scheduler: waiting for subsystems to settle"
                );
                tokio::time::sleep(self.options.settle_delay).await;
            }
        }

        let outcome = match self.fetch_and_apply().await {
            Ok(path) => {
                tracing::info!(path = %path.display(), "scheduler: wallpaper changed");
                let store = self.deps.store.as_ref();
                if self.state.last_failure_was_connectivity {
                    self.state.set_connectivity_failure(store, false);
                }
                self.state.set_last_wallpaper(store, path.clone());
                FireOutcome::Applied { path }
            }
            Err(err) if err.kind() == FailureKind::Connectivity => {
                tracing::warn!(error = %err, "scheduler: offline, retry owed on reconnect");
                self.state.set_connectivity_failure(self.deps.store.as_ref(), true);
                FireOutcome::Deferred
            }
            Err(err) => {
                self.deps.reporter.report(&err);
                FireOutcome::Failed { message: err.to_string() }
            }
        };

        self.phase = if self.armed.is_some() { SchedulerPhase::Armed } else { SchedulerPhase::Idle };
        outcome
    }

    async fn fetch_and_apply(&self) -> Result<PathBuf, FireError> {
        let path = self.deps.provider.fetch_next_image().await?;
        self.deps.setter.apply_wallpaper(&path).await?;
        Ok(path)
    }

    /// Persists `now + interval` as the next fire time and arms the timer for it.
    fn reschedule(&mut self) {
        let interval = self.state.interval_duration(self.options.profile);
        let next = compute_next_fire_time(self.deps.clock.now_unix(), interval);
        self.state.set_next_fire(self.deps.store.as_ref(), next);
        self.arm(interval);
    }

    /// Replaces the armed timer with one that fires after `after`.
    fn arm(&mut self, after: Duration) {
        let tolerance = tolerance_for(self.state.interval_duration(self.options.profile));
        let sender = self.sender.clone();

        let generation = self.timer.arm(after, tolerance, move |generation| async move {
            let Some(sender) = sender.upgrade() else {
                return;
            };
            if sender.send(SchedulerMessage::TimerFired { generation }).await.is_err() {
                tracing::debug!(generation, "scheduler: actor gone before timer fire");
            }
        });

        self.armed = Some(ArmedTimer {
            generation,
            deadline_unix_time: self.deps.clock.now_unix() + after.as_secs_f64(),
            tolerance_secs: tolerance.as_secs_f64(),
        });
        self.phase = SchedulerPhase::Armed;

        tracing::debug!(
            generation,
            after_secs = after.as_secs(),
            tolerance_secs = tolerance.as_secs(),
            "scheduler: armed timer"
        );
    }

    fn snapshot(&self) -> SchedulerSnapshot {
        SchedulerSnapshot {
            phase: self.phase,
            interval: self.state.interval,
            interval_secs: self.state.interval_duration(self.options.profile).as_secs(),
            next_fire_unix_time: self.state.next_fire_unix_time,
            last_failure_was_connectivity: self.state.last_failure_was_connectivity,
            last_wallpaper_path: self.state.last_wallpaper_path.clone(),
            armed: self.armed,
            fire_count: self.fire_count,
        }
    }
}
