//! Messages and snapshots exchanged with the scheduler actor.

use std::path::PathBuf;

use serde::Serialize;
use tokio::sync::oneshot;

use super::interval::Interval;

/// Messages processed by the scheduler actor, one at a time.
#[derive(Debug)]
pub enum SchedulerMessage {
    /// Load persisted state, fire if past due, and arm the timer.
    Start { respond_to: oneshot::Sender<()> },
    /// The one-shot timer armed with `generation` elapsed.
    TimerFired { generation: u64 },
    /// The user picked a new cadence.
    SetInterval { interval: Interval, respond_to: oneshot::Sender<()> },
    /// The network came back; service any owed retry.
    ConnectivityRestored { respond_to: oneshot::Sender<bool> },
    /// Change the wallpaper now and restart the interval.
    FireNow { respond_to: oneshot::Sender<FireOutcome> },
    /// The machine woke from sleep.
    SystemWake,
    /// The active space (virtual desktop) changed.
    ActiveSpaceChanged,
    /// Return a snapshot of the current state.
    Query { respond_to: oneshot::Sender<SchedulerSnapshot> },
    /// Cancel the timer and stop processing messages.
    Shutdown,
}

impl SchedulerMessage {
    /// Returns a short name for logging.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Start { .. } => "Start",
            Self::TimerFired { .. } => "TimerFired",
            Self::SetInterval { .. } => "SetInterval",
            Self::ConnectivityRestored { .. } => "ConnectivityRestored",
            Self::FireNow { .. } => "FireNow",
            Self::SystemWake => "SystemWake",
            Self::ActiveSpaceChanged => "ActiveSpaceChanged",
            Self::Query { .. } => "Query",
            Self::Shutdown => "Shutdown",
        }
    }
}

/// Scheduler lifecycle phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SchedulerPhase {
    /// Not started yet.
    #[default]
    Idle,
    /// Waiting for the armed timer.
    Armed,
    /// A fire is in progress.
    Firing,
    /// Shut down.
    Stopped,
}

/// Result of a single fire attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "camelCase")]
pub enum FireOutcome {
    /// A new wallpaper was applied.
    Applied { path: PathBuf },
    /// The fire failed for lack of network; a retry is owed.
    Deferred,
    /// The fire failed for another reason and was reported.
    Failed { message: String },
}

/// The timer currently waiting to fire.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArmedTimer {
    /// Generation of the arm; stale fires carry an older one.
    pub generation: u64,
    /// Absolute epoch time the timer targets.
    pub deadline_unix_time: f64,
    /// Allowed coalescing slack, in seconds.
    pub tolerance_secs: f64,
}

/// Point-in-time view of the scheduler.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerSnapshot {
    pub phase: SchedulerPhase,
    pub interval: Interval,
    pub interval_secs: u64,
    pub next_fire_unix_time: Option<f64>,
    pub last_failure_was_connectivity: bool,
    pub last_wallpaper_path: Option<PathBuf>,
    pub armed: Option<ArmedTimer>,
    /// Fire attempts since the actor started.
    pub fire_count: u64,
}
