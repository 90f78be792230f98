//! Persistent, restart-safe wallpaper scheduler.
//!
//! - [`clock`] - absolute/relative fire time arithmetic
//! - [`interval`] - symbolic cadences and duration profiles
//! - [`timer`] - cancellable one-shot timer
//! - [`state`] - persisted schedule state
//! - [`SchedulerActor`] / [`SchedulerHandle`] - the single-writer state machine

mod actor;
pub mod clock;
mod handle;
pub mod interval;
mod messages;
pub mod state;
pub mod timer;

pub use actor::{DEFAULT_SETTLE_DELAY, SchedulerActor, SchedulerDeps, SchedulerOptions};
pub use clock::{Clock, ManualClock, SystemClock};
pub use handle::SchedulerHandle;
pub use interval::{Interval, IntervalProfile};
pub use messages::{ArmedTimer, FireOutcome, SchedulerPhase, SchedulerSnapshot};
pub use state::ScheduleState;
