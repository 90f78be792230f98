//! Persisted scheduler state.

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

use super::interval::{Interval, IntervalProfile};
use crate::constants::store_keys;
use crate::store::{self, Store};

/// Scheduler state that survives relaunches.
///
/// Every field is stored under its own key and written as soon as it
/// changes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleState {
    /// Selected cadence.
    pub interval: Interval,
    /// Absolute epoch time of the next fire. `None` means fire at the next opportunity.
    pub next_fire_unix_time: Option<f64>,
    /// `true` iff the most recent fire failed for lack of network.
    pub last_failure_was_connectivity: bool,
    /// Last wallpaper applied, re-applied after wake and space changes.
    pub last_wallpaper_path: Option<PathBuf>,
}

impl ScheduleState {
    /// Loads the state from `store`, using `default_interval` if none was selected yet.
    pub fn load(store: &dyn Store, default_interval: Interval) -> Self {
        Self {
            interval: store::get_typed(store, store_keys::SCHEDULER_INTERVAL)
                .unwrap_or(default_interval),
            next_fire_unix_time: store::get_typed(store, store_keys::SCHEDULER_NEXT_FIRE),
            last_failure_was_connectivity: store::get_typed(
                store,
                store_keys::SCHEDULER_CONNECTIVITY_FAILURE,
            )
            .unwrap_or(false),
            last_wallpaper_path: store::get_typed(store, store_keys::SCHEDULER_LAST_WALLPAPER),
        }
    }

    /// Returns the concrete interval duration under `profile`.
    #[must_use]
    pub const fn interval_duration(&self, profile: IntervalProfile) -> Duration {
        profile.duration(self.interval)
    }

    /// Selects a new interval and persists it.
    pub fn set_interval(&mut self, store: &dyn Store, interval: Interval) {
        self.interval = interval;
        store::persist(store, store_keys::SCHEDULER_INTERVAL, &interval);
    }

    /// Records the next fire time and persists it.
    pub fn set_next_fire(&mut self, store: &dyn Store, next_fire_unix_time: f64) {
        self.next_fire_unix_time = Some(next_fire_unix_time);
        store::persist(store, store_keys::SCHEDULER_NEXT_FIRE, &next_fire_unix_time);
    }

    /// Sets the owed-retry flag and persists it.
    pub fn set_connectivity_failure(&mut self, store: &dyn Store, failed: bool) {
        self.last_failure_was_connectivity = failed;
        store::persist(store, store_keys::SCHEDULER_CONNECTIVITY_FAILURE, &failed);
    }

    /// Records the last applied wallpaper and persists it.
    pub fn set_last_wallpaper(&mut self, store: &dyn Store, path: PathBuf) {
        store::persist(store, store_keys::SCHEDULER_LAST_WALLPAPER, &path);
        self.last_wallpaper_path = Some(path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_load_defaults_on_first_launch() {
        let store = MemoryStore::new();
        let state = ScheduleState::load(&store, Interval::Hourly);

        assert_eq!(state.interval, Interval::Hourly);
        assert_eq!(state.next_fire_unix_time, None);
        assert!(!state.last_failure_was_connectivity);
        assert_eq!(state.last_wallpaper_path, None);
    }

    #[test]
    fn test_mutations_survive_reload() {
        let store = MemoryStore::new();
        let mut state = ScheduleState::load(&store, Interval::Daily);

        state.set_interval(&store, Interval::Weekly);
        state.set_next_fire(&store, 1_234.5);
        state.set_connectivity_failure(&store, true);
        state.set_last_wallpaper(&store, PathBuf::from("/tmp/photo.jpg"));

        let reloaded = ScheduleState::load(&store, Interval::Daily);
        assert_eq!(reloaded, state);
    }

    #[test]
    fn test_persisted_interval_wins_over_default() {
        let store = MemoryStore::new();
        let mut state = ScheduleState::load(&store, Interval::Daily);
        state.set_interval(&store, Interval::Hourly);

        let reloaded = ScheduleState::load(&store, Interval::Weekly);
        assert_eq!(reloaded.interval, Interval::Hourly);
    }

    #[test]
    fn test_interval_duration_uses_profile() {
        let store = MemoryStore::new();
        let state = ScheduleState::load(&store, Interval::Hourly);
        assert_eq!(state.interval_duration(IntervalProfile::Mock), Duration::from_secs(60));
    }
}
