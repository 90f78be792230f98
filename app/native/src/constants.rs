//! Application-wide constants.

/// Application name, used for directory names and the IPC socket.
pub const APP_NAME: &str = "backdrop";

/// Environment variable holding the `tracing` filter directive.
pub const LOG_ENV_VAR: &str = "BACKDROP_LOG";

/// Default `tracing` filter when [`LOG_ENV_VAR`] is unset.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Prefix of access keys read from a `.env` keys file.
///
/// Every entry starting with this prefix (e.g. `BACKDROP_ACCESS_KEY_2`) is
/// appended to the credential pool, ordered by key name.
pub const ACCESS_KEY_ENV_PREFIX: &str = "BACKDROP_ACCESS_KEY";

/// Store keys owned by the scheduler and credential engine.
pub mod store_keys {
    /// Selected symbolic interval (`hourly`, `daily`, `weekly`).
    pub const SCHEDULER_INTERVAL: &str = "scheduler.interval";
    /// Absolute epoch time (seconds) of the next scheduled fire.
    pub const SCHEDULER_NEXT_FIRE: &str = "scheduler.nextFireUnixTime";
    /// Sticky owed-retry flag set when a fire failed for lack of network.
    pub const SCHEDULER_CONNECTIVITY_FAILURE: &str = "scheduler.lastFailureWasConnectivity";
    /// Path of the last wallpaper successfully applied.
    pub const SCHEDULER_LAST_WALLPAPER: &str = "scheduler.lastWallpaperPath";
    /// Last credential that passed validation.
    pub const ACTIVE_CREDENTIAL: &str = "credentials.activeCredential";
}
