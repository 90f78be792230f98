//! Configuration types for Backdrop.
//!
//! Every section is optional in the file; missing keys take their defaults.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::connectivity::{DEFAULT_DEBOUNCE, DEFAULT_PROBE_HOST, DEFAULT_PROBE_INTERVAL, DEFAULT_PROBE_TIMEOUT};
use crate::constants::APP_NAME;
use crate::provider::DEFAULT_API_BASE;
use crate::scheduler::{DEFAULT_SETTLE_DELAY, Interval, IntervalProfile};
use crate::system::{DEFAULT_JUMP_THRESHOLD, DEFAULT_POLL_INTERVAL};

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct BackdropConfig {
    /// Wallpaper schedule.
    pub scheduler: SchedulerConfig,
    /// Access key pool.
    pub credentials: CredentialsConfig,
    /// Network reachability monitor.
    pub connectivity: ConnectivityConfig,
    /// Photo API.
    pub provider: ProviderConfig,
    /// Sleep detection.
    pub wake: WakeConfig,
}

/// Wallpaper schedule configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct SchedulerConfig {
    /// Interval used until one is selected at runtime. A persisted selection
    /// always wins over this value.
    pub interval: Interval,
    /// Duration table: `production` (hours/days/weeks) or `mock` (minutes).
    pub profile: IntervalProfile,
    /// Seconds to wait before the first fire after launch.
    pub settle_delay_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Interval::default(),
            profile: IntervalProfile::default(),
            settle_delay_secs: DEFAULT_SETTLE_DELAY.as_secs(),
        }
    }
}

impl SchedulerConfig {
    #[must_use]
    pub const fn settle_delay(&self) -> Duration { Duration::from_secs(self.settle_delay_secs) }
}

/// Access key pool configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct CredentialsConfig {
    /// Ordered candidate keys. Order defines the rotation sequence.
    pub keys: Vec<String>,
    /// Path to a `.env` file whose `BACKDROP_ACCESS_KEY*` entries are
    /// appended to `keys`, sorted by variable name. Relative paths resolve
    /// against the config file's directory.
    pub keys_file: Option<String>,
}

/// Reachability monitor configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct ConnectivityConfig {
    /// `host:port` opened to test reachability.
    pub probe_host: String,
    /// Seconds between probes.
    pub probe_interval_secs: u64,
    /// Milliseconds a new status must hold before it is published.
    pub debounce_ms: u64,
    /// Milliseconds allowed for one probe.
    pub probe_timeout_ms: u64,
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self {
            probe_host: DEFAULT_PROBE_HOST.to_string(),
            probe_interval_secs: DEFAULT_PROBE_INTERVAL.as_secs(),
            debounce_ms: duration_millis(DEFAULT_DEBOUNCE),
            probe_timeout_ms: duration_millis(DEFAULT_PROBE_TIMEOUT),
        }
    }
}

impl ConnectivityConfig {
    #[must_use]
    pub const fn probe_interval(&self) -> Duration { Duration::from_secs(self.probe_interval_secs) }

    #[must_use]
    pub const fn debounce(&self) -> Duration { Duration::from_millis(self.debounce_ms) }

    #[must_use]
    pub const fn probe_timeout(&self) -> Duration { Duration::from_millis(self.probe_timeout_ms) }
}

/// Photo API configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct ProviderConfig {
    /// API endpoint.
    pub api_base: String,
    /// Optional search query for random photos.
    pub query: Option<String>,
    /// Photo orientation: `landscape`, `portrait` or `squarish`.
    pub orientation: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            query: None,
            orientation: Some("landscape".to_string()),
        }
    }
}

/// Sleep detection configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct WakeConfig {
    /// Seconds between wall clock samples.
    pub poll_interval_secs: u64,
    /// Unexplained wall clock advance, in seconds, that counts as a wake.
    pub jump_threshold_secs: u64,
}

impl Default for WakeConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: DEFAULT_POLL_INTERVAL.as_secs(),
            jump_threshold_secs: DEFAULT_JUMP_THRESHOLD.as_secs(),
        }
    }
}

impl WakeConfig {
    #[must_use]
    pub const fn poll_interval(&self) -> Duration { Duration::from_secs(self.poll_interval_secs) }

    #[must_use]
    pub const fn jump_threshold(&self) -> Duration { Duration::from_secs(self.jump_threshold_secs) }
}

fn duration_millis(duration: Duration) -> u64 { u64::try_from(duration.as_millis()).unwrap_or(u64::MAX) }

// ============================================================================
// Loading
// ============================================================================

/// Errors that can occur when loading the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No configuration file was found in any of the expected locations.
    #[error("No configuration file found. Expected at ~/.config/backdrop/config.jsonc or config.json")]
    NotFound,
    /// The configuration file exists but could not be read.
    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),
    /// The configuration file contains invalid JSON.
    #[error("Failed to parse configuration file: {0}")]
    ParseError(#[from] serde_json::Error),
}

/// Configuration file names to search for (in priority order).
const CONFIG_FILE_NAMES: &[&str] = &["config.jsonc", "config.json"];

/// Returns the possible configuration file paths in priority order.
///
/// 1. `$XDG_CONFIG_HOME/backdrop/` when set
/// 2. `~/.config/backdrop/`
/// 3. `dirs::config_dir()/backdrop/` (`~/Library/Application Support` on macOS)
///
/// Each location is checked for `config.jsonc` then `config.json`.
#[must_use]
pub fn config_paths() -> Vec<PathBuf> {
    let mut dirs_to_check = Vec::new();

    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        dirs_to_check.push(PathBuf::from(xdg_config).join(APP_NAME));
    }
    if let Some(home) = dirs::home_dir() {
        dirs_to_check.push(home.join(".config").join(APP_NAME));
    }
    if let Some(config_dir) = dirs::config_dir() {
        dirs_to_check.push(config_dir.join(APP_NAME));
    }

    let mut paths: Vec<PathBuf> = Vec::new();
    for dir in dirs_to_check {
        for filename in CONFIG_FILE_NAMES {
            let path = dir.join(filename);
            // XDG_CONFIG_HOME is often ~/.config itself
            if !paths.contains(&path) {
                paths.push(path);
            }
        }
    }

    paths
}

/// Loads the configuration from the first available config file.
///
/// # Errors
///
/// Returns `ConfigError::NotFound` if no configuration file exists, or the
/// read/parse error of the first file found.
pub fn load_config() -> Result<(BackdropConfig, PathBuf), ConfigError> {
    config_paths()
        .into_iter()
        .find(|path| path.exists())
        .map_or(Err(ConfigError::NotFound), load_config_from_path)
}

/// Loads the configuration from `path`, stripping JSONC comments.
///
/// # Errors
///
/// Returns `ConfigError::NotFound` if `path` does not exist, or the
/// read/parse error.
pub fn load_config_from_path(path: impl AsRef<Path>) -> Result<(BackdropConfig, PathBuf), ConfigError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ConfigError::NotFound);
    }

    let file = fs::File::open(path)?;
    let reader = json_comments::StripComments::new(file);
    let config: BackdropConfig = serde_json::from_reader(reader)?;
    Ok((config, path.to_path_buf()))
}
