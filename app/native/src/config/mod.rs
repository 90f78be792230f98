//! Configuration loading for Backdrop.
//!
//! The configuration file supports JSONC format (JSON with comments).
//! Both single-line (`//`) and multi-line (`/* */`) comments are allowed.
//! Nothing here is global: the loaded [`LoadedConfig`] is passed to whoever
//! builds the runtime.

pub mod env;
pub mod schema;
pub mod template;
pub mod types;

use std::path::{Path, PathBuf};

pub use schema::{generate_schema, generate_schema_json};
pub use types::{
    BackdropConfig, ConfigError, ConnectivityConfig, CredentialsConfig, ProviderConfig,
    SchedulerConfig, WakeConfig, config_paths, load_config, load_config_from_path,
};

/// A configuration together with where it came from.
#[derive(Debug, Clone, Default)]
pub struct LoadedConfig {
    pub config: BackdropConfig,
    /// The file it was read from, if any.
    pub path: Option<PathBuf>,
}

impl LoadedConfig {
    /// Returns the directory relative paths in the config resolve against.
    #[must_use]
    pub fn base_dir(&self) -> PathBuf {
        self.path
            .as_deref()
            .and_then(Path::parent)
            .map_or_else(|| std::env::current_dir().unwrap_or_default(), Path::to_path_buf)
    }

    /// Returns the candidate access keys: inline `keys` followed by the
    /// entries of `keysFile`.
    #[must_use]
    pub fn access_keys(&self) -> Vec<String> {
        let credentials = &self.config.credentials;
        let mut keys = credentials.keys.clone();
        if let Some(keys_file) = credentials.keys_file.as_deref() {
            keys.extend(env::load_access_keys(keys_file, &self.base_dir()));
        }
        keys
    }
}

/// Loads the configuration from `custom` or the default search paths.
///
/// A missing file yields defaults and, when no custom path was given, a
/// commented template is written at the preferred location.
///
/// # Errors
///
/// Returns an error if a file exists but cannot be read or parsed, or if a
/// custom path does not exist.
pub fn load(custom: Option<&Path>) -> Result<LoadedConfig, ConfigError> {
    let result = custom.map_or_else(load_config, load_config_from_path);

    match result {
        Ok((config, path)) => {
            tracing::debug!(path = %path.display(), "loaded configuration");
            Ok(LoadedConfig { config, path: Some(path) })
        }
        Err(ConfigError::NotFound) if custom.is_none() => Ok(LoadedConfig {
            config: BackdropConfig::default(),
            path: create_default_config_file(),
        }),
        Err(err) => Err(err),
    }
}

/// Creates a template configuration file at the preferred location.
fn create_default_config_file() -> Option<PathBuf> {
    let Some(config_path) = config_paths().into_iter().next() else {
        tracing::debug!("no config path available for creating template");
        return None;
    };

    if config_path.exists() {
        return None;
    }

    match template::create_config_file(&config_path) {
        Ok(()) => {
            tracing::info!(path = %config_path.display(), "created default configuration file");
            Some(config_path)
        }
        Err(err) => {
            tracing::debug!(
                error = %err,
                path = %config_path.display(),
                "failed to create default configuration file"
            );
            None
        }
    }
}
