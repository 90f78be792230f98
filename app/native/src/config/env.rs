//! Environment file parsing.
//!
//! Access keys can live in a `.env` file referenced from the config instead
//! of the config itself. Parsing uses the `dotenvy` crate.

use std::collections::BTreeMap;
use std::path::Path;

use crate::constants::ACCESS_KEY_ENV_PREFIX;
use crate::platform::path::expand_and_resolve;

/// Parses an environment file and returns its entries sorted by name.
///
/// Returns an empty map if the file doesn't exist or can't be read.
#[must_use]
pub fn parse_env_file(path: &Path) -> BTreeMap<String, String> {
    match dotenvy::from_path_iter(path) {
        Ok(iter) => iter.filter_map(Result::ok).collect(),
        Err(err) => {
            if path.exists() {
                tracing::warn!(path = %path.display(), error = %err, "failed to read env file");
            }
            BTreeMap::new()
        }
    }
}

/// Loads access keys from an environment file.
///
/// Every `BACKDROP_ACCESS_KEY*` entry is returned, ordered by variable name
/// so `BACKDROP_ACCESS_KEY_1` precedes `BACKDROP_ACCESS_KEY_2`.
///
/// # Arguments
///
/// * `keys_file` - Path to the env file (can be relative or absolute)
/// * `config_dir` - Directory containing the config file (for resolving relative paths)
#[must_use]
pub fn load_access_keys(keys_file: &str, config_dir: &Path) -> Vec<String> {
    if keys_file.trim().is_empty() {
        return Vec::new();
    }

    let resolved_path = expand_and_resolve(keys_file, config_dir);

    parse_env_file(&resolved_path)
        .into_iter()
        .filter(|(name, _)| name.starts_with(ACCESS_KEY_ENV_PREFIX))
        .map(|(_, value)| value)
        .collect()
}
