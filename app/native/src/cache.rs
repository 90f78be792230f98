//! Cache and data directory utilities.
//!
//! Downloaded wallpapers and the IPC socket live under
//! `~/Library/Caches/backdrop/` on macOS (`~/.cache/backdrop/` elsewhere), with
//! a fallback to `/tmp/backdrop/`. Persisted scheduler and credential state
//! lives under the platform data directory so clearing caches never loses it.

use std::path::PathBuf;

use crate::constants::APP_NAME;

/// File name of the persisted key-value state.
const STATE_FILENAME: &str = "state.json";

/// Returns the root cache directory for the application.
#[must_use]
pub fn get_cache_dir() -> PathBuf {
    dirs::cache_dir().map_or_else(|| PathBuf::from(format!("/tmp/{APP_NAME}")), |cache| cache.join(APP_NAME))
}

/// Returns a cache subdirectory for the given component (e.g. `wallpapers`).
#[must_use]
pub fn get_cache_subdir(subdir: &str) -> PathBuf { get_cache_dir().join(subdir) }

/// Returns the directory holding persisted application state.
///
/// Falls back to the cache directory when no data directory is available.
#[must_use]
pub fn get_data_dir() -> PathBuf {
    dirs::data_dir().map_or_else(get_cache_dir, |data| data.join(APP_NAME))
}

/// Returns the path of the JSON file backing the persistent store.
#[must_use]
pub fn get_state_file_path() -> PathBuf { get_data_dir().join(STATE_FILENAME) }

/// Removes downloaded wallpapers except the `keep` most recent ones.
///
/// Returns the number of files removed.
///
/// # Errors
///
/// Returns an error if the directory cannot be read. Individual removal
/// failures are logged and skipped.
pub fn prune_downloads(dir: &std::path::Path, keep: usize) -> std::io::Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }

    let mut files: Vec<(std::time::SystemTime, PathBuf)> = std::fs::read_dir(dir)?
        .filter_map(Result::ok)
        .filter(|entry| entry.path().is_file())
        .filter_map(|entry| {
            let modified = entry.metadata().and_then(|m| m.modified()).ok()?;
            Some((modified, entry.path()))
        })
        .collect();

    // Newest first
    files.sort_by(|a, b| b.0.cmp(&a.0));

    let mut removed = 0;
    for (_, path) in files.into_iter().skip(keep) {
        match std::fs::remove_file(&path) {
            Ok(()) => removed += 1,
            Err(err) => {
                tracing::debug!(error = %err, path = %path.display(), "failed to prune wallpaper");
            }
        }
    }

    Ok(removed)
}
