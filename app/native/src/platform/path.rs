//! Paths given on the command line or in the config file.
//!
//! Only `~` is expanded; environment variables are left untouched so a key
//! file path never depends on the daemon's environment.

use std::path::{Path, PathBuf};

/// Expands a leading `~` to the home directory. Blank input yields an empty path.
#[must_use]
pub fn expand(path: &str) -> PathBuf {
    let path = path.trim();
    if path.is_empty() {
        return PathBuf::new();
    }

    PathBuf::from(shellexpand::tilde(path).as_ref())
}

/// Expands `path` and anchors it at `base_dir` when it is still relative.
///
/// Used for `credentials.keysFile`, which is relative to the config file.
#[must_use]
pub fn expand_and_resolve(path: &str, base_dir: &Path) -> PathBuf {
    let expanded = expand(path);
    if expanded.as_os_str().is_empty() || expanded.is_absolute() {
        expanded
    } else {
        base_dir.join(expanded)
    }
}
