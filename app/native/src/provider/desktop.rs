//! Desktop wallpaper setter backed by the `wallpaper` crate.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{ApplyError, WallpaperSetter};

/// Sets the wallpaper on every screen through the platform API.
#[derive(Debug, Default)]
pub struct DesktopWallpaper {
    current: Mutex<Option<PathBuf>>,
}

impl DesktopWallpaper {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Returns the last path this setter applied.
    #[must_use]
    pub fn current(&self) -> Option<PathBuf> { self.current.lock().clone() }

    async fn set(&self, path: &Path) -> Result<(), ApplyError> {
        if !path.exists() {
            return Err(ApplyError::NotFound(path.to_path_buf()));
        }

        let path_str = path.display().to_string();
        tokio::task::spawn_blocking(move || {
            wallpaper::set_from_path(&path_str).map_err(|err| err.to_string())
        })
        .await
        .map_err(|err| ApplyError::Platform(err.to_string()))?
        .map_err(ApplyError::Platform)?;

        *self.current.lock() = Some(path.to_path_buf());
        tracing::debug!(path = %path.display(), "desktop: wallpaper applied");
        Ok(())
    }
}

#[async_trait]
impl WallpaperSetter for DesktopWallpaper {
    async fn apply_wallpaper(&self, path: &Path) -> Result<(), ApplyError> {
        if self.current.lock().as_deref() == Some(path) && path.exists() {
            tracing::trace!(path = %path.display(), "desktop: wallpaper unchanged");
            return Ok(());
        }
        self.set(path).await
    }

    async fn reapply_wallpaper(&self, path: &Path) -> Result<(), ApplyError> { self.set(path).await }
}
