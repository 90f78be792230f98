//! Collaborators consumed by the scheduler and the credential engine.
//!
//! The state machines only see these traits:
//!
//! - [`CredentialValidator`] - checks an access key against the photo API
//! - [`ImageProvider`] - produces the next image as a local file
//! - [`WallpaperSetter`] - paints a file onto the desktop
//! - [`ErrorReporter`] - receives fire failures that are not connectivity related
//!
//! Concrete implementations: [`UnsplashClient`] / [`UnsplashImageProvider`]
//! for the photo API and [`DesktopWallpaper`] for the OS call.

mod desktop;
mod unsplash;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
pub use desktop::DesktopWallpaper;
use serde::Serialize;
use thiserror::Error;
pub use unsplash::{
    CredentialSource, DEFAULT_API_BASE, Photo, PhotoQuery, UnsplashClient, UnsplashImageProvider,
    classify_status, classify_transport,
};

/// Classified failure of a photo API round trip.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    /// The network is unreachable; the request never got an answer.
    #[error("no network connectivity")]
    NoConnectivity,
    /// The API rejected the access key.
    #[error("access key rejected by the photo API")]
    Unauthorized,
    /// The access key is valid but out of quota.
    #[error("photo API rate limit reached")]
    RateLimited,
    /// Every candidate access key failed validation.
    #[error("all access keys are exhausted")]
    CredentialsExhausted,
    /// Anything else, including malformed responses and transport errors.
    #[error("{0}")]
    Other(String),
}

/// Failure to paint a wallpaper.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApplyError {
    /// The image file does not exist.
    #[error("wallpaper file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// The platform call failed.
    #[error("failed to set wallpaper: {0}")]
    Platform(String),
}

/// Error taxonomy shared by every subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FailureKind {
    /// Environment-caused, heals when the network comes back.
    Connectivity,
    /// Attributable to a specific access key; drives rotation.
    Credential,
    /// Every access key failed; terminal until external intervention.
    Exhaustion,
    /// The wallpaper could not be applied; the next fire retries.
    Apply,
    /// Unclassified; handled as conservatively as a credential failure.
    Unclassified,
}

impl ProviderError {
    /// Returns the taxonomy bucket of this error.
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::NoConnectivity => FailureKind::Connectivity,
            Self::Unauthorized | Self::RateLimited => FailureKind::Credential,
            Self::CredentialsExhausted => FailureKind::Exhaustion,
            Self::Other(_) => FailureKind::Unclassified,
        }
    }
}

/// Why a wallpaper fire failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FireError {
    /// Fetching the next image failed.
    #[error("fetching next image failed: {0}")]
    Fetch(#[from] ProviderError),
    /// Applying the fetched image failed.
    #[error(transparent)]
    Apply(#[from] ApplyError),
}

impl FireError {
    /// Returns the taxonomy bucket of this error.
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::Fetch(err) => err.kind(),
            Self::Apply(_) => FailureKind::Apply,
        }
    }
}

/// Validates access keys against the photo API.
#[async_trait]
pub trait CredentialValidator: Send + Sync {
    /// Performs a round trip with `credential`.
    ///
    /// # Errors
    ///
    /// Returns a classified [`ProviderError`] when the key cannot be confirmed.
    async fn validate_credential(&self, credential: &str) -> Result<(), ProviderError>;
}

/// Produces the next wallpaper image.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Fetches the next image and returns its absolute local path.
    ///
    /// # Errors
    ///
    /// Returns a classified [`ProviderError`] when no image could be produced.
    async fn fetch_next_image(&self) -> Result<PathBuf, ProviderError>;
}

/// Paints an image onto the desktop.
#[async_trait]
pub trait WallpaperSetter: Send + Sync {
    /// Applies `path` as the wallpaper. A no-op when `path` is already applied.
    ///
    /// # Errors
    ///
    /// Returns an [`ApplyError`] if the platform call fails.
    async fn apply_wallpaper(&self, path: &Path) -> Result<(), ApplyError>;

    /// Applies `path` even if it is already the current wallpaper.
    ///
    /// Used after wake and space changes, when the OS may have dropped the
    /// wallpaper on screens or spaces that were not active.
    ///
    /// # Errors
    ///
    /// Returns an [`ApplyError`] if the platform call fails.
    async fn reapply_wallpaper(&self, path: &Path) -> Result<(), ApplyError> {
        self.apply_wallpaper(path).await
    }
}

/// Receives fire failures that the scheduler tolerates.
pub trait ErrorReporter: Send + Sync {
    /// Reports a failure.
    fn report(&self, error: &FireError);
}

/// Reports errors through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&self, error: &FireError) {
        tracing::error!(error = %error, kind = ?error.kind(), "wallpaper change failed");
    }
}
