//! Backdrop - a wallpaper rotation daemon.
//!
//! The library wires four long-lived pieces together:
//!
//! - [`scheduler`]: decides when the wallpaper changes and owes a retry after offline failures.
//! - [`credentials`]: validates, rotates and persists the image service access keys.
//! - [`connectivity`]: probes the network and publishes debounced transitions.
//! - [`system`]: wake and workspace events that re-apply the current wallpaper.
//!
//! [`Backdrop`] assembles them and [`cli`] exposes the daemon and its commands.

pub mod app;
pub mod cache;
pub mod cli;
pub mod config;
pub mod connectivity;
pub mod constants;
pub mod credentials;
pub mod error;
pub mod ipc;
pub mod platform;
pub mod provider;
pub mod scheduler;
pub mod store;
pub mod system;

pub use app::{Backdrop, BackdropBuilder, BackdropStatus};
