//! Error types for Backdrop.
//!
//! This module provides the crate-level error returned by CLI commands and
//! the actor communication error shared by the scheduler and credential
//! handles. Subsystem-specific errors (`ProviderError`, `ApplyError`,
//! `StoreError`, `ConfigError`) live next to the code that produces them.

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

/// Errors that can occur during application execution.
///
/// Serializes with a `kind`/`message` pair so IPC clients get structured
/// error information.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "kind", content = "message")]
pub enum BackdropError {
    /// Invalid command arguments.
    #[error("{0}")]
    InvalidArguments(String),
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),
    /// IPC communication error.
    #[error("IPC error: {0}")]
    IpcError(String),
    /// IO error.
    #[error("IO error: {0}")]
    IoError(String),
    /// Credential pool or validation error.
    #[error("Credential error: {0}")]
    CredentialError(String),
    /// Scheduler operation failed.
    #[error("Scheduler error: {0}")]
    SchedulerError(String),
    /// Generic command error.
    #[error("{0}")]
    CommandError(String),
}

impl From<std::io::Error> for BackdropError {
    fn from(err: std::io::Error) -> Self { Self::IoError(err.to_string()) }
}

impl From<serde_json::Error> for BackdropError {
    fn from(err: serde_json::Error) -> Self { Self::CommandError(err.to_string()) }
}

impl From<ActorError> for BackdropError {
    fn from(err: ActorError) -> Self { Self::SchedulerError(err.to_string()) }
}

impl From<String> for BackdropError {
    fn from(msg: String) -> Self { Self::CommandError(msg) }
}

impl From<&str> for BackdropError {
    fn from(msg: &str) -> Self { Self::CommandError(msg.to_string()) }
}

/// Error types for actor communication.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ActorError {
    /// Failed to send message to actor.
    #[error("Failed to send message to actor: channel closed")]
    SendFailed,

    /// Failed to receive response from actor.
    #[error("Failed to receive response from actor: channel closed")]
    ReceiveFailed,

    /// Request timed out.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
}
