//! Unix domain socket IPC between the CLI and the running daemon.
//!
//! The daemon listens on a socket in the cache directory. CLI commands
//! connect, write one JSON query line, and read one JSON response line. If
//! the socket is missing or refuses connections, the daemon is not running.
//!
//! ```json
//! {"type": "status"}
//! {"type": "setInterval", "interval": "hourly"}
//! {"type": "addCredential", "credential": "..."}
//! ```
//!
//! Responses carry either `data` or `error`:
//!
//! ```json
//! {"data": {...}}
//! {"error": "scheduler is not running"}
//! ```

mod socket;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
pub use socket::{IpcError, IpcServer, is_daemon_running, send_query};

use crate::cache::get_cache_dir;
use crate::scheduler::Interval;

/// Socket filename within the cache directory.
const SOCKET_FILENAME: &str = "backdrop.sock";

/// Gets the default path of the IPC socket.
#[must_use]
pub fn get_socket_path() -> PathBuf { get_cache_dir().join(SOCKET_FILENAME) }

/// Queries the CLI can send to the daemon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum IpcQuery {
    /// Check the daemon is alive.
    Ping,
    /// Scheduler, credential and connectivity state.
    Status,
    /// Select a new interval and restart the countdown.
    SetInterval { interval: Interval },
    /// Change the wallpaper now.
    Next,
    /// The machine woke from sleep.
    Wake,
    /// The active space changed.
    SpaceChanged,
    /// Validate a new access key and restart rotation from it.
    AddCredential { credential: String },
}

/// Response from the daemon to the CLI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IpcResponse {
    /// Successful response with data.
    Success { data: serde_json::Value },
    /// Error response.
    Error { error: String },
}

impl IpcResponse {
    /// Creates a success response.
    pub fn success(data: impl Serialize) -> Self {
        Self::Success {
            data: serde_json::to_value(data).unwrap_or(serde_json::Value::Null),
        }
    }

    /// Creates an error response.
    pub fn error(message: impl Into<String>) -> Self { Self::Error { error: message.into() } }
}
