//! Socket server (daemon side) and client (CLI side).

use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use thiserror::Error;

use super::{IpcQuery, IpcResponse};
use crate::platform::thread::spawn_named_thread;

/// Default timeout for socket operations.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Number of retry attempts for transient connection failures.
const MAX_RETRIES: u32 = 3;

/// Delay between retry attempts.
const RETRY_DELAY: Duration = Duration::from_millis(100);

/// Error type for IPC operations.
#[derive(Debug, Error)]
pub enum IpcError {
    /// Daemon is not running (socket doesn't exist or can't connect).
    #[error("backdrop daemon is not running")]
    AppNotRunning,
    /// Connection timeout.
    #[error("connection timed out")]
    Timeout,
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Invalid response from the daemon.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

// ============================================================================
// Server (daemon side)
// ============================================================================

/// A listening IPC server. Dropping it stops the server.
#[derive(Debug)]
pub struct IpcServer {
    path: PathBuf,
    running: Arc<AtomicBool>,
}

impl IpcServer {
    /// Binds `path` and serves queries with `handler` on a background thread.
    ///
    /// A stale socket file at `path` is replaced.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket cannot be bound.
    pub fn start<F>(path: impl Into<PathBuf>, handler: F) -> Result<Self, IpcError>
    where F: Fn(IpcQuery) -> IpcResponse + Send + Sync + 'static {
        let path = path.into();
        remove_socket(&path);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let listener = UnixListener::bind(&path)?;
        tracing::info!(path = %path.display(), "ipc: server listening");

        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        let handler = Arc::new(handler);
        spawn_named_thread("ipc-server", move || server_loop(&listener, &flag, &handler));

        Ok(Self { path, running })
    }

    /// Returns the socket path.
    #[must_use]
    pub fn path(&self) -> &Path { &self.path }

    /// Stops accepting connections and removes the socket file.
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        // Wake the accept loop so it observes the flag.
        let _ = UnixStream::connect(&self.path);
        remove_socket(&self.path);
        tracing::debug!("ipc: server stopped");
    }
}

impl Drop for IpcServer {
    fn drop(&mut self) { self.stop(); }
}

fn remove_socket(path: &Path) {
    if path.exists() {
        let _ = std::fs::remove_file(path);
    }
}

fn server_loop<F>(listener: &UnixListener, running: &AtomicBool, handler: &Arc<F>)
where F: Fn(IpcQuery) -> IpcResponse + Send + Sync + 'static {
    for stream in listener.incoming() {
        if !running.load(Ordering::SeqCst) {
            break;
        }

        match stream {
            Ok(stream) => {
                let handler = Arc::clone(handler);
                spawn_named_thread("ipc-conn", move || handle_connection(stream, handler.as_ref()));
            }
            Err(err) => tracing::warn!(error = %err, "ipc: connection error"),
        }
    }
}

fn handle_connection<F>(mut stream: UnixStream, handler: &F)
where F: Fn(IpcQuery) -> IpcResponse {
    let _ = stream.set_read_timeout(Some(DEFAULT_TIMEOUT));

    let Ok(read_half) = stream.try_clone() else {
        tracing::warn!("ipc: failed to clone connection");
        return;
    };
    let mut reader = BufReader::new(read_half);
    let mut line = String::new();

    if reader.read_line(&mut line).is_err() || line.trim().is_empty() {
        return;
    }

    let response = match serde_json::from_str::<IpcQuery>(line.trim()) {
        Ok(query) => {
            tracing::debug!(?query, "ipc: query received");
            handler(query)
        }
        Err(err) => IpcResponse::error(format!("Invalid query: {err}")),
    };

    let response_json = serde_json::to_string(&response)
        .unwrap_or_else(|_| r#"{"error":"Failed to serialize response"}"#.to_string());

    let _ = writeln!(stream, "{response_json}");
}

// ============================================================================
// Client (CLI side)
// ============================================================================

/// Sends a query to the daemon listening on `path` and returns the response.
///
/// Retries transient connection failures up to three times.
///
/// # Errors
///
/// Returns [`IpcError::AppNotRunning`] if nothing listens on `path`.
pub fn send_query(path: &Path, query: &IpcQuery) -> Result<IpcResponse, IpcError> {
    let mut last_error = IpcError::AppNotRunning;

    for attempt in 0..MAX_RETRIES {
        match send_query_once(path, query) {
            Ok(response) => return Ok(response),
            Err(err) => {
                last_error = err;

                // Timeouts and bad responses are real problems, not transient.
                if !matches!(last_error, IpcError::AppNotRunning) {
                    break;
                }

                if attempt < MAX_RETRIES - 1 {
                    std::thread::sleep(RETRY_DELAY);
                }
            }
        }
    }

    Err(last_error)
}

fn send_query_once(path: &Path, query: &IpcQuery) -> Result<IpcResponse, IpcError> {
    if !path.exists() {
        return Err(IpcError::AppNotRunning);
    }

    let mut stream = UnixStream::connect(path).map_err(|err| match err.kind() {
        std::io::ErrorKind::ConnectionRefused
        | std::io::ErrorKind::NotFound
        | std::io::ErrorKind::BrokenPipe
        | std::io::ErrorKind::ConnectionReset => IpcError::AppNotRunning,
        _ => IpcError::Io(err),
    })?;

    // Adding a credential waits for a validation round trip.
    let read_timeout = match query {
        IpcQuery::AddCredential { .. } | IpcQuery::Next => DEFAULT_TIMEOUT * 12,
        _ => DEFAULT_TIMEOUT,
    };
    stream.set_read_timeout(Some(read_timeout))?;
    stream.set_write_timeout(Some(DEFAULT_TIMEOUT))?;

    let query_json = serde_json::to_string(query)
        .map_err(|err| IpcError::InvalidResponse(format!("Failed to serialize query: {err}")))?;

    writeln!(stream, "{query_json}").map_err(|err| {
        if err.kind() == std::io::ErrorKind::BrokenPipe {
            IpcError::AppNotRunning
        } else {
            IpcError::Io(err)
        }
    })?;

    let mut reader = BufReader::new(stream);
    let mut response_line = String::new();
    reader.read_line(&mut response_line).map_err(|err| match err.kind() {
        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut => IpcError::Timeout,
        std::io::ErrorKind::BrokenPipe | std::io::ErrorKind::ConnectionReset => {
            IpcError::AppNotRunning
        }
        _ => IpcError::Io(err),
    })?;

    serde_json::from_str(response_line.trim())
        .map_err(|err| IpcError::InvalidResponse(format!("Failed to parse response: {err}")))
}

/// Checks if a daemon answers on `path`.
#[must_use]
pub fn is_daemon_running(path: &Path) -> bool {
    matches!(send_query(path, &IpcQuery::Ping), Ok(IpcResponse::Success { .. }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_running_when_no_socket() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.sock");

        assert!(!is_daemon_running(&path));
        assert!(matches!(send_query(&path, &IpcQuery::Ping), Err(IpcError::AppNotRunning)));
    }

    #[test]
    fn test_round_trip_through_server() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.sock");

        let server = IpcServer::start(path.clone(), |query| match query {
            IpcQuery::Ping => IpcResponse::success("pong"),
            IpcQuery::AddCredential { credential } => IpcResponse::success(credential.len()),
            _ => IpcResponse::error("unsupported"),
        })
        .unwrap();

        assert!(is_daemon_running(&path));
        assert_eq!(
            send_query(&path, &IpcQuery::AddCredential { credential: "abcd".into() }).unwrap(),
            IpcResponse::success(4)
        );
        assert_eq!(
            send_query(&path, &IpcQuery::Status).unwrap(),
            IpcResponse::error("unsupported")
        );

        server.stop();
        assert!(!path.exists());
        assert!(!is_daemon_running(&path));
    }

    #[test]
    fn test_invalid_query_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raw.sock");
        let _server = IpcServer::start(path.clone(), |_| IpcResponse::success(true)).unwrap();

        let mut stream = UnixStream::connect(&path).unwrap();
        writeln!(stream, r#"{{"type":"bogus"}}"#).unwrap();
        let mut line = String::new();
        BufReader::new(stream).read_line(&mut line).unwrap();

        assert!(line.contains("Invalid query"));
    }
}
