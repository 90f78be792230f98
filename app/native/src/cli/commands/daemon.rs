//! The `run` command: hosts every subsystem until interrupted.

use std::path::Path;
use std::sync::Arc;

use crate::app::Backdrop;
use crate::config::LoadedConfig;
use crate::error::BackdropError;
use crate::ipc::{self, IpcServer};

/// Runs the daemon in the foreground until Ctrl-C.
///
/// # Errors
///
/// Returns an error if another daemon already owns `socket`, the runtime
/// cannot be created, or a subsystem fails to start.
pub fn run(loaded: LoadedConfig, socket: &Path) -> Result<(), BackdropError> {
    if ipc::is_daemon_running(socket) {
        return Err(BackdropError::CommandError(format!(
            "a backdrop daemon is already listening on {}",
            socket.display()
        )));
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("backdrop-runtime")
        .build()?;

    runtime.block_on(serve(loaded, socket))
}

async fn serve(loaded: LoadedConfig, socket: &Path) -> Result<(), BackdropError> {
    let keys = loaded.access_keys();
    if let Some(path) = loaded.path.as_deref() {
        tracing::info!(path = %path.display(), keys = keys.len(), "using configuration");
    }

    let backdrop = Arc::new(
        Backdrop::builder()
            .config(loaded.config)
            .access_keys(keys)
            .start()
            .await?,
    );

    let handle = tokio::runtime::Handle::current();
    let server = {
        let backdrop = Arc::clone(&backdrop);
        IpcServer::start(socket, move |query| handle.block_on(backdrop.handle_query(query)))
            .map_err(|err| BackdropError::IpcError(err.to_string()))?
    };

    tokio::signal::ctrl_c().await?;
    tracing::info!("interrupted, shutting down");

    server.stop();
    backdrop.shutdown().await;
    Ok(())
}
