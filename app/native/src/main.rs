#![allow(clippy::multiple_crate_versions)]

//! Backdrop - rotating desktop wallpapers with access key failover.
//!
//! The same binary runs the daemon (`backdrop run`) and the CLI commands that
//! talk to it over a Unix socket.

use tracing_subscriber::EnvFilter;

fn main() {
    // Logs go to stderr so CLI output stays pipeable.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_env(backdrop_lib::constants::LOG_ENV_VAR)
                .unwrap_or_else(|_| EnvFilter::new(backdrop_lib::constants::DEFAULT_LOG_FILTER)),
        )
        .init();

    if let Err(err) = backdrop_lib::cli::run() {
        eprintln!("backdrop: {err}");
        std::process::exit(1);
    }
}
