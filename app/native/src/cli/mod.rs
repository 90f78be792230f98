//! CLI module for Backdrop.
//!
//! `backdrop run` starts the daemon in the foreground. Every other command
//! talks to a running daemon over the IPC socket.

mod commands;
mod output;

use clap::Parser;
pub use commands::Cli;

use crate::error::BackdropError;

/// Runs the CLI.
///
/// Parses command-line arguments and executes the appropriate command.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn run() -> Result<(), BackdropError> {
    let cli = Cli::parse();
    cli.execute()
}
