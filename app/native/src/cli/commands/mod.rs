//! CLI command definitions using Clap.
//!
//! - `daemon` - the `run` command hosting every subsystem
//! - `credentials` - access key management
//! - `types` - shared argument types

use std::io;
use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Generator, Shell, generate};
use colored::Colorize;

use crate::cli::output;
use crate::config;
use crate::error::BackdropError;
use crate::ipc::{self, IpcError, IpcQuery, IpcResponse};
use crate::scheduler::Interval;

pub mod credentials;
pub mod daemon;
pub mod types;

pub use credentials::CredentialsCommands;
pub use types::EventKind;

/// Application version from Cargo.toml.
const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Backdrop CLI - rotates the desktop wallpaper on a persistent schedule.
#[derive(Parser, Debug)]
#[command(name = "backdrop")]
#[command(author, version = APP_VERSION, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to a custom configuration file.
    ///
    /// Overrides the default configuration file search paths.
    /// Supports JSONC format (JSON with comments).
    #[arg(long, short, global = true, value_name = "PATH")]
    pub config: Option<String>,

    /// Path of the daemon's IPC socket.
    #[arg(long, global = true, value_name = "PATH", env = "BACKDROP_SOCKET", hide = true)]
    pub socket: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
#[command(next_display_order = None)]
pub enum Commands {
    /// Run the wallpaper daemon in the foreground.
    ///
    /// Starts the scheduler, the credential engine, the connectivity monitor
    /// and the IPC socket. Stops on Ctrl-C.
    Run,

    /// Show scheduler, credential and connectivity state.
    Status {
        /// Print raw JSON instead of a table.
        #[arg(long, short)]
        json: bool,
    },

    /// Change how often the wallpaper changes.
    ///
    /// The countdown restarts from now.
    Interval {
        /// The new cadence.
        #[arg(value_enum)]
        interval: Interval,
    },

    /// Change the wallpaper now and restart the countdown.
    Next,

    /// Forward a system event to the daemon.
    ///
    /// Hook this into a window manager to re-apply the wallpaper when the
    /// active space changes:
    ///   backdrop event space-changed
    #[command(verbatim_doc_comment)]
    Event {
        #[arg(value_enum)]
        kind: EventKind,
    },

    /// Access key management commands.
    #[command(subcommand)]
    Credentials(CredentialsCommands),

    /// Output Backdrop configuration JSON Schema.
    ///
    /// Outputs a JSON Schema to stdout that describes the structure of the
    /// configuration file. Can be redirected to a file for use with editors
    /// that support JSON Schema validation.
    Schema,

    /// Generate shell completions.
    ///
    /// Outputs shell completion script to stdout for the specified shell.
    ///
    /// Usage:
    ///   eval "$(backdrop completions --shell zsh)"
    ///   backdrop completions --shell fish > ~/.config/fish/completions/backdrop.fish
    #[command(verbatim_doc_comment)]
    Completions {
        /// The shell to generate completions for.
        #[arg(long, short, value_enum)]
        shell: Shell,
    },
}

impl Cli {
    /// Returns the custom config path if specified via --config flag.
    #[must_use]
    pub fn config_path(&self) -> Option<PathBuf> { self.config.as_deref().map(crate::platform::path::expand) }

    /// Returns the IPC socket path.
    #[must_use]
    pub fn socket_path(&self) -> PathBuf { self.socket.clone().unwrap_or_else(ipc::get_socket_path) }

    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command execution fails.
    pub fn execute(&self) -> Result<(), BackdropError> {
        let socket = self.socket_path();

        match &self.command {
            Commands::Run => {
                let loaded = config::load(self.config_path().as_deref())
                    .map_err(|err| BackdropError::ConfigError(err.to_string()))?;
                daemon::run(loaded, &socket)
            }

            Commands::Status { json } => {
                let data = query(&socket, &IpcQuery::Status)?;
                if *json {
                    output::print_highlighted_json(&data);
                } else {
                    output::print_status(&data);
                }
                Ok(())
            }

            Commands::Interval { interval } => {
                query(&socket, &IpcQuery::SetInterval { interval: *interval })?;
                println!("{} {}", "Interval set to".green(), interval.to_string().bold());
                Ok(())
            }

            Commands::Next => {
                let data = query(&socket, &IpcQuery::Next)?;
                output::print_fire_outcome(&data);
                Ok(())
            }

            Commands::Event { kind } => {
                query(&socket, &kind.to_query())?;
                Ok(())
            }

            Commands::Credentials(cmd) => credentials::execute(cmd, &socket),

            Commands::Schema => {
                println!("{}", config::generate_schema_json());
                Ok(())
            }

            Commands::Completions { shell } => {
                Self::print_completions(*shell);
                Ok(())
            }
        }
    }

    /// Print shell completions to stdout.
    fn print_completions<G: Generator>(generator: G) {
        let mut cmd = Self::command();
        generate(generator, &mut cmd, "backdrop", &mut io::stdout());
    }
}

/// Sends `query` to the daemon and unwraps a successful response.
pub(super) fn query(socket: &Path, query: &IpcQuery) -> Result<serde_json::Value, BackdropError> {
    match ipc::send_query(socket, query) {
        Ok(IpcResponse::Success { data }) => Ok(data),
        Ok(IpcResponse::Error { error }) => Err(BackdropError::CommandError(error)),
        Err(IpcError::AppNotRunning) => Err(BackdropError::IpcError(
            "backdrop daemon is not running (start it with `backdrop run`)".to_string(),
        )),
        Err(err) => Err(BackdropError::IpcError(err.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_run() {
        let cli = Cli::try_parse_from(["backdrop", "run"]).unwrap();
        assert!(matches!(cli.command, Commands::Run));
    }

    #[test]
    fn test_cli_parses_status_json() {
        let cli = Cli::try_parse_from(["backdrop", "status", "--json"]).unwrap();
        assert!(matches!(cli.command, Commands::Status { json: true }));
    }

    #[test]
    fn test_cli_parses_interval() {
        let cli = Cli::try_parse_from(["backdrop", "interval", "weekly"]).unwrap();
        match cli.command {
            Commands::Interval { interval } => assert_eq!(interval, Interval::Weekly),
            _ => panic!("Expected Interval command"),
        }
    }

    #[test]
    fn test_cli_rejects_unknown_interval() {
        assert!(Cli::try_parse_from(["backdrop", "interval", "monthly"]).is_err());
    }

    #[test]
    fn test_cli_parses_event_space_changed() {
        let cli = Cli::try_parse_from(["backdrop", "event", "space-changed"]).unwrap();
        match cli.command {
            Commands::Event { kind } => assert_eq!(kind, EventKind::SpaceChanged),
            _ => panic!("Expected Event command"),
        }
    }

    #[test]
    fn test_cli_parses_credentials_add() {
        let cli = Cli::try_parse_from(["backdrop", "credentials", "add", "abc123"]).unwrap();
        match cli.command {
            Commands::Credentials(CredentialsCommands::Add { key }) => assert_eq!(key, "abc123"),
            _ => panic!("Expected Credentials Add command"),
        }
    }

    #[test]
    fn test_cli_parses_schema() {
        let cli = Cli::try_parse_from(["backdrop", "schema"]).unwrap();
        assert!(matches!(cli.command, Commands::Schema));
    }

    #[test]
    fn test_cli_parses_completions_zsh() {
        let cli = Cli::try_parse_from(["backdrop", "completions", "--shell", "zsh"]).unwrap();
        match cli.command {
            Commands::Completions { shell } => assert_eq!(shell, Shell::Zsh),
            _ => panic!("Expected Completions command"),
        }
    }

    #[test]
    fn test_cli_global_config_flag() {
        let cli = Cli::try_parse_from(["backdrop", "--config", "/tmp/c.jsonc", "status"]).unwrap();
        assert_eq!(cli.config_path(), Some(PathBuf::from("/tmp/c.jsonc")));
    }

    #[test]
    fn test_cli_socket_flag_overrides_default() {
        let cli = Cli::try_parse_from(["backdrop", "--socket", "/tmp/b.sock", "next"]).unwrap();
        assert_eq!(cli.socket_path(), PathBuf::from("/tmp/b.sock"));
    }

    #[test]
    fn test_query_reports_daemon_not_running() {
        let dir = tempfile::tempdir().unwrap();
        let result = query(&dir.path().join("none.sock"), &IpcQuery::Ping);

        assert!(matches!(result, Err(BackdropError::IpcError(msg)) if msg.contains("not running")));
    }

    #[test]
    fn test_cli_debug_assert() { Cli::command().debug_assert(); }
}
