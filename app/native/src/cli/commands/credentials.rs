//! Access key CLI commands.

use std::path::Path;

use clap::Subcommand;
use colored::Colorize;

use super::query;
use crate::credentials::{CredentialStatus, mask_credential};
use crate::error::BackdropError;
use crate::ipc::IpcQuery;

/// Credentials subcommands.
#[derive(Subcommand, Debug)]
#[command(next_display_order = None)]
pub enum CredentialsCommands {
    /// Validate an access key and make it active.
    ///
    /// Restarts rotation from this key, which also clears an exhausted pool.
    Add {
        /// The access key.
        #[arg(value_name = "KEY")]
        key: String,
    },
}

/// Execute credentials subcommands.
///
/// # Errors
///
/// Returns an error if the daemon is unreachable or the key is rejected.
pub fn execute(cmd: &CredentialsCommands, socket: &Path) -> Result<(), BackdropError> {
    match cmd {
        CredentialsCommands::Add { key } => {
            let data = query(socket, &IpcQuery::AddCredential { credential: key.clone() })?;
            let status: CredentialStatus = serde_json::from_value(data["status"].clone())?;
            let masked = mask_credential(key);

            match status {
                CredentialStatus::Valid => {
                    println!("{} {}", "Access key accepted:".green(), masked.bold());
                    Ok(())
                }
                CredentialStatus::NoConnectivity => {
                    println!(
                        "{} {}",
                        "Offline, the key will be validated when the network returns:".yellow(),
                        masked.bold()
                    );
                    Ok(())
                }
                other => Err(BackdropError::CredentialError(
                    other.user_message().map_or_else(|| other.to_string(), str::to_string),
                )),
            }
        }
    }
}
