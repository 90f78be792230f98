//! Shared types for CLI commands.

use crate::ipc::IpcQuery;

/// System events the CLI can forward to the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum EventKind {
    /// The machine woke from sleep.
    Wake,
    /// The active space or desktop changed.
    SpaceChanged,
}

impl EventKind {
    /// Returns the IPC query delivering this event.
    #[must_use]
    pub const fn to_query(self) -> IpcQuery {
        match self {
            Self::Wake => IpcQuery::Wake,
            Self::SpaceChanged => IpcQuery::SpaceChanged,
        }
    }
}
