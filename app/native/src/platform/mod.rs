//! Platform helpers shared across subsystems.

pub mod path;
pub mod thread;
