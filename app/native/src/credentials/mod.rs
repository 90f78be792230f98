//! Access key pool, validation and rotation.
//!
//! [`CredentialEngine`] owns the rotation state machine and publishes a
//! [`CredentialSnapshot`] on every change. Everything else talks to it
//! through a [`CredentialHandle`].

mod engine;
mod handle;
pub mod pool;
pub mod status;

pub use engine::{CredentialEngine, CredentialSnapshot};
pub use handle::CredentialHandle;
pub use pool::{CredentialPool, PoolError};
pub use status::{CredentialStatus, ValidationOutcome, mask_credential};
