//! Key-value persistence used by the scheduler and the credential engine.
//!
//! Each subsystem owns a disjoint set of keys (see
//! [`crate::constants::store_keys`]) and writes them one step at a time, so
//! a crash mid-operation loses at most the step in progress.
//!
//! - [`MemoryStore`] - ephemeral, used by tests and dry runs
//! - [`JsonFileStore`] - a single JSON object on disk, rewritten atomically on every `set`

mod file;
mod memory;

pub use file::JsonFileStore;
pub use memory::MemoryStore;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Errors raised by store implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed.
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),
    /// A value could not be encoded or decoded.
    #[error("store serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// String-keyed persistence.
///
/// Implementations must be safe for concurrent key-scoped reads and writes.
pub trait Store: Send + Sync {
    /// Returns the value stored under `key`, if any.
    fn get(&self, key: &str) -> Option<serde_json::Value>;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value could not be persisted.
    fn set(&self, key: &str, value: serde_json::Value) -> Result<(), StoreError>;

    /// Removes the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the removal could not be persisted.
    fn remove(&self, key: &str) -> Result<(), StoreError> { self.set(key, serde_json::Value::Null) }
}

/// Reads and decodes a typed value.
///
/// `null` and values that fail to decode are treated as absent; decode
/// failures are logged since they indicate a schema change or corruption.
pub fn get_typed<T: DeserializeOwned>(store: &dyn Store, key: &str) -> Option<T> {
    let value = store.get(key)?;
    if value.is_null() {
        return None;
    }

    match serde_json::from_value(value) {
        Ok(decoded) => Some(decoded),
        Err(err) => {
            tracing::warn!(key, error = %err, "ignoring undecodable stored value");
            None
        }
    }
}

/// Encodes and stores a typed value.
///
/// # Errors
///
/// Returns an error if encoding or persisting fails.
pub fn set_typed<T: Serialize + ?Sized>(store: &dyn Store, key: &str, value: &T) -> Result<(), StoreError> {
    store.set(key, serde_json::to_value(value)?)
}

/// Stores a typed value, logging instead of propagating failures.
///
/// State machines use this at every step boundary: persistence failures
/// must not interrupt scheduling or rotation.
pub fn persist<T: Serialize + ?Sized>(store: &dyn Store, key: &str, value: &T) {
    if let Err(err) = set_typed(store, key, value) {
        tracing::warn!(key, error = %err, "failed to persist state");
    }
}
