//! In-memory store.

use std::collections::HashMap;

use parking_lot::RwLock;

use super::{Store, StoreError};

/// A [`Store`] that keeps values in memory for the process lifetime.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, serde_json::Value>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Creates a store pre-populated with the given entries.
    #[must_use]
    pub fn with_entries<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, serde_json::Value)>,
        K: Into<String>,
    {
        let values = entries.into_iter().map(|(k, v)| (k.into(), v)).collect();
        Self { values: RwLock::new(values) }
    }

    /// Returns a copy of every stored entry.
    #[must_use]
    pub fn snapshot(&self) -> HashMap<String, serde_json::Value> { self.values.read().clone() }
}

impl Store for MemoryStore {
    fn get(&self, key: &str) -> Option<serde_json::Value> { self.values.read().get(key).cloned() }

    fn set(&self, key: &str, value: serde_json::Value) -> Result<(), StoreError> {
        self.values.write().insert(key.to_string(), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_overwrites() {
        let store = MemoryStore::new();
        store.set("k", serde_json::json!(1)).unwrap();
        store.set("k", serde_json::json!(2)).unwrap();
        assert_eq!(store.get("k"), Some(serde_json::json!(2)));
    }

    #[test]
    fn test_with_entries() {
        let store = MemoryStore::with_entries([("a", serde_json::json!("x"))]);
        assert_eq!(store.get("a"), Some(serde_json::json!("x")));
        assert_eq!(store.snapshot().len(), 1);
    }
}
