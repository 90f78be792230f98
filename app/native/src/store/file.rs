//! JSON file backed store.
//!
//! The whole key space is a single JSON object. Every `set` rewrites the file
//! through a temporary sibling and a rename, so readers never observe a torn
//! write and each step boundary is durable on its own.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use super::{Store, StoreError};

/// A [`Store`] persisted to a JSON file.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    values: Mutex<BTreeMap<String, serde_json::Value>>,
}

impl JsonFileStore {
    /// Opens the store at `path`, loading any existing contents.
    ///
    /// A missing file starts an empty store. A corrupt file is logged and
    /// treated as empty; it is replaced on the next write.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory cannot be created or the
    /// file exists but cannot be read.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let values = if path.exists() {
            let contents = fs::read_to_string(&path)?;
            match serde_json::from_str(&contents) {
                Ok(values) => values,
                Err(err) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %err,
                        "state file is corrupt, starting with empty state"
                    );
                    BTreeMap::new()
                }
            }
        } else {
            BTreeMap::new()
        };

        Ok(Self { path, values: Mutex::new(values) })
    }

    /// Returns the path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path { &self.path }

    fn flush(&self, values: &BTreeMap<String, serde_json::Value>) -> Result<(), StoreError> {
        let contents = serde_json::to_vec_pretty(values)?;
        let tmp_path = self.path.with_extension("json.tmp");

        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(&contents)?;
        file.sync_all()?;
        fs::rename(&tmp_path, &self.path)?;

        Ok(())
    }
}

impl Store for JsonFileStore {
    fn get(&self, key: &str) -> Option<serde_json::Value> { self.values.lock().get(key).cloned() }

    fn set(&self, key: &str, value: serde_json::Value) -> Result<(), StoreError> {
        let mut values = self.values.lock();
        if value.is_null() {
            values.remove(key);
        } else {
            values.insert(key.to_string(), value);
        }
        self.flush(&values)
    }
}
