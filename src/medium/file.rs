//! File-backed key-value medium
//!
//! Persists the whole key space as one JSON document on disk. Native apps use
//! this for the reference medium; the document stays small (references,
//! version marker, handle tokens), so read-modify-write per operation is fine.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use tracing::warn;

use super::KeyValueMedium;
use crate::storage::StorageError;

/// Key-value medium stored as a single JSON document.
pub struct FileKeyValueMedium {
    path: PathBuf,
}

impl FileKeyValueMedium {
    /// Create a medium backed by the JSON document at `path`. The file is
    /// created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn load(&self) -> BTreeMap<String, String> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return BTreeMap::new(),
            Err(e) => {
                warn!("Failed to read medium document {}: {}", self.path.display(), e);
                return BTreeMap::new();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(
                    "Medium document {} is not valid JSON, starting empty: {}",
                    self.path.display(),
                    e
                );
                BTreeMap::new()
            }
        }
    }

    fn store(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                StorageError::WriteFailure(format!(
                    "Failed to create directory for {}: {}",
                    self.path.display(),
                    e
                ))
            })?;
        }

        let raw = serde_json::to_string_pretty(entries)
            .map_err(|e| StorageError::DataFormat(format!("Failed to serialize medium: {}", e)))?;

        fs::write(&self.path, raw).map_err(|e| {
            StorageError::WriteFailure(format!("Failed to write {}: {}", self.path.display(), e))
        })
    }
}

impl KeyValueMedium for FileKeyValueMedium {
    fn get(&self, key: &str) -> Option<String> {
        self.load().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.load();
        entries.insert(key.to_string(), value.to_string());
        self.store(&entries)
    }

    fn remove(&self, key: &str) {
        let mut entries = self.load();
        if entries.remove(key).is_some() {
            if let Err(e) = self.store(&entries) {
                warn!("Failed to persist removal of key {}: {}", key, e);
            }
        }
    }

    fn keys(&self) -> Vec<String> {
        self.load().keys().cloned().collect()
    }
}
