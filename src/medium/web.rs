//! Browser key-value medium
//!
//! Implements KeyValueMedium over window.localStorage for WASM apps.

use super::KeyValueMedium;
use crate::storage::StorageError;
use web_sys::Storage;

/// Key-value medium backed by browser localStorage.
pub struct LocalStorageMedium;

impl LocalStorageMedium {
    pub fn new() -> Self {
        Self
    }

    fn storage(&self) -> Result<Storage, StorageError> {
        let window = web_sys::window()
            .ok_or_else(|| StorageError::WriteFailure("Window not available".to_string()))?;

        window
            .local_storage()
            .map_err(|e| {
                StorageError::WriteFailure(format!("localStorage not available: {:?}", e))
            })?
            .ok_or_else(|| StorageError::WriteFailure("localStorage is None".to_string()))
    }
}

impl Default for LocalStorageMedium {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueMedium for LocalStorageMedium {
    fn get(&self, key: &str) -> Option<String> {
        self.storage()
            .ok()
            .and_then(|storage| storage.get_item(key).ok().flatten())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let storage = self.storage()?;
        storage.set_item(key, value).map_err(|e| {
            StorageError::WriteFailure(format!("Failed to write to localStorage: {:?}", e))
        })
    }

    fn remove(&self, key: &str) {
        if let Ok(storage) = self.storage() {
            let _ = storage.remove_item(key);
        }
    }

    fn keys(&self) -> Vec<String> {
        let Ok(storage) = self.storage() else {
            return Vec::new();
        };

        let length = storage.length().unwrap_or(0);
        let mut keys = Vec::with_capacity(length as usize);
        for i in 0..length {
            if let Ok(Some(key)) = storage.key(i) {
                keys.push(key);
            }
        }
        keys
    }
}
