//! In-memory key-value medium
//!
//! Backs tests and embedding hosts that manage persistence themselves.

use std::collections::BTreeMap;
use std::sync::RwLock;

use super::KeyValueMedium;
use crate::storage::StorageError;

/// Key-value medium held entirely in process memory.
#[derive(Debug, Default)]
pub struct MemoryKeyValueMedium {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryKeyValueMedium {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueMedium for MemoryKeyValueMedium {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .read()
            .expect("medium lock poisoned")
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .write()
            .expect("medium lock poisoned")
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) {
        self.entries
            .write()
            .expect("medium lock poisoned")
            .remove(key);
    }

    fn keys(&self) -> Vec<String> {
        self.entries
            .read()
            .expect("medium lock poisoned")
            .keys()
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_remove() {
        let medium = MemoryKeyValueMedium::new();
        assert!(medium.get("a").is_none());

        medium.set("a", "1").unwrap();
        assert_eq!(medium.get("a").as_deref(), Some("1"));

        medium.set("a", "2").unwrap();
        assert_eq!(medium.get("a").as_deref(), Some("2"));

        medium.remove("a");
        assert!(medium.get("a").is_none());
    }

    #[test]
    fn test_keys_enumerates_everything() {
        let medium = MemoryKeyValueMedium::new();
        medium.set("x", "1").unwrap();
        medium.set("y", "2").unwrap();

        let mut keys = medium.keys();
        keys.sort();
        assert_eq!(keys, vec!["x".to_string(), "y".to_string()]);
    }
}
