//! Key-value medium abstraction
//!
//! All raw key-value access in the crate goes through the `KeyValueMedium`
//! trait; the reference store, the migration engine, and the key-value storage
//! provider are its only consumers. Implementations:
//! - MemoryKeyValueMedium: in-process map (tests, embedding hosts)
//! - FileKeyValueMedium: one JSON document on disk (native apps)
//! - LocalStorageMedium: browser localStorage (WASM apps)

use crate::storage::StorageError;

/// Synchronous-feeling key-value medium.
///
/// Lookups are cheap and infallible; writes surface quota or permission
/// problems as `StorageError::WriteFailure`.
pub trait KeyValueMedium: Send + Sync {
    /// Read the value stored under `key`, if any.
    fn get(&self, key: &str) -> Option<String>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove the value stored under `key`. Removing an absent key is a no-op.
    fn remove(&self, key: &str);

    /// Enumerate every key currently present in the medium.
    fn keys(&self) -> Vec<String>;
}

pub mod memory;

#[cfg(feature = "native-fs")]
pub mod file;

#[cfg(all(target_arch = "wasm32", feature = "wasm"))]
pub mod web;
