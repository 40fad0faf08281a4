//! Schema migration engine
//!
//! Upgrades persisted records across storage schema versions at startup. The
//! version is a single integer under a reserved key in the reference medium.
//! When the key is absent, the version is inferred structurally: any
//! project-shaped record without a corresponding reference record means
//! version 1 legacy data, otherwise this is a fresh install at the current
//! version.
//!
//! Steps run sequentially and the marker advances only after a step
//! completes, so a failed step leaves a re-runnable state. Detection is
//! structural rather than flag-based, which makes every step idempotent by
//! construction.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::medium::KeyValueMedium;
use crate::model::{ids, FileRecord, ProjectReference, StoredProject};
use crate::reference::REFERENCE_KEY_PREFIX;
use crate::storage::{keyvalue, StorageError};

/// Current storage schema version.
pub const CURRENT_STORAGE_VERSION: u32 = 2;

pub const VERSION_KEY: &str = "diagram-storage-version";
const BACKUP_KEY_PREFIX: &str = "diagram-storage-backup-";
const PROJECT_KEY_PREFIX: &str = "project-";

/// Migration status snapshot, for diagnostics surfaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    pub current_version: u32,
    pub target_version: u32,
    pub has_legacy_data: bool,
    pub needs_migration: bool,
    pub legacy_projects: usize,
}

/// State machine over the persisted schema version.
pub struct StorageMigrator {
    medium: Arc<dyn KeyValueMedium>,
}

impl StorageMigrator {
    pub fn new(medium: Arc<dyn KeyValueMedium>) -> Self {
        Self { medium }
    }

    /// Check the persisted version and run any outstanding migrations.
    /// A failing step is fatal: the error propagates and the marker stays at
    /// the last completed version.
    pub fn migrate_if_needed(&self) -> Result<(), StorageError> {
        let current = self.current_storage_version();
        info!(
            "Storage version {} (target {})",
            current, CURRENT_STORAGE_VERSION
        );

        if current < CURRENT_STORAGE_VERSION {
            info!(
                "Migration needed from version {} to {}",
                current, CURRENT_STORAGE_VERSION
            );
            // The backup is an escape hatch only; its failure never blocks
            // the migration itself.
            self.create_backup();
            self.run_migrations(current)?;
        } else {
            debug!("No migration needed");
        }
        Ok(())
    }

    /// Persisted schema version, inferred structurally when absent.
    pub fn current_storage_version(&self) -> u32 {
        match self.medium.get(VERSION_KEY) {
            Some(raw) => match raw.parse() {
                Ok(version) => version,
                Err(_) => {
                    warn!("Unreadable version marker {:?}, re-inferring", raw);
                    self.infer_version()
                }
            },
            None => self.infer_version(),
        }
    }

    fn infer_version(&self) -> u32 {
        if self.has_legacy_project_data() {
            1
        } else {
            CURRENT_STORAGE_VERSION
        }
    }

    fn has_legacy_project_data(&self) -> bool {
        !self.legacy_project_keys().is_empty()
    }

    /// Keys of version-1 project records: project-shaped blobs with a
    /// `diagrams` map and no corresponding reference record.
    fn legacy_project_keys(&self) -> Vec<String> {
        let mut keys = Vec::new();
        for key in self.medium.keys() {
            let Some(project_id) = key.strip_prefix(PROJECT_KEY_PREFIX) else {
                continue;
            };
            if key.starts_with(REFERENCE_KEY_PREFIX) {
                continue;
            }
            if self
                .medium
                .get(&format!("{}{}", REFERENCE_KEY_PREFIX, project_id))
                .is_some()
            {
                continue;
            }
            let Some(raw) = self.medium.get(&key) else {
                continue;
            };
            match serde_json::from_str::<Value>(&raw) {
                Ok(value) if value.get("diagrams").is_some_and(Value::is_object) => {
                    keys.push(key);
                }
                Ok(_) => {}
                Err(e) => warn!("Failed to parse project data for key {}: {}", key, e),
            }
        }
        keys.sort();
        keys
    }

    /// Apply migrations sequentially from `from` up to the current version.
    fn run_migrations(&self, from: u32) -> Result<(), StorageError> {
        let mut version = from;
        while version < CURRENT_STORAGE_VERSION {
            let next = version + 1;
            info!("Running migration from version {} to {}", version, next);

            let step = match next {
                2 => self.migrate_v1_to_v2(),
                _ => {
                    warn!("Unknown migration version: {}", next);
                    Ok(())
                }
            };
            step.map_err(|e| {
                error!("Migration to version {} failed: {}", next, e);
                match e {
                    StorageError::MigrationFailure(_) => e,
                    other => StorageError::MigrationFailure(format!(
                        "step to version {}: {}",
                        next, other
                    )),
                }
            })?;

            // Advance the marker only once the step has fully completed.
            self.medium
                .set(VERSION_KEY, &next.to_string())
                .map_err(|e| {
                    StorageError::MigrationFailure(format!(
                        "could not persist version marker {}: {}",
                        next, e
                    ))
                })?;
            version = next;
            info!("Successfully migrated to version {}", next);
        }
        Ok(())
    }

    /// v1 -> v2: split each legacy project blob into a normalized key-value
    /// project record plus a `ProjectReference` defaulting to the key-value
    /// provider.
    fn migrate_v1_to_v2(&self) -> Result<(), StorageError> {
        let legacy_keys = self.legacy_project_keys();
        info!("Found {} legacy project(s) to migrate", legacy_keys.len());

        for key in legacy_keys {
            self.migrate_legacy_project(&key)?;
        }
        Ok(())
    }

    fn migrate_legacy_project(&self, key: &str) -> Result<(), StorageError> {
        let project_id = key
            .strip_prefix(PROJECT_KEY_PREFIX)
            .unwrap_or(key)
            .to_string();
        let raw = self
            .medium
            .get(key)
            .ok_or_else(|| StorageError::NotFound(format!("legacy record {}", key)))?;
        let value: Value = serde_json::from_str(&raw).map_err(|e| {
            StorageError::DataFormat(format!("Legacy record {} is not valid JSON: {}", key, e))
        })?;

        let name = value
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("Unnamed Project")
            .to_string();
        let theme = value
            .get("theme")
            .and_then(Value::as_str)
            .unwrap_or("default")
            .to_string();
        let selected_file_id = value
            .get("selectedFile")
            .and_then(Value::as_str)
            .map(str::to_string);

        debug!("Migrating project {} ({})", name, project_id);

        // Normalize every file record, filling the fields v1 could omit.
        let mut diagrams = BTreeMap::new();
        if let Some(files) = value.get("diagrams").and_then(Value::as_object) {
            for (file_id, file) in files {
                diagrams.insert(
                    file_id.clone(),
                    FileRecord {
                        id: file
                            .get("id")
                            .and_then(Value::as_str)
                            .unwrap_or(file_id)
                            .to_string(),
                        name: file
                            .get("name")
                            .and_then(Value::as_str)
                            .unwrap_or("Untitled")
                            .to_string(),
                        content: file
                            .get("content")
                            .and_then(Value::as_str)
                            .unwrap_or("")
                            .to_string(),
                        version: Some(
                            file.get("version")
                                .and_then(Value::as_str)
                                .map(str::to_string)
                                .unwrap_or_else(ids::new_version),
                        ),
                    },
                );
            }
        }

        let normalized = StoredProject {
            id: project_id.clone(),
            name,
            diagrams,
        };
        let raw = serde_json::to_string(&normalized).map_err(|e| {
            StorageError::DataFormat(format!(
                "Failed to serialize migrated project {}: {}",
                project_id, e
            ))
        })?;
        self.medium.set(key, &raw)?;

        let mut reference = ProjectReference::new(&project_id, keyvalue::PROVIDER_NAME);
        reference.theme = theme;
        reference.selected_file_id = selected_file_id;
        let raw = serde_json::to_string(&reference).map_err(|e| {
            StorageError::DataFormat(format!(
                "Failed to serialize reference {}: {}",
                project_id, e
            ))
        })?;
        self.medium
            .set(&format!("{}{}", REFERENCE_KEY_PREFIX, project_id), &raw)?;

        debug!("Migrated project {} and created its reference", project_id);
        Ok(())
    }

    /// Snapshot the entire medium under a timestamped key before migrating.
    /// Returns the backup key, or None when the snapshot could not be stored
    /// (for example over quota); that failure is logged and skipped.
    pub fn create_backup(&self) -> Option<String> {
        let mut snapshot = BTreeMap::new();
        for key in self.medium.keys() {
            if let Some(value) = self.medium.get(&key) {
                snapshot.insert(key, value);
            }
        }

        let timestamp = Utc::now()
            .to_rfc3339()
            .replace([':', '.'], "-");
        let backup_key = format!("{}{}", BACKUP_KEY_PREFIX, timestamp);

        let raw = match serde_json::to_string(&snapshot) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Failed to serialize backup: {}", e);
                return None;
            }
        };
        match self.medium.set(&backup_key, &raw) {
            Ok(()) => {
                info!("Created backup: {}", backup_key);
                Some(backup_key)
            }
            Err(e) => {
                warn!("Failed to create backup due to storage limits: {}", e);
                None
            }
        }
    }

    /// Restore the medium from a backup snapshot (recovery escape hatch).
    pub fn restore_backup(&self, backup_key: &str) -> Result<(), StorageError> {
        let raw = self
            .medium
            .get(backup_key)
            .ok_or_else(|| StorageError::NotFound(format!("backup {}", backup_key)))?;
        let snapshot: BTreeMap<String, String> = serde_json::from_str(&raw).map_err(|e| {
            StorageError::DataFormat(format!("Backup {} is not valid JSON: {}", backup_key, e))
        })?;

        for key in self.medium.keys() {
            if key != backup_key {
                self.medium.remove(&key);
            }
        }
        for (key, value) in &snapshot {
            self.medium.set(key, value)?;
        }

        info!("Restored medium from backup {}", backup_key);
        Ok(())
    }

    pub fn status(&self) -> MigrationStatus {
        let current_version = self.current_storage_version();
        let legacy_projects = self.legacy_project_keys().len();
        MigrationStatus {
            current_version,
            target_version: CURRENT_STORAGE_VERSION,
            has_legacy_data: legacy_projects > 0,
            needs_migration: current_version < CURRENT_STORAGE_VERSION,
            legacy_projects,
        }
    }
}
