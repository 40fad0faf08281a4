//! Migration engine tests

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use diagram_storage_sdk::{
    KeyValueMedium, MemoryKeyValueMedium, ReferenceStore, StorageError, StorageMigrator,
    StoredProject, CURRENT_STORAGE_VERSION,
};

const VERSION_KEY: &str = "diagram-storage-version";

fn legacy_record(name: &str, file_id: &str) -> String {
    format!(
        r#"{{"name":"{name}","theme":"dark","selectedFile":"{file_id}","diagrams":{{"{file_id}":{{"id":"{file_id}","name":"Main","content":"graph TD;"}}}}}}"#
    )
}

fn seeded_medium() -> Arc<MemoryKeyValueMedium> {
    let medium = Arc::new(MemoryKeyValueMedium::new());
    medium
        .set("project-p1", &legacy_record("First", "f1"))
        .unwrap();
    medium
        .set("project-p2", &legacy_record("Second", "f2"))
        .unwrap();
    medium
}

/// Medium that rejects writes to keys with a given prefix while armed. Lets
/// the tests force a mid-migration failure.
struct FlakyMedium {
    inner: MemoryKeyValueMedium,
    fail_prefix: String,
    armed: AtomicBool,
}

impl FlakyMedium {
    fn new(fail_prefix: &str) -> Self {
        Self {
            inner: MemoryKeyValueMedium::new(),
            fail_prefix: fail_prefix.to_string(),
            armed: AtomicBool::new(true),
        }
    }

    fn disarm(&self) {
        self.armed.store(false, Ordering::SeqCst);
    }
}

impl KeyValueMedium for FlakyMedium {
    fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.armed.load(Ordering::SeqCst) && key.starts_with(&self.fail_prefix) {
            return Err(StorageError::WriteFailure(format!(
                "simulated quota failure writing {}",
                key
            )));
        }
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) {
        self.inner.remove(key)
    }

    fn keys(&self) -> Vec<String> {
        self.inner.keys()
    }
}

mod version_inference_tests {
    use super::*;

    #[test]
    fn test_fresh_install_is_already_current() {
        let medium = Arc::new(MemoryKeyValueMedium::new());
        let migrator = StorageMigrator::new(medium.clone());

        assert_eq!(migrator.current_storage_version(), CURRENT_STORAGE_VERSION);
        migrator.migrate_if_needed().unwrap();
        // A fresh install never needed a backup.
        assert!(medium
            .keys()
            .iter()
            .all(|key| !key.starts_with("diagram-storage-backup-")));
    }

    #[test]
    fn test_legacy_data_infers_version_one() {
        let medium = seeded_medium();
        let migrator = StorageMigrator::new(medium);
        assert_eq!(migrator.current_storage_version(), 1);

        let status = migrator.status();
        assert!(status.needs_migration);
        assert_eq!(status.legacy_projects, 2);
    }

    #[test]
    fn test_explicit_marker_wins_over_inference() {
        let medium = seeded_medium();
        medium
            .set(VERSION_KEY, &CURRENT_STORAGE_VERSION.to_string())
            .unwrap();
        let migrator = StorageMigrator::new(medium);
        assert_eq!(migrator.current_storage_version(), CURRENT_STORAGE_VERSION);
        assert!(!migrator.status().needs_migration);
    }
}

mod migration_run_tests {
    use super::*;

    #[test]
    fn test_legacy_records_gain_references_and_versions() {
        let medium = seeded_medium();
        let migrator = StorageMigrator::new(medium.clone());
        migrator.migrate_if_needed().unwrap();

        assert_eq!(
            medium.get(VERSION_KEY).as_deref(),
            Some(CURRENT_STORAGE_VERSION.to_string().as_str())
        );

        let references = ReferenceStore::new(medium.clone());
        let reference = references.get("p1").unwrap().unwrap();
        assert_eq!(reference.storage_provider, "keyValue");
        assert_eq!(reference.theme, "dark");
        assert_eq!(reference.selected_file_id.as_deref(), Some("f1"));
        assert!(references.get("p2").unwrap().is_some());

        // The blob was normalized: every file now carries a version stamp.
        let project: StoredProject =
            serde_json::from_str(&medium.get("project-p1").unwrap()).unwrap();
        assert_eq!(project.id, "p1");
        assert_eq!(project.name, "First");
        assert!(project.diagrams["f1"].version.is_some());

        // No legacy-shaped records remain.
        let status = migrator.status();
        assert!(!status.has_legacy_data);
        assert_eq!(status.legacy_projects, 0);
    }

    #[test]
    fn test_running_migration_twice_is_a_no_op() {
        let medium = seeded_medium();
        let migrator = StorageMigrator::new(medium.clone());
        migrator.migrate_if_needed().unwrap();

        let snapshot_p1 = medium.get("project-p1").unwrap();
        let snapshot_ref = medium.get("project-ref-p1").unwrap();

        migrator.migrate_if_needed().unwrap();
        assert_eq!(medium.get("project-p1").unwrap(), snapshot_p1);
        assert_eq!(medium.get("project-ref-p1").unwrap(), snapshot_ref);
    }

    #[test]
    fn test_backup_snapshot_is_written_before_migrating() {
        let medium = seeded_medium();
        let migrator = StorageMigrator::new(medium.clone());
        migrator.migrate_if_needed().unwrap();

        let backup_key = medium
            .keys()
            .into_iter()
            .find(|key| key.starts_with("diagram-storage-backup-"))
            .expect("backup key present");

        // The snapshot holds the pre-migration record.
        let snapshot: std::collections::BTreeMap<String, String> =
            serde_json::from_str(&medium.get(&backup_key).unwrap()).unwrap();
        assert_eq!(snapshot.get("project-p1").unwrap(), &legacy_record("First", "f1"));
    }

    #[test]
    fn test_restore_backup_rolls_the_medium_back() {
        let medium = seeded_medium();
        let migrator = StorageMigrator::new(medium.clone());
        migrator.migrate_if_needed().unwrap();

        let backup_key = medium
            .keys()
            .into_iter()
            .find(|key| key.starts_with("diagram-storage-backup-"))
            .unwrap();

        migrator.restore_backup(&backup_key).unwrap();
        assert_eq!(
            medium.get("project-p1").unwrap(),
            legacy_record("First", "f1")
        );
        assert!(medium.get("project-ref-p1").is_none());
        assert!(medium.get(VERSION_KEY).is_none());
    }
}

mod failure_tests {
    use super::*;

    #[test]
    fn test_failed_step_aborts_without_advancing_the_marker() {
        let medium = Arc::new(FlakyMedium::new("project-ref-"));
        medium
            .set("project-p1", &legacy_record("First", "f1"))
            .unwrap();

        let migrator = StorageMigrator::new(medium.clone());
        let result = migrator.migrate_if_needed();
        assert!(matches!(result, Err(StorageError::MigrationFailure(_))));
        assert!(medium.get(VERSION_KEY).is_none());

        // After the underlying problem clears, re-running completes cleanly.
        medium.disarm();
        migrator.migrate_if_needed().unwrap();
        assert_eq!(
            medium.get(VERSION_KEY).as_deref(),
            Some(CURRENT_STORAGE_VERSION.to_string().as_str())
        );
        assert!(medium.get("project-ref-p1").is_some());
    }

    #[test]
    fn test_backup_failure_does_not_block_migration() {
        let medium = Arc::new(FlakyMedium::new("diagram-storage-backup-"));
        medium
            .set("project-p1", &legacy_record("First", "f1"))
            .unwrap();

        let migrator = StorageMigrator::new(medium.clone());
        migrator.migrate_if_needed().unwrap();

        assert!(medium.get("project-ref-p1").is_some());
        assert!(medium
            .keys()
            .iter()
            .all(|key| !key.starts_with("diagram-storage-backup-")));
    }
}
