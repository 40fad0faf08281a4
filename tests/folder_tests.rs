//! Local-folder provider tests
//!
//! Run against real temp directories with a scripted picker standing in for
//! the interactive directory dialog.

use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;

use diagram_storage_sdk::{
    KeyValueMedium, KeyValueProvider, LocalFolderProvider, MemoryKeyValueMedium,
    NativeFolderMedium, ProjectManager, QueuedDirectoryPicker, StorageError,
};

struct Harness {
    medium: Arc<MemoryKeyValueMedium>,
    picker: Arc<QueuedDirectoryPicker>,
    folder: Arc<LocalFolderProvider>,
    manager: ProjectManager,
}

fn harness() -> Harness {
    let medium = Arc::new(MemoryKeyValueMedium::new());
    let picker = Arc::new(QueuedDirectoryPicker::new());
    let folder_medium = Arc::new(NativeFolderMedium::new(picker.clone()));
    let folder = Arc::new(LocalFolderProvider::new(folder_medium, medium.clone()));

    let mut manager = ProjectManager::new(medium.clone());
    manager.register_provider(Arc::new(KeyValueProvider::new(medium.clone())));
    manager.register_local_folder(folder.clone());

    Harness {
        medium,
        picker,
        folder,
        manager,
    }
}

fn no_params() -> serde_json::Value {
    serde_json::Value::Object(Default::default())
}

fn doc_paths(dir: &Path) -> Vec<std::path::PathBuf> {
    std::fs::read_dir(dir)
        .unwrap()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.ends_with(".diagram-project.json"))
        })
        .collect()
}

fn mmd_count(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .unwrap()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.ends_with(".mmd"))
        })
        .count()
}

mod folder_crud_tests {
    use super::*;

    #[tokio::test]
    async fn test_create_project_writes_document_and_artifacts() {
        let dir = TempDir::new().unwrap();
        let mut h = harness();
        h.picker.push(dir.path());

        let reference = h
            .manager
            .create_project("Notes", "localFolder", no_params())
            .await
            .unwrap();
        assert_eq!(reference.storage_provider, "localFolder");

        let docs = doc_paths(dir.path());
        assert_eq!(docs.len(), 1);
        assert!(docs[0].ends_with("Notes.diagram-project.json"));
        assert_eq!(mmd_count(dir.path()), 1);

        // The document lists the file but never its content.
        let doc = std::fs::read_to_string(&docs[0]).unwrap();
        assert!(doc.contains("\"selectedFileId\""));
        assert!(!doc.contains("graph TD"));

        let files = h.manager.get_files().await.unwrap();
        assert_eq!(files.len(), 1);
        assert!(!files[0].content.is_empty());
    }

    #[tokio::test]
    async fn test_save_file_updates_artifact_and_document() {
        let dir = TempDir::new().unwrap();
        let mut h = harness();
        h.picker.push(dir.path());
        h.manager
            .create_project("Notes", "localFolder", no_params())
            .await
            .unwrap();

        let mut file = h.manager.get_files().await.unwrap().remove(0);
        file.content = "graph LR;\n    X-->Y;".to_string();
        let saved = h.manager.save_file(&file).await.unwrap();

        let artifact = dir.path().join(format!("{}.mmd", file.id));
        assert_eq!(
            std::fs::read_to_string(artifact).unwrap(),
            "graph LR;\n    X-->Y;"
        );

        let doc = std::fs::read_to_string(&doc_paths(dir.path())[0]).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&doc).unwrap();
        assert_eq!(
            parsed["files"][&file.id]["version"].as_str(),
            saved.version.as_deref()
        );
    }

    #[tokio::test]
    async fn test_reference_only_delete_leaves_files_on_disk() {
        let dir = TempDir::new().unwrap();
        let mut h = harness();
        h.picker.push(dir.path());
        h.manager
            .create_project("Notes", "localFolder", no_params())
            .await
            .unwrap();

        h.manager.delete_project(false).await.unwrap();

        // The user's files survive; only the reference and handle are gone.
        assert_eq!(doc_paths(dir.path()).len(), 1);
        assert_eq!(mmd_count(dir.path()), 1);
        // The fallback chain still left a project open.
        assert!(h.manager.selected_project().is_some());
    }

    #[tokio::test]
    async fn test_full_delete_erases_document_and_artifacts() {
        let dir = TempDir::new().unwrap();
        let mut h = harness();
        h.picker.push(dir.path());
        h.manager
            .create_project("Notes", "localFolder", no_params())
            .await
            .unwrap();

        h.manager.delete_project(true).await.unwrap();

        assert!(doc_paths(dir.path()).is_empty());
        assert_eq!(mmd_count(dir.path()), 0);
        assert!(h.manager.selected_project().is_some());
    }

    #[tokio::test]
    async fn test_cancelled_picker_creates_nothing() {
        let mut h = harness();
        // Queue left empty: the prompt is "dismissed".
        let result = h
            .manager
            .create_project("Notes", "localFolder", no_params())
            .await;
        assert!(matches!(result, Err(StorageError::UserCancelled)));
        assert!(h.manager.list_projects().await.unwrap().is_empty());
    }
}

mod reconnect_tests {
    use super::*;

    #[tokio::test]
    async fn test_lost_handle_surfaces_as_reconnect_required() {
        let dir = TempDir::new().unwrap();
        let mut h = harness();
        h.picker.push(dir.path());
        let reference = h
            .manager
            .create_project("Notes", "localFolder", no_params())
            .await
            .unwrap();

        // The cached grant disappears (new browser profile, cleared cache).
        h.medium
            .remove(&format!("directory-handle-{}", reference.id));

        let result = h.manager.open_project(&reference.id).await;
        assert!(matches!(result, Err(StorageError::ReconnectRequired(_))));
    }

    #[tokio::test]
    async fn test_reconnect_restores_access() {
        let dir = TempDir::new().unwrap();
        let mut h = harness();
        h.picker.push(dir.path());
        let reference = h
            .manager
            .create_project("Notes", "localFolder", no_params())
            .await
            .unwrap();
        h.medium
            .remove(&format!("directory-handle-{}", reference.id));

        h.picker.push(dir.path());
        let reopened = h
            .manager
            .reconnect_folder_project(&reference.id)
            .await
            .unwrap();
        assert_eq!(reopened.id, reference.id);
        assert_eq!(h.manager.get_files().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_vanished_directory_surfaces_as_reconnect_required() {
        let parent = TempDir::new().unwrap();
        let dir = parent.path().join("granted");
        std::fs::create_dir(&dir).unwrap();

        let mut h = harness();
        h.picker.push(&dir);
        let reference = h
            .manager
            .create_project("Notes", "localFolder", no_params())
            .await
            .unwrap();

        std::fs::remove_dir_all(&dir).unwrap();

        let result = h.manager.open_project(&reference.id).await;
        assert!(matches!(result, Err(StorageError::ReconnectRequired(_))));
    }
}

mod discovery_tests {
    use super::*;

    #[tokio::test]
    async fn test_discovery_finds_every_project_in_the_folder() {
        let dir = TempDir::new().unwrap();
        let mut h = harness();
        h.picker.push(dir.path());
        h.manager
            .create_project("Alpha", "localFolder", no_params())
            .await
            .unwrap();
        h.picker.push(dir.path());
        h.manager
            .create_project("Beta", "localFolder", no_params())
            .await
            .unwrap();

        // A fresh session scans the same folder.
        let mut fresh = harness();
        fresh.picker.push(dir.path());
        let discovery = fresh.manager.discover_folder_projects().await.unwrap();

        let mut names: Vec<&str> = discovery
            .projects
            .iter()
            .map(|project| project.name.as_str())
            .collect();
        names.sort();
        assert_eq!(names, vec!["Alpha", "Beta"]);

        let picked = discovery
            .projects
            .iter()
            .find(|project| project.name == "Beta")
            .unwrap();
        let opened = fresh
            .manager
            .open_discovered_project(&discovery.handle, picked)
            .await
            .unwrap();
        assert_eq!(opened.storage_provider, "localFolder");
        assert_eq!(fresh.manager.get_files().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_discovery_of_an_empty_folder_returns_no_projects() {
        let dir = TempDir::new().unwrap();
        let mut h = harness();
        h.picker.push(dir.path());

        let discovery = h.manager.discover_folder_projects().await.unwrap();
        assert!(discovery.projects.is_empty());
    }
}

mod duplication_tests {
    use super::*;

    #[tokio::test]
    async fn test_cross_provider_duplicate_lands_in_the_folder() {
        let dir = TempDir::new().unwrap();
        let mut h = harness();
        h.manager
            .create_project("Main", "keyValue", no_params())
            .await
            .unwrap();
        h.manager
            .create_file("Extra", Some("sequenceDiagram;"))
            .await
            .unwrap();
        let source_files = h.manager.get_files().await.unwrap();

        h.picker.push(dir.path());
        let copy = h
            .manager
            .duplicate_project("Main on disk", Some("localFolder"))
            .await
            .unwrap();
        assert_eq!(copy.storage_provider, "localFolder");

        assert_eq!(doc_paths(dir.path()).len(), 1);
        assert_eq!(mmd_count(dir.path()), source_files.len());

        let copy_files = h.manager.get_files().await.unwrap();
        assert_eq!(copy_files.len(), source_files.len());
        for (original, copied) in source_files.iter().zip(copy_files.iter()) {
            assert_eq!(original.name, copied.name);
            assert_eq!(original.content, copied.content);
            assert_ne!(original.id, copied.id);
        }
    }

    #[tokio::test]
    async fn test_provider_level_duplicate_deep_copies_into_a_new_folder() {
        let source_dir = TempDir::new().unwrap();
        let copy_dir = TempDir::new().unwrap();
        let mut h = harness();
        h.picker.push(source_dir.path());
        let reference = h
            .manager
            .create_project("Notes", "localFolder", no_params())
            .await
            .unwrap();

        use diagram_storage_sdk::StorageProvider;
        h.picker.push(copy_dir.path());
        h.folder
            .duplicate_project(&reference.id, "copy-id", "Notes copy")
            .await
            .unwrap();

        let metadata = h
            .folder
            .get_project_metadata("copy-id")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(metadata.name, "Notes copy");

        let files = h.folder.get_project_files("copy-id").await.unwrap().unwrap();
        assert_eq!(files.len(), 1);
        let copied = files.values().next().unwrap();
        assert!(!copied.content.is_empty());
        assert_ne!(
            Some(copied.id.as_str()),
            reference.selected_file_id.as_deref()
        );
    }

    #[tokio::test]
    async fn test_folder_duplicate_prompts_for_a_new_location() {
        let source_dir = TempDir::new().unwrap();
        let copy_dir = TempDir::new().unwrap();
        let mut h = harness();
        h.picker.push(source_dir.path());
        h.manager
            .create_project("Notes", "localFolder", no_params())
            .await
            .unwrap();

        h.picker.push(copy_dir.path());
        let copy = h
            .manager
            .duplicate_project("Notes copy", None)
            .await
            .unwrap();
        assert_eq!(copy.storage_provider, "localFolder");

        assert_eq!(doc_paths(copy_dir.path()).len(), 1);
        assert_eq!(mmd_count(copy_dir.path()), 1);
        // The source folder is untouched.
        assert_eq!(doc_paths(source_dir.path()).len(), 1);
    }
}
