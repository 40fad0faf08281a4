//! Local-folder storage provider
//!
//! A project lives in a user-granted directory as one small metadata document
//! (file records without content) plus one content artifact per file, named
//! by file id. Content stays readable and editable outside the tool, and a
//! metadata change never rewrites diagram text.
//!
//! The granted directory is reached through a cached handle token that is
//! re-validated before every use; a lapsed grant surfaces as the
//! distinguished `ReconnectRequired` condition so the caller can re-prompt.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info, warn};

use super::{FileMap, ImportedProject, StorageError, StorageProvider};
use crate::folder::{DirectoryHandle, FolderMedium, HandleCache, PickerMode};
use crate::medium::KeyValueMedium;
use crate::model::{
    ids, FileRecord, FolderFileEntry, FolderProjectDocument, MetadataUpdate, ProjectExport,
    ProjectMetadata,
};

pub const PROVIDER_NAME: &str = "localFolder";

/// Naming convention for the per-project metadata document. Discovery scans a
/// directory's immediate entries for this suffix.
pub const PROJECT_DOC_SUFFIX: &str = ".diagram-project.json";

fn content_entry(file_id: &str) -> String {
    format!("{}.mmd", file_id)
}

fn doc_entry(project_name: &str) -> String {
    format!("{}{}", project_name, PROJECT_DOC_SUFFIX)
}

/// Project discovered while scanning a user-picked directory.
#[derive(Debug, Clone)]
pub struct DiscoveredProject {
    pub id: String,
    pub name: String,
    pub doc_entry: String,
}

/// Result of a discovery scan: the picked directory plus every project
/// metadata document found in it. Zero and multiple matches are both valid
/// outcomes for the caller to handle.
pub struct FolderDiscovery {
    pub handle: Arc<dyn DirectoryHandle>,
    pub projects: Vec<DiscoveredProject>,
}

/// Storage provider over a user-granted local folder.
pub struct LocalFolderProvider {
    medium: Arc<dyn FolderMedium>,
    handles: HandleCache,
}

impl LocalFolderProvider {
    pub fn new(medium: Arc<dyn FolderMedium>, cache_medium: Arc<dyn KeyValueMedium>) -> Self {
        Self {
            medium,
            handles: HandleCache::new(cache_medium),
        }
    }

    /// Whether this environment can grant folder access. Checked before the
    /// provider is registered.
    pub fn is_supported(&self) -> bool {
        self.medium.is_supported()
    }

    async fn project_handle(
        &self,
        project_id: &str,
    ) -> Result<Arc<dyn DirectoryHandle>, StorageError> {
        self.handles.restore(self.medium.as_ref(), project_id).await
    }

    /// Prompt for a directory and remember it for `project_id`.
    pub async fn connect_project_directory(
        &self,
        project_id: &str,
    ) -> Result<Arc<dyn DirectoryHandle>, StorageError> {
        let handle = self.medium.pick_directory(PickerMode::ReadWrite).await?;
        self.handles.store(project_id, &handle.token())?;
        info!(
            "Directory {} connected for project {}",
            handle.display_name(),
            project_id
        );
        Ok(handle)
    }

    /// Drop the cached directory handle for `project_id`, leaving the
    /// directory contents untouched.
    pub fn forget_project_directory(&self, project_id: &str) {
        self.handles.remove(project_id);
    }

    /// Prompt for a directory and scan its immediate entries for project
    /// metadata documents.
    pub async fn discover_projects(&self) -> Result<FolderDiscovery, StorageError> {
        let handle = self.medium.pick_directory(PickerMode::Read).await?;
        let mut projects = Vec::new();

        for entry in handle.list_entries().await? {
            if !entry.ends_with(PROJECT_DOC_SUFFIX) {
                continue;
            }
            let Some(raw) = handle.read_file(&entry).await? else {
                continue;
            };
            match serde_json::from_str::<FolderProjectDocument>(&raw) {
                Ok(doc) => projects.push(DiscoveredProject {
                    id: doc.metadata.id,
                    name: doc.metadata.name,
                    doc_entry: entry,
                }),
                Err(e) => warn!("Skipping unreadable project document {}: {}", entry, e),
            }
        }

        info!(
            "Discovered {} project(s) in {}",
            projects.len(),
            handle.display_name()
        );
        Ok(FolderDiscovery { handle, projects })
    }

    /// Adopt a discovered project: cache the directory handle under its id so
    /// the regular provider operations can reach it.
    pub fn adopt_discovered_project(
        &self,
        handle: &Arc<dyn DirectoryHandle>,
        project: &DiscoveredProject,
    ) -> Result<(), StorageError> {
        self.handles.store(&project.id, &handle.token())
    }

    async fn find_project_doc(
        &self,
        handle: &dyn DirectoryHandle,
        project_id: &str,
    ) -> Result<Option<(String, FolderProjectDocument)>, StorageError> {
        for entry in handle.list_entries().await? {
            if !entry.ends_with(PROJECT_DOC_SUFFIX) {
                continue;
            }
            let Some(raw) = handle.read_file(&entry).await? else {
                continue;
            };
            match serde_json::from_str::<FolderProjectDocument>(&raw) {
                Ok(doc) if doc.metadata.id == project_id => return Ok(Some((entry, doc))),
                Ok(_) => {}
                Err(e) => warn!("Skipping unreadable project document {}: {}", entry, e),
            }
        }
        Ok(None)
    }

    async fn write_project_doc(
        &self,
        handle: &dyn DirectoryHandle,
        entry: &str,
        doc: &FolderProjectDocument,
    ) -> Result<(), StorageError> {
        let raw = serde_json::to_string_pretty(doc).map_err(|e| {
            StorageError::DataFormat(format!(
                "Failed to serialize project document {}: {}",
                doc.metadata.id, e
            ))
        })?;
        handle.write_file(entry, &raw).await
    }

    /// Write a full project (document plus content artifacts) into `handle`.
    async fn write_project(
        &self,
        handle: &dyn DirectoryHandle,
        project_id: &str,
        project_name: &str,
        files: &FileMap,
        theme: Option<&str>,
        selected_file_id: Option<&str>,
    ) -> Result<(), StorageError> {
        let now = Utc::now();
        let mut doc = FolderProjectDocument::new(project_id, project_name);
        if let Some(theme) = theme {
            doc.metadata.theme = theme.to_string();
        }
        doc.metadata.selected_file_id = selected_file_id
            .map(str::to_string)
            .or_else(|| files.keys().next().cloned());

        // Content artifacts first; the project only becomes discoverable once
        // the metadata document lands.
        for (file_id, file) in files {
            handle
                .write_file(&content_entry(file_id), &file.content)
                .await?;
            doc.files.insert(
                file_id.clone(),
                FolderFileEntry {
                    id: file.id.clone(),
                    name: file.name.clone(),
                    version: Some(
                        file.version
                            .clone()
                            .unwrap_or_else(ids::new_version),
                    ),
                    created_at: now,
                    modified_at: now,
                },
            );
        }

        self.write_project_doc(handle, &doc_entry(project_name), &doc)
            .await
    }
}

#[async_trait(?Send)]
impl StorageProvider for LocalFolderProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    fn display_name(&self) -> &'static str {
        "Local Folder"
    }

    async fn get_project_metadata(
        &self,
        project_id: &str,
    ) -> Result<Option<ProjectMetadata>, StorageError> {
        let handle = self.project_handle(project_id).await?;
        Ok(self
            .find_project_doc(handle.as_ref(), project_id)
            .await?
            .map(|(_, doc)| ProjectMetadata {
                name: doc.metadata.name,
                theme: Some(doc.metadata.theme),
                selected_file_id: doc.metadata.selected_file_id,
            }))
    }

    async fn create_project(
        &self,
        project_id: &str,
        project_name: &str,
        initial_files: &FileMap,
    ) -> Result<(), StorageError> {
        // Use the cached directory when one exists; otherwise prompt.
        let handle = match self.project_handle(project_id).await {
            Ok(handle) => handle,
            Err(StorageError::ReconnectRequired(_)) => {
                self.connect_project_directory(project_id).await?
            }
            Err(e) => return Err(e),
        };

        self.write_project(
            handle.as_ref(),
            project_id,
            project_name,
            initial_files,
            None,
            None,
        )
        .await?;
        info!("Created project {} in {}", project_name, handle.display_name());
        Ok(())
    }

    async fn update_project_metadata(
        &self,
        project_id: &str,
        updates: &MetadataUpdate,
    ) -> Result<(), StorageError> {
        let handle = self.project_handle(project_id).await?;
        let Some((entry, mut doc)) = self.find_project_doc(handle.as_ref(), project_id).await?
        else {
            return Err(StorageError::NotFound(format!("project {}", project_id)));
        };

        if let Some(name) = &updates.name {
            doc.metadata.name = name.clone();
        }
        if let Some(theme) = &updates.theme {
            doc.metadata.theme = theme.clone();
        }
        if let Some(selected) = &updates.selected_file_id {
            doc.metadata.selected_file_id = Some(selected.clone());
        }
        doc.touch();

        // The document keeps its original entry name even across renames so
        // external references to the file stay valid.
        self.write_project_doc(handle.as_ref(), &entry, &doc).await
    }

    async fn delete_project(&self, project_id: &str) -> Result<(), StorageError> {
        // Reference-only removal: the user's files stay on disk untouched.
        self.forget_project_directory(project_id);
        debug!("Forgot directory handle for project {}", project_id);
        Ok(())
    }

    async fn delete_project_files(&self, project_id: &str) -> Result<(), StorageError> {
        let handle = self.project_handle(project_id).await?;
        let Some((entry, doc)) = self.find_project_doc(handle.as_ref(), project_id).await? else {
            self.forget_project_directory(project_id);
            return Err(StorageError::NotFound(format!("project {}", project_id)));
        };

        for file_id in doc.files.keys() {
            if let Err(e) = handle.remove_entry(&content_entry(file_id)).await {
                warn!("Could not remove content artifact for {}: {}", file_id, e);
            }
        }
        handle.remove_entry(&entry).await?;
        self.forget_project_directory(project_id);
        info!("Deleted all files for project {}", project_id);
        Ok(())
    }

    async fn get_project_files(&self, project_id: &str) -> Result<Option<FileMap>, StorageError> {
        let handle = self.project_handle(project_id).await?;
        let Some((_, doc)) = self.find_project_doc(handle.as_ref(), project_id).await? else {
            return Ok(None);
        };

        let mut files = FileMap::new();
        for (file_id, file_entry) in &doc.files {
            let content = match handle.read_file(&content_entry(file_id)).await? {
                Some(content) => content,
                None => {
                    warn!(
                        "Content artifact missing for file {} in project {}",
                        file_id, project_id
                    );
                    String::new()
                }
            };
            files.insert(
                file_id.clone(),
                FileRecord {
                    id: file_entry.id.clone(),
                    name: file_entry.name.clone(),
                    content,
                    version: file_entry.version.clone(),
                },
            );
        }
        Ok(Some(files))
    }

    async fn get_file(
        &self,
        project_id: &str,
        file_id: &str,
    ) -> Result<Option<FileRecord>, StorageError> {
        let handle = self.project_handle(project_id).await?;
        let Some((_, doc)) = self.find_project_doc(handle.as_ref(), project_id).await? else {
            return Ok(None);
        };
        let Some(file_entry) = doc.files.get(file_id) else {
            return Ok(None);
        };

        let content = handle
            .read_file(&content_entry(file_id))
            .await?
            .unwrap_or_else(|| {
                warn!(
                    "Content artifact missing for file {} in project {}",
                    file_id, project_id
                );
                String::new()
            });

        Ok(Some(FileRecord {
            id: file_entry.id.clone(),
            name: file_entry.name.clone(),
            content,
            version: file_entry.version.clone(),
        }))
    }

    async fn save_file(&self, project_id: &str, file: &FileRecord) -> Result<(), StorageError> {
        let handle = self.project_handle(project_id).await?;
        let Some((entry, mut doc)) = self.find_project_doc(handle.as_ref(), project_id).await?
        else {
            return Err(StorageError::NotFound(format!("project {}", project_id)));
        };

        let version = file.version.clone().unwrap_or_else(ids::new_version);

        // Two writes: content artifact, then metadata document. A crash
        // between them leaves the document referring to a newer artifact.
        // TODO: write the artifact to a temp entry and rename it over the old
        // one so the pair can never be observed half-updated.
        handle
            .write_file(&content_entry(&file.id), &file.content)
            .await?;

        let now = Utc::now();
        let created_at = doc
            .files
            .get(&file.id)
            .map(|existing| existing.created_at)
            .unwrap_or(now);
        doc.files.insert(
            file.id.clone(),
            FolderFileEntry {
                id: file.id.clone(),
                name: file.name.clone(),
                version: Some(version),
                created_at,
                modified_at: now,
            },
        );
        doc.touch();

        self.write_project_doc(handle.as_ref(), &entry, &doc).await?;
        debug!("Saved file {} in project {}", file.name, project_id);
        Ok(())
    }

    async fn delete_file(&self, project_id: &str, file_id: &str) -> Result<(), StorageError> {
        let handle = self.project_handle(project_id).await?;
        let Some((entry, mut doc)) = self.find_project_doc(handle.as_ref(), project_id).await?
        else {
            return Err(StorageError::NotFound(format!("project {}", project_id)));
        };

        if doc.files.remove(file_id).is_some() {
            if let Err(e) = handle.remove_entry(&content_entry(file_id)).await {
                warn!("Could not remove content artifact for {}: {}", file_id, e);
            }
            doc.touch();
            self.write_project_doc(handle.as_ref(), &entry, &doc).await?;
            debug!("Deleted file {} from project {}", file_id, project_id);
        }
        Ok(())
    }

    async fn duplicate_project(
        &self,
        source_id: &str,
        new_id: &str,
        new_name: &str,
    ) -> Result<(), StorageError> {
        let files = self
            .get_project_files(source_id)
            .await?
            .ok_or_else(|| StorageError::NotFound(format!("project {}", source_id)))?;
        let source_theme = self
            .get_project_metadata(source_id)
            .await?
            .and_then(|metadata| metadata.theme);

        let mut fresh = FileMap::new();
        for file in files.values() {
            let file = FileRecord {
                id: ids::new_id(),
                name: file.name.clone(),
                content: file.content.clone(),
                version: Some(ids::new_version()),
            };
            fresh.insert(file.id.clone(), file);
        }

        // The duplicate needs its own physical location.
        let handle = self.connect_project_directory(new_id).await?;
        self.write_project(
            handle.as_ref(),
            new_id,
            new_name,
            &fresh,
            source_theme.as_deref(),
            None,
        )
        .await?;
        info!(
            "Duplicated project {} as {} in {}",
            source_id,
            new_name,
            handle.display_name()
        );
        Ok(())
    }

    async fn export_project(&self, project_id: &str) -> Result<Option<String>, StorageError> {
        let Some(files) = self.get_project_files(project_id).await? else {
            return Ok(None);
        };
        let metadata = self
            .get_project_metadata(project_id)
            .await?
            .ok_or_else(|| StorageError::NotFound(format!("project {}", project_id)))?;

        let mut files: Vec<FileRecord> = files.into_values().collect();
        files.sort_by(|a, b| a.name.cmp(&b.name));

        let export = ProjectExport::new(project_id, metadata.name, files);
        Ok(Some(export.to_json()?))
    }

    async fn import_project(&self, data: &str) -> Result<ImportedProject, StorageError> {
        let export = ProjectExport::parse(data)?;

        let mut files = FileMap::new();
        for file in &export.files {
            let mut file = file.clone();
            if file.version.is_none() {
                file.version = Some(ids::new_version());
            }
            files.insert(file.id.clone(), file);
        }

        // An imported project needs a physical location of its own.
        let handle = self.connect_project_directory(&export.id).await?;
        self.write_project(handle.as_ref(), &export.id, &export.name, &files, None, None)
            .await?;
        info!(
            "Imported project {} into {}",
            export.name,
            handle.display_name()
        );
        Ok(ImportedProject {
            project_id: export.id,
            project_name: export.name,
        })
    }
}
