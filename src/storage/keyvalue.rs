//! Key-value storage provider
//!
//! Stores one JSON blob per project under a namespaced key; every file record
//! lives nested inside that blob. Each mutation re-reads the blob, merges the
//! change, and rewrites the whole value. Projects are small, so rewriting is
//! acceptable and keeps the merge window narrow for concurrent sessions.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{FileMap, ImportedProject, StorageError, StorageProvider};
use crate::medium::KeyValueMedium;
use crate::model::{ids, FileRecord, MetadataUpdate, ProjectExport, ProjectMetadata, StoredProject};

pub const PROVIDER_NAME: &str = "keyValue";

pub(crate) fn project_key(project_id: &str) -> String {
    format!("project-{}", project_id)
}

/// Storage provider over a key-value medium.
pub struct KeyValueProvider {
    medium: Arc<dyn KeyValueMedium>,
}

impl KeyValueProvider {
    pub fn new(medium: Arc<dyn KeyValueMedium>) -> Self {
        Self { medium }
    }

    fn read_project(&self, project_id: &str) -> Result<Option<StoredProject>, StorageError> {
        let Some(raw) = self.medium.get(&project_key(project_id)) else {
            return Ok(None);
        };

        serde_json::from_str(&raw).map(Some).map_err(|e| {
            StorageError::DataFormat(format!(
                "Project record {} is not valid JSON: {}",
                project_id, e
            ))
        })
    }

    fn write_project(&self, project: &StoredProject) -> Result<(), StorageError> {
        let raw = serde_json::to_string(project).map_err(|e| {
            StorageError::DataFormat(format!(
                "Failed to serialize project {}: {}",
                project.id, e
            ))
        })?;
        self.medium.set(&project_key(&project.id), &raw)
    }
}

#[async_trait(?Send)]
impl StorageProvider for KeyValueProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    fn display_name(&self) -> &'static str {
        "Browser Storage"
    }

    async fn get_project_metadata(
        &self,
        project_id: &str,
    ) -> Result<Option<ProjectMetadata>, StorageError> {
        Ok(self.read_project(project_id)?.map(|project| ProjectMetadata {
            name: project.name,
            theme: None,
            selected_file_id: None,
        }))
    }

    async fn create_project(
        &self,
        project_id: &str,
        project_name: &str,
        initial_files: &FileMap,
    ) -> Result<(), StorageError> {
        let mut project = StoredProject::new(project_id, project_name);
        for (file_id, file) in initial_files {
            let mut file = file.clone();
            if file.version.is_none() {
                file.version = Some(ids::new_version());
            }
            project.diagrams.insert(file_id.clone(), file);
        }

        // A single medium write: the project is fully readable afterwards or
        // nothing persisted.
        self.write_project(&project)?;
        debug!("Created project {} ({})", project_name, project_id);
        Ok(())
    }

    async fn update_project_metadata(
        &self,
        project_id: &str,
        updates: &MetadataUpdate,
    ) -> Result<(), StorageError> {
        let mut project = self
            .read_project(project_id)?
            .ok_or_else(|| StorageError::NotFound(format!("project {}", project_id)))?;

        if let Some(name) = &updates.name {
            project.name = name.clone();
        }
        // Theme and selected file live on the project reference; the blob
        // carries no copy of them.

        self.write_project(&project)
    }

    async fn delete_project(&self, project_id: &str) -> Result<(), StorageError> {
        self.medium.remove(&project_key(project_id));
        debug!("Deleted project {}", project_id);
        Ok(())
    }

    async fn get_project_files(&self, project_id: &str) -> Result<Option<FileMap>, StorageError> {
        Ok(self.read_project(project_id)?.map(|project| project.diagrams))
    }

    async fn get_file(
        &self,
        project_id: &str,
        file_id: &str,
    ) -> Result<Option<FileRecord>, StorageError> {
        Ok(self
            .read_project(project_id)?
            .and_then(|project| project.diagrams.get(file_id).cloned()))
    }

    async fn save_file(&self, project_id: &str, file: &FileRecord) -> Result<(), StorageError> {
        // Re-read immediately before merging so a concurrent session's writes
        // to other files survive this one.
        let mut project = self
            .read_project(project_id)?
            .ok_or_else(|| StorageError::NotFound(format!("project {}", project_id)))?;

        let mut file = file.clone();
        if file.version.is_none() {
            file.version = Some(ids::new_version());
        }

        debug!("Saving file {} in project {}", file.name, project_id);
        project.diagrams.insert(file.id.clone(), file);
        self.write_project(&project)
    }

    async fn delete_file(&self, project_id: &str, file_id: &str) -> Result<(), StorageError> {
        let mut project = self
            .read_project(project_id)?
            .ok_or_else(|| StorageError::NotFound(format!("project {}", project_id)))?;

        if project.diagrams.remove(file_id).is_some() {
            self.write_project(&project)?;
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
        let source = self
            .read_project(source_id)?
            .ok_or_else(|| StorageError::NotFound(format!("project {}", source_id)))?;

        let mut copy = StoredProject::new(new_id, new_name);
        for file in source.diagrams.values() {
            let fresh = FileRecord {
                id: ids::new_id(),
                name: file.name.clone(),
                content: file.content.clone(),
                version: Some(ids::new_version()),
            };
            copy.diagrams.insert(fresh.id.clone(), fresh);
        }

        self.write_project(&copy)?;
        debug!("Duplicated project {} as {} ({})", source_id, new_name, new_id);
        Ok(())
    }

    async fn export_project(&self, project_id: &str) -> Result<Option<String>, StorageError> {
        let Some(project) = self.read_project(project_id)? else {
            return Ok(None);
        };

        let mut files: Vec<FileRecord> = project.diagrams.into_values().collect();
        files.sort_by(|a, b| a.name.cmp(&b.name));

        let export = ProjectExport::new(project.id, project.name, files);
        Ok(Some(export.to_json()?))
    }

    async fn import_project(&self, data: &str) -> Result<ImportedProject, StorageError> {
        let export = ProjectExport::parse(data).inspect_err(|e| {
            warn!("Rejected project import: {}", e);
        })?;

        let mut project = StoredProject::new(&export.id, &export.name);
        for file in &export.files {
            let mut file = file.clone();
            if file.version.is_none() {
                file.version = Some(ids::new_version());
            }
            project.diagrams.insert(file.id.clone(), file);
        }

        self.write_project(&project)?;
        debug!("Imported project {} ({})", project.name, project.id);
        Ok(ImportedProject {
            project_id: project.id,
            project_name: project.name,
        })
    }
}
