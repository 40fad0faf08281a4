//! Storage provider abstraction
//!
//! Defines the StorageProvider trait and implementations for the supported
//! storage media:
//! - KeyValueProvider: one JSON blob per project in a key-value medium
//! - LocalFolderProvider: a user-granted directory, one metadata document
//!   plus one content artifact per file

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::model::{FileRecord, MetadataUpdate, ProjectMetadata};

/// Error type for storage operations
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Storage provider not available: {0}")]
    ProviderUnavailable(String),
    #[error("Folder access must be re-granted: {0}")]
    ReconnectRequired(String),
    #[error("Cancelled by user")]
    UserCancelled,
    #[error("Malformed data: {0}")]
    DataFormat(String),
    #[error("Migration failed: {0}")]
    MigrationFailure(String),
    #[error("Write rejected by storage medium: {0}")]
    WriteFailure(String),
    #[error("IO error: {0}")]
    IoError(String),
}

/// File records keyed by file id.
pub type FileMap = BTreeMap<String, FileRecord>;

/// Result of importing a serialized project into a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedProject {
    pub project_id: String,
    pub project_name: String,
}

/// Trait for storage providers
///
/// Each provider implements the full project/file CRUD contract for one
/// physical medium. Callers never touch the medium directly; the project
/// coordinator resolves a provider by name and delegates through this trait.
#[async_trait(?Send)]
pub trait StorageProvider: Send + Sync {
    /// Registry key for this provider.
    fn name(&self) -> &'static str;

    /// Human-readable name shown when picking a provider.
    fn display_name(&self) -> &'static str;

    /// Fetch project metadata without loading content. Returns Ok(None) for
    /// an absent project; this doubles as the cheap existence check.
    async fn get_project_metadata(
        &self,
        project_id: &str,
    ) -> Result<Option<ProjectMetadata>, StorageError>;

    /// Create a project with its initial files. Atomic from the caller's
    /// perspective: afterwards the project is fully readable, or nothing
    /// persists.
    async fn create_project(
        &self,
        project_id: &str,
        project_name: &str,
        initial_files: &FileMap,
    ) -> Result<(), StorageError>;

    /// Apply a partial metadata update.
    async fn update_project_metadata(
        &self,
        project_id: &str,
        updates: &MetadataUpdate,
    ) -> Result<(), StorageError>;

    /// Remove the project from this provider. Media with separate physical
    /// file artifacts leave those untouched; see `delete_project_files`.
    async fn delete_project(&self, project_id: &str) -> Result<(), StorageError>;

    /// Remove the project plus every physical file artifact. Media without
    /// separate artifacts treat this the same as `delete_project`.
    async fn delete_project_files(&self, project_id: &str) -> Result<(), StorageError> {
        self.delete_project(project_id).await
    }

    /// All files in a project, or Ok(None) when the project is absent.
    async fn get_project_files(&self, project_id: &str) -> Result<Option<FileMap>, StorageError>;

    /// One file, or Ok(None) when the project or file is absent.
    async fn get_file(
        &self,
        project_id: &str,
        file_id: &str,
    ) -> Result<Option<FileRecord>, StorageError>;

    /// Create or update a file. The stored record always carries a version
    /// stamp; a record without one is assigned a fresh stamp.
    async fn save_file(&self, project_id: &str, file: &FileRecord) -> Result<(), StorageError>;

    /// Delete a file. Deleting an absent file is a no-op.
    async fn delete_file(&self, project_id: &str, file_id: &str) -> Result<(), StorageError>;

    /// Deep-copy a project under fresh identifiers within this provider.
    async fn duplicate_project(
        &self,
        source_id: &str,
        new_id: &str,
        new_name: &str,
    ) -> Result<(), StorageError>;

    /// Self-contained textual snapshot of the project, or Ok(None) when the
    /// project is absent.
    async fn export_project(&self, project_id: &str) -> Result<Option<String>, StorageError>;

    /// Import a serialized project snapshot. Fails with a data-format error
    /// if the payload does not parse into a known export shape.
    async fn import_project(&self, data: &str) -> Result<ImportedProject, StorageError>;
}

/// Runtime registry mapping provider name to provider instance.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn StorageProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, provider: Arc<dyn StorageProvider>) {
        self.providers
            .insert(provider.name().to_string(), provider);
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn StorageProvider>, StorageError> {
        self.providers
            .get(name)
            .cloned()
            .ok_or_else(|| StorageError::ProviderUnavailable(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.providers.keys().cloned().collect();
        names.sort();
        names
    }
}

// Storage provider implementations
pub mod keyvalue;
pub mod local_folder;
