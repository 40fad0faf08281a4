//! Project coordination
//!
//! `ProjectManager` is the single entry point for callers: it owns the
//! currently selected project reference, resolves it to a storage provider,
//! and exposes project/file CRUD, conflict detection, sharing, import/export,
//! and cross-provider duplication. External surfaces (editor, UI) only ever
//! talk to this type; no other component touches the media directly.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::folder::DirectoryHandle;
use crate::medium::KeyValueMedium;
use crate::migration::StorageMigrator;
use crate::model::{ids, FileRecord, MetadataUpdate, ProjectExport, ProjectReference};
use crate::reference::ReferenceStore;
use crate::storage::local_folder::{DiscoveredProject, FolderDiscovery, LocalFolderProvider};
use crate::storage::{keyvalue, FileMap, ProviderRegistry, StorageError, StorageProvider};
use crate::templates::TemplateSet;

/// Result of an advisory version check: whether another session wrote to the
/// file since this session last read or saved it. Never blocks a save; the
/// caller decides what to do with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictCheck {
    pub conflict: bool,
    pub file_name: Option<String>,
    pub storage_version: Option<String>,
    pub editor_version: Option<String>,
}

impl ConflictCheck {
    fn clean() -> Self {
        Self {
            conflict: false,
            file_name: None,
            storage_version: None,
            editor_version: None,
        }
    }
}

/// Accessibility of a referenced project, as observed by a metadata probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectAccess {
    Accessible,
    /// Folder-backed project whose directory grant must be renewed.
    NeedsReconnect,
    /// Reference resolves but the provider has no data for it.
    Missing,
    /// The named provider is not registered in this environment.
    ProviderUnavailable,
}

/// One row of the project listing: the reference plus what a metadata probe
/// found out about it.
#[derive(Debug, Clone)]
pub struct ProjectListing {
    pub reference: ProjectReference,
    pub name: Option<String>,
    pub access: ProjectAccess,
}

/// Outcome of importing a project.
#[derive(Debug)]
pub enum ImportOutcome {
    Imported(ProjectReference),
    /// A project with the same id already has a reference; nothing was
    /// written. Resolve with `resolve_import_conflict`.
    Conflict(ImportConflict),
}

#[derive(Debug)]
pub struct ImportConflict {
    pub incoming: ProjectExport,
    pub existing_name: Option<String>,
}

/// Central coordinator owning the active project reference and its resolved
/// provider.
pub struct ProjectManager {
    references: ReferenceStore,
    migrator: StorageMigrator,
    registry: ProviderRegistry,
    folder: Option<Arc<LocalFolderProvider>>,
    templates: TemplateSet,
    selected: Option<ProjectReference>,
    /// Version stamp of the last file this session read or saved.
    file_version: Option<String>,
    initialized: bool,
}

impl ProjectManager {
    /// Build a coordinator over the given reference medium. Providers are
    /// registered separately; the key-value provider is expected on every
    /// platform, the folder provider only where the environment supports it.
    pub fn new(medium: Arc<dyn KeyValueMedium>) -> Self {
        Self {
            references: ReferenceStore::new(medium.clone()),
            migrator: StorageMigrator::new(medium),
            registry: ProviderRegistry::new(),
            folder: None,
            templates: TemplateSet::new(),
            selected: None,
            file_version: None,
            initialized: false,
        }
    }

    pub fn register_provider(&mut self, provider: Arc<dyn StorageProvider>) {
        self.registry.register(provider);
    }

    /// Register the local-folder provider, keeping a typed handle for the
    /// discovery and reconnect operations only it supports.
    pub fn register_local_folder(&mut self, provider: Arc<LocalFolderProvider>) {
        self.folder = Some(provider.clone());
        self.registry.register(provider);
    }

    pub fn provider_names(&self) -> Vec<String> {
        self.registry.names()
    }

    /// Run the migration engine. Runs exactly once per coordinator; every
    /// operation calls through here first, so storage stays untouched until
    /// migration has succeeded and halts entirely while it keeps failing.
    pub fn initialize(&mut self) -> Result<(), StorageError> {
        self.ensure_initialized()
    }

    fn ensure_initialized(&mut self) -> Result<(), StorageError> {
        if !self.initialized {
            self.migrator.migrate_if_needed()?;
            self.initialized = true;
        }
        Ok(())
    }

    pub fn selected_project(&self) -> Option<&ProjectReference> {
        self.selected.as_ref()
    }

    pub fn selected_file_id(&self) -> Option<String> {
        self.selected
            .as_ref()
            .and_then(|reference| reference.selected_file_id.clone())
    }

    pub fn get_theme(&self) -> String {
        self.selected
            .as_ref()
            .map(|reference| reference.theme.clone())
            .unwrap_or_else(|| "default".to_string())
    }

    fn current(&self) -> Result<(ProjectReference, Arc<dyn StorageProvider>), StorageError> {
        let reference = self
            .selected
            .clone()
            .ok_or_else(|| StorageError::NotFound("no project is open".to_string()))?;
        let provider = self.registry.get(&reference.storage_provider)?;
        Ok((reference, provider))
    }

    fn folder_provider(&self) -> Result<Arc<LocalFolderProvider>, StorageError> {
        self.folder.clone().ok_or_else(|| {
            StorageError::ProviderUnavailable(
                crate::storage::local_folder::PROVIDER_NAME.to_string(),
            )
        })
    }

    /// Seed files for a new project. The distinguished name "Default" gets a
    /// README plus one file per built-in template; any other name gets a
    /// single starter file.
    fn seed_files(&self, project_name: &str) -> (FileMap, String) {
        let mut files = FileMap::new();
        let first_id = ids::new_id();

        if project_name == "Default" {
            let mut readme =
                FileRecord::new(first_id.clone(), "README", self.templates.readme_content());
            readme.version = Some(ids::new_version());
            files.insert(first_id.clone(), readme);

            for name in self.templates.names() {
                let mut file =
                    FileRecord::new(ids::new_id(), name, self.templates.get(name));
                file.version = Some(ids::new_version());
                files.insert(file.id.clone(), file);
            }
        } else {
            let mut file =
                FileRecord::new(first_id.clone(), "Default", self.templates.default_content());
            file.version = Some(ids::new_version());
            files.insert(first_id.clone(), file);
        }

        (files, first_id)
    }

    // ---- project lifecycle ----

    /// Create a project on the named provider and open it. The reference is
    /// persisted only after the provider confirms the create, so a reference
    /// never points at a project that failed to materialize.
    pub async fn create_project(
        &mut self,
        name: &str,
        provider_name: &str,
        provider_parameters: Value,
    ) -> Result<ProjectReference, StorageError> {
        self.ensure_initialized()?;
        let provider = self.registry.get(provider_name)?;

        let project_id = ids::new_id();
        let (files, selected_file_id) = self.seed_files(name);

        debug!("Creating project {} on provider {}", name, provider_name);
        provider.create_project(&project_id, name, &files).await?;

        let mut reference = ProjectReference::new(&project_id, provider_name);
        reference.storage_provider_parameters = provider_parameters;
        reference.selected_file_id = Some(selected_file_id);
        self.references.save(&reference)?;

        self.open_project(&project_id).await
    }

    /// Resolve a reference, verify the project is actually readable from its
    /// provider, and commit it as selected. A dead reference surfaces as
    /// NotFound; a folder project with a lapsed grant as ReconnectRequired.
    pub async fn open_project(
        &mut self,
        project_id: &str,
    ) -> Result<ProjectReference, StorageError> {
        self.ensure_initialized()?;
        let reference = self
            .references
            .get(project_id)?
            .ok_or_else(|| StorageError::NotFound(format!("project reference {}", project_id)))?;
        let provider = self.registry.get(&reference.storage_provider)?;

        provider
            .get_project_metadata(project_id)
            .await?
            .ok_or_else(|| {
                StorageError::NotFound(format!(
                    "project {} has no data in provider {}",
                    project_id, reference.storage_provider
                ))
            })?;

        self.references.set_last_selected(project_id)?;
        self.selected = Some(reference.clone());
        self.file_version = None;
        info!("Opened project {}", project_id);
        Ok(reference)
    }

    /// Open the last selected project, falling back to the first accessible
    /// one, and finally to a freshly created default project. The chain is
    /// deterministic and always ends in a valid open project.
    pub async fn open_last_selected_project(
        &mut self,
    ) -> Result<ProjectReference, StorageError> {
        self.ensure_initialized()?;

        if let Some(project_id) = self.references.last_selected() {
            match self.open_project(&project_id).await {
                Ok(reference) => return Ok(reference),
                Err(e) => warn!("Last selected project {} not openable: {}", project_id, e),
            }
        }
        self.open_first_accessible_or_default().await
    }

    async fn open_first_accessible_or_default(
        &mut self,
    ) -> Result<ProjectReference, StorageError> {
        for reference in self.references.list() {
            match self.open_project(&reference.id).await {
                Ok(opened) => return Ok(opened),
                Err(e) => warn!("Skipping inaccessible project {}: {}", reference.id, e),
            }
        }

        info!("No accessible projects, creating a default project");
        self.create_project(
            "Default",
            keyvalue::PROVIDER_NAME,
            Value::Object(Default::default()),
        )
        .await
    }

    /// Delete the current project. For folder-backed projects `delete_files`
    /// chooses between erasing the physical files and only dropping the
    /// reference; key-value deletion is always total. Afterwards another
    /// accessible project is opened (or a fresh default created); the
    /// coordinator is never left without an open project.
    pub async fn delete_project(
        &mut self,
        delete_files: bool,
    ) -> Result<ProjectReference, StorageError> {
        self.ensure_initialized()?;
        let (reference, provider) = self.current()?;

        if delete_files {
            provider.delete_project_files(&reference.id).await?;
        } else {
            provider.delete_project(&reference.id).await?;
        }

        self.references.delete(&reference.id);
        if self.references.last_selected().as_deref() == Some(reference.id.as_str()) {
            self.references.clear_last_selected();
        }
        self.selected = None;
        self.file_version = None;
        info!("Deleted project {}", reference.id);

        self.open_first_accessible_or_default().await
    }

    pub async fn rename_project(&mut self, new_name: &str) -> Result<(), StorageError> {
        self.ensure_initialized()?;
        let (reference, provider) = self.current()?;
        provider
            .update_project_metadata(&reference.id, &MetadataUpdate::name(new_name))
            .await
    }

    /// Duplicate the current project by exporting it and replaying the export
    /// as a fresh create on the target provider (defaulting to the source's
    /// own provider), with new identifiers throughout. This is also how
    /// cross-provider copies work.
    pub async fn duplicate_project(
        &mut self,
        new_name: &str,
        target_provider: Option<&str>,
    ) -> Result<ProjectReference, StorageError> {
        self.ensure_initialized()?;
        let (reference, provider) = self.current()?;

        let data = provider
            .export_project(&reference.id)
            .await?
            .ok_or_else(|| StorageError::NotFound(format!("project {}", reference.id)))?;
        let export = ProjectExport::parse(&data)?;

        let target_name = target_provider
            .unwrap_or(&reference.storage_provider)
            .to_string();
        let target = self.registry.get(&target_name)?;

        let (fresh, id_mapping) = export.with_fresh_ids(ids::new_id(), new_name);
        target.import_project(&fresh.to_json()?).await?;

        let mut new_reference = ProjectReference::new(&fresh.id, &target_name);
        new_reference.theme = reference.theme.clone();
        if target_name == reference.storage_provider {
            new_reference.storage_provider_parameters =
                reference.storage_provider_parameters.clone();
        }
        new_reference.selected_file_id = reference
            .selected_file_id
            .as_ref()
            .and_then(|old| id_mapping.get(old).cloned())
            .or_else(|| fresh.files.first().map(|file| file.id.clone()));
        self.references.save(&new_reference)?;

        info!(
            "Duplicated project {} as {} on provider {}",
            reference.id, fresh.id, target_name
        );
        self.open_project(&fresh.id).await
    }

    /// Every reference with the result of a metadata probe: accessible,
    /// needs-reconnect, missing data, or provider unavailable. Nothing is
    /// deleted here; see `cleanup_orphaned_references`.
    pub async fn list_projects(&mut self) -> Result<Vec<ProjectListing>, StorageError> {
        self.ensure_initialized()?;

        let mut listings = Vec::new();
        for reference in self.references.list() {
            let listing = match self.registry.get(&reference.storage_provider) {
                Err(_) => ProjectListing {
                    reference,
                    name: None,
                    access: ProjectAccess::ProviderUnavailable,
                },
                Ok(provider) => match provider.get_project_metadata(&reference.id).await {
                    Ok(Some(metadata)) => ProjectListing {
                        reference,
                        name: Some(metadata.name),
                        access: ProjectAccess::Accessible,
                    },
                    Ok(None) => ProjectListing {
                        reference,
                        name: None,
                        access: ProjectAccess::Missing,
                    },
                    Err(StorageError::ReconnectRequired(_)) => ProjectListing {
                        reference,
                        name: None,
                        access: ProjectAccess::NeedsReconnect,
                    },
                    Err(e) => {
                        warn!("Probe failed for project {}: {}", reference.id, e);
                        ProjectListing {
                            reference,
                            name: None,
                            access: ProjectAccess::Missing,
                        }
                    }
                },
            };
            listings.push(listing);
        }

        listings.sort_by(|a, b| (&a.name, &a.reference.id).cmp(&(&b.name, &b.reference.id)));
        Ok(listings)
    }

    /// Remove references whose backing data is confirmed gone: the provider
    /// resolves but reports no project across repeated probes. A project that
    /// merely needs a reconnect is never treated as orphaned.
    pub async fn cleanup_orphaned_references(&mut self) -> Result<Vec<String>, StorageError> {
        self.ensure_initialized()?;
        const PROBE_ATTEMPTS: u32 = 2;

        let mut removed = Vec::new();
        for reference in self.references.list() {
            let Ok(provider) = self.registry.get(&reference.storage_provider) else {
                warn!(
                    "Provider {} unavailable, keeping reference {}",
                    reference.storage_provider, reference.id
                );
                continue;
            };

            let mut misses = 0;
            for _ in 0..PROBE_ATTEMPTS {
                match provider.get_project_metadata(&reference.id).await {
                    Ok(None) => misses += 1,
                    Ok(Some(_)) => {
                        misses = 0;
                        break;
                    }
                    Err(e) => {
                        warn!("Probe failed for reference {}: {}", reference.id, e);
                        misses = 0;
                        break;
                    }
                }
            }

            if misses == PROBE_ATTEMPTS {
                info!("Removing orphaned reference {}", reference.id);
                self.references.delete(&reference.id);
                removed.push(reference.id);
            }
        }
        Ok(removed)
    }

    // ---- selected-file and theme state ----

    /// Update the selected-file pointer on the current reference. The
    /// reference is the authority for this pointer; providers never track it
    /// on the coordinator's behalf.
    pub fn set_selected_file(&mut self, file_id: Option<String>) -> Result<(), StorageError> {
        let mut reference = self
            .selected
            .clone()
            .ok_or_else(|| StorageError::NotFound("no project is open".to_string()))?;
        reference.selected_file_id = file_id;
        self.references.save(&reference)?;
        self.selected = Some(reference);
        Ok(())
    }

    pub async fn set_theme(&mut self, theme: &str) -> Result<(), StorageError> {
        let mut reference = self
            .selected
            .clone()
            .ok_or_else(|| StorageError::NotFound("no project is open".to_string()))?;
        reference.theme = theme.to_string();
        self.references.save(&reference)?;
        self.selected = Some(reference.clone());

        // Media that keep their own metadata copy get it refreshed; the
        // reference stays authoritative if this write cannot land.
        if let Ok(provider) = self.registry.get(&reference.storage_provider)
            && let Err(e) = provider
                .update_project_metadata(&reference.id, &MetadataUpdate::theme(theme))
                .await
        {
            warn!(
                "Could not refresh stored theme for project {}: {}",
                reference.id, e
            );
        }
        Ok(())
    }

    // ---- file operations ----

    /// Files of the current project, sorted by name.
    pub async fn get_files(&self) -> Result<Vec<FileRecord>, StorageError> {
        let (reference, provider) = self.current()?;
        let files = provider
            .get_project_files(&reference.id)
            .await?
            .ok_or_else(|| StorageError::NotFound(format!("project {}", reference.id)))?;

        let mut files: Vec<FileRecord> = files.into_values().collect();
        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }

    pub async fn get_file(&self, file_id: &str) -> Result<Option<FileRecord>, StorageError> {
        let (reference, provider) = self.current()?;
        provider.get_file(&reference.id, file_id).await
    }

    /// Create a file in the current project and select it. Without explicit
    /// content the default template is used.
    pub async fn create_file(
        &mut self,
        name: &str,
        content: Option<&str>,
    ) -> Result<FileRecord, StorageError> {
        let content = content.unwrap_or_else(|| self.templates.default_content());
        let file = FileRecord::new(ids::new_id(), name, content);
        let saved = self.save_file(&file).await?;
        self.set_selected_file(Some(saved.id.clone()))?;
        Ok(saved)
    }

    /// Open a file: fetch it from storage, record its version stamp as the
    /// session's last-seen version, and select it.
    pub async fn open_file(&mut self, file_id: &str) -> Result<FileRecord, StorageError> {
        let (reference, provider) = self.current()?;
        let file = provider
            .get_file(&reference.id, file_id)
            .await?
            .ok_or_else(|| StorageError::NotFound(format!("file {}", file_id)))?;

        self.file_version = file.version.clone();
        self.set_selected_file(Some(file.id.clone()))?;
        Ok(file)
    }

    /// Save a file with a freshly generated version stamp. The stamp advances
    /// on every save, even when the content is unchanged, so concurrent
    /// sessions always observe the write.
    pub async fn save_file(&mut self, file: &FileRecord) -> Result<FileRecord, StorageError> {
        let (reference, provider) = self.current()?;

        let mut stored = file.clone();
        stored.version = Some(ids::new_version());
        provider.save_file(&reference.id, &stored).await?;
        self.file_version = stored.version.clone();
        Ok(stored)
    }

    /// Delete a file (defaulting to the selected one), then select the first
    /// remaining file. Deleting the last file synthesizes a fresh "Default"
    /// file, so a project never ends up with zero files. Returns the file
    /// that is now selected.
    pub async fn delete_file(
        &mut self,
        file_id: Option<&str>,
    ) -> Result<FileRecord, StorageError> {
        let (reference, provider) = self.current()?;
        let target = file_id
            .map(str::to_string)
            .or_else(|| reference.selected_file_id.clone())
            .ok_or_else(|| StorageError::NotFound("no file selected".to_string()))?;

        provider.delete_file(&reference.id, &target).await?;
        debug!("Deleted file {} from project {}", target, reference.id);

        let files = self.get_files().await?;
        match files.first() {
            Some(first) => {
                let first_id = first.id.clone();
                self.open_file(&first_id).await
            }
            None => self.create_file("Default", None).await,
        }
    }

    pub async fn rename_file(
        &mut self,
        file_id: &str,
        new_name: &str,
    ) -> Result<FileRecord, StorageError> {
        let mut file = self
            .get_file(file_id)
            .await?
            .ok_or_else(|| StorageError::NotFound(format!("file {}", file_id)))?;
        file.name = new_name.to_string();
        self.save_file(&file).await
    }

    /// Copy a file under a new id and name, and select the copy.
    pub async fn duplicate_file(
        &mut self,
        file_id: &str,
        new_name: &str,
    ) -> Result<FileRecord, StorageError> {
        let source = self
            .get_file(file_id)
            .await?
            .ok_or_else(|| StorageError::NotFound(format!("file {}", file_id)))?;

        let copy = FileRecord::new(ids::new_id(), new_name, source.content);
        let saved = self.save_file(&copy).await?;
        self.set_selected_file(Some(saved.id.clone()))?;
        Ok(saved)
    }

    /// Compare the session's last-seen version stamp against what storage
    /// holds now. Advisory only: a conflict is returned as data, never
    /// enforced.
    pub async fn check_version_conflict(
        &self,
        file_id: &str,
    ) -> Result<ConflictCheck, StorageError> {
        let (reference, provider) = self.current()?;
        let stored = provider.get_file(&reference.id, file_id).await?;

        match stored {
            Some(file) if file.version != self.file_version => {
                debug!(
                    "Version conflict on file {} in project {}",
                    file_id, reference.id
                );
                Ok(ConflictCheck {
                    conflict: true,
                    file_name: Some(file.name),
                    storage_version: file.version,
                    editor_version: self.file_version.clone(),
                })
            }
            _ => Ok(ConflictCheck::clean()),
        }
    }

    // ---- export / import / sharing ----

    /// Self-contained export of the current project.
    pub async fn export_project(&self) -> Result<String, StorageError> {
        let (reference, provider) = self.current()?;
        provider
            .export_project(&reference.id)
            .await?
            .ok_or_else(|| StorageError::NotFound(format!("project {}", reference.id)))
    }

    /// Import a serialized project. When its id already has a reference,
    /// nothing is written and a conflict descriptor is returned for explicit
    /// resolution.
    pub async fn import_project(&mut self, data: &str) -> Result<ImportOutcome, StorageError> {
        self.ensure_initialized()?;
        let export = ProjectExport::parse(data)?;
        self.import_export(export).await
    }

    async fn import_export(
        &mut self,
        export: ProjectExport,
    ) -> Result<ImportOutcome, StorageError> {
        if let Some(existing) = self.references.get(&export.id)? {
            let existing_name = match self.registry.get(&existing.storage_provider) {
                Ok(provider) => provider
                    .get_project_metadata(&existing.id)
                    .await
                    .ok()
                    .flatten()
                    .map(|metadata| metadata.name),
                Err(_) => None,
            };
            info!("Import collides with existing project {}", export.id);
            return Ok(ImportOutcome::Conflict(ImportConflict {
                incoming: export,
                existing_name,
            }));
        }

        let reference = self.import_fresh(&export).await?;
        Ok(ImportOutcome::Imported(reference))
    }

    /// Imports land on the key-value provider; moving a project to a folder
    /// afterwards goes through `duplicate_project`.
    async fn import_fresh(
        &mut self,
        export: &ProjectExport,
    ) -> Result<ProjectReference, StorageError> {
        let provider = self.registry.get(keyvalue::PROVIDER_NAME)?;
        provider.import_project(&export.to_json()?).await?;

        let mut files = export.files.clone();
        files.sort_by(|a, b| a.name.cmp(&b.name));

        let mut reference = ProjectReference::new(&export.id, keyvalue::PROVIDER_NAME);
        reference.selected_file_id = files.first().map(|file| file.id.clone());
        self.references.save(&reference)?;

        info!("Imported project {} ({})", export.name, export.id);
        self.open_project(&export.id).await
    }

    /// Resolve an import conflict with an explicit action: `overwrite`
    /// replaces the existing reference and data, `create-copy` imports under
    /// a fresh id and "(Copy)" name. Any other action is a no-op returning
    /// false.
    pub async fn resolve_import_conflict(
        &mut self,
        incoming: &ProjectExport,
        action: &str,
    ) -> Result<bool, StorageError> {
        self.ensure_initialized()?;
        match action {
            "overwrite" => {
                if let Some(existing) = self.references.get(&incoming.id)? {
                    if let Ok(provider) = self.registry.get(&existing.storage_provider) {
                        if let Err(e) = provider.delete_project_files(&existing.id).await {
                            warn!(
                                "Could not remove data of replaced project {}: {}",
                                existing.id, e
                            );
                        }
                    }
                    self.references.delete(&existing.id);
                }
                self.import_fresh(incoming).await?;
                Ok(true)
            }
            "create-copy" => {
                let copy = incoming
                    .with_identity(ids::new_id(), format!("{} (Copy)", incoming.name));
                self.import_fresh(&copy).await?;
                Ok(true)
            }
            other => {
                warn!("Unrecognized import conflict action: {}", other);
                Ok(false)
            }
        }
    }

    /// Encode the current project into a URL that carries the full export in
    /// its query string.
    pub async fn generate_share_url(&self, base_url: &str) -> Result<String, StorageError> {
        let data = self.export_project().await?;
        let export = ProjectExport::parse(&data)?;
        let encoded = crate::share::encode_share_data(&export)?;
        Ok(format!(
            "{}?project={}",
            base_url.trim_end_matches(['?', '&']),
            encoded
        ))
    }

    /// Import a project from share-link data, accepting both the compact and
    /// the legacy encoding.
    pub async fn import_from_url(&mut self, data: &str) -> Result<ImportOutcome, StorageError> {
        self.ensure_initialized()?;
        let export = crate::share::decode_share_data(data)?;
        self.import_export(export).await
    }

    // ---- folder-specific flows ----

    /// Prompt for a directory and scan it for existing folder-backed
    /// projects. Zero matches and multiple matches are both valid results;
    /// the caller decides how to proceed.
    pub async fn discover_folder_projects(&mut self) -> Result<FolderDiscovery, StorageError> {
        self.ensure_initialized()?;
        self.folder_provider()?.discover_projects().await
    }

    /// Open a project found by `discover_folder_projects`, creating a
    /// reference for it when none exists yet.
    pub async fn open_discovered_project(
        &mut self,
        handle: &Arc<dyn DirectoryHandle>,
        project: &DiscoveredProject,
    ) -> Result<ProjectReference, StorageError> {
        self.ensure_initialized()?;
        let folder = self.folder_provider()?;
        folder.adopt_discovered_project(handle, project)?;

        if self.references.get(&project.id)?.is_none() {
            let reference = ProjectReference::new(
                &project.id,
                crate::storage::local_folder::PROVIDER_NAME,
            );
            self.references.save(&reference)?;
        }
        self.open_project(&project.id).await
    }

    /// Re-prompt for the directory of a folder-backed project whose grant has
    /// lapsed, then open it.
    pub async fn reconnect_folder_project(
        &mut self,
        project_id: &str,
    ) -> Result<ProjectReference, StorageError> {
        self.ensure_initialized()?;
        let folder = self.folder_provider()?;
        folder.connect_project_directory(project_id).await?;
        self.open_project(project_id).await
    }
}
