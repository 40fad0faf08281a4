//! Diagram Storage SDK - project and file storage for diagram editors
//!
//! Provides unified interfaces for:
//! - Storage providers (key-value blob storage, user-granted local folders)
//! - Project references decoupling "which project is open" from "where its
//!   data lives"
//! - Optimistic version-conflict detection via opaque stamps
//! - Startup schema migration of persisted records
//! - Project export/import and share-link encoding

pub mod folder;
pub mod medium;
pub mod migration;
pub mod model;
pub mod project;
pub mod reference;
pub mod share;
pub mod storage;
pub mod templates;

// Re-export commonly used types
pub use storage::{
    FileMap, ImportedProject, ProviderRegistry, StorageError, StorageProvider,
};
pub use storage::keyvalue::KeyValueProvider;
pub use storage::local_folder::{DiscoveredProject, FolderDiscovery, LocalFolderProvider};

pub use medium::KeyValueMedium;
pub use medium::memory::MemoryKeyValueMedium;
#[cfg(feature = "native-fs")]
pub use medium::file::FileKeyValueMedium;
#[cfg(all(target_arch = "wasm32", feature = "wasm"))]
pub use medium::web::LocalStorageMedium;

pub use folder::{
    DirectoryHandle, FolderMedium, HandleCache, HandleToken, PermissionState, PickerMode,
};
#[cfg(feature = "native-fs")]
pub use folder::native::{DirectoryPicker, NativeFolderMedium, QueuedDirectoryPicker};

pub use model::{
    FileRecord, MetadataUpdate, ProjectExport, ProjectMetadata, ProjectReference, StoredProject,
};
pub use reference::ReferenceStore;
pub use migration::{MigrationStatus, StorageMigrator, CURRENT_STORAGE_VERSION};
pub use project::{
    ConflictCheck, ImportConflict, ImportOutcome, ProjectAccess, ProjectListing, ProjectManager,
};
pub use share::{decode_share_data, encode_share_data};
pub use templates::TemplateSet;
