//! Native folder medium
//!
//! Implements the folder capability traits over the local file system via
//! tokio::fs. The handle token is the directory path; permission maps to the
//! directory still existing (the OS grants access as long as it does). The
//! interactive picker is injected, so headless hosts and tests can script it.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, info};

use super::{DirectoryHandle, FolderMedium, HandleToken, PermissionState, PickerMode};
use crate::storage::StorageError;

/// Source of user-chosen directories for the native medium.
#[async_trait(?Send)]
pub trait DirectoryPicker: Send + Sync {
    /// Resolve the directory the user chose, or `UserCancelled` when the
    /// prompt was dismissed.
    async fn pick(&self, mode: PickerMode) -> Result<PathBuf, StorageError>;
}

/// Picker that resolves directories from a pre-seeded queue. Hosts without an
/// interactive dialog (and tests) use this; an empty queue behaves like a
/// dismissed prompt.
#[derive(Default)]
pub struct QueuedDirectoryPicker {
    queue: Mutex<VecDeque<PathBuf>>,
}

impl QueuedDirectoryPicker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_paths(paths: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            queue: Mutex::new(paths.into_iter().collect()),
        }
    }

    pub fn push(&self, path: impl Into<PathBuf>) {
        self.queue
            .lock()
            .expect("picker lock poisoned")
            .push_back(path.into());
    }
}

#[async_trait(?Send)]
impl DirectoryPicker for QueuedDirectoryPicker {
    async fn pick(&self, _mode: PickerMode) -> Result<PathBuf, StorageError> {
        self.queue
            .lock()
            .expect("picker lock poisoned")
            .pop_front()
            .ok_or(StorageError::UserCancelled)
    }
}

/// Folder medium over the local file system.
pub struct NativeFolderMedium {
    picker: Arc<dyn DirectoryPicker>,
}

impl NativeFolderMedium {
    pub fn new(picker: Arc<dyn DirectoryPicker>) -> Self {
        Self { picker }
    }
}

#[async_trait(?Send)]
impl FolderMedium for NativeFolderMedium {
    fn is_supported(&self) -> bool {
        true
    }

    async fn pick_directory(
        &self,
        mode: PickerMode,
    ) -> Result<Arc<dyn DirectoryHandle>, StorageError> {
        let path = self.picker.pick(mode).await?;
        fs::create_dir_all(&path).await.map_err(|e| {
            StorageError::IoError(format!(
                "Failed to prepare directory {}: {}",
                path.display(),
                e
            ))
        })?;
        info!("Directory granted: {}", path.display());
        Ok(Arc::new(NativeDirectoryHandle { path }))
    }

    async fn restore_handle(
        &self,
        token: &HandleToken,
    ) -> Result<Option<Arc<dyn DirectoryHandle>>, StorageError> {
        let path = PathBuf::from(token.as_str());
        match fs::metadata(&path).await {
            Ok(metadata) if metadata.is_dir() => {
                debug!("Restored directory handle: {}", path.display());
                Ok(Some(Arc::new(NativeDirectoryHandle { path })))
            }
            Ok(_) => Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::IoError(format!(
                "Failed to restore directory {}: {}",
                path.display(),
                e
            ))),
        }
    }
}

/// Granted directory on the local file system.
pub struct NativeDirectoryHandle {
    path: PathBuf,
}

impl NativeDirectoryHandle {
    /// Entries are bare file names; anything path-like would escape the
    /// granted directory.
    fn resolve_entry(&self, entry: &str) -> Result<PathBuf, StorageError> {
        if entry.contains('/') || entry.contains('\\') || entry.contains("..") {
            return Err(StorageError::IoError(format!(
                "Entry name escapes the granted directory: {}",
                entry
            )));
        }
        Ok(self.path.join(entry))
    }
}

#[async_trait(?Send)]
impl DirectoryHandle for NativeDirectoryHandle {
    fn display_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    fn token(&self) -> HandleToken {
        HandleToken::new(self.path.to_string_lossy().into_owned())
    }

    async fn list_entries(&self) -> Result<Vec<String>, StorageError> {
        let mut entries = Vec::new();
        let mut read_dir = fs::read_dir(&self.path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::NotFound(self.path.display().to_string())
            } else {
                StorageError::IoError(format!(
                    "Failed to read directory {}: {}",
                    self.path.display(),
                    e
                ))
            }
        })?;

        while let Some(entry) = read_dir
            .next_entry()
            .await
            .map_err(|e| StorageError::IoError(format!("Failed to read directory entry: {}", e)))?
        {
            if let Ok(file_type) = entry.file_type().await
                && file_type.is_file()
                && let Some(file_name) = entry.file_name().to_str()
            {
                entries.push(file_name.to_string());
            }
        }

        entries.sort();
        Ok(entries)
    }

    async fn read_file(&self, entry: &str) -> Result<Option<String>, StorageError> {
        let path = self.resolve_entry(entry)?;
        match fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::IoError(format!(
                "Failed to read {}: {}",
                entry, e
            ))),
        }
    }

    async fn write_file(&self, entry: &str, content: &str) -> Result<(), StorageError> {
        let path = self.resolve_entry(entry)?;
        fs::write(&path, content)
            .await
            .map_err(|e| StorageError::WriteFailure(format!("Failed to write {}: {}", entry, e)))
    }

    async fn remove_entry(&self, entry: &str) -> Result<(), StorageError> {
        let path = self.resolve_entry(entry)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::WriteFailure(format!(
                "Failed to remove {}: {}",
                entry, e
            ))),
        }
    }

    async fn query_permission(&self) -> PermissionState {
        if path_is_dir(&self.path).await {
            PermissionState::Granted
        } else {
            PermissionState::Denied
        }
    }

    async fn request_permission(&self) -> PermissionState {
        // The OS grants access as long as the directory exists; there is no
        // interactive prompt to repeat.
        self.query_permission().await
    }
}

async fn path_is_dir(path: &Path) -> bool {
    fs::metadata(path)
        .await
        .map(|metadata| metadata.is_dir())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_entry_names_cannot_escape() {
        let temp = TempDir::new().unwrap();
        let handle = NativeDirectoryHandle {
            path: temp.path().to_path_buf(),
        };

        assert!(handle.read_file("../etc/passwd").await.is_err());
        assert!(handle.write_file("a/b.mmd", "x").await.is_err());
        assert!(handle.read_file("plain.mmd").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_write_read_remove_round_trip() {
        let temp = TempDir::new().unwrap();
        let handle = NativeDirectoryHandle {
            path: temp.path().to_path_buf(),
        };

        handle.write_file("f1.mmd", "graph TD;").await.unwrap();
        assert_eq!(
            handle.read_file("f1.mmd").await.unwrap().as_deref(),
            Some("graph TD;")
        );
        assert_eq!(handle.list_entries().await.unwrap(), vec!["f1.mmd"]);

        handle.remove_entry("f1.mmd").await.unwrap();
        assert!(handle.read_file("f1.mmd").await.unwrap().is_none());
        // Removing again is a no-op.
        handle.remove_entry("f1.mmd").await.unwrap();
    }

    #[tokio::test]
    async fn test_restore_handle_missing_directory() {
        let temp = TempDir::new().unwrap();
        let medium = NativeFolderMedium::new(Arc::new(QueuedDirectoryPicker::new()));

        let token = HandleToken::new(temp.path().join("gone").display().to_string());
        assert!(medium.restore_handle(&token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_empty_picker_queue_is_cancelled() {
        let medium = NativeFolderMedium::new(Arc::new(QueuedDirectoryPicker::new()));
        let result = medium.pick_directory(PickerMode::ReadWrite).await;
        assert!(matches!(result, Err(StorageError::UserCancelled)));
    }
}
