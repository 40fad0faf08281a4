//! Local-folder medium capabilities
//!
//! A user-granted folder is modeled as a capability: an opaque persistable
//! `HandleToken` plus async traits for picking, restoring, and operating on
//! the granted directory. Access can lapse between sessions, so every use
//! re-validates permission; a failed check surfaces as the distinguished
//! `ReconnectRequired` condition rather than a generic error.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::medium::KeyValueMedium;
use crate::storage::StorageError;

#[cfg(feature = "native-fs")]
pub mod native;

/// Permission status for a granted directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionState {
    Granted,
    /// Access can be re-requested without a full re-pick.
    Prompt,
    Denied,
}

/// Access mode requested from the directory picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickerMode {
    Read,
    ReadWrite,
}

/// Opaque persistable pointer to a previously granted directory. Only the
/// folder medium that minted a token can interpret it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HandleToken(String);

impl HandleToken {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A granted directory: entry listing plus read/write/remove of named
/// entries. Entries are bare file names; the handle never exposes paths
/// outside the granted directory.
#[async_trait(?Send)]
pub trait DirectoryHandle: Send + Sync {
    /// Display name of the granted directory.
    fn display_name(&self) -> String;

    /// Persistable token that the owning medium can later restore.
    fn token(&self) -> HandleToken;

    /// Names of the directory's immediate file entries.
    async fn list_entries(&self) -> Result<Vec<String>, StorageError>;

    /// Read a named entry as text. Ok(None) when the entry does not exist.
    async fn read_file(&self, entry: &str) -> Result<Option<String>, StorageError>;

    /// Create or overwrite a named entry.
    async fn write_file(&self, entry: &str, content: &str) -> Result<(), StorageError>;

    /// Remove a named entry. Removing an absent entry is a no-op.
    async fn remove_entry(&self, entry: &str) -> Result<(), StorageError>;

    async fn query_permission(&self) -> PermissionState;

    async fn request_permission(&self) -> PermissionState;
}

/// Environment capability for granting folder access.
#[async_trait(?Send)]
pub trait FolderMedium: Send + Sync {
    /// Whether this environment can grant folder access at all. Checked
    /// before the folder provider is registered or used.
    fn is_supported(&self) -> bool;

    /// Prompt the user to pick a directory. A dismissed prompt surfaces as
    /// `UserCancelled`, never as a timeout.
    async fn pick_directory(
        &self,
        mode: PickerMode,
    ) -> Result<Arc<dyn DirectoryHandle>, StorageError>;

    /// Rebuild a handle from a persisted token. Ok(None) when the token no
    /// longer resolves to a directory.
    async fn restore_handle(
        &self,
        token: &HandleToken,
    ) -> Result<Option<Arc<dyn DirectoryHandle>>, StorageError>;
}

const HANDLE_KEY_PREFIX: &str = "directory-handle-";

/// Persistent cache of directory tokens keyed by project id.
///
/// Handles themselves cannot be serialized; the cache stores the opaque token
/// and re-validates access on every restore.
pub struct HandleCache {
    medium: Arc<dyn KeyValueMedium>,
}

impl HandleCache {
    pub fn new(medium: Arc<dyn KeyValueMedium>) -> Self {
        Self { medium }
    }

    fn key(project_id: &str) -> String {
        format!("{}{}", HANDLE_KEY_PREFIX, project_id)
    }

    pub fn store(&self, project_id: &str, token: &HandleToken) -> Result<(), StorageError> {
        debug!("Caching directory handle for project {}", project_id);
        self.medium.set(&Self::key(project_id), token.as_str())
    }

    pub fn get(&self, project_id: &str) -> Option<HandleToken> {
        self.medium
            .get(&Self::key(project_id))
            .map(HandleToken::new)
    }

    pub fn remove(&self, project_id: &str) {
        self.medium.remove(&Self::key(project_id));
    }

    /// Restore the granted directory for a project, re-validating permission.
    ///
    /// A missing token, a token that no longer resolves, or revoked access
    /// all surface as `ReconnectRequired` so the caller can re-prompt the
    /// user instead of treating the project as gone. The cached token is left
    /// in place; a later reconnect may restore access to the same directory.
    pub async fn restore(
        &self,
        medium: &dyn FolderMedium,
        project_id: &str,
    ) -> Result<Arc<dyn DirectoryHandle>, StorageError> {
        let token = self
            .get(project_id)
            .ok_or_else(|| StorageError::ReconnectRequired(project_id.to_string()))?;

        let handle = medium
            .restore_handle(&token)
            .await?
            .ok_or_else(|| StorageError::ReconnectRequired(project_id.to_string()))?;

        match handle.query_permission().await {
            PermissionState::Granted => Ok(handle),
            PermissionState::Prompt => {
                if handle.request_permission().await == PermissionState::Granted {
                    Ok(handle)
                } else {
                    Err(StorageError::ReconnectRequired(project_id.to_string()))
                }
            }
            PermissionState::Denied => {
                Err(StorageError::ReconnectRequired(project_id.to_string()))
            }
        }
    }
}
