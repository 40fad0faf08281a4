//! Project reference store
//!
//! Persists the small pointer records ("this project lives in provider X with
//! parameters Y") in the key-value medium, independent of the providers
//! themselves. The system can therefore always enumerate which projects might
//! exist, even when some backing media are unreachable.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::medium::KeyValueMedium;
use crate::model::ProjectReference;
use crate::storage::StorageError;

pub const REFERENCE_KEY_PREFIX: &str = "project-ref-";
pub const SELECTED_PROJECT_KEY: &str = "selected-project";

/// CRUD over `ProjectReference` records keyed by project id.
pub struct ReferenceStore {
    medium: Arc<dyn KeyValueMedium>,
}

impl ReferenceStore {
    pub fn new(medium: Arc<dyn KeyValueMedium>) -> Self {
        Self { medium }
    }

    fn key(project_id: &str) -> String {
        format!("{}{}", REFERENCE_KEY_PREFIX, project_id)
    }

    pub fn save(&self, reference: &ProjectReference) -> Result<(), StorageError> {
        let raw = serde_json::to_string(reference).map_err(|e| {
            StorageError::DataFormat(format!(
                "Failed to serialize reference {}: {}",
                reference.id, e
            ))
        })?;
        self.medium.set(&Self::key(&reference.id), &raw)?;
        debug!("Saved reference for project {}", reference.id);
        Ok(())
    }

    pub fn get(&self, project_id: &str) -> Result<Option<ProjectReference>, StorageError> {
        let Some(raw) = self.medium.get(&Self::key(project_id)) else {
            return Ok(None);
        };
        serde_json::from_str(&raw).map(Some).map_err(|e| {
            StorageError::DataFormat(format!(
                "Reference record {} is not valid JSON: {}",
                project_id, e
            ))
        })
    }

    pub fn delete(&self, project_id: &str) {
        self.medium.remove(&Self::key(project_id));
        debug!("Deleted reference for project {}", project_id);
    }

    /// Every readable reference, sorted by project id. Corrupt records are
    /// skipped with a warning instead of failing the whole listing.
    pub fn list(&self) -> Vec<ProjectReference> {
        let mut references = Vec::new();
        for key in self.medium.keys() {
            let Some(project_id) = key.strip_prefix(REFERENCE_KEY_PREFIX) else {
                continue;
            };
            let Some(raw) = self.medium.get(&key) else {
                continue;
            };
            match serde_json::from_str::<ProjectReference>(&raw) {
                Ok(reference) => references.push(reference),
                Err(e) => {
                    warn!("Skipping corrupt reference record for {}: {}", project_id, e);
                }
            }
        }
        references.sort_by(|a, b| a.id.cmp(&b.id));
        references
    }

    pub fn set_last_selected(&self, project_id: &str) -> Result<(), StorageError> {
        self.medium.set(SELECTED_PROJECT_KEY, project_id)
    }

    pub fn last_selected(&self) -> Option<String> {
        self.medium.get(SELECTED_PROJECT_KEY)
    }

    pub fn clear_last_selected(&self) {
        self.medium.remove(SELECTED_PROJECT_KEY);
    }
}
