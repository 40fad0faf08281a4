//! Project export format
//!
//! A self-contained textual snapshot of one project (id, name, every file
//! with content) used for backup, import, duplication, and share links. The
//! current shape carries files as a flat array; the older shape nested them
//! in a `diagrams` map, and import accepts both.

use std::collections::BTreeMap;
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::file::FileRecord;
use super::ids;
use crate::storage::StorageError;

/// Exported project snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectExport {
    pub id: String,
    pub name: String,
    pub files: Vec<FileRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exported_at: Option<DateTime<Utc>>,
}

/// Older export shape: files nested in a map keyed by file id.
#[derive(Debug, Deserialize)]
struct LegacyExport {
    id: String,
    name: String,
    diagrams: BTreeMap<String, FileRecord>,
}

impl ProjectExport {
    pub fn new(id: impl Into<String>, name: impl Into<String>, files: Vec<FileRecord>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            files,
            exported_at: Some(Utc::now()),
        }
    }

    /// Parse an export payload, accepting both the flat-array shape and the
    /// legacy nested-map shape. Anything else is a data-format error.
    pub fn parse(data: &str) -> Result<Self, StorageError> {
        if let Ok(export) = serde_json::from_str::<ProjectExport>(data) {
            return Ok(export);
        }

        match serde_json::from_str::<LegacyExport>(data) {
            Ok(legacy) => Ok(Self {
                id: legacy.id,
                name: legacy.name,
                files: legacy.diagrams.into_values().collect(),
                exported_at: None,
            }),
            Err(e) => Err(StorageError::DataFormat(format!(
                "Project data does not match any known export shape: {}",
                e
            ))),
        }
    }

    pub fn to_json(&self) -> Result<String, StorageError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| StorageError::DataFormat(format!("Failed to serialize export: {}", e)))
    }

    /// Re-identified copy keeping the same file set. Used by import conflict
    /// resolution, where the copy must stay comparable to the original.
    pub fn with_identity(&self, new_id: impl Into<String>, new_name: impl Into<String>) -> Self {
        Self {
            id: new_id.into(),
            name: new_name.into(),
            files: self.files.clone(),
            exported_at: self.exported_at,
        }
    }

    /// Deep re-identified copy: new project id, new file ids, fresh version
    /// stamps. Returns the old-id to new-id mapping so callers can carry
    /// pointers (such as the selected file) across.
    pub fn with_fresh_ids(
        &self,
        new_id: impl Into<String>,
        new_name: impl Into<String>,
    ) -> (Self, HashMap<String, String>) {
        let mut mapping = HashMap::new();
        let files = self
            .files
            .iter()
            .map(|file| {
                let fresh_id = ids::new_id();
                mapping.insert(file.id.clone(), fresh_id.clone());
                FileRecord {
                    id: fresh_id,
                    name: file.name.clone(),
                    content: file.content.clone(),
                    version: Some(ids::new_version()),
                }
            })
            .collect();

        (
            Self {
                id: new_id.into(),
                name: new_name.into(),
                files,
                exported_at: Some(Utc::now()),
            },
            mapping,
        )
    }
}
