//! Folder-backed project document shapes
//!
//! A folder-backed project is one small metadata document plus one content
//! artifact per file, named by file id, in the same directory. The document
//! deliberately excludes file content so diagrams stay readable and editable
//! outside the tool.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The per-project metadata document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FolderProjectDocument {
    pub metadata: FolderProjectMetadata,
    #[serde(default)]
    pub files: BTreeMap<String, FolderFileEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FolderProjectMetadata {
    pub id: String,
    pub name: String,
    #[serde(default = "default_theme")]
    pub theme: String,
    #[serde(default)]
    pub selected_file_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

/// File entry inside the document: everything except the content, which lives
/// in the sibling content artifact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FolderFileEntry {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl FolderProjectDocument {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            metadata: FolderProjectMetadata {
                id: id.into(),
                name: name.into(),
                theme: default_theme(),
                selected_file_id: None,
                created_at: now,
                modified_at: now,
            },
            files: BTreeMap::new(),
        }
    }

    pub fn touch(&mut self) {
        self.metadata.modified_at = Utc::now();
    }
}

fn default_theme() -> String {
    "default".to_string()
}
