//! File records and project metadata

use serde::{Deserialize, Serialize};

/// One diagram file: display name, source text, and an opaque version stamp
/// regenerated on every successful save.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl FileRecord {
    /// New record without a version stamp; storage assigns one on first save.
    pub fn new(id: impl Into<String>, name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            content: content.into(),
            version: None,
        }
    }
}

/// Cheap metadata fetch result; also doubles as the existence check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectMetadata {
    pub name: String,
    pub theme: Option<String>,
    pub selected_file_id: Option<String>,
}

/// Partial update applied through `StorageProvider::update_project_metadata`.
/// Absent fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct MetadataUpdate {
    pub name: Option<String>,
    pub theme: Option<String>,
    pub selected_file_id: Option<String>,
}

impl MetadataUpdate {
    pub fn name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn theme(theme: impl Into<String>) -> Self {
        Self {
            theme: Some(theme.into()),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_omitted_until_assigned() {
        let file = FileRecord::new("f1", "Default", "graph TD;");
        let json = serde_json::to_string(&file).unwrap();
        assert!(!json.contains("version"));

        let parsed: FileRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, file);
    }
}
