//! Project references
//!
//! A reference is a pointer record: it names a project id, the provider that
//! backs its content, and small display-state fields. It is not the project
//! data itself and lives in the reference medium regardless of which provider
//! holds the content.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Pointer record for one project. Exactly one exists per project id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectReference {
    pub id: String,
    /// Registry key of the provider backing this project's content.
    pub storage_provider: String,
    /// Opaque configuration bag interpreted only by that provider.
    #[serde(default = "empty_parameters")]
    pub storage_provider_parameters: Value,
    #[serde(default = "default_theme")]
    pub theme: String,
    /// Last-opened file within the project, if any.
    #[serde(default)]
    pub selected_file_id: Option<String>,
}

impl ProjectReference {
    pub fn new(id: impl Into<String>, storage_provider: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            storage_provider: storage_provider.into(),
            storage_provider_parameters: empty_parameters(),
            theme: default_theme(),
            selected_file_id: None,
        }
    }
}

fn empty_parameters() -> Value {
    Value::Object(serde_json::Map::new())
}

fn default_theme() -> String {
    "default".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_shape_is_camel_case() {
        let reference = ProjectReference::new("p1", "keyValue");
        let json = serde_json::to_string(&reference).unwrap();

        assert!(json.contains("\"storageProvider\":\"keyValue\""));
        assert!(json.contains("\"storageProviderParameters\":{}"));
        assert!(json.contains("\"selectedFileId\":null"));
    }

    #[test]
    fn test_missing_optional_fields_default() {
        let reference: ProjectReference =
            serde_json::from_str(r#"{"id":"p1","storageProvider":"keyValue"}"#).unwrap();

        assert_eq!(reference.theme, "default");
        assert!(reference.selected_file_id.is_none());
        assert!(reference.storage_provider_parameters.is_object());
    }
}
