//! Key-value-backed project record

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::file::FileRecord;

/// Project as stored by the key-value provider: one JSON blob holding the
/// metadata plus every file record nested under `diagrams`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredProject {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub diagrams: BTreeMap<String, FileRecord>,
}

impl StoredProject {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            diagrams: BTreeMap::new(),
        }
    }
}
