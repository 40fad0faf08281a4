//! Opaque identifier generation
//!
//! Project ids, file ids, and version stamps are random, unique, opaque
//! strings. Version stamps are only ever compared for equality.

use uuid::Uuid;

/// Generate a new opaque identifier for a project or file.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generate a new opaque version stamp.
pub fn new_version() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(new_id(), new_id());
        assert_ne!(new_version(), new_version());
    }
}
