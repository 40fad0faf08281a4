//! Share-link encoding
//!
//! A full project export, compressed (deflate) and URL-safe base64 encoded so
//! it fits in a query parameter. Decoding also accepts the older, less
//! compact form (standard base64 over a percent-encoded JSON document), so
//! links produced by earlier versions keep working.

use std::io::{Read, Write};

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use tracing::debug;

use crate::model::ProjectExport;
use crate::storage::StorageError;

/// Encode a project export into the compact share form.
pub fn encode_share_data(export: &ProjectExport) -> Result<String, StorageError> {
    let json = serde_json::to_string(export)
        .map_err(|e| StorageError::DataFormat(format!("Failed to serialize export: {}", e)))?;

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(json.as_bytes())
        .map_err(|e| StorageError::DataFormat(format!("Failed to compress export: {}", e)))?;
    let compressed = encoder
        .finish()
        .map_err(|e| StorageError::DataFormat(format!("Failed to compress export: {}", e)))?;

    Ok(URL_SAFE_NO_PAD.encode(compressed))
}

/// Decode share data, trying the compact form first and falling back to the
/// legacy form. Anything that survives neither decode is corrupt.
pub fn decode_share_data(data: &str) -> Result<ProjectExport, StorageError> {
    if let Some(json) = decode_compact(data)
        && let Ok(export) = ProjectExport::parse(&json)
    {
        return Ok(export);
    }

    if let Some(json) = decode_legacy(data)
        && let Ok(export) = ProjectExport::parse(&json)
    {
        debug!("Decoded share data in the legacy encoding");
        return Ok(export);
    }

    Err(StorageError::DataFormat(
        "Share data is corrupt or uses an unknown encoding".to_string(),
    ))
}

fn decode_compact(data: &str) -> Option<String> {
    let compressed = URL_SAFE_NO_PAD.decode(data).ok()?;
    let mut decoder = ZlibDecoder::new(compressed.as_slice());
    let mut json = String::new();
    decoder.read_to_string(&mut json).ok()?;
    Some(json)
}

fn decode_legacy(data: &str) -> Option<String> {
    let bytes = STANDARD.decode(data).ok()?;
    let encoded = String::from_utf8(bytes).ok()?;
    urlencoding::decode(&encoded).ok().map(|s| s.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FileRecord;

    fn sample_export() -> ProjectExport {
        ProjectExport::new(
            "p1",
            "Diagrams",
            vec![FileRecord {
                id: "f1".to_string(),
                name: "Default".to_string(),
                content: "graph TD;\n    A-->B;".to_string(),
                version: Some("v1".to_string()),
            }],
        )
    }

    #[test]
    fn test_compact_round_trip() {
        let export = sample_export();
        let encoded = encode_share_data(&export).unwrap();

        // URL-safe: no characters needing percent-encoding in a query value.
        assert!(!encoded.contains('+'));
        assert!(!encoded.contains('/'));
        assert!(!encoded.contains('='));

        let decoded = decode_share_data(&encoded).unwrap();
        assert_eq!(decoded, export);
    }

    #[test]
    fn test_legacy_encoding_still_decodes() {
        let export = sample_export();
        let json = serde_json::to_string(&export).unwrap();
        let legacy = STANDARD.encode(urlencoding::encode(&json).as_bytes());

        let decoded = decode_share_data(&legacy).unwrap();
        assert_eq!(decoded.id, "p1");
        assert_eq!(decoded.files[0].content, export.files[0].content);
    }

    #[test]
    fn test_corrupt_data_is_rejected() {
        let result = decode_share_data("definitely?not!an#encoding");
        assert!(matches!(result, Err(StorageError::DataFormat(_))));

        // Valid base64 but not a project underneath.
        let result = decode_share_data(&STANDARD.encode("{\"x\":1}"));
        assert!(matches!(result, Err(StorageError::DataFormat(_))));
    }
}
