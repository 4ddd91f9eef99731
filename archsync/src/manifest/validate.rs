//! Structural validation of a raw manifest document.
//!
//! Validation runs on the untyped JSON value before deserialization so that
//! rejections name the offending entry instead of surfacing a serde message.

use serde_json::Value;
use thiserror::Error;

use crate::paths::{relative_segments, PathError};

/// Reasons a manifest document is rejected.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("manifest is not a JSON object")]
    NotAnObject,

    #[error("manifest must include a 'files' array")]
    MissingFiles,

    #[error("manifest file entry #{index} is not an object")]
    EntryNotObject { index: usize },

    #[error("manifest file entry #{index} needs a non-empty 'path'")]
    EntryMissingPath { index: usize },

    #[error("manifest file entry '{path}' needs either 'url' or 'folder_handle'")]
    EntryMissingSource { path: String },

    #[error("manifest file entry has an unsafe path: {0}")]
    UnsafePath(PathError),

    #[error("manifest 'deleted' must be an array")]
    DeletedNotArray,

    #[error("manifest 'deleted' entry #{index} is not a string")]
    DeletedEntryNotString { index: usize },

    #[error("manifest 'deleted' has an unsafe path: {0}")]
    UnsafeDeletedPath(PathError),
}

/// Validate the shape of a manifest document.
///
/// Rules:
/// - the document is an object with a `files` array;
/// - every file entry is an object with a non-empty string `path` that stays
///   inside the archive root, and a non-empty `url` or `folder_handle`
///   (`folder_url` is accepted as the older spelling);
/// - `deleted`, when present and not null, is an array of safe path strings.
pub fn validate_manifest(doc: &Value) -> Result<(), ValidationError> {
    let obj = doc.as_object().ok_or(ValidationError::NotAnObject)?;

    let files = obj
        .get("files")
        .and_then(Value::as_array)
        .ok_or(ValidationError::MissingFiles)?;

    for (index, row) in files.iter().enumerate() {
        let row = row
            .as_object()
            .ok_or(ValidationError::EntryNotObject { index })?;

        let path = non_empty_str(row.get("path"))
            .ok_or(ValidationError::EntryMissingPath { index })?;

        relative_segments(path).map_err(ValidationError::UnsafePath)?;

        let has_source = ["url", "folder_handle", "folder_url"]
            .iter()
            .any(|key| non_empty_str(row.get(*key)).is_some());
        if !has_source {
            return Err(ValidationError::EntryMissingSource {
                path: path.to_string(),
            });
        }
    }

    match obj.get("deleted") {
        None | Some(Value::Null) => {}
        Some(Value::Array(deleted)) => {
            for (index, item) in deleted.iter().enumerate() {
                let path = item
                    .as_str()
                    .ok_or(ValidationError::DeletedEntryNotString { index })?;
                relative_segments(path).map_err(ValidationError::UnsafeDeletedPath)?;
            }
        }
        Some(_) => return Err(ValidationError::DeletedNotArray),
    }

    Ok(())
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}
