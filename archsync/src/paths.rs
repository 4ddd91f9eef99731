//! Archive-relative path handling.
//!
//! Manifest paths are untrusted input. Every path is joined onto the archive
//! root through [`safe_join`], which refuses anything that could land outside
//! the root.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// A manifest path that cannot be placed under the archive root.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("empty path")]
    Empty,

    #[error("absolute path not allowed: {0}")]
    Absolute(String),

    #[error("path escapes the archive root: {0}")]
    Traversal(String),
}

/// Normalize separators to forward slashes.
pub fn normalize_separators(rel: &str) -> String {
    rel.replace('\\', "/")
}

/// Last segment of a relative path, after separator normalization.
pub fn file_name(rel: &str) -> &str {
    rel.rsplit(['/', '\\']).next().unwrap_or(rel)
}

/// Check that `rel` is a plain relative path and return its segments.
///
/// Both `/` and `\` count as separators regardless of platform, so a
/// manifest written on Windows cannot smuggle `..\` past the check.
pub fn relative_segments(rel: &str) -> Result<Vec<&str>, PathError> {
    if rel.trim().is_empty() {
        return Err(PathError::Empty);
    }

    if rel.starts_with('/') || rel.starts_with('\\') || has_drive_prefix(rel) {
        return Err(PathError::Absolute(rel.to_string()));
    }

    let mut segments = Vec::new();
    for segment in rel.split(['/', '\\']) {
        match segment {
            "" | "." => continue,
            ".." => return Err(PathError::Traversal(rel.to_string())),
            s => segments.push(s),
        }
    }

    if segments.is_empty() {
        return Err(PathError::Empty);
    }

    Ok(segments)
}

/// Join a manifest-relative path onto the archive root.
pub fn safe_join(root: &Path, rel: &str) -> Result<PathBuf, PathError> {
    let segments = relative_segments(rel)?;
    let mut path = root.to_path_buf();
    path.extend(segments);
    Ok(path)
}

fn has_drive_prefix(rel: &str) -> bool {
    let bytes = rel.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}
