//! Error types for a single transfer item.
//!
//! None of these abort a pass. The executor renders each into a message in
//! [`SyncResult::errors`](super::SyncResult) and moves on.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::http::HttpError;
use crate::paths::PathError;
use crate::resolver::ResolveError;

/// Result type for transfer operations.
pub type TransferResult<T> = Result<T, TransferError>;

/// Failure of one download or deletion.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error(transparent)]
    UnsafePath(#[from] PathError),

    #[error("No download URL available for {0}")]
    NoUrl(String),

    #[error("no link resolver configured for shared folder {0}")]
    NoResolver(String),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Http(#[from] HttpError),

    #[error("failed to create directory {path}: {source}")]
    CreateDirFailed { path: PathBuf, source: io::Error },

    #[error("failed to write {path}: {source}")]
    WriteFailed { path: PathBuf, source: io::Error },

    #[error("failed to read {path}: {source}")]
    ReadFailed { path: PathBuf, source: io::Error },

    #[error("Checksum mismatch after download: {path} (expected {expected}, got {actual})")]
    ChecksumMismatch {
        path: String,
        expected: String,
        actual: String,
    },
}

impl TransferError {
    /// Message recorded in the pass result for the item at `rel`.
    pub fn describe(&self, rel: &str) -> String {
        match self {
            Self::ChecksumMismatch { .. } => self.to_string(),
            _ => format!("Download failed for {rel}: {self}"),
        }
    }
}
