//! Diff engine: manifest versus local tree.
//!
//! Produces the minimal whole-file change set. A file is fetched when it is
//! missing locally or fails the strongest check the manifest offers:
//!
//! 1. `sha256` present: local digest must match (case-insensitive);
//! 2. else `size` present: local byte length must match;
//! 3. else: an existing file is accepted as is.
//!
//! The diff reads only the manifest and the live filesystem, never persisted
//! sync state, so running it again on an unchanged tree yields an empty set.

use std::fs;
use std::path::Path;

use crate::checksum::{calculate_file_checksum, checksums_match};
use crate::manifest::{Manifest, ManifestEntry};
use crate::paths::safe_join;

/// Files to fetch and paths to remove for one sync pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingChangeSet {
    /// Entries whose local copy is missing or stale, in manifest order.
    pub to_download: Vec<ManifestEntry>,
    /// Deleted paths that currently exist locally.
    pub to_delete: Vec<String>,
}

impl PendingChangeSet {
    pub fn download_count(&self) -> usize {
        self.to_download.len()
    }

    pub fn delete_count(&self) -> usize {
        self.to_delete.len()
    }

    /// Whether there is nothing to download and nothing to delete.
    pub fn is_empty(&self) -> bool {
        self.to_download.is_empty() && self.to_delete.is_empty()
    }

    /// Whether a transfer pass would change anything, given the removal policy.
    pub fn has_work(&self, remove_deleted: bool) -> bool {
        !self.to_download.is_empty() || (remove_deleted && !self.to_delete.is_empty())
    }

    /// Total bytes of pending downloads whose size is known.
    pub fn known_download_bytes(&self) -> u64 {
        self.to_download.iter().filter_map(|e| e.size).sum()
    }
}

/// Compare the manifest against the files under `archive_root`.
///
/// Entries whose path would escape the archive root are skipped with a
/// warning; the fetcher already rejects such manifests, this guards
/// manifests built in code.
pub fn compute_pending_changes(archive_root: &Path, manifest: &Manifest) -> PendingChangeSet {
    let mut pending = PendingChangeSet::default();

    for entry in &manifest.files {
        let local = match safe_join(archive_root, &entry.path) {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!(path = %entry.path, error = %e, "Skipping unsafe manifest entry");
                continue;
            }
        };

        if !is_up_to_date(&local, entry) {
            pending.to_download.push(entry.clone());
        }
    }

    for rel in &manifest.deleted {
        match safe_join(archive_root, rel) {
            Ok(local) if local.is_file() => pending.to_delete.push(rel.clone()),
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(path = %rel, error = %e, "Skipping unsafe deleted entry");
            }
        }
    }

    tracing::debug!(
        downloads = pending.download_count(),
        deletions = pending.delete_count(),
        "Computed pending changes"
    );

    pending
}

/// Whether the file at `local` satisfies `entry`.
pub fn is_up_to_date(local: &Path, entry: &ManifestEntry) -> bool {
    if !local.is_file() {
        return false;
    }

    if let Some(expected) = entry.expected_sha256() {
        return match calculate_file_checksum(local) {
            Ok(actual) => checksums_match(&actual, expected),
            Err(e) => {
                tracing::debug!(path = %local.display(), error = %e, "Cannot hash local file");
                false
            }
        };
    }

    if let Some(expected) = entry.size {
        return fs::metadata(local)
            .map(|m| m.len() == expected)
            .unwrap_or(false);
    }

    true
}
