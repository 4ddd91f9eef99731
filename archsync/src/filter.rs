//! Host-side narrowing of a pending change set.
//!
//! The diff engine reports everything that differs from the manifest; a host
//! decides which of those downloads it actually wants. Deletions are never
//! filtered.

use std::collections::HashSet;

use crate::diff::PendingChangeSet;
use crate::manifest::ManifestEntry;
use crate::paths::normalize_separators;

/// Name of the catalogue database shipped with the archive.
pub const CATALOGUE_DB: &str = "miniatures.db";

const THUMB_SUFFIXES: &[&str] = &["_thumb.jpg", "_thumb.jpeg", "_thumb.png", "_thumb.webp"];
const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".webp"];

/// Policy deciding which pending downloads to keep.
pub trait PendingFilter {
    /// Whether `entry` should be downloaded.
    fn keep(&self, entry: &ManifestEntry) -> bool;

    /// Narrow `pending` to the kept downloads. Deletions pass through.
    fn filter(&self, pending: PendingChangeSet) -> PendingChangeSet {
        let PendingChangeSet {
            to_download,
            to_delete,
        } = pending;

        PendingChangeSet {
            to_download: to_download.into_iter().filter(|e| self.keep(e)).collect(),
            to_delete,
        }
    }
}

impl<F> PendingFilter for F
where
    F: Fn(&ManifestEntry) -> bool,
{
    fn keep(&self, entry: &ManifestEntry) -> bool {
        self(entry)
    }
}

/// Default policy for a media archive.
///
/// Keeps the catalogue database, `.mp4` videos and `*_thumb.*` thumbnails.
/// Full-resolution images are kept only when enabled; anything else is
/// dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct MediaFilter {
    download_fullres_images: bool,
}

impl MediaFilter {
    pub fn new(download_fullres_images: bool) -> Self {
        Self {
            download_fullres_images,
        }
    }
}

impl PendingFilter for MediaFilter {
    fn keep(&self, entry: &ManifestEntry) -> bool {
        let rel = entry.path.replace('\\', "/").to_lowercase();
        let name = rel.rsplit('/').next().unwrap_or(&rel);

        if rel == CATALOGUE_DB || rel.ends_with(".mp4") {
            return true;
        }
        if THUMB_SUFFIXES.iter().any(|s| name.ends_with(s)) {
            return true;
        }
        self.download_fullres_images && IMAGE_EXTENSIONS.iter().any(|ext| rel.ends_with(ext))
    }
}

/// Keeps only the catalogue database at the archive root.
#[derive(Debug, Clone, Copy, Default)]
pub struct CatalogueOnly;

impl PendingFilter for CatalogueOnly {
    fn keep(&self, entry: &ManifestEntry) -> bool {
        is_catalogue(&entry.path)
    }
}

/// Whether `rel` names the root catalogue database.
pub fn is_catalogue(rel: &str) -> bool {
    normalize_separators(rel).eq_ignore_ascii_case(CATALOGUE_DB)
}

/// Number of distinct miniatures touched by `entries`.
///
/// A miniature is identified by its folder and file stem, so a video, its
/// full image and its `_thumb` image count once. The catalogue database is
/// not a miniature. Comparison is case-insensitive.
pub fn count_pending_miniatures(entries: &[ManifestEntry]) -> usize {
    entries
        .iter()
        .filter(|e| !is_catalogue(&e.path))
        .map(|e| miniature_key(&e.path))
        .collect::<HashSet<_>>()
        .len()
}

fn miniature_key(rel: &str) -> String {
    let rel = normalize_separators(rel);
    let (parent, name) = match rel.rsplit_once('/') {
        Some((parent, name)) => (parent, name),
        None => ("", rel.as_str()),
    };
    let stem = name.rsplit_once('.').map_or(name, |(stem, _)| stem);
    let stem = stem.strip_suffix("_thumb").unwrap_or(stem);

    if parent.is_empty() {
        stem.to_lowercase()
    } else {
        format!("{parent}/{stem}").to_lowercase()
    }
}
