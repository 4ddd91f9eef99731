//! Derive a manifest's `deleted` list from its predecessor.

use std::collections::{BTreeSet, HashSet};

use super::builder::RESERVED_FILE_NAMES;
use super::types::Manifest;
use crate::paths;

/// Paths listed in `old` but no longer in `new`.
///
/// Reserved sync files are never listed. With `keep_existing`, entries already
/// in `new.deleted` are kept as well. The result is sorted case-insensitively.
pub fn merge_deleted(old: &Manifest, new: &Manifest, keep_existing: bool) -> Vec<String> {
    let current: HashSet<&str> = new.files.iter().map(|e| e.path.as_str()).collect();

    let mut removed: BTreeSet<(String, String)> = BTreeSet::new();
    let mut push = |path: &str| {
        if !is_reserved(path) {
            removed.insert((path.to_lowercase(), path.to_string()));
        }
    };

    old.files
        .iter()
        .map(|e| e.path.as_str())
        .filter(|p| !p.trim().is_empty() && !current.contains(p))
        .for_each(&mut push);

    if keep_existing {
        new.deleted
            .iter()
            .map(String::as_str)
            .filter(|p| !p.trim().is_empty())
            .for_each(&mut push);
    }

    removed.into_iter().map(|(_, path)| path).collect()
}

fn is_reserved(path: &str) -> bool {
    RESERVED_FILE_NAMES.contains(&paths::file_name(path))
}
