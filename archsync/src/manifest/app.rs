//! Application release information carried by the manifest.

use std::cmp::Ordering;

use semver::Version;
use serde::{Deserialize, Serialize};

/// Newest published release of the desktop application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppInfo {
    #[serde(default)]
    pub latest_version: String,

    #[serde(default)]
    pub download_url: String,
}

impl AppInfo {
    pub fn new(latest_version: impl Into<String>, download_url: impl Into<String>) -> Self {
        Self {
            latest_version: latest_version.into(),
            download_url: download_url.into(),
        }
    }

    /// Whether the advertised release is newer than `current`.
    ///
    /// A blank advertised version is never newer.
    pub fn is_newer_than(&self, current: &str) -> bool {
        if self.latest_version.trim().is_empty() {
            return false;
        }
        compare_versions(&self.latest_version, current) == Ordering::Greater
    }

    /// The download URL, if one is set.
    pub fn download_url(&self) -> Option<&str> {
        Some(self.download_url.trim()).filter(|s| !s.is_empty())
    }
}

/// Compare loosely formatted version strings.
///
/// Leading `v` is dropped, non-digit characters inside a component are
/// ignored and missing components count as zero, so `v1.2` equals `1.2.0`
/// and `1.2.0-beta` equals `1.2.0`. The first three components are compared
/// as a [`Version`]; any further components break ties.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let a = numeric_components(a);
    let b = numeric_components(b);

    let core = |c: &[u64]| {
        Version::new(
            c.first().copied().unwrap_or(0),
            c.get(1).copied().unwrap_or(0),
            c.get(2).copied().unwrap_or(0),
        )
    };

    core(&a).cmp(&core(&b)).then_with(|| {
        let len = a.len().max(b.len()).max(3);
        (3..len)
            .map(|i| {
                let x = a.get(i).copied().unwrap_or(0);
                let y = b.get(i).copied().unwrap_or(0);
                x.cmp(&y)
            })
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    })
}

fn numeric_components(version: &str) -> Vec<u64> {
    let cleaned = version.trim().to_lowercase();
    let cleaned = cleaned.trim_start_matches('v');

    cleaned
        .split('.')
        .map(|chunk| {
            let digits: String = chunk.chars().filter(|c| c.is_ascii_digit()).collect();
            digits.parse().unwrap_or(0)
        })
        .collect()
}
