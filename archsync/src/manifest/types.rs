//! Manifest data model.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::app::AppInfo;
use crate::paths;

/// One file the archive should contain.
///
/// A file is fetched either from `url` directly or, when only
/// `folder_handle` is set, from a shared folder through the link resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Archive-relative path, forward slashes.
    pub path: String,

    /// Expected size in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,

    /// Expected SHA-256 digest (hex). Authoritative over `size`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,

    /// Direct download URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Shared-folder reference used when no direct URL is given.
    #[serde(
        default,
        alias = "folder_url",
        skip_serializing_if = "Option::is_none"
    )]
    pub folder_handle: Option<String>,
}

impl ManifestEntry {
    /// Create an entry with only a path; add a source with the builders.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            size: None,
            sha256: None,
            url: None,
            folder_handle: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_folder_handle(mut self, handle: impl Into<String>) -> Self {
        self.folder_handle = Some(handle.into());
        self
    }

    pub fn with_sha256(mut self, digest: impl Into<String>) -> Self {
        self.sha256 = Some(digest.into());
        self
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    /// The direct URL, if one is set and non-blank.
    pub fn direct_url(&self) -> Option<&str> {
        non_blank(self.url.as_deref())
    }

    /// The shared-folder handle, if one is set and non-blank.
    pub fn folder_handle(&self) -> Option<&str> {
        non_blank(self.folder_handle.as_deref())
    }

    /// The expected digest, if one is set and non-blank.
    pub fn expected_sha256(&self) -> Option<&str> {
        non_blank(self.sha256.as_deref())
    }

    /// File name component of the path.
    pub fn file_name(&self) -> &str {
        paths::file_name(&self.path)
    }
}

/// The authoritative description of the archive's desired contents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Opaque version token. Also used as the cache-busting value.
    #[serde(
        rename = "archive_version",
        default,
        deserialize_with = "version_token"
    )]
    pub version: String,

    /// Files the archive should contain, in manifest order.
    pub files: Vec<ManifestEntry>,

    /// Paths that were removed upstream.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub deleted: Vec<String>,

    /// Information about the newest release of the desktop application.
    #[serde(
        rename = "app",
        default,
        deserialize_with = "lenient_app",
        skip_serializing_if = "Option::is_none"
    )]
    pub app_info: Option<AppInfo>,
}

impl Manifest {
    /// Create an empty manifest with the given version token.
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            ..Default::default()
        }
    }

    /// Find an entry by its exact path.
    pub fn entry(&self, path: &str) -> Option<&ManifestEntry> {
        self.files.iter().find(|e| e.path == path)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// Accepts a string or number; absent or null becomes the empty token.
fn version_token<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(String::new()),
        Value::String(s) => Ok(s.trim().to_string()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "archive_version must be a string, got {}",
            other
        ))),
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// An `app` block of the wrong shape is ignored rather than rejecting the
/// whole manifest; it only drives an advisory notice.
fn lenient_app<'de, D>(deserializer: D) -> Result<Option<AppInfo>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}
