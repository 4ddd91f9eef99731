//! Publisher-side manifest generation.
//!
//! Walks a local archive and emits the manifest that clients sync against:
//! every included file with its size, SHA-256 digest and public URL.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, SubsecRound, Utc};
use reqwest::Url;
use thiserror::Error;

use super::app::AppInfo;
use super::fetch::{parse_manifest, ManifestError};
use super::types::{Manifest, ManifestEntry};
use crate::checksum::calculate_file_checksum;
use crate::state::STATE_FILE_NAME;

/// Extensions included by default.
pub const DEFAULT_INCLUDE_EXTENSIONS: &[&str] = &["mp4", "jpg", "jpeg", "png", "db", "json"];

/// Directory names never descended into.
pub const DEFAULT_SKIP_DIRS: &[&str] = &[
    "00_Apps",
    "01_Build",
    ".git",
    ".github",
    ".pyinstaller",
    ".venv",
    "__pycache__",
    "build",
    "dist",
    ".state",
];

/// File names that belong to the sync machinery, not the archive.
pub const RESERVED_FILE_NAMES: &[&str] = &[
    "manifest.json",
    "manifest.new.json",
    "manifest.prev.json",
    STATE_FILE_NAME,
];

/// Errors from building, reading or writing manifest files.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("failed to read {}: {source}", path.display())]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid manifest {}: {source}", path.display())]
    InvalidManifest {
        path: PathBuf,
        #[source]
        source: ManifestError,
    },

    #[error("failed to serialize manifest: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result type for builder operations.
pub type BuildResult<T> = Result<T, BuildError>;

/// Options for [`build_manifest`].
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Public URL under which the archive root is served.
    pub base_url: String,
    /// Lowercase extensions without the leading dot.
    pub include_extensions: BTreeSet<String>,
    /// Directory names to skip at any depth.
    pub skip_dirs: BTreeSet<String>,
    /// Optional application release block.
    pub app_info: Option<AppInfo>,
}

impl BuildOptions {
    /// Create options with the default extension and directory filters.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            include_extensions: DEFAULT_INCLUDE_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            skip_dirs: DEFAULT_SKIP_DIRS.iter().map(|s| s.to_string()).collect(),
            app_info: None,
        }
    }

    /// Include another extension (with or without the leading dot).
    pub fn with_extension(mut self, ext: &str) -> Self {
        let ext = ext.trim().trim_start_matches('.').to_lowercase();
        if !ext.is_empty() {
            self.include_extensions.insert(ext);
        }
        self
    }

    /// Skip another directory name.
    pub fn with_skip_dir(mut self, name: impl Into<String>) -> Self {
        self.skip_dirs.insert(name.into());
        self
    }

    /// Advertise an application release. Ignored when the version is blank.
    pub fn with_app(mut self, latest_version: &str, download_url: &str) -> Self {
        let latest_version = latest_version.trim();
        if !latest_version.is_empty() {
            self.app_info = Some(AppInfo::new(latest_version, download_url.trim()));
        }
        self
    }
}

/// Build a manifest describing every included file under `root`.
///
/// The version token is the current UTC time; entries are sorted by path.
pub fn build_manifest(root: &Path, options: &BuildOptions) -> BuildResult<Manifest> {
    let base = Url::parse(options.base_url.trim()).map_err(|e| BuildError::InvalidBaseUrl {
        url: options.base_url.clone(),
        reason: e.to_string(),
    })?;
    if base.cannot_be_a_base() {
        return Err(BuildError::InvalidBaseUrl {
            url: options.base_url.clone(),
            reason: "URL cannot be a base".to_string(),
        });
    }

    let mut files = Vec::new();
    collect_files(root, root, options, &mut files)?;
    files.sort();

    let mut manifest = Manifest::new(
        Utc::now()
            .trunc_subsecs(0)
            .to_rfc3339_opts(SecondsFormat::Secs, false),
    );

    for (rel, path) in files {
        let size = fs::metadata(&path)
            .map_err(|e| BuildError::ReadFailed {
                path: path.clone(),
                source: e,
            })?
            .len();
        let sha256 = calculate_file_checksum(&path).map_err(|e| BuildError::ReadFailed {
            path: path.clone(),
            source: e,
        })?;

        manifest.files.push(
            ManifestEntry::new(rel.clone())
                .with_size(size)
                .with_sha256(sha256)
                .with_url(public_url(&base, &rel)),
        );
    }

    manifest.app_info = options.app_info.clone();

    tracing::info!(
        root = %root.display(),
        files = manifest.files.len(),
        version = %manifest.version,
        "Built manifest"
    );

    Ok(manifest)
}

/// Load and validate a manifest from a local file.
pub fn load_manifest_file(path: &Path) -> BuildResult<Manifest> {
    let bytes = fs::read(path).map_err(|e| BuildError::ReadFailed {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_manifest(&bytes).map_err(|e| BuildError::InvalidManifest {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Write a manifest as pretty-printed JSON, creating parent directories.
pub fn write_manifest(manifest: &Manifest, path: &Path) -> BuildResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| BuildError::WriteFailed {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    let json = serde_json::to_string_pretty(manifest)?;
    fs::write(path, json).map_err(|e| BuildError::WriteFailed {
        path: path.to_path_buf(),
        source: e,
    })
}

fn collect_files(
    root: &Path,
    dir: &Path,
    options: &BuildOptions,
    out: &mut Vec<(String, PathBuf)>,
) -> BuildResult<()> {
    let entries = fs::read_dir(dir).map_err(|e| BuildError::ReadFailed {
        path: dir.to_path_buf(),
        source: e,
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| BuildError::ReadFailed {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().to_string();

        if path.is_dir() {
            if !options.skip_dirs.contains(&name) {
                collect_files(root, &path, options, out)?;
            }
            continue;
        }

        if !path.is_file() || RESERVED_FILE_NAMES.contains(&name.as_str()) {
            continue;
        }

        let included = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .is_some_and(|ext| options.include_extensions.contains(&ext));
        if !included {
            continue;
        }

        if let Ok(rel) = path.strip_prefix(root) {
            let rel = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            out.push((rel, path));
        }
    }

    Ok(())
}

fn public_url(base: &Url, rel: &str) -> String {
    let mut url = base.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty();
        segments.extend(rel.split('/'));
    }
    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::calculate_checksum;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, data: &[u8]) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, data).unwrap();
    }

    #[test]
    fn test_build_manifest_includes_and_skips() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "videos/a.mp4", b"video");
        write(temp.path(), "thumbs/a_thumb.jpg", b"thumb");
        write(temp.path(), "notes.txt", b"skipped extension");
        write(temp.path(), ".git/config.json", b"skipped dir");
        write(temp.path(), "manifest.json", b"{}");
        write(temp.path(), STATE_FILE_NAME, b"{}");

        let options = BuildOptions::new("https://cdn.example.com/archive/");
        let manifest = build_manifest(temp.path(), &options).unwrap();

        let paths: Vec<_> = manifest.files.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["thumbs/a_thumb.jpg", "videos/a.mp4"]);

        let video = manifest.entry("videos/a.mp4").unwrap();
        assert_eq!(video.size, Some(5));
        assert_eq!(video.sha256.as_deref(), Some(calculate_checksum(b"video").as_str()));
        assert_eq!(
            video.url.as_deref(),
            Some("https://cdn.example.com/archive/videos/a.mp4")
        );
        assert!(!manifest.version.is_empty());
    }

    #[test]
    fn test_tool_directories_are_not_published() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "miniatures.db", b"catalogue");
        write(temp.path(), "00_Apps/viewer.json", b"{}");
        write(temp.path(), "01_Build/app.db", b"build");
        write(temp.path(), "nested/.pyinstaller/hook.json", b"{}");

        let manifest =
            build_manifest(temp.path(), &BuildOptions::new("https://cdn.example.com")).unwrap();

        let paths: Vec<_> = manifest.files.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["miniatures.db"]);
    }

    #[test]
    fn test_urls_are_percent_encoded() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "my videos/a b.mp4", b"x");

        let manifest =
            build_manifest(temp.path(), &BuildOptions::new("https://cdn.example.com")).unwrap();
        assert_eq!(
            manifest.files[0].url.as_deref(),
            Some("https://cdn.example.com/my%20videos/a%20b.mp4")
        );
    }

    #[test]
    fn test_extra_extension_and_app_block() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "doc.PDF", b"pdf");

        let options = BuildOptions::new("https://cdn.example.com")
            .with_extension(".pdf")
            .with_app("1.2.0", "https://example.com/download");
        let manifest = build_manifest(temp.path(), &options).unwrap();

        assert_eq!(manifest.files.len(), 1);
        assert_eq!(manifest.app_info.unwrap().latest_version, "1.2.0");
    }

    #[test]
    fn test_invalid_base_url() {
        let temp = TempDir::new().unwrap();
        let result = build_manifest(temp.path(), &BuildOptions::new("not a url"));
        assert!(matches!(result, Err(BuildError::InvalidBaseUrl { .. })));
    }

    #[test]
    fn test_write_then_load_validates() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "a.mp4", b"a");
        let manifest =
            build_manifest(temp.path(), &BuildOptions::new("https://cdn.example.com")).unwrap();

        let out = temp.path().join("out/manifest.json");
        write_manifest(&manifest, &out).unwrap();
        let loaded = load_manifest_file(&out).unwrap();
        assert_eq!(loaded, manifest);
    }

    #[test]
    fn test_load_rejects_invalid_manifest() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("manifest.json");
        fs::write(&path, r#"{"files": "nope"}"#).unwrap();

        assert!(matches!(
            load_manifest_file(&path),
            Err(BuildError::InvalidManifest { .. })
        ));
    }
}
