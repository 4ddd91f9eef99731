//! INI configuration file.
//!
//! Lives at `<config_dir>/archsync/config.ini`:
//!
//! ```ini
//! [archive]
//! root = /home/me/.local/share/archsync/archive
//! manifest_url = https://example.com/archive/manifest.json
//!
//! [sync]
//! request_timeout = 6
//! download_timeout = 20
//! remove_deleted = false
//! download_fullres_images = false
//! allow_mismatch = miniatures.db
//! bootstrap_full_archive = true
//!
//! [logging]
//! directory = /home/me/.cache/archsync/logs
//! ```
//!
//! A missing file yields defaults. Keys that are absent or fail to parse keep
//! their default value. Every key is written on save, so an emptied list
//! (`allow_mismatch =`) stays empty on the next load.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ini::Ini;
use thiserror::Error;

use crate::filter::CATALOGUE_DB;
use crate::transfer::{MismatchAllowList, TransferOptions};

const APP_DIR: &str = "archsync";
const CONFIG_FILE_NAME: &str = "config.ini";

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 6;
const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 20;

/// Errors from loading or saving the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {reason}")]
    Read { path: PathBuf, reason: String },

    #[error("failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("unknown configuration key '{0}'")]
    UnknownKey(String),
}

/// Path of the configuration file.
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join(CONFIG_FILE_NAME)
}

/// Default archive root.
pub fn default_archive_root() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join("archive")
}

/// Default log directory.
pub fn default_log_directory() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR)
        .join("logs")
}

/// `[archive]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveSettings {
    pub root: PathBuf,
    pub manifest_url: Option<String>,
}

impl Default for ArchiveSettings {
    fn default() -> Self {
        Self {
            root: default_archive_root(),
            manifest_url: None,
        }
    }
}

/// `[sync]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSettings {
    /// Manifest request timeout, in seconds.
    pub request_timeout_secs: u64,
    /// Per-download timeout, in seconds.
    pub download_timeout_secs: u64,
    pub remove_deleted: bool,
    pub download_fullres_images: bool,
    /// Paths or file names whose checksum mismatch is only a warning.
    pub allow_mismatch: Vec<String>,
    /// First run without a local catalogue fetches the whole archive rather
    /// than the catalogue alone.
    pub bootstrap_full_archive: bool,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            download_timeout_secs: DEFAULT_DOWNLOAD_TIMEOUT_SECS,
            remove_deleted: false,
            download_fullres_images: false,
            allow_mismatch: vec![CATALOGUE_DB.to_string()],
            bootstrap_full_archive: true,
        }
    }
}

impl SyncSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }

    /// Transfer options derived from these settings.
    pub fn transfer_options(&self) -> TransferOptions {
        TransferOptions {
            remove_deleted: self.remove_deleted,
            timeout: self.download_timeout(),
            allowed_mismatch: self.allow_mismatch.iter().collect::<MismatchAllowList>(),
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    pub directory: PathBuf,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            directory: default_log_directory(),
        }
    }
}

/// Parsed configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    pub archive: ArchiveSettings,
    pub sync: SyncSettings,
    pub logging: LoggingSettings,
}

impl ConfigFile {
    /// Load from the standard location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_file_path())
    }

    /// Load from `path`; a missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        Ok(Self::from_ini(&ini))
    }

    /// Parse from INI text.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(text).map_err(|e| ConfigError::Read {
            path: PathBuf::from("<string>"),
            reason: e.to_string(),
        })?;
        Ok(Self::from_ini(&ini))
    }

    fn from_ini(ini: &Ini) -> Self {
        let mut config = Self::default();

        for key in ConfigKey::all() {
            let value = ini
                .section(Some(key.section()))
                .and_then(|s| s.get(key.key_name()));

            if let Some(value) = value {
                if let Err(e) = key.set(&mut config, value) {
                    tracing::warn!(error = %e, "Ignoring configuration value");
                }
            }
        }

        config
    }

    /// Save to the standard location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&config_file_path())
    }

    /// Save to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let write_failed = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_failed)?;
        }

        self.to_ini().write_to_file(path).map_err(write_failed)
    }

    fn to_ini(&self) -> Ini {
        let mut ini = Ini::new();
        for key in ConfigKey::all() {
            ini.with_section(Some(key.section()))
                .set(key.key_name(), key.get(self));
        }
        ini
    }
}

/// Addressable configuration key, written `section.key`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    ArchiveRoot,
    ArchiveManifestUrl,
    SyncRequestTimeout,
    SyncDownloadTimeout,
    SyncRemoveDeleted,
    SyncDownloadFullresImages,
    SyncAllowMismatch,
    SyncBootstrapFullArchive,
    LoggingDirectory,
}

impl ConfigKey {
    /// Every key, in file order.
    pub fn all() -> &'static [ConfigKey] {
        &[
            ConfigKey::ArchiveRoot,
            ConfigKey::ArchiveManifestUrl,
            ConfigKey::SyncRequestTimeout,
            ConfigKey::SyncDownloadTimeout,
            ConfigKey::SyncRemoveDeleted,
            ConfigKey::SyncDownloadFullresImages,
            ConfigKey::SyncAllowMismatch,
            ConfigKey::SyncBootstrapFullArchive,
            ConfigKey::LoggingDirectory,
        ]
    }

    pub fn section(&self) -> &'static str {
        match self {
            ConfigKey::ArchiveRoot | ConfigKey::ArchiveManifestUrl => "archive",
            ConfigKey::SyncRequestTimeout
            | ConfigKey::SyncDownloadTimeout
            | ConfigKey::SyncRemoveDeleted
            | ConfigKey::SyncDownloadFullresImages
            | ConfigKey::SyncAllowMismatch
            | ConfigKey::SyncBootstrapFullArchive => "sync",
            ConfigKey::LoggingDirectory => "logging",
        }
    }

    pub fn key_name(&self) -> &'static str {
        match self {
            ConfigKey::ArchiveRoot => "root",
            ConfigKey::ArchiveManifestUrl => "manifest_url",
            ConfigKey::SyncRequestTimeout => "request_timeout",
            ConfigKey::SyncDownloadTimeout => "download_timeout",
            ConfigKey::SyncRemoveDeleted => "remove_deleted",
            ConfigKey::SyncDownloadFullresImages => "download_fullres_images",
            ConfigKey::SyncAllowMismatch => "allow_mismatch",
            ConfigKey::SyncBootstrapFullArchive => "bootstrap_full_archive",
            ConfigKey::LoggingDirectory => "directory",
        }
    }

    /// Full `section.key` name.
    pub fn name(&self) -> String {
        format!("{}.{}", self.section(), self.key_name())
    }

    /// Current value as text; empty when unset.
    pub fn get(&self, config: &ConfigFile) -> String {
        match self {
            ConfigKey::ArchiveRoot => config.archive.root.display().to_string(),
            ConfigKey::ArchiveManifestUrl => {
                config.archive.manifest_url.clone().unwrap_or_default()
            }
            ConfigKey::SyncRequestTimeout => config.sync.request_timeout_secs.to_string(),
            ConfigKey::SyncDownloadTimeout => config.sync.download_timeout_secs.to_string(),
            ConfigKey::SyncRemoveDeleted => config.sync.remove_deleted.to_string(),
            ConfigKey::SyncDownloadFullresImages => {
                config.sync.download_fullres_images.to_string()
            }
            ConfigKey::SyncAllowMismatch => config.sync.allow_mismatch.join(", "),
            ConfigKey::SyncBootstrapFullArchive => {
                config.sync.bootstrap_full_archive.to_string()
            }
            ConfigKey::LoggingDirectory => config.logging.directory.display().to_string(),
        }
    }

    /// Validate and store `value`.
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> Result<(), ConfigError> {
        let value = value.trim();
        match self {
            ConfigKey::ArchiveRoot => config.archive.root = self.parse_path(value)?,
            ConfigKey::ArchiveManifestUrl => {
                config.archive.manifest_url = if value.is_empty() {
                    None
                } else {
                    reqwest::Url::parse(value).map_err(|e| self.invalid(value, e))?;
                    Some(value.to_string())
                };
            }
            ConfigKey::SyncRequestTimeout => {
                config.sync.request_timeout_secs = self.parse_secs(value)?
            }
            ConfigKey::SyncDownloadTimeout => {
                config.sync.download_timeout_secs = self.parse_secs(value)?
            }
            ConfigKey::SyncRemoveDeleted => config.sync.remove_deleted = self.parse_bool(value)?,
            ConfigKey::SyncDownloadFullresImages => {
                config.sync.download_fullres_images = self.parse_bool(value)?
            }
            ConfigKey::SyncAllowMismatch => {
                config.sync.allow_mismatch = value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect();
            }
            ConfigKey::SyncBootstrapFullArchive => {
                config.sync.bootstrap_full_archive = self.parse_bool(value)?
            }
            ConfigKey::LoggingDirectory => config.logging.directory = self.parse_path(value)?,
        }
        Ok(())
    }

    fn invalid(&self, value: &str, reason: impl fmt::Display) -> ConfigError {
        ConfigError::InvalidValue {
            key: self.name(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }

    fn parse_path(&self, value: &str) -> Result<PathBuf, ConfigError> {
        if value.is_empty() {
            return Err(self.invalid(value, "path cannot be empty"));
        }
        Ok(expand_tilde(value))
    }

    fn parse_secs(&self, value: &str) -> Result<u64, ConfigError> {
        match value.parse::<u64>() {
            Ok(0) => Err(self.invalid(value, "must be at least 1 second")),
            Ok(secs) => Ok(secs),
            Err(e) => Err(self.invalid(value, e)),
        }
    }

    fn parse_bool(&self, value: &str) -> Result<bool, ConfigError> {
        match value.to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(true),
            "false" | "no" | "off" | "0" => Ok(false),
            _ => Err(self.invalid(value, "expected true or false")),
        }
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        ConfigKey::all()
            .iter()
            .copied()
            .find(|key| key.name() == wanted)
            .ok_or_else(|| ConfigError::UnknownKey(s.to_string()))
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.section(), self.key_name())
    }
}

fn expand_tilde(value: &str) -> PathBuf {
    match value.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(value)),
        None => PathBuf::from(value),
    }
}
