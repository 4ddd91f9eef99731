//! Persisted sync state.
//!
//! A small JSON document kept at a fixed hidden path under the archive root:
//!
//! ```text
//! {
//!   "last_check_utc": "2024-05-01T12:00:00+00:00",
//!   "last_manifest_version": "2024-05-01T11:58:03+00:00",
//!   "last_success_sync_utc": "2024-05-01T12:00:41+00:00",
//!   "last_sync_error_count": 0
//! }
//! ```
//!
//! The state is advisory. Loading never fails: a missing or unreadable file
//! yields [`SyncState::default`]. Unknown keys are carried through saves.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use thiserror::Error;

/// File name of the state document inside the archive root.
pub const STATE_FILE_NAME: &str = ".archive_sync_state.json";

/// Errors from persisting sync state.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to write sync state to {path}: {source}")]
    WriteFailed { path: PathBuf, source: io::Error },

    #[error("failed to serialize sync state: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result type for state store operations.
pub type StateResult<T> = Result<T, StateError>;

/// Record of the most recent check and transfer pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncState {
    /// When a manifest was last fetched successfully.
    #[serde(
        rename = "last_check_utc",
        default,
        with = "timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_check: Option<DateTime<Utc>>,

    /// Version token of the last manifest applied without errors.
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_manifest_version: Option<String>,

    /// When the last zero-error transfer pass finished.
    #[serde(
        rename = "last_success_sync_utc",
        default,
        with = "timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_success_sync: Option<DateTime<Utc>>,

    /// Error count of the most recent transfer pass.
    #[serde(
        rename = "last_sync_error_count",
        default,
        deserialize_with = "lenient_count",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_error_count: Option<usize>,

    /// Keys written by other tools.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SyncState {
    /// Whether the archive is known to match the manifest version `version`.
    ///
    /// True only after a zero-error pass applied exactly this version.
    pub fn is_synced_to(&self, version: &str) -> bool {
        self.last_manifest_version.as_deref() == Some(version)
    }

    /// Note a successful manifest fetch.
    pub fn record_check(&mut self, at: DateTime<Utc>) {
        self.last_check = Some(at);
    }

    /// Note the outcome of a transfer pass.
    ///
    /// The success markers advance only when `error_count` is zero.
    pub fn record_pass(&mut self, version: &str, error_count: usize, at: DateTime<Utc>) {
        if error_count == 0 {
            self.last_success_sync = Some(at);
            self.last_manifest_version = Some(version.to_string());
        }
        self.last_error_count = Some(error_count);
    }

    /// Note a pass that was cancelled before finishing.
    ///
    /// Only the error count is kept; the success markers never advance.
    pub fn record_interrupted(&mut self, error_count: usize) {
        self.last_error_count = Some(error_count);
    }
}

/// Store reading and writing [`SyncState`] at a fixed path.
#[derive(Debug, Clone)]
pub struct SyncStateStore {
    path: PathBuf,
}

impl SyncStateStore {
    /// Store located at the standard path under `archive_root`.
    pub fn for_archive(archive_root: &Path) -> Self {
        Self::at(archive_root.join(STATE_FILE_NAME))
    }

    /// Store located at an explicit path.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the state, falling back to defaults on any failure.
    pub fn load(&self) -> SyncState {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return SyncState::default(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Cannot read sync state");
                return SyncState::default();
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Ignoring malformed sync state"
                );
                SyncState::default()
            }
        }
    }

    /// Write the state atomically (temp file, then rename).
    pub fn save(&self, state: &SyncState) -> StateResult<()> {
        let write_failed = |source| StateError::WriteFailed {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(write_failed)?;
        }

        let temp_path = self.path.with_extension("json.tmp");
        let file = File::create(&temp_path).map_err(write_failed)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, state)?;
        writer.flush().map_err(write_failed)?;
        drop(writer);

        fs::rename(&temp_path, &self.path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            write_failed(e)
        })?;

        Ok(())
    }

    /// Read-modify-write. Returns the state as saved.
    pub fn update(&self, f: impl FnOnce(&mut SyncState)) -> StateResult<SyncState> {
        let mut state = self.load();
        f(&mut state);
        self.save(&state)?;
        Ok(state)
    }

    /// Stamp the check time.
    pub fn record_check(&self) -> StateResult<SyncState> {
        self.update(|state| state.record_check(now()))
    }

    /// Record a completed transfer pass.
    pub fn record_pass(&self, version: &str, error_count: usize) -> StateResult<SyncState> {
        self.update(|state| state.record_pass(version, error_count, now()))
    }
}

/// Current UTC time at second precision.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}

/// Format a timestamp the way the state file stores it.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, false)
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

mod timestamp {
    use super::*;

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(ts) => serializer.serialize_str(&format_timestamp(ts)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let raw = Option::<Value>::deserialize(deserializer)?;
        Ok(raw.as_ref().and_then(Value::as_str).and_then(parse_timestamp))
    }
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<usize>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_u64().map(|n| n as usize),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}
