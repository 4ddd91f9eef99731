//! Manifest retrieval over HTTP(S).

use std::time::Duration;

use thiserror::Error;

use super::types::Manifest;
use super::validate::{validate_manifest, ValidationError};
use crate::http::{HttpClient, HttpError};

/// Why a manifest document could not be turned into a [`Manifest`].
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// Classified failure of a manifest fetch.
///
/// Neither variant is fatal to the host. `Offline` means "try again later";
/// `Malformed` means the server answered but its data is unusable.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("update server unreachable ({url}): {source}")]
    Offline {
        url: String,
        #[source]
        source: HttpError,
    },

    #[error("manifest from {url} is malformed: {reason}")]
    Malformed { url: String, reason: String },
}

impl FetchError {
    /// Whether the failure was a connectivity problem.
    pub fn is_offline(&self) -> bool {
        matches!(self, Self::Offline { .. })
    }
}

/// Parse and validate a manifest document.
pub fn parse_manifest(bytes: &[u8]) -> Result<Manifest, ManifestError> {
    let doc: serde_json::Value = serde_json::from_slice(bytes)?;
    validate_manifest(&doc)?;
    Ok(serde_json::from_value(doc)?)
}

/// Fetches and validates the remote manifest.
pub struct ManifestFetcher<'a> {
    client: &'a dyn HttpClient,
    timeout: Duration,
}

impl<'a> ManifestFetcher<'a> {
    pub fn new(client: &'a dyn HttpClient, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Fetch the manifest at `url`.
    ///
    /// Network-level failures (refused connection, DNS, timeout) classify as
    /// [`FetchError::Offline`]. A reachable server returning an error status,
    /// invalid JSON or a document failing validation classifies as
    /// [`FetchError::Malformed`].
    pub fn fetch(&self, url: &str) -> Result<Manifest, FetchError> {
        tracing::debug!(url = %url, timeout_secs = self.timeout.as_secs(), "Fetching manifest");

        let body = self.client.get(url, self.timeout).map_err(|e| {
            if e.is_offline() {
                FetchError::Offline {
                    url: url.to_string(),
                    source: e,
                }
            } else {
                FetchError::Malformed {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            }
        })?;

        let manifest = parse_manifest(&body).map_err(|e| FetchError::Malformed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        tracing::info!(
            url = %url,
            version = %manifest.version,
            files = manifest.files.len(),
            deleted = manifest.deleted.len(),
            "Manifest fetched"
        );

        Ok(manifest)
    }
}
