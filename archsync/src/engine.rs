//! High-level sync facade for hosts.
//!
//! [`SyncEngine`] bundles the archive root with the HTTP client, link
//! resolver and state store, and exposes the two calls a host needs:
//!
//! 1. [`SyncEngine::check_for_updates`] fetches the manifest and computes
//!    the pending change set (the host may narrow it with a
//!    [`PendingFilter`](crate::filter::PendingFilter));
//! 2. [`SyncEngine::sync_updates`] applies it and records the outcome.
//!
//! The engine holds no locks. Hosts must not run two passes against the
//! same archive root at once.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::diff::{compute_pending_changes, PendingChangeSet};
use crate::http::{HttpClient, HttpError, ReqwestClient};
use crate::manifest::{AppInfo, FetchError, Manifest, ManifestFetcher};
use crate::resolver::{LinkResolver, PcloudResolver};
use crate::state::{SyncState, SyncStateStore};
use crate::transfer::{SyncObserver, SyncResult, TransferExecutor, TransferOptions};

/// Default timeout for the manifest request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(6);

/// Result of a successful update check.
#[derive(Debug, Clone)]
pub struct UpdateCheck {
    pub manifest: Manifest,
    pub pending: PendingChangeSet,
    /// Sync state after the check time was recorded.
    pub state: SyncState,
}

impl UpdateCheck {
    /// Application release newer than `current_version`, if the manifest
    /// announces one.
    pub fn app_update(&self, current_version: &str) -> Option<&AppInfo> {
        self.manifest
            .app_info
            .as_ref()
            .filter(|app| app.is_newer_than(current_version))
    }

    /// Whether the last zero-error pass applied this manifest version.
    pub fn is_synced(&self) -> bool {
        self.state.is_synced_to(&self.manifest.version)
    }
}

/// Sync engine bound to one archive root.
#[derive(Clone)]
pub struct SyncEngine {
    archive_root: PathBuf,
    client: Arc<dyn HttpClient>,
    resolver: Arc<dyn LinkResolver>,
    state_store: SyncStateStore,
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("archive_root", &self.archive_root)
            .field("state_store", &self.state_store)
            .finish()
    }
}

impl SyncEngine {
    /// Engine using the reqwest client and the pCloud resolver.
    pub fn new(archive_root: impl Into<PathBuf>) -> Result<Self, HttpError> {
        let client: Arc<dyn HttpClient> = Arc::new(ReqwestClient::new()?);
        let resolver = Arc::new(PcloudResolver::new(Arc::clone(&client)));
        Ok(Self::with_client(archive_root, client, resolver))
    }

    /// Engine with injected network collaborators.
    pub fn with_client(
        archive_root: impl Into<PathBuf>,
        client: Arc<dyn HttpClient>,
        resolver: Arc<dyn LinkResolver>,
    ) -> Self {
        let archive_root = archive_root.into();
        let state_store = SyncStateStore::for_archive(&archive_root);
        Self {
            archive_root,
            client,
            resolver,
            state_store,
        }
    }

    pub fn archive_root(&self) -> &Path {
        &self.archive_root
    }

    pub fn state_store(&self) -> &SyncStateStore {
        &self.state_store
    }

    /// Current persisted state (defaults when absent or unreadable).
    pub fn load_state(&self) -> SyncState {
        self.state_store.load()
    }

    /// Fetch the manifest and diff it against the archive.
    ///
    /// On success the check time is recorded. A state write failure is
    /// logged and otherwise ignored.
    pub fn check_for_updates(
        &self,
        manifest_url: &str,
        timeout: Duration,
    ) -> Result<UpdateCheck, FetchError> {
        let manifest = ManifestFetcher::new(self.client.as_ref(), timeout).fetch(manifest_url)?;

        let state = match self.state_store.record_check() {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!(error = %e, "Could not record check time");
                self.state_store.load()
            }
        };

        let pending = compute_pending_changes(&self.archive_root, &manifest);

        tracing::info!(
            version = %manifest.version,
            downloads = pending.download_count(),
            deletions = pending.delete_count(),
            "Update check complete"
        );

        Ok(UpdateCheck {
            manifest,
            pending,
            state,
        })
    }

    /// Apply `pending` for `manifest` and record the outcome.
    pub fn sync_updates(
        &self,
        manifest: &Manifest,
        pending: &PendingChangeSet,
        options: &TransferOptions,
        observer: &dyn SyncObserver,
    ) -> SyncResult {
        TransferExecutor::new(&self.archive_root, self.client.as_ref())
            .with_resolver(self.resolver.as_ref())
            .with_state_store(self.state_store.clone())
            .run(manifest, pending, options, observer)
    }
}

/// One-shot update check with the default client.
///
/// A client that cannot be constructed is reported as offline.
pub fn check_for_updates(
    archive_root: &Path,
    manifest_url: &str,
    timeout: Duration,
) -> Result<UpdateCheck, FetchError> {
    let engine = SyncEngine::new(archive_root).map_err(|source| FetchError::Offline {
        url: manifest_url.to_string(),
        source,
    })?;
    engine.check_for_updates(manifest_url, timeout)
}

/// One-shot transfer pass with the default client and resolver.
///
/// A client that cannot be constructed yields a result carrying that single
/// error; nothing is transferred and the sync state is left alone.
pub fn sync_updates(
    archive_root: &Path,
    manifest: &Manifest,
    pending: &PendingChangeSet,
    options: &TransferOptions,
    observer: &dyn SyncObserver,
) -> SyncResult {
    run_pass(
        SyncEngine::new(archive_root),
        manifest,
        pending,
        options,
        observer,
    )
}

fn run_pass(
    engine: Result<SyncEngine, HttpError>,
    manifest: &Manifest,
    pending: &PendingChangeSet,
    options: &TransferOptions,
    observer: &dyn SyncObserver,
) -> SyncResult {
    match engine {
        Ok(engine) => engine.sync_updates(manifest, pending, options, observer),
        Err(e) => {
            tracing::warn!(error = %e, "Cannot start transfer pass");
            SyncResult {
                errors: vec![format!("Sync could not start: {e}")],
                ..SyncResult::default()
            }
        }
    }
}
