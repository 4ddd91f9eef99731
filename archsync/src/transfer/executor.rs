use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

use super::cache_bust::with_cache_buster;
use super::error::{TransferError, TransferResult};
use super::progress::{ProgressEvent, ProgressPhase, SyncObserver};
use super::staging::StagedFile;
use crate::checksum::{calculate_file_checksum, checksums_match};
use crate::diff::PendingChangeSet;
use crate::http::HttpClient;
use crate::manifest::{Manifest, ManifestEntry};
use crate::paths::{file_name, normalize_separators, safe_join};
use crate::resolver::{LinkResolver, ResolutionCache};
use crate::state::{self, SyncStateStore};

/// Default timeout for each download request.
pub const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(20);

/// Paths whose checksum mismatch is downgraded to a warning.
///
/// Matching is case-insensitive against the full relative path (with forward
/// slashes) or the bare file name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MismatchAllowList {
    entries: HashSet<String>,
}

impl MismatchAllowList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: &str) {
        let normalized = normalize(path);
        if !normalized.is_empty() {
            self.entries.insert(normalized);
        }
    }

    pub fn contains(&self, rel: &str) -> bool {
        let rel = normalize(rel);
        self.entries.contains(&rel) || self.entries.contains(file_name(&rel))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for MismatchAllowList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut list = Self::new();
        for path in iter {
            list.insert(path.as_ref());
        }
        list
    }
}

fn normalize(path: &str) -> String {
    normalize_separators(path.trim()).to_lowercase()
}

/// Caller choices for one transfer pass.
#[derive(Debug, Clone)]
pub struct TransferOptions {
    /// Unlink paths listed in `to_delete`.
    pub remove_deleted: bool,
    /// Timeout applied to every network request of the pass.
    pub timeout: Duration,
    pub allowed_mismatch: MismatchAllowList,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            remove_deleted: false,
            timeout: DEFAULT_DOWNLOAD_TIMEOUT,
            allowed_mismatch: MismatchAllowList::default(),
        }
    }
}

impl TransferOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_remove_deleted(mut self, remove: bool) -> Self {
        self.remove_deleted = remove;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn allow_mismatch(mut self, path: &str) -> Self {
        self.allowed_mismatch.insert(path);
        self
    }
}

/// Outcome of one transfer pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncResult {
    pub downloaded: usize,
    pub removed: usize,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub cancelled: bool,
}

impl SyncResult {
    /// Whether the pass ran to completion without errors.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty() && !self.cancelled
    }
}

/// Runs transfer passes against one archive root.
pub struct TransferExecutor<'a> {
    archive_root: PathBuf,
    client: &'a dyn HttpClient,
    resolver: Option<&'a dyn LinkResolver>,
    state_store: SyncStateStore,
}

impl<'a> TransferExecutor<'a> {
    /// Executor writing under `archive_root` and recording state in the
    /// standard state file there.
    pub fn new(archive_root: impl Into<PathBuf>, client: &'a dyn HttpClient) -> Self {
        let archive_root = archive_root.into();
        let state_store = SyncStateStore::for_archive(&archive_root);
        Self {
            archive_root,
            client,
            resolver: None,
            state_store,
        }
    }

    /// Resolve entries that only carry a `folder_handle`.
    pub fn with_resolver(mut self, resolver: &'a dyn LinkResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn with_state_store(mut self, store: SyncStateStore) -> Self {
        self.state_store = store;
        self
    }

    /// Apply `pending` and record the outcome.
    ///
    /// `pending` is expected to come from
    /// [`compute_pending_changes`](crate::diff::compute_pending_changes) on
    /// the same manifest, possibly narrowed by a filter.
    pub fn run(
        &self,
        manifest: &Manifest,
        pending: &PendingChangeSet,
        options: &TransferOptions,
        observer: &dyn SyncObserver,
    ) -> SyncResult {
        let mut result = SyncResult::default();
        let mut cache = ResolutionCache::new();
        let total = pending.to_download.len();

        tracing::info!(
            downloads = total,
            deletions = pending.delete_count(),
            remove_deleted = options.remove_deleted,
            version = %manifest.version,
            "Starting transfer pass"
        );

        for (i, entry) in pending.to_download.iter().enumerate() {
            if observer.should_cancel() {
                tracing::info!(completed = i, total, "Transfer pass cancelled");
                result.cancelled = true;
                break;
            }

            let index = i + 1;
            observer.on_progress(&ProgressEvent::new(
                ProgressPhase::Downloading,
                index,
                total,
                entry.path.as_str(),
            ));

            match self.download(entry, &manifest.version, options, &mut cache) {
                Ok(warning) => {
                    result.warnings.extend(warning);
                    result.downloaded += 1;
                    observer.on_progress(&ProgressEvent::new(
                        ProgressPhase::Downloaded,
                        index,
                        total,
                        entry.path.as_str(),
                    ));
                }
                Err(e) => {
                    tracing::warn!(path = %entry.path, error = %e, "Download failed");
                    result.errors.push(e.describe(&entry.path));
                }
            }
        }

        if options.remove_deleted {
            for rel in &pending.to_delete {
                match self.remove(rel) {
                    Ok(true) => result.removed += 1,
                    Ok(false) => {}
                    Err(e) => {
                        tracing::warn!(path = %rel, error = %e, "Deletion failed");
                        result.errors.push(format!("Could not delete {rel}: {e}"));
                    }
                }
            }
        }

        self.record_outcome(manifest, &mut result);

        tracing::info!(
            downloaded = result.downloaded,
            removed = result.removed,
            errors = result.errors.len(),
            warnings = result.warnings.len(),
            cancelled = result.cancelled,
            "Transfer pass finished"
        );

        result
    }

    /// Fetch, verify and install one entry. Returns a warning for a
    /// tolerated checksum mismatch.
    fn download(
        &self,
        entry: &ManifestEntry,
        version: &str,
        options: &TransferOptions,
        cache: &mut ResolutionCache,
    ) -> TransferResult<Option<String>> {
        let dest = safe_join(&self.archive_root, &entry.path)?;
        let source = self.source_url(entry, options.timeout, cache)?;
        let url = with_cache_buster(&source, version);

        let mut staged = StagedFile::create(&dest)?;
        let bytes = self.client.download(&url, options.timeout, &mut staged)?;
        staged.finish()?;

        tracing::debug!(path = %entry.path, bytes, "Downloaded");

        let mut warning = None;
        if let Some(expected) = entry.expected_sha256() {
            let actual =
                calculate_file_checksum(staged.path()).map_err(|source| {
                    TransferError::ReadFailed {
                        path: staged.path().to_path_buf(),
                        source,
                    }
                })?;

            if !checksums_match(&actual, expected) {
                if !options.allowed_mismatch.contains(&entry.path) {
                    return Err(TransferError::ChecksumMismatch {
                        path: entry.path.clone(),
                        expected: expected.to_string(),
                        actual,
                    });
                }

                tracing::warn!(path = %entry.path, "Checksum mismatch tolerated");
                warning = Some(format!(
                    "Checksum mismatch tolerated for {} (expected {}, got {})",
                    entry.path, expected, actual
                ));
            }
        }

        staged.commit()?;
        Ok(warning)
    }

    fn source_url(
        &self,
        entry: &ManifestEntry,
        timeout: Duration,
        cache: &mut ResolutionCache,
    ) -> TransferResult<String> {
        if let Some(url) = entry.direct_url() {
            return Ok(url.to_string());
        }

        let handle = entry
            .folder_handle()
            .ok_or_else(|| TransferError::NoUrl(entry.path.clone()))?;
        let resolver = self
            .resolver
            .ok_or_else(|| TransferError::NoResolver(handle.to_string()))?;

        Ok(cache.resolve(resolver, handle, entry.file_name(), timeout)?)
    }

    /// Unlink one deleted path. `Ok(false)` when it was already gone.
    fn remove(&self, rel: &str) -> TransferResult<bool> {
        let path = safe_join(&self.archive_root, rel)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::debug!(path = %rel, "Removed");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(TransferError::WriteFailed { path, source }),
        }
    }

    fn record_outcome(&self, manifest: &Manifest, result: &mut SyncResult) {
        let error_count = result.errors.len();
        let cancelled = result.cancelled;
        let at = state::now();

        let saved = self.state_store.update(|state| {
            if cancelled {
                state.record_interrupted(error_count);
            } else {
                state.record_pass(&manifest.version, error_count, at);
            }
        });

        if let Err(e) = saved {
            tracing::warn!(error = %e, "Could not save sync state");
            result
                .warnings
                .push(format!("Could not save sync state: {e}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::calculate_checksum;
    use crate::diff::compute_pending_changes;
    use crate::http::tests::MockHttpClient;
    use crate::resolver::tests::StaticResolver;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tempfile::TempDir;

    const CDN: &str = "https://cdn.example.com";

    fn url(rel: &str) -> String {
        format!("{CDN}/{rel}")
    }

    fn entry(rel: &str, body: &[u8]) -> ManifestEntry {
        ManifestEntry::new(rel)
            .with_url(url(rel))
            .with_sha256(calculate_checksum(body))
            .with_size(body.len() as u64)
    }

    fn write(root: &Path, rel: &str, data: &[u8]) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, data).unwrap();
    }

    fn pending(entries: &[ManifestEntry], deletions: &[&str]) -> PendingChangeSet {
        PendingChangeSet {
            to_download: entries.to_vec(),
            to_delete: deletions.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Records events; cancels once `should_cancel` has been asked more
    /// than `cancel_after` times.
    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<ProgressEvent>>,
        checks: AtomicUsize,
        cancel_after: Option<usize>,
    }

    impl Recorder {
        fn cancelling_after(checks: usize) -> Self {
            Self {
                cancel_after: Some(checks),
                ..Self::default()
            }
        }

        fn events(&self) -> Vec<(ProgressPhase, usize, usize, String)> {
            self.events
                .lock()
                .unwrap()
                .iter()
                .map(|e| (e.phase, e.index, e.total, e.path.clone()))
                .collect()
        }
    }

    impl SyncObserver for Recorder {
        fn on_progress(&self, event: &ProgressEvent) {
            self.events.lock().unwrap().push(event.clone());
        }

        fn should_cancel(&self) -> bool {
            let asked = self.checks.fetch_add(1, Ordering::SeqCst) + 1;
            self.cancel_after.is_some_and(|limit| asked > limit)
        }
    }

    #[test]
    fn test_end_to_end_download_and_delete() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        write(root, "a.mp4", b"stale bytes");
        write(root, "old.mp4", b"old");

        let mut manifest = Manifest::new("v1");
        manifest.files.push(entry("a.mp4", b"fresh bytes"));
        manifest.deleted = vec!["old.mp4".to_string()];

        let pending = compute_pending_changes(root, &manifest);
        assert_eq!(pending.to_download.len(), 1);
        assert_eq!(pending.to_delete, vec!["old.mp4"]);

        let mock = MockHttpClient::new().route(&url("a.mp4"), b"fresh bytes".to_vec());
        let result = TransferExecutor::new(root, &mock).run(
            &manifest,
            &pending,
            &TransferOptions::new().with_remove_deleted(true),
            &Recorder::default(),
        );

        assert_eq!(result.downloaded, 1);
        assert_eq!(result.removed, 1);
        assert!(result.errors.is_empty());
        assert!(result.is_ok());
        assert_eq!(fs::read(root.join("a.mp4")).unwrap(), b"fresh bytes");
        assert!(!root.join("old.mp4").exists());
        assert!(!root.join("a.mp4.part").exists());
        assert_eq!(mock.requests(), vec!["https://cdn.example.com/a.mp4?v=v1"]);

        assert!(compute_pending_changes(root, &manifest).is_empty());
        let state = SyncStateStore::for_archive(root).load();
        assert!(state.is_synced_to("v1"));
        assert_eq!(state.last_error_count, Some(0));
    }

    #[test]
    fn test_checksum_failure_is_isolated() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        write(root, "b.mp4", b"previous b");

        let entries = [
            entry("a.mp4", b"aaa"),
            entry("b.mp4", b"bbb"),
            entry("c.mp4", b"ccc"),
        ];
        let mock = MockHttpClient::new()
            .route(&url("a.mp4"), b"aaa".to_vec())
            .route(&url("b.mp4"), b"corrupted".to_vec())
            .route(&url("c.mp4"), b"ccc".to_vec());

        let manifest = Manifest::new("v2");
        let result = TransferExecutor::new(root, &mock).run(
            &manifest,
            &pending(&entries, &[]),
            &TransferOptions::new(),
            &Recorder::default(),
        );

        assert_eq!(result.downloaded, 2);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].starts_with("Checksum mismatch after download: b.mp4"));
        assert!(result.warnings.is_empty());
        assert_eq!(mock.count_requests(&url("c.mp4")), 1);
        assert_eq!(fs::read(root.join("b.mp4")).unwrap(), b"previous b");
        assert!(!root.join("b.mp4.part").exists());
    }

    #[test]
    fn test_tolerated_mismatch_keeps_file() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();

        let entries = [entry("db/miniatures.db", b"published")];
        let mock = MockHttpClient::new().route(&url("db/miniatures.db"), b"regenerated".to_vec());

        let result = TransferExecutor::new(root, &mock).run(
            &Manifest::new("v3"),
            &pending(&entries, &[]),
            &TransferOptions::new().allow_mismatch("Miniatures.DB"),
            &Recorder::default(),
        );

        assert_eq!(result.downloaded, 1);
        assert!(result.errors.is_empty());
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].starts_with("Checksum mismatch tolerated for db/miniatures.db"));
        assert_eq!(fs::read(root.join("db/miniatures.db")).unwrap(), b"regenerated");
    }

    #[test]
    fn test_cancellation_before_second_item() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();

        let entries = [
            entry("a.mp4", b"a"),
            entry("b.mp4", b"b"),
            entry("c.mp4", b"c"),
        ];
        let mock = MockHttpClient::new()
            .route(&url("a.mp4"), b"a".to_vec())
            .route(&url("b.mp4"), b"b".to_vec())
            .route(&url("c.mp4"), b"c".to_vec());
        let observer = Recorder::cancelling_after(1);

        let result = TransferExecutor::new(root, &mock).run(
            &Manifest::new("v4"),
            &pending(&entries, &[]),
            &TransferOptions::new(),
            &observer,
        );

        assert!(result.cancelled);
        assert!(!result.is_ok());
        assert_eq!(result.downloaded, 1);
        assert_eq!(mock.requests().len(), 1);
        assert!(root.join("a.mp4").exists());
        assert!(!root.join("b.mp4").exists());
        assert_eq!(
            observer.events(),
            vec![
                (ProgressPhase::Downloading, 1, 3, "a.mp4".to_string()),
                (ProgressPhase::Downloaded, 1, 3, "a.mp4".to_string()),
            ]
        );

        let state = SyncStateStore::for_archive(root).load();
        assert_eq!(state.last_manifest_version, None);
        assert_eq!(state.last_error_count, Some(0));
    }

    #[test]
    fn test_deletions_still_run_after_cancel() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        write(root, "old.mp4", b"old");

        let result = TransferExecutor::new(root, &MockHttpClient::new()).run(
            &Manifest::new("v5"),
            &pending(&[entry("a.mp4", b"a")], &["old.mp4"]),
            &TransferOptions::new().with_remove_deleted(true),
            &Recorder::cancelling_after(0),
        );

        assert!(result.cancelled);
        assert_eq!(result.downloaded, 0);
        assert_eq!(result.removed, 1);
    }

    #[test]
    fn test_deleting_absent_file_is_silent() {
        let temp = TempDir::new().unwrap();

        let result = TransferExecutor::new(temp.path(), &MockHttpClient::new()).run(
            &Manifest::new("v6"),
            &pending(&[], &["gone.mp4"]),
            &TransferOptions::new().with_remove_deleted(true),
            &Recorder::default(),
        );

        assert_eq!(result.removed, 0);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_deletion_failure_does_not_stop_others() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("folder.mp4")).unwrap();
        write(root, "old.mp4", b"old");

        let result = TransferExecutor::new(root, &MockHttpClient::new()).run(
            &Manifest::new("v7"),
            &pending(&[], &["folder.mp4", "old.mp4"]),
            &TransferOptions::new().with_remove_deleted(true),
            &Recorder::default(),
        );

        assert_eq!(result.removed, 1);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].starts_with("Could not delete folder.mp4"));
    }

    #[test]
    fn test_deletions_skipped_unless_enabled() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "old.mp4", b"old");

        let result = TransferExecutor::new(temp.path(), &MockHttpClient::new()).run(
            &Manifest::new("v8"),
            &pending(&[], &["old.mp4"]),
            &TransferOptions::new(),
            &Recorder::default(),
        );

        assert_eq!(result.removed, 0);
        assert!(temp.path().join("old.mp4").exists());
    }

    #[test]
    fn test_state_advances_only_without_errors() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        let store = SyncStateStore::for_archive(root);

        let failing = MockHttpClient::new().route_status(&url("a.mp4"), 500);
        let result = TransferExecutor::new(root, &failing).run(
            &Manifest::new("v9"),
            &pending(&[entry("a.mp4", b"a")], &[]),
            &TransferOptions::new(),
            &Recorder::default(),
        );
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].starts_with("Download failed for a.mp4: HTTP 500"));

        let state = store.load();
        assert_eq!(state.last_manifest_version, None);
        assert_eq!(state.last_success_sync, None);
        assert_eq!(state.last_error_count, Some(1));

        let working = MockHttpClient::new().route(&url("a.mp4"), b"a".to_vec());
        let result = TransferExecutor::new(root, &working).run(
            &Manifest::new("v9"),
            &pending(&[entry("a.mp4", b"a")], &[]),
            &TransferOptions::new(),
            &Recorder::default(),
        );
        assert!(result.is_ok());

        let state = store.load();
        assert!(state.is_synced_to("v9"));
        assert!(state.last_success_sync.is_some());
        assert_eq!(state.last_error_count, Some(0));
    }

    #[test]
    fn test_timeout_is_a_per_item_error() {
        let temp = TempDir::new().unwrap();
        let mock = MockHttpClient::new()
            .route_timeout(&url("a.mp4"))
            .route(&url("b.mp4"), b"b".to_vec());

        let result = TransferExecutor::new(temp.path(), &mock).run(
            &Manifest::new("v10"),
            &pending(&[entry("a.mp4", b"a"), entry("b.mp4", b"b")], &[]),
            &TransferOptions::new().with_timeout(Duration::from_secs(3)),
            &Recorder::default(),
        );

        assert_eq!(result.downloaded, 1);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("timed out after 3s"));
    }

    #[test]
    fn test_folder_handle_entries_are_resolved_once_per_folder() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        let resolver = StaticResolver::default()
            .with_folder("share-1", &[("a_thumb.jpg", Some(11)), ("b_thumb.jpg", Some(12))]);
        let mock = MockHttpClient::new()
            .route("https://dl.example.com/share-1/11", b"thumb a".to_vec())
            .route("https://dl.example.com/share-1/12", b"thumb b".to_vec());

        let entries = [
            ManifestEntry::new("thumbs/a_thumb.jpg").with_folder_handle("share-1"),
            ManifestEntry::new("thumbs/b_thumb.jpg").with_folder_handle("share-1"),
        ];

        let result = TransferExecutor::new(root, &mock).with_resolver(&resolver).run(
            &Manifest::new("v11"),
            &pending(&entries, &[]),
            &TransferOptions::new(),
            &Recorder::default(),
        );

        assert!(result.is_ok());
        assert_eq!(result.downloaded, 2);
        assert_eq!(resolver.list_calls.load(Ordering::SeqCst), 1);
        assert_eq!(fs::read(root.join("thumbs/b_thumb.jpg")).unwrap(), b"thumb b");
        assert_eq!(
            mock.requests()[0],
            "https://dl.example.com/share-1/11?v=v11"
        );
    }

    #[test]
    fn test_resolution_failure_is_isolated() {
        let temp = TempDir::new().unwrap();
        let resolver = StaticResolver::default().with_folder("share-1", &[("a.jpg", Some(1))]);
        let mock = MockHttpClient::new()
            .route("https://dl.example.com/share-1/1", b"a".to_vec())
            .route(&url("c.mp4"), b"c".to_vec());

        let entries = [
            ManifestEntry::new("missing.jpg").with_folder_handle("share-1"),
            ManifestEntry::new("a.jpg").with_folder_handle("share-1"),
            ManifestEntry::new("c.mp4").with_url(url("c.mp4")),
        ];

        let result = TransferExecutor::new(temp.path(), &mock)
            .with_resolver(&resolver)
            .run(
                &Manifest::new("v12"),
                &pending(&entries, &[]),
                &TransferOptions::new(),
                &Recorder::default(),
            );

        assert_eq!(result.downloaded, 2);
        assert_eq!(
            result.errors,
            vec!["Download failed for missing.jpg: could not find 'missing.jpg' in shared folder"]
        );
    }

    #[test]
    fn test_missing_url_or_resolver() {
        let temp = TempDir::new().unwrap();
        let entries = [
            ManifestEntry::new("nowhere.mp4"),
            ManifestEntry::new("shared.jpg").with_folder_handle("share-1"),
        ];

        let result = TransferExecutor::new(temp.path(), &MockHttpClient::new()).run(
            &Manifest::new("v13"),
            &pending(&entries, &[]),
            &TransferOptions::new(),
            &Recorder::default(),
        );

        assert_eq!(result.downloaded, 0);
        assert_eq!(
            result.errors,
            vec![
                "Download failed for nowhere.mp4: No download URL available for nowhere.mp4",
                "Download failed for shared.jpg: no link resolver configured for shared folder share-1",
            ]
        );
    }

    #[test]
    fn test_unsafe_path_is_rejected() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("archive");
        fs::create_dir_all(&root).unwrap();
        let mock = MockHttpClient::new().route(&url("evil"), b"x".to_vec());

        let result = TransferExecutor::new(&root, &mock).run(
            &Manifest::new("v14"),
            &pending(
                &[ManifestEntry::new("../evil.mp4").with_url(url("evil"))],
                &["../victim.txt"],
            ),
            &TransferOptions::new().with_remove_deleted(true),
            &Recorder::default(),
        );

        assert_eq!(result.errors.len(), 2);
        assert!(mock.requests().is_empty());
        assert!(!temp.path().join("evil.mp4").exists());
    }

    #[test]
    fn test_progress_events_for_success_and_failure() {
        let temp = TempDir::new().unwrap();
        let mock = MockHttpClient::new().route(&url("b.mp4"), b"b".to_vec());
        let observer = Recorder::default();

        TransferExecutor::new(temp.path(), &mock).run(
            &Manifest::new("v15"),
            &pending(&[entry("a.mp4", b"a"), entry("b.mp4", b"b")], &[]),
            &TransferOptions::new(),
            &observer,
        );

        assert_eq!(
            observer.events(),
            vec![
                (ProgressPhase::Downloading, 1, 2, "a.mp4".to_string()),
                (ProgressPhase::Downloading, 2, 2, "b.mp4".to_string()),
                (ProgressPhase::Downloaded, 2, 2, "b.mp4".to_string()),
            ]
        );
    }

    #[test]
    fn test_allow_list_matching() {
        let list: MismatchAllowList = ["miniatures.db", "Data\\Index.JSON"].into_iter().collect();

        assert!(list.contains("miniatures.db"));
        assert!(list.contains("sub/MINIATURES.db"));
        assert!(list.contains("data/index.json"));
        assert!(!list.contains("other/index.json"));
        assert!(!list.contains("a.mp4"));
    }
}
