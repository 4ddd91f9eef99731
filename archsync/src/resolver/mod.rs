//! Link resolution for files living in shared folders.
//!
//! Some manifest entries carry a `folder_handle` instead of a direct URL.
//! Resolving one is a two-step remote exchange:
//!
//! ```text
//! list_folder(handle) ──► FolderListing ──► find(file name) ──► file id
//!                                                                  │
//!                          download_link(handle, file id) ◄────────┘
//! ```
//!
//! [`ResolutionCache`] lives for one transfer pass. It keeps each folder
//! listing and each resolved link, so many files from one shared folder cost
//! a single listing call.

mod pcloud;

pub use pcloud::{share_code, PcloudResolver, DEFAULT_API_BASE};

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::time::Duration;

use thiserror::Error;

use crate::http::HttpError;

/// Errors from link resolution. Each one fails a single file, never a pass.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("folder handle has no share code: {0}")]
    MissingCode(String),

    #[error("{call} failed with result={code}")]
    Api { call: &'static str, code: i64 },

    #[error("could not find '{0}' in shared folder")]
    NotFound(String),

    #[error("missing {field} in {call} response")]
    MissingField {
        call: &'static str,
        field: &'static str,
    },

    #[error("invalid {call} response: {reason}")]
    InvalidResponse { call: &'static str, reason: String },

    #[error(transparent)]
    Http(#[from] HttpError),
}

/// Result type for resolver operations.
pub type ResolveResult<T> = Result<T, ResolveError>;

/// A file found in a shared-folder listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedFile {
    pub name: String,
    /// Provider-internal identifier; `None` when the listing omitted it.
    pub file_id: Option<u64>,
}

/// Files contained in a shared folder, flattened across subfolders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderListing {
    files: Vec<ListedFile>,
}

impl FolderListing {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, file_id: Option<u64>) {
        self.files.push(ListedFile {
            name: name.into(),
            file_id,
        });
    }

    /// First file whose name matches exactly.
    pub fn find(&self, name: &str) -> Option<&ListedFile> {
        self.files.iter().find(|f| f.name == name)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Remote API translating shared-folder handles into download URLs.
pub trait LinkResolver: Send + Sync {
    /// Fetch the listing of the folder behind `handle`.
    fn list_folder(&self, handle: &str, timeout: Duration) -> ResolveResult<FolderListing>;

    /// Request a direct download URL for a file inside the folder.
    fn download_link(&self, handle: &str, file_id: u64, timeout: Duration)
        -> ResolveResult<String>;
}

/// Per-pass cache of folder listings and resolved links.
#[derive(Debug, Default)]
pub struct ResolutionCache {
    listings: HashMap<String, FolderListing>,
    links: HashMap<String, HashMap<String, String>>,
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `file_name` inside the folder behind `handle`.
    ///
    /// Failures are not cached; a later file from the same folder retries.
    pub fn resolve(
        &mut self,
        resolver: &dyn LinkResolver,
        handle: &str,
        file_name: &str,
        timeout: Duration,
    ) -> ResolveResult<String> {
        if let Some(url) = self.links.get(handle).and_then(|m| m.get(file_name)) {
            return Ok(url.clone());
        }

        let listing = match self.listings.entry(handle.to_string()) {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(e) => {
                tracing::debug!(handle = %handle, "Listing shared folder");
                e.insert(resolver.list_folder(handle, timeout)?)
            }
        };

        let listed = listing
            .find(file_name)
            .ok_or_else(|| ResolveError::NotFound(file_name.to_string()))?;
        let file_id = listed.file_id.ok_or(ResolveError::MissingField {
            call: "folder listing",
            field: "fileid",
        })?;

        let url = resolver.download_link(handle, file_id, timeout)?;
        self.links
            .entry(handle.to_string())
            .or_default()
            .insert(file_name.to_string(), url.clone());

        Ok(url)
    }

    /// Number of folder listings held.
    pub fn listing_count(&self) -> usize {
        self.listings.len()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory resolver counting remote calls.
    #[derive(Debug, Default)]
    pub(crate) struct StaticResolver {
        pub(crate) folders: HashMap<String, FolderListing>,
        pub(crate) list_calls: AtomicUsize,
        pub(crate) link_calls: AtomicUsize,
    }

    impl StaticResolver {
        pub(crate) fn with_folder(mut self, handle: &str, files: &[(&str, Option<u64>)]) -> Self {
            let mut listing = FolderListing::new();
            for (name, id) in files {
                listing.push(*name, *id);
            }
            self.folders.insert(handle.to_string(), listing);
            self
        }
    }

    impl LinkResolver for StaticResolver {
        fn list_folder(&self, handle: &str, _timeout: Duration) -> ResolveResult<FolderListing> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            self.folders
                .get(handle)
                .cloned()
                .ok_or(ResolveError::Api {
                    call: "showpublink",
                    code: 7001,
                })
        }

        fn download_link(
            &self,
            handle: &str,
            file_id: u64,
            _timeout: Duration,
        ) -> ResolveResult<String> {
            self.link_calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("https://dl.example.com/{handle}/{file_id}"))
        }
    }

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[test]
    fn test_listing_fetched_once_per_handle() {
        let resolver =
            StaticResolver::default().with_folder("h1", &[("a.jpg", Some(1)), ("b.jpg", Some(2))]);
        let mut cache = ResolutionCache::new();

        let a = cache.resolve(&resolver, "h1", "a.jpg", TIMEOUT).unwrap();
        let b = cache.resolve(&resolver, "h1", "b.jpg", TIMEOUT).unwrap();

        assert_eq!(a, "https://dl.example.com/h1/1");
        assert_eq!(b, "https://dl.example.com/h1/2");
        assert_eq!(resolver.list_calls.load(Ordering::SeqCst), 1);
        assert_eq!(resolver.link_calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.listing_count(), 1);
    }

    #[test]
    fn test_resolved_link_is_reused() {
        let resolver = StaticResolver::default().with_folder("h1", &[("a.jpg", Some(1))]);
        let mut cache = ResolutionCache::new();

        cache.resolve(&resolver, "h1", "a.jpg", TIMEOUT).unwrap();
        cache.resolve(&resolver, "h1", "a.jpg", TIMEOUT).unwrap();

        assert_eq!(resolver.link_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let resolver = StaticResolver::default().with_folder("h1", &[("a.jpg", Some(1))]);
        let mut cache = ResolutionCache::new();

        let err = cache
            .resolve(&resolver, "h1", "missing.jpg", TIMEOUT)
            .unwrap_err();
        assert!(matches!(err, ResolveError::NotFound(name) if name == "missing.jpg"));
    }

    #[test]
    fn test_missing_file_id_is_an_error() {
        let resolver = StaticResolver::default().with_folder("h1", &[("a.jpg", None)]);
        let mut cache = ResolutionCache::new();

        let err = cache.resolve(&resolver, "h1", "a.jpg", TIMEOUT).unwrap_err();
        assert!(matches!(err, ResolveError::MissingField { field: "fileid", .. }));
    }

    #[test]
    fn test_failed_listing_is_retried() {
        let resolver = StaticResolver::default();
        let mut cache = ResolutionCache::new();

        assert!(cache.resolve(&resolver, "nope", "a.jpg", TIMEOUT).is_err());
        assert!(cache.resolve(&resolver, "nope", "b.jpg", TIMEOUT).is_err());
        assert_eq!(resolver.list_calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.listing_count(), 0);
    }

    #[test]
    fn test_exact_name_match() {
        let mut listing = FolderListing::new();
        listing.push("A.jpg", Some(1));
        assert!(listing.find("a.jpg").is_none());
        assert!(listing.find("A.jpg").is_some());
    }
}
