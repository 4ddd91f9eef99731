//! The remote manifest: data model, validation, retrieval, and the
//! publisher-side tools that produce it.
//!
//! # Wire format
//!
//! ```text
//! {
//!   "archive_version": "2024-05-01T12:00:00+00:00",
//!   "files": [
//!     {"path": "videos/a.mp4", "size": 1024, "sha256": "…", "url": "https://…"},
//!     {"path": "thumbs/a_thumb.jpg", "folder_handle": "https://…?code=…"}
//!   ],
//!   "deleted": ["videos/old.mp4"],
//!   "app": {"latest_version": "1.2.0", "download_url": "https://…"}
//! }
//! ```

mod app;
mod builder;
mod fetch;
mod merge;
mod types;
mod validate;

pub use app::{compare_versions, AppInfo};
pub use builder::{
    build_manifest, load_manifest_file, write_manifest, BuildError, BuildOptions, BuildResult,
    DEFAULT_INCLUDE_EXTENSIONS, DEFAULT_SKIP_DIRS, RESERVED_FILE_NAMES,
};
pub use fetch::{parse_manifest, FetchError, ManifestError, ManifestFetcher};
pub use merge::merge_deleted;
pub use types::{Manifest, ManifestEntry};
pub use validate::{validate_manifest, ValidationError};
