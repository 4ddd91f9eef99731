//! archsync - Pull-only content synchronization for media archives
//!
//! This library keeps a local archive directory in step with a remote,
//! versioned manifest. A sync pass is a single sequence:
//!
//! ```text
//! ManifestFetcher ──► compute_pending_changes ──► PendingFilter (host policy)
//!                                                       │
//!                         SyncStateStore ◄── TransferExecutor ──► LinkResolver
//! ```
//!
//! The [`engine::SyncEngine`] facade wires these pieces together for hosts
//! (the CLI, or any UI layer) that own scheduling, progress display and
//! cancellation.

pub mod bootstrap;
pub mod checksum;
pub mod config;
pub mod diff;
pub mod engine;
pub mod filter;
pub mod http;
pub mod logging;
pub mod manifest;
pub mod paths;
pub mod resolver;
pub mod state;
pub mod transfer;

/// Library version, reported in the HTTP user agent.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use bootstrap::BootstrapError;
pub use diff::{compute_pending_changes, PendingChangeSet};
pub use engine::{check_for_updates, sync_updates, SyncEngine, UpdateCheck};
pub use filter::{count_pending_miniatures, CatalogueOnly, MediaFilter, PendingFilter};
pub use manifest::{AppInfo, FetchError, Manifest, ManifestEntry};
pub use state::{SyncState, SyncStateStore};
pub use transfer::{
    CancelFlag, MismatchAllowList, NoopObserver, ProgressEvent, ProgressPhase, SyncObserver,
    SyncResult, TransferExecutor, TransferOptions,
};
