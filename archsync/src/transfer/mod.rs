//! Transfer executor: applies a pending change set to the archive.
//!
//! One pass processes downloads strictly in order, one connection and one
//! open file at a time, then optional deletions, then records the outcome in
//! the sync state. Every per-item failure is isolated; the pass itself
//! cannot fail and always yields a complete [`SyncResult`].

mod cache_bust;
mod error;
mod executor;
mod progress;
mod staging;

pub use cache_bust::{with_cache_buster, CACHE_BUST_PARAM};
pub use error::{TransferError, TransferResult};
pub use executor::{
    MismatchAllowList, SyncResult, TransferExecutor, TransferOptions, DEFAULT_DOWNLOAD_TIMEOUT,
};
pub use progress::{CancelFlag, NoopObserver, ProgressEvent, ProgressPhase, SyncObserver};
pub use staging::{staging_path, StagedFile, STAGING_SUFFIX};
