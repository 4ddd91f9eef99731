//! Progress reporting and cooperative cancellation for transfer passes.
//!
//! Hosts implement [`SyncObserver`] and hand it to the executor. Both hooks
//! may be polled while the host is running its own UI loop on another thread,
//! so implementations must be `Send + Sync` and should return quickly.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;

/// Lifecycle point of a single download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressPhase {
    /// The item is about to be fetched.
    Downloading,
    /// The item was fetched, verified and moved into place.
    Downloaded,
}

/// Per-item progress notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressEvent {
    pub phase: ProgressPhase,
    /// 1-based position in the pending download list.
    pub index: usize,
    pub total: usize,
    pub path: String,
}

impl ProgressEvent {
    pub fn new(phase: ProgressPhase, index: usize, total: usize, path: impl Into<String>) -> Self {
        Self {
            phase,
            index,
            total,
            path: path.into(),
        }
    }
}

/// Hooks a host supplies to follow and interrupt a transfer pass.
pub trait SyncObserver: Send + Sync {
    /// Called at the start and successful end of each download.
    fn on_progress(&self, _event: &ProgressEvent) {}

    /// Polled before each item; returning `true` stops the download loop.
    fn should_cancel(&self) -> bool {
        false
    }
}

/// Observer that ignores progress and never cancels.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl SyncObserver for NoopObserver {}

/// Thread-safe cancellation switch.
///
/// Clones share the same flag, so one clone can be moved into a signal
/// handler while another is passed to the executor.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Takes effect at the next item boundary.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

impl SyncObserver for CancelFlag {
    fn should_cancel(&self) -> bool {
        self.is_cancelled()
    }
}
