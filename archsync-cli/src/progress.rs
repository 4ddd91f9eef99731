//! Terminal progress for sync passes.
//!
//! Cargo-style status lines on stderr plus an indicatif bar that follows the
//! executor's per-item events. Ctrl-C flips a [`CancelFlag`]; the executor
//! stops at the next item boundary.

use std::io::Write as _;
use std::time::{Duration, Instant};

use archsync::{CancelFlag, ProgressEvent, ProgressPhase, SyncObserver};
use indicatif::{ProgressBar, ProgressStyle};

use crate::error::CliError;

/// Print a right-aligned, green status verb followed by a message.
pub fn print_status(status: &str, message: &str) {
    let mut term = console::Term::stderr();
    let style = console::Style::new().green().bold();
    let _ = writeln!(term, "{:>12} {}", style.apply_to(status), message);
}

/// Same as [`print_status`] in yellow.
pub fn print_warning(status: &str, message: &str) {
    let mut term = console::Term::stderr();
    let style = console::Style::new().yellow().bold();
    let _ = writeln!(term, "{:>12} {}", style.apply_to(status), message);
}

/// Observer driving a progress bar, cancellable from Ctrl-C.
pub struct SyncProgress {
    bar: ProgressBar,
    cancel: CancelFlag,
    start: Instant,
}

impl SyncProgress {
    /// Bar over `total` downloads. Installs the Ctrl-C handler.
    pub fn new(total: usize) -> Result<Self, CliError> {
        let cancel = CancelFlag::new();
        let handler_flag = cancel.clone();
        ctrlc::set_handler(move || handler_flag.cancel())
            .map_err(|e| CliError::Config(format!("Failed to set signal handler: {}", e)))?;

        let bar = ProgressBar::new(total as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} {msg:>12} [{bar:25.cyan/dim}] {pos}/{len} {prefix:.dim}")
        {
            bar.set_style(style.progress_chars("=> "));
        }
        bar.set_message("Syncing");
        bar.enable_steady_tick(Duration::from_millis(100));

        Ok(Self {
            bar,
            cancel,
            start: Instant::now(),
        })
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl SyncObserver for SyncProgress {
    fn on_progress(&self, event: &ProgressEvent) {
        match event.phase {
            ProgressPhase::Downloading => {
                self.bar.set_length(event.total as u64);
                self.bar.set_position(event.index.saturating_sub(1) as u64);
                self.bar.set_prefix(event.path.clone());
            }
            ProgressPhase::Downloaded => self.bar.set_position(event.index as u64),
        }
    }

    fn should_cancel(&self) -> bool {
        let cancelled = self.cancel.is_cancelled();
        if cancelled {
            self.bar.set_message("Cancelling");
        }
        cancelled
    }
}

/// Human-readable duration for summaries.
pub fn format_elapsed(elapsed: Duration) -> String {
    if elapsed.as_secs() >= 1 {
        format!("{:.2}s", elapsed.as_secs_f64())
    } else {
        format!("{}ms", elapsed.as_millis())
    }
}
