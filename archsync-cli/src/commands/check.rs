//! `archsync check`: fetch the manifest and report what a sync would do.

use archsync::config::ConfigFile;
use archsync::{count_pending_miniatures, PendingChangeSet, PendingFilter, SyncEngine, UpdateCheck};

use super::common::{format_size, print_app_update, RemoteArgs, RemoteSettings};
use crate::error::CliError;
use crate::progress::print_status;

/// Outcome of the check step shared with `sync`.
pub struct CheckOutcome {
    pub engine: SyncEngine,
    pub check: UpdateCheck,
    /// Pending changes after the host download policy.
    pub pending: PendingChangeSet,
}

/// Fetch, diff and filter.
pub fn fetch(settings: &RemoteSettings) -> Result<CheckOutcome, CliError> {
    let engine = SyncEngine::new(&settings.root)?;

    print_status("Checking", &settings.manifest_url);
    let check = engine.check_for_updates(&settings.manifest_url, settings.request_timeout)?;
    let pending = settings.filter.filter(check.pending.clone());

    tracing::info!(
        version = %check.manifest.version,
        files = check.manifest.files.len(),
        pending_downloads = pending.download_count(),
        pending_deletes = pending.delete_count(),
        "Update check complete"
    );

    Ok(CheckOutcome {
        engine,
        check,
        pending,
    })
}

/// Run the check command.
pub fn run(args: &RemoteArgs) -> Result<(), CliError> {
    let config = ConfigFile::load().unwrap_or_default();
    let settings = args.resolve(&config)?;
    let outcome = fetch(&settings)?;

    print_report(&outcome, config.sync.remove_deleted);
    print_app_update(&outcome.check);
    Ok(())
}

fn print_report(outcome: &CheckOutcome, remove_deleted: bool) {
    let CheckOutcome { check, pending, .. } = outcome;

    println!();
    println!("Archive:          {}", outcome.engine.archive_root().display());
    println!("Manifest version: {}", check.manifest.version);
    println!("Files listed:     {}", check.manifest.files.len());
    println!();

    if outcome.engine.needs_bootstrap() {
        println!("Archive is not initialised yet. Run 'archsync sync' to download it.");
        println!();
    }

    if pending.is_empty() {
        if check.is_synced() {
            println!("Archive is up to date.");
        } else {
            println!("All files present. Run 'archsync sync' to record this version.");
        }
        return;
    }

    match update_summary(pending, remove_deleted) {
        Some(summary) => println!("{}", summary),
        None => println!("Up to date (only deletions pending)."),
    }
    println!();

    let skipped = check.pending.download_count() - pending.download_count();
    println!(
        "To download:      {} ({} known)",
        pending.download_count(),
        format_size(pending.known_download_bytes())
    );
    if skipped > 0 {
        println!("Skipped:          {} (not wanted by download policy)", skipped);
    }
    println!("To delete:        {}", pending.delete_count());

    if pending.delete_count() > 0 && !remove_deleted {
        println!();
        println!("Deletions are only applied with 'archsync sync --remove-deleted'.");
    }
}

/// One-line description of a pending update, or `None` when a sync would
/// change nothing under the removal policy.
fn update_summary(pending: &PendingChangeSet, remove_deleted: bool) -> Option<String> {
    if !pending.has_work(remove_deleted) {
        return None;
    }

    let miniatures = count_pending_miniatures(&pending.to_download);
    let mut summary = if miniatures > 0 {
        format!("Update available: {} miniatures", miniatures)
    } else {
        "Update available: metadata refresh".to_string()
    };
    if remove_deleted && pending.delete_count() > 0 {
        summary.push_str(&format!(", {} removals", pending.delete_count()));
    }
    Some(summary)
}
