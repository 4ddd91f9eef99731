//! `archsync sync`: check, then download and delete with progress.

use std::time::Duration;

use archsync::config::ConfigFile;
use archsync::{BootstrapError, SyncResult, TransferOptions};

use super::check::{fetch, CheckOutcome};
use super::common::{print_app_update, RemoteArgs};
use crate::error::CliError;
use crate::progress::{format_elapsed, print_status, print_warning, SyncProgress};

/// Arguments for the sync command.
#[derive(Debug)]
pub struct SyncArgs {
    pub remote: RemoteArgs,
    pub remove_deleted: bool,
    pub download_timeout: Option<u64>,
    pub allow_mismatch: Vec<String>,
}

impl SyncArgs {
    /// Transfer options from config, with CLI flags layered on top.
    fn transfer_options(&self, config: &ConfigFile) -> Result<TransferOptions, CliError> {
        let mut options = config
            .sync
            .transfer_options()
            .with_remove_deleted(self.remove_deleted || config.sync.remove_deleted);

        match self.download_timeout {
            Some(0) => {
                return Err(CliError::Config(
                    "--download-timeout must be at least 1 second".to_string(),
                ))
            }
            Some(secs) => options = options.with_timeout(Duration::from_secs(secs)),
            None => {}
        }

        for path in &self.allow_mismatch {
            options = options.allow_mismatch(path);
        }
        Ok(options)
    }
}

/// Run the sync command.
pub fn run(args: SyncArgs) -> Result<(), CliError> {
    let config = ConfigFile::load().unwrap_or_default();
    let settings = args.remote.resolve(&config)?;
    let options = args.transfer_options(&config)?;

    let CheckOutcome {
        engine,
        check,
        pending,
    } = fetch(&settings)?;

    if engine.needs_bootstrap() {
        print_status("Initialising", &engine.archive_root().display().to_string());
        let progress = SyncProgress::new(pending.download_count())?;
        let outcome = engine.bootstrap(
            &check.manifest,
            pending,
            config.sync.bootstrap_full_archive,
            &options,
            &progress,
        );
        progress.finish();

        return match outcome {
            Ok(result) => {
                print_result(&result, &format_elapsed(progress.elapsed()));
                print_app_update(&check);
                finish(&result)
            }
            Err(e) => {
                if let BootstrapError::CatalogueMissing { errors } = &e {
                    for error in errors.iter().take(4) {
                        print_warning("Failed", error);
                    }
                }
                Err(CliError::Bootstrap(e))
            }
        };
    }

    if !pending.has_work(options.remove_deleted) && check.is_synced() {
        print_status("Fresh", &format!("archive is at version {}", check.manifest.version));
        print_app_update(&check);
        return Ok(());
    }

    print_status(
        "Syncing",
        &format!(
            "{} download(s), {} deletion(s) to version {}",
            pending.download_count(),
            if options.remove_deleted {
                pending.delete_count()
            } else {
                0
            },
            check.manifest.version
        ),
    );

    let progress = SyncProgress::new(pending.download_count())?;
    let result = engine.sync_updates(&check.manifest, &pending, &options, &progress);
    progress.finish();

    print_result(&result, &format_elapsed(progress.elapsed()));
    print_app_update(&check);
    finish(&result)
}

fn finish(result: &SyncResult) -> Result<(), CliError> {
    if result.cancelled {
        Err(CliError::Cancelled)
    } else if !result.errors.is_empty() {
        Err(CliError::SyncFailed {
            errors: result.errors.len(),
        })
    } else {
        Ok(())
    }
}

fn print_result(result: &SyncResult, elapsed: &str) {
    for warning in &result.warnings {
        print_warning("Warning", warning);
    }
    for error in &result.errors {
        print_warning("Failed", error);
    }

    let summary = format!(
        "{} downloaded, {} removed, {} warning(s), {} error(s) in {}",
        result.downloaded,
        result.removed,
        result.warnings.len(),
        result.errors.len(),
        elapsed
    );

    if result.cancelled {
        print_warning("Cancelled", &summary);
    } else if result.errors.is_empty() {
        print_status("Finished", &summary);
    } else {
        print_warning("Finished", &summary);
    }
}
