//! First-run initialisation of an archive that has no local catalogue.
//!
//! Without `miniatures.db` a host has nothing to browse, so the first pass is
//! special: it never deletes, tolerates a catalogue checksum mismatch, and
//! can be narrowed to the catalogue alone. The pass only counts as done when
//! the catalogue exists afterwards.

use std::path::Path;

use thiserror::Error;

use crate::diff::PendingChangeSet;
use crate::engine::SyncEngine;
use crate::filter::{CatalogueOnly, PendingFilter, CATALOGUE_DB};
use crate::manifest::Manifest;
use crate::transfer::{SyncObserver, SyncResult, TransferOptions};

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("manifest lists no downloadable content, but the local catalogue is missing")]
    NothingToDownload,

    #[error("miniatures.db is not listed in the manifest")]
    CatalogueNotListed,

    #[error("initial download did not produce miniatures.db ({} error(s))", .errors.len())]
    CatalogueMissing { errors: Vec<String> },
}

/// Whether the catalogue database exists under `archive_root`.
pub fn catalogue_present(archive_root: &Path) -> bool {
    archive_root.join(CATALOGUE_DB).is_file()
}

/// Narrow an already filtered pending set for the first pass.
///
/// With `full_archive` every pending download is kept; otherwise only the
/// catalogue. Deletions are always dropped.
pub fn bootstrap_pending(
    pending: PendingChangeSet,
    full_archive: bool,
) -> Result<PendingChangeSet, BootstrapError> {
    if pending.is_empty() {
        return Err(BootstrapError::NothingToDownload);
    }

    let to_download = if full_archive {
        pending.to_download
    } else {
        let narrowed = CatalogueOnly.filter(pending).to_download;
        if narrowed.is_empty() {
            return Err(BootstrapError::CatalogueNotListed);
        }
        narrowed
    };

    Ok(PendingChangeSet {
        to_download,
        to_delete: Vec::new(),
    })
}

/// Options for the first pass, derived from the host's usual options.
pub fn bootstrap_options(options: &TransferOptions) -> TransferOptions {
    options
        .clone()
        .with_remove_deleted(false)
        .allow_mismatch(CATALOGUE_DB)
}

impl SyncEngine {
    /// Whether the archive still needs its first-run pass.
    pub fn needs_bootstrap(&self) -> bool {
        !catalogue_present(self.archive_root())
    }

    /// Run the first-run pass for `manifest`.
    ///
    /// `pending` should already carry the host's download policy. On success
    /// the returned result may still list per-item errors for files other
    /// than the catalogue.
    pub fn bootstrap(
        &self,
        manifest: &Manifest,
        pending: PendingChangeSet,
        full_archive: bool,
        options: &TransferOptions,
        observer: &dyn SyncObserver,
    ) -> Result<SyncResult, BootstrapError> {
        let pending = bootstrap_pending(pending, full_archive)?;
        let options = bootstrap_options(options);

        tracing::info!(
            downloads = pending.download_count(),
            full_archive,
            version = %manifest.version,
            "Initialising archive"
        );

        let result = self.sync_updates(manifest, &pending, &options, observer);

        if !catalogue_present(self.archive_root()) {
            tracing::warn!(errors = result.errors.len(), "Catalogue still missing after first pass");
            return Err(BootstrapError::CatalogueMissing {
                errors: result.errors,
            });
        }
        Ok(result)
    }
}
