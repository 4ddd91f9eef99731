//! `archsync status`: show the persisted sync state.

use std::path::PathBuf;

use archsync::config::ConfigFile;
use archsync::state::format_timestamp;
use archsync::{SyncState, SyncStateStore};

use super::common::resolve_root;
use crate::error::CliError;

/// Run the status command.
pub fn run(root: Option<PathBuf>) -> Result<(), CliError> {
    let config = ConfigFile::load().unwrap_or_default();
    let root = resolve_root(root, &config);
    let store = SyncStateStore::for_archive(&root);

    println!("Archive:    {}", root.display());
    println!("State file: {}", store.path().display());
    println!();

    if !store.path().exists() {
        println!("No sync has been recorded for this archive yet.");
        return Ok(());
    }

    for line in describe(&store.load()) {
        println!("{}", line);
    }
    Ok(())
}

fn describe(state: &SyncState) -> Vec<String> {
    let or_never = |ts: Option<String>| ts.unwrap_or_else(|| "never".to_string());

    vec![
        format!(
            "Last check:        {}",
            or_never(state.last_check.as_ref().map(format_timestamp))
        ),
        format!(
            "Last good sync:    {}",
            or_never(state.last_success_sync.as_ref().map(format_timestamp))
        ),
        format!(
            "Synced version:    {}",
            state.last_manifest_version.as_deref().unwrap_or("none")
        ),
        format!(
            "Last pass errors:  {}",
            state
                .last_error_count
                .map(|n| n.to_string())
                .unwrap_or_else(|| "-".to_string())
        ),
    ]
}
