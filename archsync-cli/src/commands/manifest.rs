//! Publisher-side manifest commands.

use std::path::{Path, PathBuf};

use archsync::manifest::{
    build_manifest, load_manifest_file, merge_deleted, write_manifest, BuildOptions,
};
use clap::Subcommand;

use crate::error::CliError;
use crate::progress::print_status;

/// Default manifest file name written next to the published tree.
const DEFAULT_MANIFEST_NAME: &str = "manifest.json";

/// Manifest subcommands.
#[derive(Debug, Subcommand)]
pub enum ManifestCommands {
    /// Build a manifest describing a published directory tree
    Build {
        /// Directory to scan
        root: PathBuf,

        /// Public URL the directory is served under
        #[arg(long)]
        base_url: String,

        /// Output file [default: <ROOT>/manifest.json]
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Additional file extension to include (repeatable)
        #[arg(long = "include-ext", value_name = "EXT")]
        include_ext: Vec<String>,

        /// Additional directory name to skip (repeatable)
        #[arg(long = "skip-dir", value_name = "NAME")]
        skip_dir: Vec<String>,

        /// Advertised application version
        #[arg(long)]
        app_latest_version: Option<String>,

        /// Download page for the advertised application version
        #[arg(long, requires = "app_latest_version")]
        app_download_url: Option<String>,
    },

    /// Carry removed paths from an old manifest into a new one
    MergeDeleted {
        /// Previously published manifest
        #[arg(long)]
        old: PathBuf,

        /// Freshly built manifest
        #[arg(long)]
        new: PathBuf,

        /// Output file [default: overwrite --new]
        #[arg(long)]
        out: Option<PathBuf>,

        /// Replace the new manifest's deleted list instead of extending it
        #[arg(long)]
        replace: bool,
    },
}

/// Run a manifest subcommand.
pub fn run(command: ManifestCommands) -> Result<(), CliError> {
    match command {
        ManifestCommands::Build {
            root,
            base_url,
            output,
            include_ext,
            skip_dir,
            app_latest_version,
            app_download_url,
        } => {
            let mut options = BuildOptions::new(base_url);
            for ext in &include_ext {
                options = options.with_extension(ext);
            }
            for dir in skip_dir {
                options = options.with_skip_dir(dir);
            }
            if let Some(version) = app_latest_version {
                options = options.with_app(&version, app_download_url.as_deref().unwrap_or(""));
            }
            let output = output.unwrap_or_else(|| root.join(DEFAULT_MANIFEST_NAME));
            run_build(&root, &options, &output)
        }
        ManifestCommands::MergeDeleted {
            old,
            new,
            out,
            replace,
        } => {
            let out = out.unwrap_or_else(|| new.clone());
            run_merge_deleted(&old, &new, &out, !replace)
        }
    }
}

fn run_build(root: &Path, options: &BuildOptions, output: &Path) -> Result<(), CliError> {
    if !root.is_dir() {
        return Err(CliError::Config(format!(
            "'{}' is not a directory",
            root.display()
        )));
    }

    print_status("Scanning", &root.display().to_string());
    let manifest = build_manifest(root, options)?;
    write_manifest(&manifest, output)?;

    print_status(
        "Wrote",
        &format!(
            "{} ({} files, version {})",
            output.display(),
            manifest.files.len(),
            manifest.version
        ),
    );
    Ok(())
}

fn run_merge_deleted(
    old: &Path,
    new: &Path,
    out: &Path,
    keep_existing: bool,
) -> Result<(), CliError> {
    let old_manifest = load_manifest_file(old)?;
    let mut new_manifest = load_manifest_file(new)?;

    new_manifest.deleted = merge_deleted(&old_manifest, &new_manifest, keep_existing);
    write_manifest(&new_manifest, out)?;

    print_status(
        "Merged",
        &format!(
            "{} deleted path(s) into {}",
            new_manifest.deleted.len(),
            out.display()
        ),
    );
    Ok(())
}
