//! archsync CLI - keep a local archive in step with its published manifest.

mod commands;
mod error;
mod progress;

use std::path::PathBuf;
use std::process::ExitCode;

use archsync::config::ConfigFile;
use archsync::logging::{init_logging, LoggingConfig, LoggingGuard};
use clap::{Parser, Subcommand};

use commands::common::RemoteArgs;
use commands::config::ConfigCommands;
use commands::manifest::ManifestCommands;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "archsync", version, about, long_about = None)]
struct Cli {
    /// Log debug output (also mirrored to stderr)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Fetch the manifest and report pending changes
    Check {
        #[command(flatten)]
        remote: RemoteArgs,
    },

    /// Download pending files and apply deletions
    Sync {
        #[command(flatten)]
        remote: RemoteArgs,

        /// Remove local files the manifest marks as deleted
        #[arg(long)]
        remove_deleted: bool,

        /// Per-download timeout in seconds (overrides sync.download_timeout)
        #[arg(long)]
        download_timeout: Option<u64>,

        /// Extra path or file name whose checksum mismatch is tolerated
        #[arg(long = "allow-mismatch", value_name = "PATH")]
        allow_mismatch: Vec<String>,
    },

    /// Show the persisted sync state of an archive
    Status {
        /// Local archive directory (overrides archive.root)
        #[arg(long)]
        root: Option<PathBuf>,
    },

    /// Publisher tools for building manifests
    #[command(subcommand)]
    Manifest(ManifestCommands),

    /// View or change configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let _logging = setup_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", console::style("Error:").red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Check { remote } => commands::check::run(&remote),
        Commands::Sync {
            remote,
            remove_deleted,
            download_timeout,
            allow_mismatch,
        } => commands::sync::run(commands::sync::SyncArgs {
            remote,
            remove_deleted,
            download_timeout,
            allow_mismatch,
        }),
        Commands::Status { root } => commands::status::run(root),
        Commands::Manifest(command) => commands::manifest::run(command),
        Commands::Config(command) => commands::config::run(command),
    }
}

fn setup_logging(verbose: bool) -> Option<LoggingGuard> {
    let config = ConfigFile::load().unwrap_or_default();
    let logging = LoggingConfig::new(config.logging.directory)
        .with_verbose(verbose)
        .with_stderr(verbose);

    match init_logging(logging) {
        Ok(guard) => {
            tracing::debug!(
                version = archsync::VERSION,
                log_file = %guard.log_file().display(),
                "archsync starting"
            );
            Some(guard)
        }
        Err(e) => {
            eprintln!("{} {}", console::style("Warning:").yellow().bold(), e);
            None
        }
    }
}
