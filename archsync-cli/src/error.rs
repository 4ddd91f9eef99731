//! CLI error type.

use std::fmt;

use archsync::config::ConfigError;
use archsync::http::HttpError;
use archsync::manifest::BuildError;
use archsync::{BootstrapError, FetchError};

/// Errors reported by CLI commands.
#[derive(Debug)]
pub enum CliError {
    /// Missing or invalid configuration.
    Config(String),
    /// The update server could not be reached.
    Offline(FetchError),
    /// The update server answered with unusable data.
    Malformed(FetchError),
    /// The HTTP client could not be created.
    Http(HttpError),
    /// Manifest build or merge failed.
    Manifest(BuildError),
    /// First-run initialisation failed.
    Bootstrap(BootstrapError),
    /// A sync pass finished with errors.
    SyncFailed { errors: usize },
    /// A sync pass was interrupted.
    Cancelled,
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Offline(e) => write!(f, "Offline, try again later ({})", e),
            CliError::Malformed(e) => write!(f, "Update data problem: {}", e),
            CliError::Http(e) => write!(f, "{}", e),
            CliError::Manifest(e) => write!(f, "{}", e),
            CliError::Bootstrap(e) => write!(f, "Archive initialisation failed: {}", e),
            CliError::SyncFailed { errors } => {
                write!(f, "Sync finished with {} error(s)", errors)
            }
            CliError::Cancelled => write!(f, "Sync cancelled"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Offline(e) | CliError::Malformed(e) => Some(e),
            CliError::Http(e) => Some(e),
            CliError::Manifest(e) => Some(e),
            CliError::Bootstrap(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<FetchError> for CliError {
    fn from(e: FetchError) -> Self {
        if e.is_offline() {
            CliError::Offline(e)
        } else {
            CliError::Malformed(e)
        }
    }
}

impl From<HttpError> for CliError {
    fn from(e: HttpError) -> Self {
        CliError::Http(e)
    }
}

impl From<BuildError> for CliError {
    fn from(e: BuildError) -> Self {
        CliError::Manifest(e)
    }
}
