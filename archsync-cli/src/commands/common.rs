//! Argument resolution shared by commands that talk to the update server.

use std::path::PathBuf;
use std::time::Duration;

use archsync::config::ConfigFile;
use archsync::filter::MediaFilter;
use archsync::UpdateCheck;

use crate::error::CliError;

/// Options shared by `check` and `sync`.
#[derive(Debug, Clone, clap::Args)]
pub struct RemoteArgs {
    /// Manifest URL (overrides archive.manifest_url)
    #[arg(long)]
    pub manifest_url: Option<String>,

    /// Local archive directory (overrides archive.root)
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Manifest request timeout in seconds (overrides sync.request_timeout)
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Also fetch full-resolution images
    #[arg(long)]
    pub fullres: bool,
}

/// Settings for one remote command after merging CLI args over config.
#[derive(Debug, Clone)]
pub struct RemoteSettings {
    pub root: PathBuf,
    pub manifest_url: String,
    pub request_timeout: Duration,
    pub filter: MediaFilter,
}

impl RemoteArgs {
    /// CLI takes precedence, then config.
    pub fn resolve(&self, config: &ConfigFile) -> Result<RemoteSettings, CliError> {
        let manifest_url = self
            .manifest_url
            .clone()
            .or_else(|| config.archive.manifest_url.clone())
            .ok_or_else(|| {
                CliError::Config(
                    "No manifest URL configured. \
                     Set archive.manifest_url with 'archsync config set' or use --manifest-url"
                        .to_string(),
                )
            })?;

        let request_timeout = match self.timeout {
            Some(0) => {
                return Err(CliError::Config(
                    "--timeout must be at least 1 second".to_string(),
                ))
            }
            Some(secs) => Duration::from_secs(secs),
            None => config.sync.request_timeout(),
        };

        Ok(RemoteSettings {
            root: resolve_root(self.root.clone(), config),
            manifest_url,
            request_timeout,
            filter: MediaFilter::new(self.fullres || config.sync.download_fullres_images),
        })
    }
}

/// Archive root from the CLI, falling back to config.
pub fn resolve_root(cli_root: Option<PathBuf>, config: &ConfigFile) -> PathBuf {
    cli_root.unwrap_or_else(|| config.archive.root.clone())
}

/// Print the application update notice, if any.
pub fn print_app_update(check: &UpdateCheck) {
    if let Some(app) = check.app_update(archsync::VERSION) {
        println!();
        println!(
            "A newer version is available: {} (you have {})",
            app.latest_version,
            archsync::VERSION
        );
        if let Some(url) = app.download_url() {
            println!("  Download: {}", url);
        }
    }
}

/// Format a byte count for display.
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> RemoteArgs {
        RemoteArgs {
            manifest_url: None,
            root: None,
            timeout: None,
            fullres: false,
        }
    }

    #[test]
    fn test_resolve_requires_manifest_url() {
        let config = ConfigFile::default();
        assert!(matches!(args().resolve(&config), Err(CliError::Config(_))));
    }

    #[test]
    fn test_cli_overrides_config() {
        let mut config = ConfigFile::default();
        config.archive.manifest_url = Some("https://config.test/manifest.json".to_string());
        config.sync.request_timeout_secs = 9;

        let from_config = args().resolve(&config).unwrap();
        assert_eq!(from_config.manifest_url, "https://config.test/manifest.json");
        assert_eq!(from_config.request_timeout, Duration::from_secs(9));
        assert_eq!(from_config.root, config.archive.root);

        let cli = RemoteArgs {
            manifest_url: Some("https://cli.test/manifest.json".to_string()),
            root: Some(PathBuf::from("/srv/archive")),
            timeout: Some(3),
            fullres: true,
        };
        let resolved = cli.resolve(&config).unwrap();
        assert_eq!(resolved.manifest_url, "https://cli.test/manifest.json");
        assert_eq!(resolved.root, PathBuf::from("/srv/archive"));
        assert_eq!(resolved.request_timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = ConfigFile::default();
        config.archive.manifest_url = Some("https://config.test/manifest.json".to_string());
        let cli = RemoteArgs {
            timeout: Some(0),
            ..args()
        };
        assert!(cli.resolve(&config).is_err());
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 bytes");
        assert_eq!(format_size(2048), "2.00 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.00 MB");
    }
}
