//! Application settings and paths.
//!
//! Settings live in `settings.json` under the XDG config directory
//! (`~/.config/portsweep` on Linux). A missing file means defaults.

use crate::error::{ConfigError, ConfigResult};
use crate::scanner::{ScanConfig, ScanMode, DEFAULT_CONCURRENCY, MAX_CONCURRENCY};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Application directory paths following the XDG Base Directory Specification.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Configuration directory (~/.config/portsweep)
    pub config_dir: PathBuf,
}

impl Paths {
    /// Locate the platform directories for this application.
    pub fn discover() -> ConfigResult<Self> {
        let project = ProjectDirs::from("com", "portsweep", "portsweep")
            .ok_or(ConfigError::DirectoryNotFound)?;

        Ok(Self {
            config_dir: project.config_dir().to_path_buf(),
        })
    }

    /// Get the path to the settings file.
    pub fn settings_file(&self) -> PathBuf {
        self.config_dir.join("settings.json")
    }
}

/// Application-wide scan defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Default worker pool size.
    pub default_concurrency: usize,
    /// Default per-port timeout in milliseconds.
    pub default_timeout_ms: u64,
    /// Grab banners from open ports.
    pub grab_banners: bool,
    /// Report closed ports.
    pub show_closed: bool,
    /// Default scan mode.
    pub default_mode: ScanMode,
    /// Probe starts per second, 0 for unlimited.
    pub rate_limit: u32,
    /// Where export files are written (current directory if unset).
    pub export_dir: Option<PathBuf>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            default_concurrency: DEFAULT_CONCURRENCY,
            default_timeout_ms: 500,
            grab_banners: true,
            show_closed: false,
            default_mode: ScanMode::Priority,
            rate_limit: 0,
            export_dir: None,
        }
    }
}

impl AppSettings {
    /// Load settings from the default location.
    pub fn load() -> ConfigResult<Self> {
        let paths = match Paths::discover() {
            Ok(paths) => paths,
            Err(e) => {
                debug!(error = %e, "no config directory, using default settings");
                return Ok(Self::default());
            }
        };

        let file = paths.settings_file();
        if !file.exists() {
            return Ok(Self::default());
        }

        Self::load_from(&file)
    }

    /// Load settings from a specific file.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let settings: Self = serde_json::from_str(&content)
            .map_err(|e| ConfigError::InvalidFormat(e.to_string()))?;
        settings.validate()?;
        debug!(path = %path.display(), "settings loaded");
        Ok(settings)
    }

    /// Reject values no scan could run with.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.default_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "default_timeout_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.default_concurrency == 0 || self.default_concurrency > MAX_CONCURRENCY {
            return Err(ConfigError::InvalidValue {
                field: "default_concurrency",
                reason: format!("must be between 1 and {}", MAX_CONCURRENCY),
            });
        }
        Ok(())
    }

    /// A scan configuration seeded from these settings.
    pub fn scan_config(&self) -> ScanConfig {
        ScanConfig::default()
            .with_concurrency(self.default_concurrency)
            .with_timeout(Duration::from_millis(self.default_timeout_ms))
            .with_banners(self.grab_banners)
            .with_verbose(self.show_closed)
            .with_mode(self.default_mode)
            .with_rate_limit(self.rate_limit)
    }
}
