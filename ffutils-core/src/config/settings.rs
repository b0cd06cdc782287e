//! Settings for ffutils.
//!
//! Settings are persisted as JSON in the user config directory:
//! `{config}/ffutils/settings.json`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::binaries::{default_install_dir, DownloadSource, DEFAULT_BASE_URL, DEFAULT_VERSION_TAG};

/// Returns the default settings file path.
pub fn default_settings_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("ffutils")
        .join("settings.json")
}

// =============================================================================
// Settings
// =============================================================================

/// Provisioning settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Private install directory. `None` uses the per-user data directory.
    #[serde(default)]
    pub install_dir: Option<PathBuf>,

    /// Base URL the prebuilt binaries are downloaded from.
    #[serde(default = "default_base_url")]
    pub download_base_url: String,

    /// Build version tag embedded in remote file names.
    #[serde(default = "default_version_tag")]
    pub version_tag: String,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_version_tag() -> String {
    DEFAULT_VERSION_TAG.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            install_dir: None,
            download_base_url: default_base_url(),
            version_tag: default_version_tag(),
        }
    }
}

impl Settings {
    /// Load settings from the default path.
    pub fn load() -> Self {
        Self::load_from(&default_settings_path())
    }

    /// Load settings from a file, using defaults for anything missing.
    ///
    /// If the file doesn't exist or can't be parsed, returns defaults.
    pub fn load_from(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "No settings file, using defaults");
                return Self::default();
            }
        };

        match serde_json::from_str::<Settings>(&content) {
            Ok(mut loaded) => {
                loaded.validate();
                loaded
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to parse settings, using defaults");
                Self::default()
            }
        }
    }

    /// Save settings to a file, creating parent directories.
    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
    }

    /// Restore blank fields to their defaults.
    pub fn validate(&mut self) {
        self.download_base_url = self.download_base_url.trim().to_string();
        if self.download_base_url.is_empty() {
            self.download_base_url = default_base_url();
        }

        self.version_tag = self.version_tag.trim().to_string();
        if self.version_tag.is_empty() {
            self.version_tag = default_version_tag();
        }

        if matches!(&self.install_dir, Some(dir) if dir.as_os_str().is_empty()) {
            self.install_dir = None;
        }
    }

    /// Effective install directory.
    pub fn install_dir(&self) -> PathBuf {
        self.install_dir.clone().unwrap_or_else(default_install_dir)
    }

    /// Download source derived from these settings.
    pub fn download_source(&self) -> DownloadSource {
        DownloadSource {
            base_url: self.download_base_url.clone(),
            version_tag: self.version_tag.clone(),
        }
    }
}
