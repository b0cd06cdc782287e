//! Core types for binary provisioning.
//!
//! Tool identifiers, host platform detection, and the descriptor that pins
//! down where a tool is downloaded from and where it is installed.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use url::Url;

use crate::error::{Error, FetchError, Result};

use super::catalog::{self, DownloadSource};

// ============================================================================
// Tool Identifiers
// ============================================================================

/// The external binaries this crate knows how to provision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolId {
    /// The media transcoder.
    Ffmpeg,
    /// The companion media probe.
    Ffprobe,
}

impl ToolId {
    /// Returns all known tool IDs.
    pub fn all() -> &'static [ToolId] {
        &[Self::Ffmpeg, Self::Ffprobe]
    }

    /// Returns the logical tool name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ffmpeg => "ffmpeg",
            Self::Ffprobe => "ffprobe",
        }
    }

    /// Flag injected so re-runs against an existing output do not block on
    /// an interactive overwrite prompt.
    pub fn overwrite_flag(&self) -> Option<&'static str> {
        match self {
            Self::Ffmpeg => Some("-y"),
            Self::Ffprobe => None,
        }
    }

    /// Flags that already settle the overwrite question when passed by the caller.
    pub fn overwrite_flags(&self) -> &'static [&'static str] {
        match self {
            Self::Ffmpeg => &["-y", "-n"],
            Self::Ffprobe => &[],
        }
    }
}

impl fmt::Display for ToolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ToolId {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ffmpeg" => Ok(Self::Ffmpeg),
            "ffprobe" => Ok(Self::Ffprobe),
            _ => Err(Error::UnknownTool(s.to_string())),
        }
    }
}

// ============================================================================
// Platform Detection
// ============================================================================

/// Normalized host platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Linux,
    Darwin,
    Windows,
}

impl Platform {
    /// Detects the current platform.
    ///
    /// Returns `None` if the host OS has no prebuilt binaries.
    pub fn current() -> Option<Self> {
        Self::from_os(std::env::consts::OS)
    }

    /// Maps an OS name as reported by `std::env::consts::OS`.
    pub fn from_os(os: &str) -> Option<Self> {
        match os {
            "linux" => Some(Self::Linux),
            "macos" => Some(Self::Darwin),
            "windows" => Some(Self::Windows),
            _ => None,
        }
    }

    /// Returns the normalized platform key.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::Darwin => "darwin",
            Self::Windows => "windows",
        }
    }

    /// Whether downloaded files need their execute bits set.
    pub fn needs_exec_bit(&self) -> bool {
        !matches!(self, Self::Windows)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Binary Descriptor
// ============================================================================

/// Where a tool comes from and where it lands once installed.
///
/// Both `install_path` and `source_url` are derived only from the tool, the
/// platform, and the configured source, so two descriptors for the same
/// inputs always agree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryDescriptor {
    pub tool: ToolId,
    pub platform: Platform,
    pub install_path: PathBuf,
    pub source_url: Url,
}

impl BinaryDescriptor {
    pub fn new(
        tool: ToolId,
        platform: Platform,
        install_dir: &std::path::Path,
        source: &DownloadSource,
    ) -> Result<Self> {
        let entry = catalog::entry(platform);
        let install_path = install_dir.join(format!("{}{}", tool.as_str(), entry.exe_suffix));

        let remote_name = format!(
            "{}-{}-{}{}",
            tool.as_str(),
            entry.build,
            source.version_tag,
            entry.exe_suffix
        );
        let source_url = join_url(&source.base_url, &remote_name)?;

        Ok(Self {
            tool,
            platform,
            install_path,
            source_url,
        })
    }
}

fn join_url(base: &str, name: &str) -> Result<Url> {
    let invalid = |reason: String| FetchError::InvalidUrl {
        url: base.to_string(),
        reason,
    };

    // Url::join replaces the last segment unless the base ends with a slash.
    let base = if base.ends_with('/') {
        base.to_string()
    } else {
        format!("{}/", base)
    };

    let url = Url::parse(&base).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme {}", url.scheme())).into());
    }

    url.join(name)
        .map_err(|e| invalid(e.to_string()).into())
}
