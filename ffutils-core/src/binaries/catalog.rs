//! Static per-platform build table.
//!
//! Every supported platform has exactly one row. The host is checked against
//! the table once, up front, so an unsupported OS fails before any lookup or
//! download is attempted.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

use super::types::Platform;

/// Default location of the prebuilt binaries.
pub const DEFAULT_BASE_URL: &str = "https://github.com/imageio/imageio-binaries/raw/master/ffmpeg/";

/// Default build version tag.
pub const DEFAULT_VERSION_TAG: &str = "v4.1";

// ============================================================================
// Platform Table
// ============================================================================

/// Build naming for one platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformEntry {
    pub platform: Platform,
    /// Build identifier embedded in the remote file name.
    pub build: &'static str,
    /// Executable suffix, both remote and installed.
    pub exe_suffix: &'static str,
}

const LINUX: PlatformEntry = PlatformEntry {
    platform: Platform::Linux,
    build: "linux64",
    exe_suffix: "",
};

const DARWIN: PlatformEntry = PlatformEntry {
    platform: Platform::Darwin,
    build: "osx64",
    exe_suffix: "",
};

const WINDOWS: PlatformEntry = PlatformEntry {
    platform: Platform::Windows,
    build: "win64",
    exe_suffix: ".exe",
};

/// All rows, in no particular order.
pub const PLATFORM_TABLE: &[PlatformEntry] = &[LINUX, DARWIN, WINDOWS];

/// Returns the table row for a platform.
pub fn entry(platform: Platform) -> &'static PlatformEntry {
    match platform {
        Platform::Linux => &LINUX,
        Platform::Darwin => &DARWIN,
        Platform::Windows => &WINDOWS,
    }
}

/// Returns the table row for the host, failing if the host is unsupported.
pub fn host_entry() -> Result<&'static PlatformEntry> {
    let platform = Platform::current()
        .ok_or_else(|| Error::UnsupportedPlatform(std::env::consts::OS.to_string()))?;
    Ok(entry(platform))
}

// ============================================================================
// Download Source
// ============================================================================

/// Where builds are fetched from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadSource {
    pub base_url: String,
    pub version_tag: String,
}

impl Default for DownloadSource {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            version_tag: DEFAULT_VERSION_TAG.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_covers_every_platform() {
        for platform in [Platform::Linux, Platform::Darwin, Platform::Windows] {
            let rows = PLATFORM_TABLE
                .iter()
                .filter(|e| e.platform == platform)
                .count();
            assert_eq!(rows, 1, "expected one row for {}", platform);
            assert_eq!(entry(platform).platform, platform);
        }
    }

    #[test]
    fn test_entry_values() {
        assert_eq!(entry(Platform::Linux).build, "linux64");
        assert_eq!(entry(Platform::Darwin).build, "osx64");
        assert_eq!(entry(Platform::Windows).exe_suffix, ".exe");
        assert_eq!(entry(Platform::Linux).exe_suffix, "");
    }

    #[test]
    fn test_host_entry() {
        #[cfg(any(target_os = "linux", target_os = "macos", target_os = "windows"))]
        assert!(host_entry().is_ok());
    }
}
