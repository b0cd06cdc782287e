//! Private install directory layout.
//!
//! Downloaded binaries live in a single per-user data directory:
//!
//! - Linux: `~/.local/share/ffutils/bin/`
//! - macOS: `~/Library/Application Support/ffutils/bin/`
//! - Windows: `C:\Users\<User>\AppData\Local\ffutils\bin\`
//!
//! If the OS reports no data directory, the OS temp folder is used instead.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};

use super::catalog;
use super::types::{Platform, ToolId};

/// Subdirectory name under the user data folder.
const APP_DIR: &str = "ffutils";

// ============================================================================
// Path Resolution
// ============================================================================

/// Returns the default private install directory.
///
/// Path: `{data_local}/ffutils/bin/`
pub fn default_install_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR)
        .join("bin")
}

/// Returns the installed file name for a tool on a platform.
///
/// - Linux/macOS: `ffmpeg`
/// - Windows: `ffmpeg.exe`
pub fn executable_name(tool: ToolId, platform: Platform) -> String {
    format!("{}{}", tool.as_str(), catalog::entry(platform).exe_suffix)
}

/// Anchors a relative path at the current directory.
///
/// Falls back to the path as given if the current directory is unavailable.
pub fn absolute_path(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Creates the install directory and its parents if missing.
///
/// # Errors
///
/// Returns [`Error::Install`] if the directory cannot be created.
pub fn ensure_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|e| Error::install(dir, e))?;
    debug!("Install directory ready at {}", dir.display());
    Ok(())
}
