//! Executable search path with the private install directory prepended.
//!
//! The search path is computed once at startup and stored as process-wide
//! state. It is never written back into the process environment; instead it
//! is passed explicitly to lookups and applied to spawned child commands.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing::debug;

static SEARCH_PATH: OnceLock<SearchPath> = OnceLock::new();

/// An executable search path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPath {
    value: OsString,
}

impl SearchPath {
    /// Builds a search path with `install_dir` ahead of `existing`.
    pub fn with_install_dir(install_dir: &Path, existing: Option<&OsStr>) -> Self {
        let mut dirs: Vec<PathBuf> = vec![install_dir.to_path_buf()];
        if let Some(existing) = existing {
            dirs.extend(
                std::env::split_paths(existing).filter(|p| p.as_path() != install_dir),
            );
        }

        // join_paths only fails on entries containing the separator, which
        // split_paths never yields; fall back to the install dir alone.
        let value = std::env::join_paths(&dirs).unwrap_or_else(|_| install_dir.as_os_str().to_owned());

        Self { value }
    }

    /// Builds a search path from the host `PATH` with `install_dir` prepended.
    pub fn from_env(install_dir: &Path) -> Self {
        let existing = std::env::var_os("PATH");
        Self::with_install_dir(install_dir, existing.as_deref())
    }

    /// The raw `PATH`-style value.
    pub fn as_os_str(&self) -> &OsStr {
        &self.value
    }

    /// Directories in search order.
    pub fn dirs(&self) -> Vec<PathBuf> {
        std::env::split_paths(&self.value).collect()
    }

    /// Finds an executable by name, honoring the search order.
    ///
    /// The returned path is always absolute.
    pub fn find(&self, name: &str) -> Option<PathBuf> {
        let cwd = std::env::current_dir().ok()?;
        match which::which_in(name, Some(&self.value), &cwd) {
            Ok(path) => {
                // Relative search path entries yield relative hits.
                let path = if path.is_relative() { cwd.join(path) } else { path };
                debug!("Found {} at {}", name, path.display());
                Some(path)
            }
            Err(e) => {
                debug!("{} not found on search path: {}", name, e);
                None
            }
        }
    }

    /// Sets `PATH` on a child command so it sees the same search path.
    pub fn apply_to_command(&self, cmd: &mut tokio::process::Command) {
        cmd.env("PATH", &self.value);
    }
}

/// Initializes the process-wide search path with `install_dir` prepended.
///
/// The first call wins; later calls return the already initialized value.
pub fn init_search_path(install_dir: &Path) -> &'static SearchPath {
    SEARCH_PATH.get_or_init(|| {
        let search_path = SearchPath::from_env(install_dir);
        debug!(
            "Search path initialized with {} first",
            install_dir.display()
        );
        search_path
    })
}

/// Returns the process-wide search path, if initialized.
pub fn search_path() -> Option<&'static SearchPath> {
    SEARCH_PATH.get()
}
