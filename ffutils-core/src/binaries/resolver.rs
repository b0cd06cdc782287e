//! Resolver that finds a tool on the search path or installs it.
//!
//! The `Resolver` is the entry point for provisioning. It coordinates the
//! search path, the platform table, and the downloader.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::progress::ProgressSink;

use super::catalog::{self, DownloadSource};
use super::downloader;
use super::env::{self, SearchPath};
use super::paths;
use super::types::{BinaryDescriptor, Platform, ToolId};

// ============================================================================
// Resolver
// ============================================================================

/// Locates external binaries, downloading them into a private directory
/// when the search path has none.
///
/// Resolution is idempotent: once a tool is installed, later calls find it
/// on the search path and never touch the network.
#[derive(Debug, Clone)]
pub struct Resolver {
    install_dir: PathBuf,
    platform: Platform,
    source: DownloadSource,
    search_path: SearchPath,
    client: reqwest::Client,
}

impl Resolver {
    /// Creates a resolver from settings for the host platform.
    ///
    /// Initializes the process-wide search path on first use.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedPlatform`] if the host has no prebuilt binaries.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let platform = catalog::host_entry()?.platform;
        let install_dir = paths::absolute_path(&settings.install_dir());
        let search_path = env::init_search_path(&install_dir).clone();

        info!(
            "Resolver initialized. Install dir: {}, Platform: {}",
            install_dir.display(),
            platform
        );

        Ok(Self::new(install_dir, platform, settings.download_source())
            .with_search_path(search_path))
    }

    /// Creates a resolver with explicit parts.
    ///
    /// The search path defaults to the host `PATH` with `install_dir` first.
    /// A relative `install_dir` is anchored at the current directory.
    pub fn new(install_dir: PathBuf, platform: Platform, source: DownloadSource) -> Self {
        let install_dir = paths::absolute_path(&install_dir);
        let search_path = SearchPath::from_env(&install_dir);
        Self {
            install_dir,
            platform,
            source,
            search_path,
            client: reqwest::Client::new(),
        }
    }

    /// Replaces the search path used for lookups.
    pub fn with_search_path(mut self, search_path: SearchPath) -> Self {
        self.search_path = search_path;
        self
    }

    /// Returns the private install directory.
    pub fn install_dir(&self) -> &Path {
        &self.install_dir
    }

    /// Returns the target platform.
    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Returns the search path used for lookups.
    pub fn search_path(&self) -> &SearchPath {
        &self.search_path
    }

    /// Returns the download and install locations for a tool.
    pub fn descriptor(&self, tool: ToolId) -> Result<BinaryDescriptor> {
        BinaryDescriptor::new(tool, self.platform, &self.install_dir, &self.source)
    }

    /// Finds a tool on the search path without side effects.
    pub fn locate(&self, tool: ToolId) -> Option<PathBuf> {
        self.search_path.find(tool.as_str())
    }

    /// Returns the absolute path to `tool`, installing it first if it cannot
    /// be found.
    ///
    /// # Errors
    ///
    /// - [`Error::Fetch`] if the download fails; nothing is left at the install path.
    /// - [`Error::Install`] if the install directory cannot be created or the
    ///   downloaded file cannot be made executable.
    pub async fn resolve(&self, tool: ToolId, sink: &dyn ProgressSink) -> Result<PathBuf> {
        if let Some(path) = self.locate(tool) {
            debug!("{} already available at {}", tool, path.display());
            return Ok(path);
        }

        let descriptor = self.descriptor(tool)?;
        info!(
            "{} was not found! downloading from {}",
            tool, descriptor.source_url
        );

        paths::ensure_dir(&self.install_dir)?;

        downloader::fetch(
            &self.client,
            descriptor.source_url.as_str(),
            &descriptor.install_path,
            tool.as_str(),
            sink,
        )
        .await?;

        if self.platform.needs_exec_bit() {
            make_executable(&descriptor.install_path)?;
        }

        info!(
            "{} installed at {}",
            tool,
            descriptor.install_path.display()
        );
        Ok(descriptor.install_path)
    }

    /// Resolves several tools in order, stopping at the first failure.
    pub async fn resolve_all(
        &self,
        tools: &[ToolId],
        sink: &dyn ProgressSink,
    ) -> Result<Vec<PathBuf>> {
        let mut resolved = Vec::with_capacity(tools.len());
        for tool in tools {
            resolved.push(self.resolve(*tool, sink).await?);
        }
        Ok(resolved)
    }
}

// ============================================================================
// Permissions
// ============================================================================

/// Adds owner/group/other execute permission (0o755) to a file.
///
/// A no-op on platforms without Unix permission bits.
pub fn make_executable(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let metadata = std::fs::metadata(path).map_err(|e| Error::install(path, e))?;

        let mut permissions = metadata.permissions();
        let current_mode = permissions.mode();
        permissions.set_mode(current_mode | 0o755);

        std::fs::set_permissions(path, permissions).map_err(|e| Error::install(path, e))?;

        debug!("Set executable permission on {}", path.display());
    }

    #[cfg(not(unix))]
    let _ = path;

    Ok(())
}
