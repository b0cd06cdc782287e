//! Provisioning of external binaries.
//!
//! Finds `ffmpeg`/`ffprobe` on the search path, or downloads a prebuilt
//! binary for the host platform into a private install directory.
//!
//! # Architecture
//!
//! - `types`: Core types (ToolId, Platform, BinaryDescriptor)
//! - `catalog`: Per-platform build table and download source defaults
//! - `paths`: Private install directory layout
//! - `env`: Process-wide search path with the install dir prepended
//! - `downloader`: Streaming download to a temp file, then atomic rename
//! - `resolver`: High-level "find or install" API
//!
//! # Example
//!
//! ```ignore
//! use ffutils_core::binaries::{Resolver, ToolId};
//! use ffutils_core::{NoProgress, Settings};
//!
//! let resolver = Resolver::from_settings(&Settings::load())?;
//! let ffmpeg = resolver.resolve(ToolId::Ffmpeg, &NoProgress).await?;
//! println!("ffmpeg at {}", ffmpeg.display());
//! ```

pub mod catalog;
pub mod downloader;
pub mod env;
pub mod paths;
pub mod resolver;
pub mod types;

pub use catalog::{DownloadSource, PlatformEntry, DEFAULT_BASE_URL, DEFAULT_VERSION_TAG};
pub use downloader::{fetch, write_stream};
pub use env::{init_search_path, search_path, SearchPath};
pub use paths::{absolute_path, default_install_dir, ensure_dir, executable_name};
pub use resolver::{make_executable, Resolver};
pub use types::{BinaryDescriptor, Platform, ToolId};
