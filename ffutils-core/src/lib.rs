//! ffutils Core Library
//!
//! This crate provisions and runs the `ffmpeg` family of command-line tools.
//! It includes:
//!
//! - Locating `ffmpeg`/`ffprobe` on the search path
//! - Downloading prebuilt binaries into a private install directory
//! - Running a tool while parsing its log into progress updates
//! - Settings persisted as JSON in the user config directory

pub mod binaries;
pub mod config;
pub mod error;
pub mod progress;
pub mod runner;

// Re-exports for convenience
pub use config::{default_settings_path, Settings};
pub use error::{Error, FetchError, ProcessFailure, Result};

// Re-export provisioning
pub use binaries::{Platform, Resolver, SearchPath, ToolId};

// Re-export progress types
pub use progress::{DiscardOutput, NoProgress, OutputSink, Progress, ProgressSink};

// Re-export the runner
pub use runner::{LineClassifier, LineKind, ProcessRunner, RegexClassifier};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
