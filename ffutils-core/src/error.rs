//! Error types for ffutils-core.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using the crate [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

// =============================================================================
// Fetch Errors
// =============================================================================

/// Errors raised while streaming a remote binary to disk.
///
/// None of these leave a file at the destination path.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Invalid download URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Failed to start download from {url}: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Download from {url} failed with status {status}")]
    Status { url: String, status: u16 },

    #[error("Failed to read response body from {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FetchError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

// =============================================================================
// Process Failure
// =============================================================================

/// A wrapped tool exited unsuccessfully.
///
/// Carries the full argument vector and everything the tool printed, so the
/// caller can surface the tool's own diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessFailure {
    /// Argument vector, program first.
    pub args: Vec<String>,
    /// Exit code, or `None` if the process was terminated by a signal.
    pub status: Option<i32>,
    /// Captured output lines joined with newlines.
    pub output: String,
}

impl fmt::Display for ProcessFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Error running command.")?;
        writeln!(f, "Command: {:?}", self.args)?;
        match self.status {
            Some(code) => writeln!(f, "Return code: {}", code)?,
            None => writeln!(f, "Return code: terminated by signal")?,
        }
        write!(f, "Output: {}", self.output)
    }
}

impl std::error::Error for ProcessFailure {}

// =============================================================================
// Crate Error
// =============================================================================

/// Errors surfaced by resolving and running external binaries.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Failed to install {}: {source}", path.display())]
    Install {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid invocation: {0}")]
    InvalidInvocation(String),

    #[error("Failed to start {}: {source}", program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    ProcessFailed(ProcessFailure),
}

impl Error {
    pub(crate) fn install(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Install {
            path: path.into(),
            source,
        }
    }

    /// Returns the process failure if this error wraps one.
    pub fn as_process_failure(&self) -> Option<&ProcessFailure> {
        match self {
            Self::ProcessFailed(failure) => Some(failure),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_failure_display_contains_output() {
        let failure = ProcessFailure {
            args: vec!["ffmpeg".to_string(), "-i".to_string(), "in.mkv".to_string()],
            status: Some(1),
            output: "Error: invalid codec".to_string(),
        };

        let text = failure.to_string();
        assert!(text.contains("Return code: 1"));
        assert!(text.contains("Error: invalid codec"));
        assert!(text.contains("in.mkv"));
    }

    #[test]
    fn test_process_failure_signal() {
        let failure = ProcessFailure {
            args: vec!["ffmpeg".to_string()],
            status: None,
            output: String::new(),
        };
        assert!(failure.to_string().contains("terminated by signal"));
    }

    #[test]
    fn test_as_process_failure() {
        let err = Error::ProcessFailed(ProcessFailure {
            args: vec![],
            status: Some(2),
            output: String::new(),
        });
        assert_eq!(err.as_process_failure().map(|f| f.status), Some(Some(2)));
        assert!(Error::UnknownTool("x".into()).as_process_failure().is_none());
    }

    #[test]
    fn test_fetch_status_message() {
        let err: Error = FetchError::Status {
            url: "https://example.com/ffmpeg".to_string(),
            status: 404,
        }
        .into();
        assert!(err.to_string().contains("404"));
    }
}
