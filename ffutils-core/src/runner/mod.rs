//! Running ffmpeg-family tools with progress reporting.
//!
//! # Architecture
//!
//! - `classifier`: Maps log lines to durations and positions
//! - `tracker`: Turns classified lines into monotonic progress updates
//! - `process`: Spawns the tool, drains both output streams, reports failure

pub mod classifier;
pub mod process;
pub mod tracker;

pub use classifier::{LineClassifier, LineKind, RegexClassifier};
pub use process::{LineSplitter, ProcessRunner};
pub use tracker::{ProgressTracker, RunState};
