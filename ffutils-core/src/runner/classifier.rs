//! Classification of tool log lines.
//!
//! The wrapped tool only reports progress as human-readable text. Matching is
//! kept behind [`LineClassifier`] so the process lifecycle code never depends
//! on the log format.

use regex::Regex;

/// What a single output line says about progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// Total media duration, in whole seconds.
    TotalDuration(u64),
    /// Current encode position, in whole seconds.
    CurrentPosition(u64),
    Unrecognized,
}

/// Maps an output line to a [`LineKind`].
pub trait LineClassifier: Send + Sync {
    fn classify(&self, line: &str) -> LineKind;
}

/// Matches `Duration: HH:MM:SS.ff` and `time=HH:MM:SS.ff`.
///
/// Fractional seconds are dropped.
#[derive(Debug, Clone)]
pub struct RegexClassifier {
    duration: Regex,
    position: Regex,
}

impl RegexClassifier {
    pub fn new() -> Self {
        Self {
            duration: Regex::new(r"Duration: (\d{2}):(\d{2}):(\d{2})\.\d{2}")
                .expect("duration pattern is valid"),
            position: Regex::new(r"time=(\d{2}):(\d{2}):(\d{2})\.\d{2}")
                .expect("position pattern is valid"),
        }
    }
}

impl Default for RegexClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl LineClassifier for RegexClassifier {
    fn classify(&self, line: &str) -> LineKind {
        if let Some(secs) = capture_seconds(&self.duration, line) {
            LineKind::TotalDuration(secs)
        } else if let Some(secs) = capture_seconds(&self.position, line) {
            LineKind::CurrentPosition(secs)
        } else {
            LineKind::Unrecognized
        }
    }
}

fn capture_seconds(re: &Regex, line: &str) -> Option<u64> {
    let caps = re.captures(line)?;
    let field = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u64>().ok());
    Some(field(1)? * 3600 + field(2)? * 60 + field(3)?)
}
