//! Progress state derived from classified log lines.

use crate::progress::Progress;

use super::classifier::LineKind;

/// Lifecycle of a single tool run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    NotStarted,
    /// Running; `total_known` flips once a duration line has been seen.
    Running { total_known: bool },
    Succeeded,
    Failed,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// Tracks elapsed and total seconds for one run.
///
/// The first duration line wins. Positions only ever move forward: a line
/// reporting the same or an earlier time produces no update.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    label: String,
    total: Option<u64>,
    current: u64,
}

impl ProgressTracker {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            total: None,
            current: 0,
        }
    }

    /// Total duration in seconds, once known.
    pub fn total(&self) -> Option<u64> {
        self.total
    }

    /// Highest position seen so far, in seconds.
    pub fn current(&self) -> u64 {
        self.current
    }

    /// Applies a classified line, returning an update if progress advanced.
    pub fn observe(&mut self, kind: LineKind) -> Option<Progress> {
        match kind {
            LineKind::TotalDuration(secs) => {
                if self.total.is_none() {
                    self.total = Some(secs);
                }
                None
            }
            LineKind::CurrentPosition(secs) if secs > self.current => {
                let advanced = secs - self.current;
                self.current = secs;
                Some(Progress::new(
                    self.label.clone(),
                    self.current,
                    self.total,
                    advanced,
                ))
            }
            LineKind::CurrentPosition(_) | LineKind::Unrecognized => None,
        }
    }
}
