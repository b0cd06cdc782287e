//! Progress reporting shared by downloads and tool runs.
//!
//! Both the downloader (bytes) and the process runner (elapsed seconds) report
//! through the same [`ProgressSink`], so a caller can render either with one
//! progress bar implementation.

// ============================================================================
// Progress
// ============================================================================

/// A single progress update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    /// Human-readable label for what is progressing.
    pub label: String,
    /// Cumulative amount completed so far.
    pub current: u64,
    /// Total amount expected, or `None` while it is unknown.
    pub total: Option<u64>,
    /// Amount completed since the previous update.
    pub advanced: u64,
}

impl Progress {
    pub fn new(label: impl Into<String>, current: u64, total: Option<u64>, advanced: u64) -> Self {
        Self {
            label: label.into(),
            current,
            total,
            advanced,
        }
    }

    /// Completed fraction in `0.0..=1.0`, or `None` if the total is unknown or zero.
    pub fn fraction(&self) -> Option<f64> {
        match self.total {
            Some(total) if total > 0 => Some((self.current as f64 / total as f64).min(1.0)),
            _ => None,
        }
    }

    /// Progress percentage (0.0 to 100.0), or `None` if the total is unknown.
    pub fn percent(&self) -> Option<f64> {
        self.fraction().map(|f| f * 100.0)
    }
}

// ============================================================================
// Sinks
// ============================================================================

/// Receives progress updates.
///
/// Called once per chunk or output line, so implementations must be cheap
/// and must not block.
pub trait ProgressSink: Send + Sync {
    fn update(&self, progress: &Progress);
}

impl<F> ProgressSink for F
where
    F: Fn(&Progress) + Send + Sync,
{
    fn update(&self, progress: &Progress) {
        self(progress)
    }
}

/// Discards all progress updates.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn update(&self, _progress: &Progress) {}
}

/// Receives a failed run's captured output.
pub trait OutputSink: Send + Sync {
    fn diagnostics(&self, text: &str);
}

impl<F> OutputSink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn diagnostics(&self, text: &str) {
        self(text)
    }
}

/// Discards captured output.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardOutput;

impl OutputSink for DiscardOutput {
    fn diagnostics(&self, _text: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_progress_fraction() {
        let progress = Progress::new("x", 45, Some(90), 45);
        assert_eq!(progress.fraction(), Some(0.5));
        assert_eq!(progress.percent(), Some(50.0));

        let unknown = Progress::new("x", 45, None, 45);
        assert_eq!(unknown.fraction(), None);

        let zero_total = Progress::new("x", 0, Some(0), 0);
        assert_eq!(zero_total.fraction(), None);
    }

    #[test]
    fn test_progress_fraction_clamped() {
        let overshoot = Progress::new("x", 120, Some(100), 20);
        assert_eq!(overshoot.fraction(), Some(1.0));
    }

    #[test]
    fn test_closure_sink() {
        let seen = Mutex::new(Vec::new());
        let sink = |p: &Progress| seen.lock().unwrap().push(p.current);

        sink.update(&Progress::new("a", 1, None, 1));
        sink.update(&Progress::new("a", 3, None, 2));

        assert_eq!(*seen.lock().unwrap(), vec![1, 3]);
    }

    #[test]
    fn test_closure_output_sink() {
        let seen = Mutex::new(String::new());
        let sink = |text: &str| seen.lock().unwrap().push_str(text);
        sink.diagnostics("boom");
        assert_eq!(*seen.lock().unwrap(), "boom");
    }
}
