//! Terminal rendering of progress updates.

use std::io::Write;
use std::sync::Mutex;

use ffutils_core::{OutputSink, Progress, ProgressSink};

/// Redraws a single status line on stderr.
#[derive(Debug, Default)]
pub struct TerminalProgress {
    /// Width of the last line drawn, so shorter lines can blank it out.
    drawn: Mutex<Option<usize>>,
}

impl TerminalProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ends the status line, if one was drawn.
    pub fn finish(&self) {
        let mut drawn = match self.drawn.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if drawn.take().is_some() {
            let _ = writeln!(std::io::stderr());
        }
    }
}

impl ProgressSink for TerminalProgress {
    fn update(&self, progress: &Progress) {
        let line = format_progress(progress);
        let mut drawn = match self.drawn.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let pad = drawn.map_or(0, |width| width.saturating_sub(line.len()));

        let mut stderr = std::io::stderr().lock();
        let _ = write!(stderr, "\r{}{}", line, " ".repeat(pad));
        let _ = stderr.flush();
        *drawn = Some(line.len());
    }
}

/// Formats `label: current/total (pct%)`, or `label: current` when the
/// total is unknown.
pub fn format_progress(progress: &Progress) -> String {
    match (progress.total, progress.percent()) {
        (Some(total), Some(pct)) => format!(
            "{}: {}/{} ({:.0}%)",
            progress.label, progress.current, total, pct
        ),
        _ => format!("{}: {}", progress.label, progress.current),
    }
}

/// Writes a failed run's output to stderr verbatim.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrOutput;

impl OutputSink for StderrOutput {
    fn diagnostics(&self, text: &str) {
        let mut stderr = std::io::stderr().lock();
        let _ = writeln!(stderr, "{}", text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_known_total() {
        let progress = Progress::new("encode", 45, Some(90), 15);
        assert_eq!(format_progress(&progress), "encode: 45/90 (50%)");
    }

    #[test]
    fn test_format_unknown_total() {
        let progress = Progress::new("ffmpeg", 1024, None, 1024);
        assert_eq!(format_progress(&progress), "ffmpeg: 1024");
    }

    #[test]
    fn test_format_zero_total() {
        let progress = Progress::new("ffmpeg", 0, Some(0), 0);
        assert_eq!(format_progress(&progress), "ffmpeg: 0");
    }

    #[test]
    fn test_finish_without_updates_is_quiet() {
        let renderer = TerminalProgress::new();
        renderer.finish();
        assert!(renderer.drawn.lock().unwrap().is_none());
    }
}
