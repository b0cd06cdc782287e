//! Running a tool while turning its log output into progress.
//!
//! Standard output and standard error are drained by two reader tasks that
//! feed a single channel, so the tool never blocks on a full pipe. The exit
//! status is awaited only after both streams reach end-of-file.
//!
//! The two pipes are read independently, so captured lines keep their order
//! within each stream but may interleave differently across streams than the
//! tool wrote them. ffmpeg writes its log and progress to stderr only.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::binaries::{SearchPath, ToolId};
use crate::error::{Error, ProcessFailure, Result};
use crate::progress::{OutputSink, ProgressSink};

use super::classifier::{LineClassifier, RegexClassifier};
use super::tracker::{ProgressTracker, RunState};

/// Read buffer size for the tool's output pipes.
const READ_CHUNK: usize = 8 * 1024;

// ============================================================================
// Process Runner
// ============================================================================

/// Runs one external tool and reports progress parsed from its log.
#[derive(Clone)]
pub struct ProcessRunner {
    tool_name: String,
    program: PathBuf,
    current_dir: Option<PathBuf>,
    label: Option<String>,
    overwrite_flag: Option<String>,
    overwrite_flags: Vec<String>,
    classifier: Arc<dyn LineClassifier>,
    search_path: Option<SearchPath>,
}

impl std::fmt::Debug for ProcessRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessRunner")
            .field("tool_name", &self.tool_name)
            .field("program", &self.program)
            .field("current_dir", &self.current_dir)
            .field("overwrite_flag", &self.overwrite_flag)
            .finish_non_exhaustive()
    }
}

impl ProcessRunner {
    /// Creates a runner for `program`, known to callers as `tool_name`.
    ///
    /// No overwrite flag is injected unless configured with
    /// [`overwrite_flag`](Self::overwrite_flag).
    pub fn new(tool_name: impl Into<String>, program: impl Into<PathBuf>) -> Self {
        Self {
            tool_name: tool_name.into(),
            program: program.into(),
            current_dir: None,
            label: None,
            overwrite_flag: None,
            overwrite_flags: Vec::new(),
            classifier: Arc::new(RegexClassifier::new()),
            search_path: None,
        }
    }

    /// Creates a runner for a known tool using its overwrite convention.
    pub fn for_tool(tool: ToolId, program: impl Into<PathBuf>) -> Self {
        let mut runner = Self::new(tool.as_str(), program);
        runner.overwrite_flag = tool.overwrite_flag().map(str::to_string);
        runner.overwrite_flags = tool
            .overwrite_flags()
            .iter()
            .map(|f| f.to_string())
            .collect();
        runner
    }

    /// Runs the tool in `dir` instead of the current directory.
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Label attached to progress updates. Defaults to the tool name.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Flag injected when the caller passes none of the overwrite flags.
    pub fn overwrite_flag(mut self, flag: Option<&str>) -> Self {
        self.overwrite_flag = flag.map(str::to_string);
        self.overwrite_flags = flag.map(|f| vec![f.to_string()]).unwrap_or_default();
        self
    }

    /// Replaces the log line classifier.
    pub fn classifier(mut self, classifier: impl LineClassifier + 'static) -> Self {
        self.classifier = Arc::new(classifier);
        self
    }

    /// Search path exported to the child as `PATH`.
    pub fn search_path(mut self, search_path: SearchPath) -> Self {
        self.search_path = Some(search_path);
        self
    }

    /// Path of the program that will be launched.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Puts the program first and injects the overwrite flag if needed.
    ///
    /// Callers may pass arguments with or without the tool name in front.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInvocation`] for an empty argument list or an
    /// argument containing a NUL byte.
    pub fn normalize_args(&self, mut args: Vec<String>) -> Result<Vec<String>> {
        if args.is_empty() {
            return Err(Error::InvalidInvocation(
                "argument list is empty".to_string(),
            ));
        }
        if let Some(bad) = args.iter().find(|a| a.contains('\0')) {
            return Err(Error::InvalidInvocation(format!(
                "argument contains a NUL byte: {:?}",
                bad
            )));
        }

        let program = self.program.to_string_lossy().into_owned();
        if self.names_program(&args[0]) {
            args[0] = program;
        } else {
            args.insert(0, program);
        }

        if let Some(flag) = &self.overwrite_flag {
            let already_set = args[1..]
                .iter()
                .any(|a| self.overwrite_flags.iter().any(|f| f == a));
            if !already_set {
                // Right after the program, where the tool treats it as global.
                args.insert(1, flag.clone());
            }
        }

        Ok(args)
    }

    /// Only the bare tool name or the exact program path count; a media
    /// file that happens to share the tool's name is a real argument.
    fn names_program(&self, arg: &str) -> bool {
        arg == self.tool_name || Path::new(arg) == self.program
    }

    /// Runs the tool to completion.
    ///
    /// Progress is reported in seconds of media processed. On a non-zero
    /// exit the captured output goes to `output` and is returned inside
    /// [`Error::ProcessFailed`].
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidInvocation`] before anything is spawned.
    /// - [`Error::Spawn`] if the program cannot be launched.
    /// - [`Error::Io`] if reading output or waiting for exit fails.
    /// - [`Error::ProcessFailed`] if the tool exits unsuccessfully.
    pub async fn run(
        &self,
        args: Vec<String>,
        progress: &dyn ProgressSink,
        output: &dyn OutputSink,
    ) -> Result<()> {
        let args = self.normalize_args(args)?;

        if let Some(dir) = &self.current_dir {
            if !dir.is_dir() {
                return Err(Error::InvalidInvocation(format!(
                    "working directory does not exist: {}",
                    dir.display()
                )));
            }
        }

        let mut state = RunState::NotStarted;
        debug!(?state, tool = %self.tool_name, "Preparing run");

        let mut cmd = Command::new(&self.program);
        cmd.args(&args[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(dir) = &self.current_dir {
            cmd.current_dir(dir);
        }
        if let Some(search_path) = &self.search_path {
            search_path.apply_to_command(&mut cmd);
        }

        info!(
            tool = %self.tool_name,
            program = %self.program.display(),
            args = ?&args[1..],
            "Starting tool"
        );

        let mut child = cmd.spawn().map_err(|source| Error::Spawn {
            program: self.program.clone(),
            source,
        })?;

        state = RunState::Running { total_known: false };
        debug!(?state, "Tool started");

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(tokio::spawn(forward_lines(stdout, tx.clone())));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(tokio::spawn(forward_lines(stderr, tx.clone())));
        }
        drop(tx);

        let label = self.label.as_deref().unwrap_or(self.tool_name.as_str());
        let mut tracker = ProgressTracker::new(label);
        let mut captured: Vec<String> = Vec::new();
        let mut read_error = None;

        while let Some(item) = rx.recv().await {
            match item {
                Ok(line) => {
                    let kind = self.classifier.classify(&line);
                    if let Some(update) = tracker.observe(kind) {
                        progress.update(&update);
                    }
                    if state == (RunState::Running { total_known: false })
                        && tracker.total().is_some()
                    {
                        state = RunState::Running { total_known: true };
                        debug!(?state, total = ?tracker.total(), "Duration discovered");
                    }
                    captured.push(line);
                }
                Err(e) => {
                    read_error.get_or_insert(e);
                }
            }
        }

        for reader in readers {
            if let Err(e) = reader.await {
                warn!("Output reader task failed: {}", e);
            }
        }

        if let Some(e) = read_error {
            // The pipe is unusable; make sure the child cannot block on it.
            if let Err(kill_err) = child.kill().await {
                debug!("Failed to kill tool after read error: {}", kill_err);
            }
            return Err(Error::Io(e));
        }

        let status = child.wait().await?;

        if status.success() {
            state = RunState::Succeeded;
            debug!(?state, elapsed = tracker.current(), "Tool finished");
            return Ok(());
        }

        state = RunState::Failed;
        debug!(?state, ?status, "Tool failed");

        let failure = ProcessFailure {
            args,
            status: status.code(),
            output: captured.join("\n"),
        };
        output.diagnostics(&failure.output);
        Err(Error::ProcessFailed(failure))
    }
}

// ============================================================================
// Output Reading
// ============================================================================

/// Splits a byte stream into lines on `\n` and `\r`, dropping empty lines.
///
/// The tool redraws its status line with bare carriage returns, so splitting
/// on newlines alone would delay progress until the run ends.
#[derive(Debug, Default)]
pub struct LineSplitter {
    pending: Vec<u8>,
}

impl LineSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds bytes, returning every line they complete.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &b in bytes {
            if b == b'\n' || b == b'\r' {
                self.take_line(&mut lines);
            } else {
                self.pending.push(b);
            }
        }
        lines
    }

    /// Returns the trailing unterminated line, if any.
    pub fn finish(&mut self) -> Option<String> {
        let mut lines = Vec::new();
        self.take_line(&mut lines);
        lines.pop()
    }

    fn take_line(&mut self, lines: &mut Vec<String>) {
        if !self.pending.is_empty() {
            lines.push(String::from_utf8_lossy(&self.pending).into_owned());
            self.pending.clear();
        }
    }
}

async fn forward_lines<R>(mut reader: R, tx: mpsc::UnboundedSender<std::io::Result<String>>)
where
    R: AsyncRead + Unpin,
{
    let mut splitter = LineSplitter::new();
    let mut buf = vec![0u8; READ_CHUNK];

    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                for line in splitter.push(&buf[..n]) {
                    if tx.send(Ok(line)).is_err() {
                        return;
                    }
                }
            }
            Err(e) => {
                let _ = tx.send(Err(e));
                return;
            }
        }
    }

    if let Some(line) = splitter.finish() {
        let _ = tx.send(Ok(line));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::{DiscardOutput, NoProgress, Progress};
    use std::sync::Mutex;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_normalize_prepends_program() {
        let runner = ProcessRunner::for_tool(ToolId::Ffmpeg, "/opt/bin/ffmpeg");
        let normalized = runner
            .normalize_args(args(&["-i", "in.mkv", "out.mp4"]))
            .unwrap();
        assert_eq!(
            normalized,
            args(&["/opt/bin/ffmpeg", "-y", "-i", "in.mkv", "out.mp4"])
        );
    }

    #[test]
    fn test_normalize_replaces_tool_name() {
        let runner = ProcessRunner::for_tool(ToolId::Ffmpeg, "/opt/bin/ffmpeg");
        let normalized = runner
            .normalize_args(args(&["ffmpeg", "-i", "in.mkv", "out.mp4"]))
            .unwrap();
        assert_eq!(normalized[0], "/opt/bin/ffmpeg");
        assert_eq!(normalized[1], "-y");
        assert_eq!(normalized.len(), 5);
    }

    #[test]
    fn test_normalize_keeps_caller_overwrite_choice() {
        let runner = ProcessRunner::for_tool(ToolId::Ffmpeg, "/opt/bin/ffmpeg");

        let no_clobber = runner
            .normalize_args(args(&["ffmpeg", "-n", "-i", "a", "b"]))
            .unwrap();
        assert!(!no_clobber.contains(&"-y".to_string()));

        let forced = runner
            .normalize_args(args(&["-i", "a", "b", "-y"]))
            .unwrap();
        assert_eq!(forced.iter().filter(|a| *a == "-y").count(), 1);
    }

    #[test]
    fn test_normalize_keeps_input_named_like_tool() {
        let runner = ProcessRunner::for_tool(ToolId::Ffprobe, "/opt/bin/ffprobe");
        let normalized = runner
            .normalize_args(args(&["/media/ffprobe.mkv"]))
            .unwrap();
        assert_eq!(normalized, args(&["/opt/bin/ffprobe", "/media/ffprobe.mkv"]));

        let runner = ProcessRunner::for_tool(ToolId::Ffmpeg, "/opt/bin/ffmpeg");
        let normalized = runner
            .normalize_args(args(&["ffmpeg.mp4", "out.mkv"]))
            .unwrap();
        assert_eq!(
            normalized,
            args(&["/opt/bin/ffmpeg", "-y", "ffmpeg.mp4", "out.mkv"])
        );
    }

    #[test]
    fn test_normalize_replaces_exact_program_path() {
        let runner = ProcessRunner::for_tool(ToolId::Ffprobe, "/opt/bin/ffprobe");
        let normalized = runner
            .normalize_args(args(&["/opt/bin/ffprobe", "in.mkv"]))
            .unwrap();
        assert_eq!(normalized, args(&["/opt/bin/ffprobe", "in.mkv"]));
    }

    #[test]
    fn test_normalize_ffprobe_has_no_overwrite_flag() {
        let runner = ProcessRunner::for_tool(ToolId::Ffprobe, "/opt/bin/ffprobe");
        let normalized = runner
            .normalize_args(args(&["ffprobe", "in.mkv"]))
            .unwrap();
        assert_eq!(normalized, args(&["/opt/bin/ffprobe", "in.mkv"]));
    }

    #[test]
    fn test_normalize_rejects_empty_and_nul() {
        let runner = ProcessRunner::for_tool(ToolId::Ffmpeg, "/opt/bin/ffmpeg");
        assert!(matches!(
            runner.normalize_args(Vec::new()),
            Err(Error::InvalidInvocation(_))
        ));
        assert!(matches!(
            runner.normalize_args(args(&["-i", "bad\0name"])),
            Err(Error::InvalidInvocation(_))
        ));
    }

    #[test]
    fn test_line_splitter() {
        let mut splitter = LineSplitter::new();
        assert_eq!(
            splitter.push(b"Duration: 00:01:30.00\nframe=1 time=00:00"),
            vec!["Duration: 00:01:30.00".to_string()]
        );
        assert_eq!(
            splitter.push(b":45.00\rframe=2\r\n"),
            vec!["frame=1 time=00:00:45.00".to_string(), "frame=2".to_string()]
        );
        assert!(splitter.push(b"tail").is_empty());
        assert_eq!(splitter.finish(), Some("tail".to_string()));
        assert_eq!(splitter.finish(), None);
    }

    #[tokio::test]
    async fn test_run_empty_args_spawns_nothing() {
        let runner = ProcessRunner::new("ffmpeg", "/nonexistent/bin/ffmpeg");
        let result = runner.run(Vec::new(), &NoProgress, &DiscardOutput).await;
        assert!(matches!(result, Err(Error::InvalidInvocation(_))));
    }

    #[tokio::test]
    async fn test_run_spawn_failure() {
        let runner = ProcessRunner::new("ffmpeg", "/nonexistent/bin/ffmpeg");
        let result = runner
            .run(args(&["ffmpeg", "-version"]), &NoProgress, &DiscardOutput)
            .await;
        assert!(matches!(result, Err(Error::Spawn { .. })));
    }

    #[tokio::test]
    async fn test_run_missing_working_directory() {
        let runner = ProcessRunner::new("ffmpeg", "/nonexistent/bin/ffmpeg")
            .current_dir("/nonexistent/work/dir");
        let result = runner
            .run(args(&["-version"]), &NoProgress, &DiscardOutput)
            .await;
        assert!(matches!(result, Err(Error::InvalidInvocation(_))));
    }

    #[cfg(unix)]
    mod unix {
        use super::*;

        fn sh() -> ProcessRunner {
            ProcessRunner::new("sh", "/bin/sh")
        }

        #[tokio::test]
        async fn test_run_reports_progress_to_total() {
            let script = r"printf 'Input #0\n  Duration: 00:01:30.00, start: 0.0\n' >&2
printf 'frame=1 time=00:00:45.00 bitrate=1\r' >&2
printf 'frame=2 time=00:00:30.00 bitrate=1\r' >&2
printf 'frame=3 time=00:00:45.00 bitrate=1\r' >&2
printf 'frame=4 time=00:01:10.00 bitrate=1\r' >&2
printf 'frame=5 time=00:01:30.00 bitrate=1\n' >&2";

            let seen = Mutex::new(Vec::<Progress>::new());
            let sink = |p: &Progress| seen.lock().unwrap().push(p.clone());

            sh().label("encode")
                .run(args(&["sh", "-c", script]), &sink, &DiscardOutput)
                .await
                .unwrap();

            let seen = seen.into_inner().unwrap();
            let currents: Vec<u64> = seen.iter().map(|p| p.current).collect();
            assert_eq!(currents, vec![45, 70, 90]);
            assert_eq!(seen.iter().map(|p| p.advanced).sum::<u64>(), 90);
            assert!(seen.iter().all(|p| p.total == Some(90)));
            assert!(seen.iter().all(|p| p.label == "encode"));
        }

        #[tokio::test]
        async fn test_run_failure_carries_output_and_status() {
            let captured = Mutex::new(String::new());
            let output = |text: &str| captured.lock().unwrap().push_str(text);

            let result = sh()
                .run(
                    args(&["-c", "echo 'Error: invalid codec' >&2; exit 1"]),
                    &NoProgress,
                    &output,
                )
                .await;

            let err = result.unwrap_err();
            let failure = err.as_process_failure().expect("process failure");
            assert_eq!(failure.status, Some(1));
            assert!(failure.output.contains("Error: invalid codec"));
            assert_eq!(failure.args[0], "/bin/sh");
            assert!(captured.lock().unwrap().contains("Error: invalid codec"));
        }

        #[tokio::test]
        async fn test_run_drains_large_output_on_both_streams() {
            let script = "i=0; while [ $i -lt 20000 ]; do echo \"out $i\"; echo \"err $i\" >&2; i=$((i+1)); done; exit 3";

            let err = sh()
                .run(args(&["-c", script]), &NoProgress, &DiscardOutput)
                .await
                .unwrap_err();

            let failure = err.as_process_failure().expect("process failure");
            assert_eq!(failure.status, Some(3));
            assert!(failure.output.contains("out 19999"));
            assert!(failure.output.contains("err 19999"));
            assert_eq!(failure.output.lines().count(), 40_000);
        }

        #[tokio::test]
        async fn test_run_keeps_order_within_each_stream() {
            let script = "i=0; while [ $i -lt 500 ]; do echo \"out $i\"; echo \"err $i\" >&2; i=$((i+1)); done; exit 1";

            let err = sh()
                .run(args(&["-c", script]), &NoProgress, &DiscardOutput)
                .await
                .unwrap_err();
            let output = &err.as_process_failure().unwrap().output;

            for prefix in ["out ", "err "] {
                let seq: Vec<u32> = output
                    .lines()
                    .filter_map(|l| l.strip_prefix(prefix))
                    .map(|n| n.parse().unwrap())
                    .collect();
                assert_eq!(seq, (0..500).collect::<Vec<u32>>());
            }
        }

        #[tokio::test]
        async fn test_run_success_without_progress_lines() {
            let seen = Mutex::new(0usize);
            let sink = |_: &Progress| *seen.lock().unwrap() += 1;

            sh().run(args(&["-c", "echo hello"]), &sink, &DiscardOutput)
                .await
                .unwrap();
            assert_eq!(*seen.lock().unwrap(), 0);
        }

        #[tokio::test]
        async fn test_run_uses_working_directory() {
            let temp_dir = tempfile::TempDir::new().unwrap();
            std::fs::write(temp_dir.path().join("marker.txt"), b"").unwrap();

            let err = sh()
                .current_dir(temp_dir.path())
                .run(args(&["-c", "ls; exit 1"]), &NoProgress, &DiscardOutput)
                .await
                .unwrap_err();

            assert!(err
                .as_process_failure()
                .unwrap()
                .output
                .contains("marker.txt"));
        }

        #[tokio::test]
        async fn test_run_exports_search_path() {
            let temp_dir = tempfile::TempDir::new().unwrap();
            let search_path = SearchPath::with_install_dir(temp_dir.path(), None);

            let err = sh()
                .search_path(search_path)
                .run(args(&["-c", "echo \"$PATH\"; exit 1"]), &NoProgress, &DiscardOutput)
                .await
                .unwrap_err();

            let output = &err.as_process_failure().unwrap().output;
            assert_eq!(output.trim(), temp_dir.path().to_string_lossy());
        }

        #[tokio::test]
        async fn test_run_killed_by_signal() {
            let err = sh()
                .run(args(&["-c", "kill -9 $$"]), &NoProgress, &DiscardOutput)
                .await
                .unwrap_err();
            assert_eq!(err.as_process_failure().unwrap().status, None);
        }
    }
}
