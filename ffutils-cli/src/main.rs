//! ffutils command-line front end.
//!
//! Resolves `ffmpeg`/`ffprobe` (downloading them when missing) and runs them
//! with a progress line on stderr.

mod cli;
mod render;

use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use ffutils_core::{Error, ProcessRunner, Resolver, Settings, ToolId};
use render::{StderrOutput, TerminalProgress};

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Respect RUST_LOG if set, otherwise default by verbosity
    let default_filter = if cli.verbose {
        "ffutils=debug,ffutils_core=debug"
    } else {
        "ffutils=info,ffutils_core=info"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("Starting ffutils v{}", ffutils_core::VERSION);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: failed to create tokio runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(dispatch(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => exit_code_for(&err),
    }
}

/// Maps a failed command to the process exit code.
///
/// A tool failure exits with the tool's own status; its output has already
/// been printed.
fn exit_code_for(err: &anyhow::Error) -> ExitCode {
    let failure = err
        .downcast_ref::<Error>()
        .and_then(Error::as_process_failure);

    match failure {
        Some(failure) => {
            tracing::error!(
                status = ?failure.status,
                "{} exited unsuccessfully",
                failure.args.first().map(String::as_str).unwrap_or("tool")
            );
            failure
                .status
                .and_then(|code| u8::try_from(code).ok())
                .filter(|code| *code != 0)
                .map(ExitCode::from)
                .unwrap_or(ExitCode::FAILURE)
        }
        None => {
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

async fn dispatch(cli: Cli) -> Result<()> {
    let mut settings = match &cli.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    };
    if let Some(dir) = cli.install_dir {
        settings.install_dir = Some(dir);
    }

    let resolver = Resolver::from_settings(&settings)?;

    match cli.command {
        Commands::Run {
            desc,
            cwd,
            tool,
            args,
        } => run_tool(&resolver, tool, desc, cwd, args).await,
        Commands::Install { ffprobe, no_ffmpeg } => {
            install(&resolver, &Commands::install_targets(ffprobe, no_ffmpeg)).await
        }
        Commands::Which { tool } => which(&resolver, tool),
    }
}

async fn run_tool(
    resolver: &Resolver,
    tool: ToolId,
    desc: Option<String>,
    cwd: Option<std::path::PathBuf>,
    args: Vec<String>,
) -> Result<()> {
    let program = resolve_with_progress(resolver, tool).await?;

    let mut runner = ProcessRunner::for_tool(tool, program)
        .search_path(resolver.search_path().clone());
    if let Some(desc) = desc {
        runner = runner.label(desc);
    }
    if let Some(cwd) = cwd {
        runner = runner.current_dir(cwd);
    }

    let renderer = TerminalProgress::new();
    let result = runner.run(args, &renderer, &StderrOutput).await;
    renderer.finish();

    Ok(result?)
}

async fn install(resolver: &Resolver, tools: &[ToolId]) -> Result<()> {
    if tools.is_empty() {
        bail!("nothing to install: --no-ffmpeg given without --ffprobe");
    }

    for tool in tools {
        let path = resolve_with_progress(resolver, *tool).await?;
        println!("{}: {}", tool, path.display());
    }
    Ok(())
}

fn which(resolver: &Resolver, tool: ToolId) -> Result<()> {
    match resolver.locate(tool) {
        Some(path) => {
            println!("{}", path.display());
            Ok(())
        }
        None => bail!(
            "{} not found (install dir: {})",
            tool,
            resolver.install_dir().display()
        ),
    }
}

async fn resolve_with_progress(resolver: &Resolver, tool: ToolId) -> Result<std::path::PathBuf> {
    let renderer = TerminalProgress::new();
    let result = resolver.resolve(tool, &renderer).await;
    renderer.finish();
    result.with_context(|| format!("failed to provision {}", tool))
}
