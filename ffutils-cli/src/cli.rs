use clap::{Parser, Subcommand};
use ffutils_core::ToolId;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "ffutils")]
#[command(author, version, about = "Provision and run ffmpeg with progress reporting")]
pub struct Cli {
    /// Path to settings file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the private install directory
    #[arg(long, global = true)]
    pub install_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a tool, installing it first if needed
    Run {
        /// Label shown on the progress line
        #[arg(long)]
        desc: Option<String>,

        /// Working directory for the tool
        #[arg(long)]
        cwd: Option<PathBuf>,

        /// Tool to run
        #[arg(long, default_value = "ffmpeg")]
        tool: ToolId,

        /// Arguments passed to the tool
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Install tools into the private directory and print their paths
    Install {
        /// Also install ffprobe
        #[arg(long)]
        ffprobe: bool,

        /// Skip ffmpeg
        #[arg(long)]
        no_ffmpeg: bool,
    },

    /// Print the path of a tool without installing it
    Which {
        /// Tool to look up
        tool: ToolId,
    },
}

impl Commands {
    /// Tools selected by `install` flags, in install order.
    pub fn install_targets(ffprobe: bool, no_ffmpeg: bool) -> Vec<ToolId> {
        let mut tools = Vec::new();
        if !no_ffmpeg {
            tools.push(ToolId::Ffmpeg);
        }
        if ffprobe {
            tools.push(ToolId::Ffprobe);
        }
        tools
    }
}
