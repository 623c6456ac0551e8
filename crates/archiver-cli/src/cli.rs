//! CLI argument definitions for the setup archiver.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{InfoLevel, Verbosity};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "setup-archiver",
    version,
    about = "Mirror setup models and their images into a zip archive",
    long_about = "Mirror the setup index and every model it references into a zip archive.\n\n\
                  Each resource is fetched twice and only persisted when both reads agree.\n\
                  Entries that are no longer referenced are removed unless the run had failures."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for debug, -vv for trace, -q for warnings only).
    #[command(flatten)]
    pub verbosity: Verbosity<InfoLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "compact",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Mirror the seeds into the archive.
    Mirror(MirrorArgs),

    /// Check that every entry of an archive is readable.
    Verify(ArchiveArgs),

    /// List the entries of an archive and the locations they mirror.
    Entries(ArchiveArgs),
}

#[derive(Parser)]
pub struct MirrorArgs {
    /// Archive file to update (default: the user cache location).
    #[arg(long = "target", value_name = "PATH")]
    pub target: Option<PathBuf>,

    /// Additional seed locations.
    #[arg(long = "uris", value_name = "URI", num_args = 1..)]
    pub uris: Vec<String>,

    /// JSON configuration file.
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Network request timeout in seconds.
    #[arg(long = "fetch-timeout", value_name = "SECS")]
    pub fetch_timeout: Option<u64>,

    /// How the new archive replaces the old one.
    #[arg(long = "replace-strategy", value_enum)]
    pub replace_strategy: Option<ReplaceStrategyArg>,
}

#[derive(Parser)]
pub struct ArchiveArgs {
    /// Path to the zip archive.
    #[arg(value_name = "ARCHIVE")]
    pub archive: PathBuf,
}

/// CLI replace strategy choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum ReplaceStrategyArg {
    Auto,
    Rename,
    DeleteFirst,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
