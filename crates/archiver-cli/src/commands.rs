use anyhow::{Context, Result};
use archiver_cli::config::{ArchiverConfig, ReplaceMode};
use archiver_cli::driver::{Archiver, RunReport};
use archiver_cli::summary::render_entries;
use archiver_store::{EntryArchive, check_integrity};
use tracing::info;

use crate::cli::{ArchiveArgs, MirrorArgs, ReplaceStrategyArg};

/// Build the run configuration: defaults, then the config file, then flags.
pub fn config_from_args(args: &MirrorArgs) -> Result<ArchiverConfig> {
    let mut config = match &args.config {
        Some(path) => ArchiverConfig::load(path)?,
        None => ArchiverConfig::default(),
    };
    if let Some(target) = &args.target {
        config.target = Some(target.clone());
    }
    config.seeds.extend(args.uris.iter().cloned());
    if let Some(timeout) = args.fetch_timeout {
        config.fetch_timeout_secs = timeout;
    }
    if let Some(strategy) = args.replace_strategy {
        config.replace_strategy = match strategy {
            ReplaceStrategyArg::Auto => ReplaceMode::Auto,
            ReplaceStrategyArg::Rename => ReplaceMode::Rename,
            ReplaceStrategyArg::DeleteFirst => ReplaceMode::DeleteFirst,
        };
    }
    Ok(config)
}

pub fn run_mirror(args: &MirrorArgs) -> Result<RunReport> {
    let config = config_from_args(args)?;
    let archiver = Archiver::new(config)?;
    archiver.run()
}

/// Returns true if the archive is intact.
pub fn run_verify(args: &ArchiveArgs) -> Result<bool> {
    match check_integrity(&args.archive) {
        Ok(entries) => {
            info!(archive = %args.archive.display(), entries, "archive is intact");
            println!("{}: {entries} entries, all readable", args.archive.display());
            Ok(true)
        }
        Err(error) => {
            eprintln!("{}", error.user_message());
            Ok(false)
        }
    }
}

pub fn run_entries(args: &ArchiveArgs) -> Result<()> {
    let archive = EntryArchive::open(&args.archive)
        .with_context(|| format!("open archive {}", args.archive.display()))?;
    print!("{}", render_entries(&archive.entry_names()));
    Ok(())
}
