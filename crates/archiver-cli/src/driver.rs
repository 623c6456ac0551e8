//! One mirroring run from seeds to a finalized archive.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use archiver_fetch::{ConsistencyCheckedFetcher, HttpHandler, UriConverter, UriHandler};
use archiver_mirror::ResourceMirror;
use archiver_model::Location;
use archiver_store::{ArchiveWorkspace, ReconcileSummary, Reconciler, ReplaceStrategy, RunOutcome};
use tracing::{error, info, info_span};

use crate::config::ArchiverConfig;

/// Everything a finished run reports.
#[derive(Debug)]
pub struct RunReport {
    pub target: PathBuf,
    pub seeds: Vec<Location>,
    /// Resources in the mirrored set.
    pub resources: usize,
    /// Locations verified by the double fetch.
    pub verified: usize,
    /// References whose fragment did not resolve.
    pub unresolved: usize,
    pub summary: ReconcileSummary,
    /// Why the archive could not be written, if it could not.
    pub commit_error: Option<String>,
    pub strategy: ReplaceStrategy,
    pub outcome: RunOutcome,
}

impl RunReport {
    /// Returns true if the run left a good archive and was not aborted.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.outcome.is_success() && !self.summary.is_aborted() && self.commit_error.is_none()
    }

    /// Process exit code for this run.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        if self.is_success() { 0 } else { 1 }
    }
}

/// Mirrors the configured seeds into the target archive.
///
/// Network reads go through a [`ConsistencyCheckedFetcher`] around `N`;
/// `file:` locations are read directly.
pub struct Archiver<N> {
    config: ArchiverConfig,
    converter: UriConverter<ConsistencyCheckedFetcher<N>>,
}

impl Archiver<HttpHandler> {
    /// An archiver that fetches over HTTP.
    pub fn new(config: ArchiverConfig) -> Result<Self> {
        let network = HttpHandler::new(config.fetch_timeout()).context("create HTTP client")?;
        Ok(Self::with_network(config, network))
    }
}

impl<N: UriHandler> Archiver<N> {
    /// An archiver that fetches network locations through `network`.
    pub fn with_network(config: ArchiverConfig, network: N) -> Self {
        Self {
            config,
            converter: UriConverter::new(ConsistencyCheckedFetcher::new(network)),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ArchiverConfig {
        &self.config
    }

    /// Perform a full run.
    ///
    /// Errors are returned only when the run cannot start or the archive
    /// cannot be prepared; per-resource problems end up in the report.
    pub fn run(&self) -> Result<RunReport> {
        let target = self.config.target_path()?;
        let seeds = self.config.seed_locations()?;
        let span = info_span!("run", target = %target.display());
        let _guard = span.enter();

        let fetcher = self.converter.network();
        fetcher.reset();

        let mut workspace = ArchiveWorkspace::prepare(&target)
            .with_context(|| format!("prepare archive {}", target.display()))?;

        let registry = self.config.registry()?;
        let mirror = ResourceMirror::new(&self.converter, &registry).with_class_images();
        let mut set = mirror.perform(seeds.iter().cloned());
        let unresolved = mirror.resolve_all(&mut set);

        let mut archive = workspace
            .open_archive()
            .with_context(|| format!("open archive {}", workspace.output_path().display()))?;
        let reconciler = Reconciler::new(
            self.config.network_schemes.iter().cloned(),
            self.config.schema_extensions.iter().cloned(),
        );
        let summary = reconciler.reconcile(set.iter_mut(), &mut archive, workspace.pending_mut());

        let mut commit_error = None;
        let committed = if summary.is_aborted() {
            false
        } else {
            match archive.commit() {
                Ok(committed) => committed,
                Err(e) => {
                    error!(error = %e, "FAILED to save archive");
                    commit_error = Some(e.to_string());
                    false
                }
            }
        };
        drop(archive);

        let strategy = self
            .config
            .replace_strategy
            .resolve(parent_dir(&target));
        let outcome = workspace.finalize(committed, strategy);
        info!(%outcome, strategy = strategy.label(), "run finished");

        Ok(RunReport {
            target,
            seeds,
            resources: set.len(),
            verified: fetcher.verified_count(),
            unresolved,
            summary,
            commit_error,
            strategy,
            outcome,
        })
    }
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}
