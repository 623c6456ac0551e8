//! Bringing the archive in line with a mirrored resource set.

use archiver_model::{Diagnostic, Location, Resource};
use tracing::{error, info, info_span, warn};

use crate::archive::EntryArchive;
use crate::entry::entry_name;
use crate::pending::PendingEntries;

/// Why a resource was not persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Empty content or structural errors.
    Load,
    /// The archive could not store the bytes.
    Save,
}

impl FailureKind {
    /// Get a human-readable label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::Save => "save",
        }
    }
}

/// One resource that could not be persisted.
#[derive(Debug, Clone)]
pub struct Failure {
    pub location: Location,
    pub kind: FailureKind,
    pub messages: Vec<String>,
}

/// What a reconciliation did.
#[derive(Debug, Clone, Default)]
pub struct ReconcileSummary {
    /// Locations whose entry was created or rewritten.
    pub saved: Vec<Location>,
    /// Locations whose entry already held the same bytes.
    pub unchanged: Vec<Location>,
    /// Locations skipped for their scheme or query.
    pub ignored: Vec<Location>,
    pub failures: Vec<Failure>,
    /// Stale entries removed from the archive.
    pub deleted: Vec<String>,
    /// Stale entries kept because the run had failures.
    pub retained: Vec<String>,
    /// The schema resource that aborted the run, if any.
    pub aborted: Option<Location>,
}

impl ReconcileSummary {
    /// Returns true if any resource failed to load or save.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Returns true if the schema guard stopped the run.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.aborted.is_some()
    }
}

/// Decides which mirrored resources are written to the archive and which
/// stale entries are removed.
#[derive(Debug, Clone)]
pub struct Reconciler {
    network_schemes: Vec<String>,
    schema_extensions: Vec<String>,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new(["http", "https"], ["ecore"])
    }
}

impl Reconciler {
    /// Create a reconciler.
    ///
    /// Only resources with one of `network_schemes` are persisted. A failed
    /// resource with one of `schema_extensions` aborts the whole run.
    pub fn new<S, E>(
        network_schemes: impl IntoIterator<Item = S>,
        schema_extensions: impl IntoIterator<Item = E>,
    ) -> Self
    where
        S: Into<String>,
        E: Into<String>,
    {
        Self {
            network_schemes: network_schemes.into_iter().map(Into::into).collect(),
            schema_extensions: schema_extensions.into_iter().map(Into::into).collect(),
        }
    }

    /// Persist changed resources and delete stale entries.
    ///
    /// Entries left in `pending` afterwards are deleted only when every
    /// persisted resource loaded and saved cleanly; otherwise they are
    /// retained. When a schema resource failed nothing is touched at all.
    pub fn reconcile<'r>(
        &self,
        resources: impl IntoIterator<Item = &'r mut Resource>,
        archive: &mut EntryArchive,
        pending: &mut PendingEntries,
    ) -> ReconcileSummary {
        let span = info_span!("reconcile", archive = %archive.path().display());
        let _guard = span.enter();

        let resources: Vec<&mut Resource> = resources.into_iter().collect();
        let mut summary = ReconcileSummary::default();

        if let Some(schema) = resources.iter().find(|resource| self.is_failed_schema(resource)) {
            error!(location = %schema.location(), "FAILED to load");
            log_diagnostics(schema.errors());
            error!("Aborting");
            summary.aborted = Some(schema.location().clone());
            return summary;
        }

        for resource in resources {
            let location = resource.location().clone();
            if location.has_query() || !location.uses_scheme(&self.network_schemes) {
                info!(%location, "Ignoring");
                summary.ignored.push(location);
                continue;
            }

            info!(%location, "Mirroring");
            let name = entry_name(&location);
            pending.claim(&name);

            if !resource.is_loaded_cleanly() {
                error!(%location, "FAILED to load");
                log_diagnostics(resource.errors());
                summary.failures.push(Failure {
                    location,
                    kind: FailureKind::Load,
                    messages: messages(resource),
                });
                continue;
            }

            match archive.save_if_changed(&name, resource.bytes()) {
                Ok(status) if status.is_change() => {
                    resource.touch();
                    warn!(%location, saved_at = ?resource.time_stamp(), "CHANGED!");
                    summary.saved.push(location);
                }
                Ok(_) => summary.unchanged.push(location),
                Err(e) => {
                    error!(%location, error = %e, "FAILED to save");
                    summary.failures.push(Failure {
                        location,
                        kind: FailureKind::Save,
                        messages: vec![e.to_string()],
                    });
                }
            }
        }

        if summary.has_failures() {
            if !pending.is_empty() {
                warn!(
                    retained = pending.len(),
                    "There were failures so no entries will be deleted from the archive"
                );
            }
            summary.retained = pending.take();
        } else {
            for name in pending.take() {
                if archive.delete(&name) {
                    info!(entry = %name, "Deleted stale entry");
                }
                summary.deleted.push(name);
            }
        }

        summary
    }

    fn is_failed_schema(&self, resource: &Resource) -> bool {
        let is_schema = resource.location().file_extension().is_some_and(|extension| {
            self.schema_extensions
                .iter()
                .any(|schema| schema.eq_ignore_ascii_case(extension))
        });
        is_schema && !resource.is_loaded_cleanly()
    }
}

fn log_diagnostics(diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        error!("  ERROR: {diagnostic}");
    }
}

fn messages(resource: &Resource) -> Vec<String> {
    resource.errors().iter().map(ToString::to_string).collect()
}
