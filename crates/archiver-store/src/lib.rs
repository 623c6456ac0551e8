//! Archive persistence for the setup archiver.
//!
//! A run prepares an [`ArchiveWorkspace`], reconciles the mirrored
//! resources into an [`EntryArchive`] with a [`Reconciler`], commits the
//! archive and finally calls [`finalize`] to decide the [`RunOutcome`] and
//! swap the new archive into place.

pub mod archive;
pub mod entry;
pub mod error;
pub mod finalize;
pub mod pending;
pub mod reconcile;
pub mod workspace;

pub use archive::{EntryArchive, SaveStatus};
pub use entry::{entry_name, location_for_entry};
pub use error::{Result, StoreError};
pub use finalize::{ReplaceStrategy, RunOutcome, check_integrity, finalize, is_damaged};
pub use pending::PendingEntries;
pub use reconcile::{Failure, FailureKind, ReconcileSummary, Reconciler};
pub use workspace::ArchiveWorkspace;
