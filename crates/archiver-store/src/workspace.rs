//! Preparation of the archive a run writes to.

use std::ffi::OsString;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::{info, warn};

use crate::archive::{EntryArchive, read_archive};
use crate::entry::location_for_entry;
use crate::error::{Result, StoreError};
use crate::finalize::{ReplaceStrategy, RunOutcome, finalize};
use crate::pending::PendingEntries;

/// `path` with `suffix` appended to its file name.
pub(crate) fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// The files involved in one run against a target archive.
///
/// When the target already exists, all writes go to a `.tmp` copy whose
/// modification time is set to the original's; the copy is promoted or
/// discarded by [`finalize`](Self::finalize). Without a prior archive the
/// run writes the target directly.
#[derive(Debug)]
pub struct ArchiveWorkspace {
    target: PathBuf,
    temp: PathBuf,
    prior_modified: Option<SystemTime>,
    pending: PendingEntries,
}

impl ArchiveWorkspace {
    /// Set up a run against `target`.
    ///
    /// A target that cannot be read as a zip archive is deleted and the
    /// run proceeds as if there had been no prior archive.
    pub fn prepare(target: &Path) -> Result<Self> {
        let temp = with_suffix(target, ".tmp");
        let mut workspace = Self {
            target: target.to_path_buf(),
            temp,
            prior_modified: None,
            pending: PendingEntries::new(),
        };

        let modified = match fs::metadata(target) {
            Ok(metadata) if metadata.is_file() => metadata
                .modified()
                .map_err(|e| StoreError::io("read modification time of", target, e))?,
            _ => {
                info!(target = %target.display(), "no previous archive");
                return Ok(workspace);
            }
        };

        fs::copy(target, &workspace.temp)
            .map_err(|e| StoreError::io("copy", target, e))?;
        set_modified(&workspace.temp, modified)?;

        match read_archive(&workspace.temp) {
            Ok(archive) => {
                let names: Vec<String> = archive.file_names().map(str::to_string).collect();
                for name in &names {
                    match location_for_entry(name) {
                        Ok(location) => info!(%location, entry = %name, "Previously mirrored"),
                        Err(_) => info!(entry = %name, "Previously mirrored"),
                    }
                }
                workspace.pending = names.into_iter().collect();
                workspace.prior_modified = Some(modified);
            }
            Err(error) => {
                warn!(target = %target.display(), %error, "existing archive is unreadable; starting over");
                fs::remove_file(target).map_err(|e| StoreError::io("delete bad version of", target, e))?;
                if let Err(e) = fs::remove_file(&workspace.temp) {
                    warn!(temp = %workspace.temp.display(), error = %e, "Could not delete");
                }
            }
        }

        Ok(workspace)
    }

    /// The live archive path.
    #[must_use]
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// The temporary copy path.
    #[must_use]
    pub fn temp_path(&self) -> &Path {
        &self.temp
    }

    /// The file this run writes to.
    #[must_use]
    pub fn output_path(&self) -> &Path {
        if self.had_prior_archive() {
            &self.temp
        } else {
            &self.target
        }
    }

    /// Returns true if a readable archive existed when the run started.
    #[must_use]
    pub fn had_prior_archive(&self) -> bool {
        self.prior_modified.is_some()
    }

    /// Modification time of the prior archive.
    #[must_use]
    pub fn prior_modified(&self) -> Option<SystemTime> {
        self.prior_modified
    }

    /// Entries of the prior archive not yet claimed by the run.
    pub fn pending_mut(&mut self) -> &mut PendingEntries {
        &mut self.pending
    }

    #[must_use]
    pub fn pending(&self) -> &PendingEntries {
        &self.pending
    }

    /// Open the output archive for writing.
    pub fn open_archive(&self) -> Result<EntryArchive> {
        EntryArchive::open(self.output_path())
    }

    /// Decide the outcome of the run and put the right file in place.
    ///
    /// `committed` reports whether the output archive was rewritten.
    pub fn finalize(self, committed: bool, strategy: ReplaceStrategy) -> RunOutcome {
        finalize(
            &self.target,
            &self.temp,
            self.prior_modified,
            committed,
            strategy,
        )
    }
}

fn set_modified(path: &Path, time: SystemTime) -> Result<()> {
    let file = File::options()
        .write(true)
        .open(path)
        .map_err(|e| StoreError::io("open", path, e))?;
    file.set_modified(time)
        .map_err(|e| StoreError::io("set timestamp of", path, e))
}
