//! Validation and promotion of the rewritten archive.

use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::Path;
use std::time::SystemTime;

use tracing::{debug, error, info, warn};
use zip::ZipArchive;

use crate::error::{Result, StoreError};
use crate::workspace::with_suffix;

/// Classification of a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The archive did not change.
    Unchanged,
    /// There was no archive and a valid one was created.
    Created,
    /// The validated new archive replaced the old one.
    Updated,
    /// The newly created archive was damaged and has been deleted.
    FailedCreate,
    /// The rewritten archive was damaged; the old one was retained.
    RejectedNew,
    /// The new archive was valid but could not be moved into place.
    ReplaceFailed,
}

impl RunOutcome {
    /// Returns true if the live archive is in a good state.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Unchanged | Self::Created | Self::Updated)
    }

    /// Get a human-readable label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Unchanged => "unchanged",
            Self::Created => "created",
            Self::Updated => "updated",
            Self::FailedCreate => "failed-create",
            Self::RejectedNew => "rejected-new",
            Self::ReplaceFailed => "replace-failed",
        }
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How the new archive is moved over the live one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceStrategy {
    /// Rename directly over the existing file.
    RenameOver,
    /// Delete the existing file first, for file systems that refuse to
    /// replace a file that may be open.
    DeleteThenRename,
}

impl ReplaceStrategy {
    /// Probe `dir` for whether a file can be renamed over a file that is
    /// held open.
    ///
    /// Falls back to the platform default when the probe cannot run.
    #[must_use]
    pub fn detect(dir: &Path) -> Self {
        match probe_rename_over_open(dir) {
            Ok(true) => Self::RenameOver,
            Ok(false) => Self::DeleteThenRename,
            Err(error) => {
                debug!(dir = %dir.display(), %error, "rename probe failed");
                Self::platform_default()
            }
        }
    }

    /// The strategy assumed when nothing can be probed.
    #[must_use]
    pub const fn platform_default() -> Self {
        if cfg!(windows) {
            Self::DeleteThenRename
        } else {
            Self::RenameOver
        }
    }

    /// Get a human-readable label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::RenameOver => "rename",
            Self::DeleteThenRename => "delete-first",
        }
    }
}

fn probe_rename_over_open(dir: &Path) -> io::Result<bool> {
    let held = tempfile::NamedTempFile::new_in(dir)?;
    let incoming = tempfile::NamedTempFile::new_in(dir)?;
    // The incoming handle stays open too, like a reader of the live archive.
    let (_incoming_file, incoming_path) = incoming.into_parts();
    Ok(fs::rename(&incoming_path, held.path()).is_ok())
}

/// Check that every entry of a zip file can be read.
///
/// Returns the number of entries. Each entry's content is read to the end
/// so CRC and size mismatches are detected.
pub fn check_integrity(path: &Path) -> Result<usize> {
    if !path.is_file() {
        return Err(StoreError::damaged(path, "file does not exist"));
    }
    let file = File::open(path).map_err(|e| StoreError::io("open", path, e))?;
    let mut archive = ZipArchive::new(BufReader::new(file))
        .map_err(|e| StoreError::damaged(path, format!("not a zip archive: {e}")))?;
    if archive.len() == 0 {
        return Err(StoreError::damaged(path, "archive has no entries"));
    }
    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|e| StoreError::damaged(path, format!("entry {index} is unreadable: {e}")))?;
        let name = entry.name().to_string();
        io::copy(&mut entry, &mut io::sink())
            .map_err(|e| StoreError::damaged(path, format!("entry {name} is unreadable: {e}")))?;
    }
    Ok(archive.len())
}

/// Returns true if the file is missing, empty or has an unreadable entry.
#[must_use]
pub fn is_damaged(path: &Path) -> bool {
    check_integrity(path).is_err()
}

/// Classify a run and put the resulting archive in place.
///
/// Without a prior archive (`prior_modified` is `None`) the run wrote
/// `original` directly; a damaged result is deleted. Otherwise the run
/// wrote `temp`, a copy of `original` stamped with its modification time.
/// An untouched copy is discarded; a changed one is validated, the
/// original is backed up to `<original>.bak`, and the copy is renamed over
/// the original.
pub fn finalize(
    original: &Path,
    temp: &Path,
    prior_modified: Option<SystemTime>,
    committed: bool,
    strategy: ReplaceStrategy,
) -> RunOutcome {
    let Some(prior_modified) = prior_modified else {
        return finalize_created(original, temp);
    };

    let final_modified = fs::metadata(temp).and_then(|m| m.modified()).ok();
    if !committed && final_modified == Some(prior_modified) {
        info!(file = %original.display(), "No updates for");
        remove_quietly(temp);
        return RunOutcome::Unchanged;
    }

    if let Err(reason) = check_integrity(temp) {
        error!(
            file = %original.display(),
            %reason,
            "The resulting archive is damaged so the old one will be retained"
        );
        remove_quietly(temp);
        return RunOutcome::RejectedNew;
    }

    replace_with_backup(original, temp, strategy)
}

/// Back up `original` to `<original>.bak` and move `temp` over it.
///
/// If the move fails after the original was already deleted, the backup is
/// copied back so the live archive does not disappear.
fn replace_with_backup(original: &Path, temp: &Path, strategy: ReplaceStrategy) -> RunOutcome {
    let backup = with_suffix(original, ".bak");
    let backed_up = match fs::copy(original, &backup) {
        Ok(_) => true,
        Err(e) => {
            warn!(backup = %backup.display(), error = %e, "Could not create backup");
            false
        }
    };

    if strategy == ReplaceStrategy::DeleteThenRename
        && let Err(e) = fs::remove_file(original)
    {
        warn!(file = %original.display(), error = %e, "Could not delete");
    }

    match fs::rename(temp, original) {
        Ok(()) => {
            info!(file = %original.display(), "Successful updates for");
            RunOutcome::Updated
        }
        Err(e) => {
            error!(
                temp = %temp.display(),
                file = %original.display(),
                error = %e,
                "Could not rename"
            );
            if backed_up && !original.exists() {
                restore_backup(&backup, original);
            }
            RunOutcome::ReplaceFailed
        }
    }
}

fn restore_backup(backup: &Path, original: &Path) {
    match fs::copy(backup, original) {
        Ok(_) => warn!(file = %original.display(), backup = %backup.display(), "Restored from backup"),
        Err(e) => error!(
            file = %original.display(),
            backup = %backup.display(),
            error = %e,
            "Could not restore from backup"
        ),
    }
}

fn finalize_created(original: &Path, temp: &Path) -> RunOutcome {
    remove_quietly(temp);
    if !original.exists() {
        info!(file = %original.display(), "No updates for");
        return RunOutcome::Unchanged;
    }
    match check_integrity(original) {
        Ok(entries) => {
            info!(file = %original.display(), entries, "Successfully created");
            RunOutcome::Created
        }
        Err(reason) => {
            error!(file = %original.display(), %reason, "The resulting archive is damaged. Deleting");
            remove_quietly(original);
            RunOutcome::FailedCreate
        }
    }
}

fn remove_quietly(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(file = %path.display(), error = %e, "Could not delete"),
    }
}
