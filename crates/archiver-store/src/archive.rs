//! Zip-backed entry store.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{Result, StoreError};
use crate::workspace::with_suffix;

/// Result of [`EntryArchive::save_if_changed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveStatus {
    /// The entry did not exist before.
    Created,
    /// The entry existed with different bytes.
    Changed,
    /// The entry already held exactly these bytes; nothing was written.
    Unchanged,
}

impl SaveStatus {
    /// Returns true if the archive content changed.
    #[must_use]
    pub const fn is_change(&self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}

/// A zip file treated as a map from entry names to bytes.
///
/// Changes are buffered until [`commit`](Self::commit). A commit only
/// touches the file when something actually changed, and entries that were
/// not written keep their original compressed bytes, CRC and timestamps.
pub struct EntryArchive {
    path: PathBuf,
    source: Option<ZipArchive<BufReader<File>>>,
    existing: BTreeSet<String>,
    written: BTreeMap<String, Vec<u8>>,
    deleted: BTreeSet<String>,
}

impl EntryArchive {
    /// Open the archive at `path`, or start an empty one if no file exists.
    pub fn open(path: &Path) -> Result<Self> {
        let source = if path.exists() {
            Some(read_archive(path)?)
        } else {
            None
        };
        let existing = source
            .as_ref()
            .map(|archive| archive.file_names().map(str::to_string).collect())
            .unwrap_or_default();
        Ok(Self {
            path: path.to_path_buf(),
            source,
            existing,
            written: BTreeMap::new(),
            deleted: BTreeSet::new(),
        })
    }

    /// Path of the zip file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current entry names, including uncommitted changes.
    #[must_use]
    pub fn entry_names(&self) -> Vec<String> {
        self.existing
            .iter()
            .filter(|name| !self.deleted.contains(*name))
            .chain(self.written.keys())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .cloned()
            .collect()
    }

    /// Returns true if the entry exists, including uncommitted changes.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.written.contains_key(name)
            || (self.existing.contains(name) && !self.deleted.contains(name))
    }

    /// Read the current bytes of an entry.
    pub fn read(&mut self, name: &str) -> Result<Option<Vec<u8>>> {
        if let Some(bytes) = self.written.get(name) {
            return Ok(Some(bytes.clone()));
        }
        if self.deleted.contains(name) || !self.existing.contains(name) {
            return Ok(None);
        }
        let Some(source) = self.source.as_mut() else {
            return Ok(None);
        };
        let mut entry = source
            .by_name(name)
            .map_err(|e| StoreError::zip("read entry of", &self.path, e))?;
        let mut bytes = Vec::new();
        entry
            .read_to_end(&mut bytes)
            .map_err(|e| StoreError::io("read entry of", &self.path, e))?;
        Ok(Some(bytes))
    }

    /// Store `bytes` under `name` unless the entry already holds them.
    pub fn save_if_changed(&mut self, name: &str, bytes: &[u8]) -> Result<SaveStatus> {
        let status = match self.read(name)? {
            None => SaveStatus::Created,
            Some(current) if current == bytes => SaveStatus::Unchanged,
            Some(_) => SaveStatus::Changed,
        };
        if status.is_change() {
            self.deleted.remove(name);
            self.written.insert(name.to_string(), bytes.to_vec());
        }
        debug!(entry = name, ?status, "save");
        Ok(status)
    }

    /// Remove an entry. Returns true if it existed.
    pub fn delete(&mut self, name: &str) -> bool {
        let existed = self.contains(name);
        self.written.remove(name);
        if self.existing.contains(name) {
            self.deleted.insert(name.to_string());
        }
        existed
    }

    /// Returns true if there are uncommitted changes.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        !self.written.is_empty() || !self.deleted.is_empty()
    }

    /// Write pending changes to disk.
    ///
    /// Returns false without touching the file when nothing changed. The
    /// new archive is assembled in a `.part` sibling and renamed over the
    /// archive path once complete.
    pub fn commit(&mut self) -> Result<bool> {
        if !self.is_dirty() {
            debug!(path = %self.path.display(), "nothing to commit");
            return Ok(false);
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| StoreError::io("create directory", parent, e))?;
        }

        let part = with_suffix(&self.path, ".part");
        let file = File::create(&part).map_err(|e| StoreError::io("create", &part, e))?;
        let mut writer = ZipWriter::new(file);

        let mut copied = 0usize;
        if let Some(source) = self.source.as_mut() {
            for index in 0..source.len() {
                let entry = source
                    .by_index_raw(index)
                    .map_err(|e| StoreError::zip("read", &self.path, e))?;
                let replaced = self.deleted.contains(entry.name()) || self.written.contains_key(entry.name());
                if replaced {
                    continue;
                }
                writer
                    .raw_copy_file(entry)
                    .map_err(|e| StoreError::zip("copy entry into", &part, e))?;
                copied += 1;
            }
        }

        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        for (name, bytes) in &self.written {
            writer
                .start_file(name.as_str(), options)
                .map_err(|e| StoreError::zip("write entry into", &part, e))?;
            writer
                .write_all(bytes)
                .map_err(|e| StoreError::io("write entry into", &part, e))?;
        }

        let file = writer
            .finish()
            .map_err(|e| StoreError::zip("finish", &part, e))?;
        file.sync_all().map_err(|e| StoreError::io("sync", &part, e))?;
        drop(file);

        // The source handle must be closed before the rename on platforms
        // that refuse to replace open files.
        self.source = None;
        fs::rename(&part, &self.path).map_err(|e| StoreError::io("rename", &part, e))?;

        info!(
            path = %self.path.display(),
            copied,
            written = self.written.len(),
            deleted = self.deleted.len(),
            "archive committed"
        );

        let archive = read_archive(&self.path)?;
        self.existing = archive.file_names().map(str::to_string).collect();
        self.source = Some(archive);
        self.written.clear();
        self.deleted.clear();
        Ok(true)
    }
}

pub(crate) fn read_archive(path: &Path) -> Result<ZipArchive<BufReader<File>>> {
    let file = File::open(path).map_err(|e| StoreError::io("open", path, e))?;
    ZipArchive::new(BufReader::new(file)).map_err(|e| StoreError::zip("read", path, e))
}
