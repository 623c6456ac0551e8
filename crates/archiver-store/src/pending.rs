//! Entries awaiting confirmation by the current run.

use std::collections::BTreeSet;

/// Entry names seen in the existing archive that no mirrored resource has
/// claimed yet.
///
/// Whatever remains after reconciliation is stale.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingEntries {
    names: BTreeSet<String>,
}

impl PendingEntries {
    /// An empty set, as for a first run.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark an entry as accounted for. Returns true if it was pending.
    pub fn claim(&mut self, name: &str) -> bool {
        self.names.remove(name)
    }

    /// Returns true if the entry is still pending.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Pending names in order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Take all remaining names, leaving the set empty.
    pub fn take(&mut self) -> Vec<String> {
        std::mem::take(&mut self.names).into_iter().collect()
    }
}

impl<S: Into<String>> FromIterator<S> for PendingEntries {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            names: iter.into_iter().map(Into::into).collect(),
        }
    }
}
