//! Hierarchical resource locations.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use url::Url;

use crate::error::{ModelError, Result};

/// Immutable, normalized identifier of a remote resource or local file.
///
/// Wraps an absolute URL. Construction strips any fragment and applies the
/// URL normalization rules (dot segments removed, scheme and host lower
/// cased), so two locations compare equal exactly when their scheme,
/// authority, path segments and query match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Location(Url);

impl Location {
    /// Parse an absolute location.
    pub fn parse(input: &str) -> Result<Self> {
        let mut url = Url::parse(input.trim()).map_err(|e| ModelError::InvalidLocation {
            input: input.to_string(),
            reason: e.to_string(),
        })?;
        url.set_fragment(None);
        Ok(Self(url))
    }

    /// Build a `file:` location from an absolute file system path.
    pub fn from_file_path(path: &Path) -> Result<Self> {
        Url::from_file_path(path)
            .map(Self)
            .map_err(|()| ModelError::RelativePath(path.display().to_string()))
    }

    /// Resolve a (possibly relative) reference against this location.
    ///
    /// The fragment of the reference, if any, is dropped.
    pub fn resolve(&self, reference: &str) -> Result<Self> {
        let mut url = self.0.join(reference).map_err(|e| ModelError::Unresolvable {
            base: self.0.to_string(),
            reference: reference.to_string(),
            reason: e.to_string(),
        })?;
        url.set_fragment(None);
        Ok(Self(url))
    }

    /// The scheme, lower case.
    #[must_use]
    pub fn scheme(&self) -> &str {
        self.0.scheme()
    }

    /// The authority (`user@host:port`), empty when there is none.
    #[must_use]
    pub fn authority(&self) -> &str {
        self.0.authority()
    }

    /// The path segments, still percent-encoded.
    #[must_use]
    pub fn segments(&self) -> Vec<&str> {
        self.0
            .path_segments()
            .map(Iterator::collect)
            .unwrap_or_default()
    }

    /// The query component, if present.
    #[must_use]
    pub fn query(&self) -> Option<&str> {
        self.0.query()
    }

    /// Returns true if this location carries a query component.
    #[must_use]
    pub fn has_query(&self) -> bool {
        self.0.query().is_some()
    }

    /// The extension of the last path segment (text after the final dot).
    #[must_use]
    pub fn file_extension(&self) -> Option<&str> {
        let last = self.0.path_segments()?.next_back()?;
        let (_, extension) = last.rsplit_once('.')?;
        if extension.is_empty() {
            None
        } else {
            Some(extension)
        }
    }

    /// Returns true if the scheme is one of `schemes` (case-insensitive).
    #[must_use]
    pub fn uses_scheme<S: AsRef<str>>(&self, schemes: &[S]) -> bool {
        schemes
            .iter()
            .any(|scheme| scheme.as_ref().eq_ignore_ascii_case(self.scheme()))
    }

    /// The local path for `file:` locations.
    #[must_use]
    pub fn to_file_path(&self) -> Option<PathBuf> {
        if self.scheme() == "file" {
            self.0.to_file_path().ok()
        } else {
            None
        }
    }

    /// The full location text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

impl FromStr for Location {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
