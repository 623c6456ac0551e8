//! The URI handler abstraction.

use std::io::Read;

use archiver_model::Location;
use chrono::{DateTime, Utc};

use crate::error::{FetchError, Result};

/// File-like attributes of a location.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes {
    /// Last modification time.
    pub last_modified: Option<DateTime<Utc>>,
    /// Content length in bytes.
    pub length: Option<u64>,
    /// Entity tag reported by the server.
    pub etag: Option<String>,
    /// Whether the location can be written.
    pub read_only: bool,
}

/// Content type information for a location.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentDescription {
    /// MIME type, when known.
    pub content_type: Option<String>,
}

/// Reads and manipulates resources at one family of locations.
pub trait UriHandler: Send + Sync {
    /// Returns true if this handler serves the location's scheme.
    fn can_handle(&self, location: &Location) -> bool;

    /// Open a stream over the location's content.
    fn open(&self, location: &Location) -> Result<Box<dyn Read + Send>>;

    /// Check whether the location exists.
    fn exists(&self, location: &Location) -> Result<bool>;

    /// Delete the location.
    fn delete(&self, location: &Location) -> Result<()>;

    /// Read the location's attributes.
    fn attributes(&self, location: &Location) -> Result<Attributes>;

    /// Update the location's attributes.
    fn set_attributes(&self, location: &Location, attributes: &Attributes) -> Result<()>;

    /// Describe the location's content.
    fn content_description(&self, location: &Location) -> Result<ContentDescription>;
}

impl<H: UriHandler + ?Sized> UriHandler for Box<H> {
    fn can_handle(&self, location: &Location) -> bool {
        (**self).can_handle(location)
    }

    fn open(&self, location: &Location) -> Result<Box<dyn Read + Send>> {
        (**self).open(location)
    }

    fn exists(&self, location: &Location) -> Result<bool> {
        (**self).exists(location)
    }

    fn delete(&self, location: &Location) -> Result<()> {
        (**self).delete(location)
    }

    fn attributes(&self, location: &Location) -> Result<Attributes> {
        (**self).attributes(location)
    }

    fn set_attributes(&self, location: &Location, attributes: &Attributes) -> Result<()> {
        (**self).set_attributes(location, attributes)
    }

    fn content_description(&self, location: &Location) -> Result<ContentDescription> {
        (**self).content_description(location)
    }
}

/// Open a location and read it completely into memory.
pub fn read_all(handler: &(impl UriHandler + ?Sized), location: &Location) -> Result<Vec<u8>> {
    let mut stream = handler.open(location)?;
    let mut bytes = Vec::new();
    stream
        .read_to_end(&mut bytes)
        .map_err(|e| FetchError::io("read", location, e))?;
    Ok(bytes)
}
