//! Handler for local `file:` locations.

use std::fs::{self, File};
use std::io::Read;
use std::path::PathBuf;
use std::time::SystemTime;

use archiver_model::Location;
use chrono::{DateTime, Utc};

use crate::error::{FetchError, Result};
use crate::handler::{Attributes, ContentDescription, UriHandler};

/// Reads and writes files on the local file system.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileHandler;

impl FileHandler {
    fn path(location: &Location) -> Result<PathBuf> {
        location.to_file_path().ok_or_else(|| FetchError::Unsupported {
            operation: "map to a file path",
            location: location.clone(),
        })
    }
}

/// MIME type guessed from the extension.
fn content_type_for(location: &Location) -> Option<&'static str> {
    let extension = location.file_extension()?.to_ascii_lowercase();
    let content_type = match extension.as_str() {
        "setup" | "ecore" | "xmi" | "genmodel" | "xml" => "application/xml",
        "gif" => "image/gif",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "svg" => "image/svg+xml",
        "zip" => "application/zip",
        _ => return None,
    };
    Some(content_type)
}

impl UriHandler for FileHandler {
    fn can_handle(&self, location: &Location) -> bool {
        location.scheme() == "file"
    }

    fn open(&self, location: &Location) -> Result<Box<dyn Read + Send>> {
        let path = Self::path(location)?;
        let file = File::open(&path).map_err(|e| FetchError::io("open", location, e))?;
        Ok(Box::new(file))
    }

    fn exists(&self, location: &Location) -> Result<bool> {
        Ok(Self::path(location)?.exists())
    }

    fn delete(&self, location: &Location) -> Result<()> {
        let path = Self::path(location)?;
        fs::remove_file(&path).map_err(|e| FetchError::io("delete", location, e))
    }

    fn attributes(&self, location: &Location) -> Result<Attributes> {
        let path = Self::path(location)?;
        let metadata = fs::metadata(&path).map_err(|e| FetchError::io("stat", location, e))?;
        Ok(Attributes {
            last_modified: metadata.modified().ok().map(DateTime::<Utc>::from),
            length: Some(metadata.len()),
            etag: None,
            read_only: metadata.permissions().readonly(),
        })
    }

    /// Only the modification time is applied.
    fn set_attributes(&self, location: &Location, attributes: &Attributes) -> Result<()> {
        let Some(last_modified) = attributes.last_modified else {
            return Ok(());
        };
        let path = Self::path(location)?;
        let file = File::options()
            .write(true)
            .open(&path)
            .map_err(|e| FetchError::io("open", location, e))?;
        file.set_modified(SystemTime::from(last_modified))
            .map_err(|e| FetchError::io("set modification time of", location, e))
    }

    fn content_description(&self, location: &Location) -> Result<ContentDescription> {
        Ok(ContentDescription {
            content_type: content_type_for(location).map(str::to_string),
        })
    }
}
