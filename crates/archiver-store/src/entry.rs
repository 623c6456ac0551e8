//! Mapping between locations and archive entry names.
//!
//! An entry name is the location's scheme, then its authority, then its
//! path segments, all joined with `/`:
//!
//! ```text
//! https://www.eclipse.org/setups/index.setup -> https/www.eclipse.org/setups/index.setup
//! ```
//!
//! Path segments are kept in their percent-encoded form so the mapping can
//! be inverted exactly. Query components are not represented; locations
//! carrying a query are never stored.

use archiver_model::Location;

use crate::error::{Result, StoreError};

/// The archive entry name for a location.
#[must_use]
pub fn entry_name(location: &Location) -> String {
    let mut name = format!("{}/{}", location.scheme(), location.authority());
    for segment in location.segments() {
        name.push('/');
        name.push_str(segment);
    }
    name
}

/// The location an entry name was derived from.
pub fn location_for_entry(name: &str) -> Result<Location> {
    let invalid = |reason: &str| StoreError::InvalidEntryName {
        name: name.to_string(),
        reason: reason.to_string(),
    };
    let (scheme, rest) = name
        .split_once('/')
        .ok_or_else(|| invalid("missing authority"))?;
    if scheme.is_empty() {
        return Err(invalid("empty scheme"));
    }
    let (authority, path) = rest.split_once('/').unwrap_or((rest, ""));
    Location::parse(&format!("{scheme}://{authority}/{path}"))
        .map_err(|e| invalid(&e.to_string()))
}
