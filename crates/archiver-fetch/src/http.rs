//! Network loader for `http` and `https` locations.

use std::io::{Cursor, Read};
use std::time::Duration;

use archiver_model::Location;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use reqwest::header::{CONTENT_TYPE, ETAG, HeaderMap, LAST_MODIFIED};
use tracing::debug;

use crate::error::{FetchError, Result};
use crate::handler::{Attributes, ContentDescription, UriHandler};

/// User agent string for requests.
const USER_AGENT_VALUE: &str = concat!("setup-archiver/", env!("CARGO_PKG_VERSION"));

/// Blocking HTTP handler.
///
/// Reads are plain GET requests; metadata queries use HEAD. Remote
/// locations are read-only, so `delete` and `set_attributes` fail with
/// [`FetchError::Unsupported`].
pub struct HttpHandler {
    client: Client,
}

impl HttpHandler {
    /// Request timeout used when none is configured.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

    /// Create a handler whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT_VALUE)
            .build()
            .map_err(FetchError::Client)?;
        Ok(Self { client })
    }

    fn head(&self, location: &Location) -> Result<Response> {
        self.client
            .head(location.as_str())
            .send()
            .map_err(|source| FetchError::Network {
                location: location.clone(),
                source,
            })
    }
}

fn check_status(location: &Location, response: &Response) -> Result<()> {
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(FetchError::Status {
            location: location.clone(),
            status: status.as_u16(),
        })
    }
}

fn header_text<'h>(headers: &'h HeaderMap, name: impl reqwest::header::AsHeaderName) -> Option<&'h str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

fn parse_last_modified(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value)
        .ok()
        .map(|date| date.with_timezone(&Utc))
}

impl UriHandler for HttpHandler {
    fn can_handle(&self, location: &Location) -> bool {
        location.uses_scheme(&["http", "https"])
    }

    fn open(&self, location: &Location) -> Result<Box<dyn Read + Send>> {
        debug!(%location, "GET");
        let response = self
            .client
            .get(location.as_str())
            .send()
            .map_err(|source| FetchError::Network {
                location: location.clone(),
                source,
            })?;
        check_status(location, &response)?;
        let bytes = response.bytes().map_err(|source| FetchError::Network {
            location: location.clone(),
            source,
        })?;
        Ok(Box::new(Cursor::new(bytes)))
    }

    fn exists(&self, location: &Location) -> Result<bool> {
        let response = self.head(location)?;
        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND | StatusCode::GONE => Ok(false),
            _ => Err(FetchError::Status {
                location: location.clone(),
                status: response.status().as_u16(),
            }),
        }
    }

    fn delete(&self, location: &Location) -> Result<()> {
        Err(FetchError::Unsupported {
            operation: "delete",
            location: location.clone(),
        })
    }

    fn attributes(&self, location: &Location) -> Result<Attributes> {
        let response = self.head(location)?;
        check_status(location, &response)?;
        let headers = response.headers();
        Ok(Attributes {
            last_modified: header_text(headers, LAST_MODIFIED).and_then(parse_last_modified),
            length: response.content_length(),
            etag: header_text(headers, ETAG).map(str::to_string),
            read_only: true,
        })
    }

    fn set_attributes(&self, location: &Location, _attributes: &Attributes) -> Result<()> {
        Err(FetchError::Unsupported {
            operation: "set attributes",
            location: location.clone(),
        })
    }

    fn content_description(&self, location: &Location) -> Result<ContentDescription> {
        let response = self.head(location)?;
        check_status(location, &response)?;
        Ok(ContentDescription {
            content_type: header_text(response.headers(), CONTENT_TYPE).map(str::to_string),
        })
    }
}
