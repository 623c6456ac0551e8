//! Resource fetching for the setup archiver.
//!
//! All reads go through the [`UriHandler`] trait. The [`UriConverter`] is
//! the fixed composition used by a run: the network handler (normally a
//! [`ConsistencyCheckedFetcher`] around an [`HttpHandler`]) for `http` and
//! `https`, and a [`FileHandler`] for `file:` locations.
//!
//! # Example
//!
//! ```no_run
//! use std::io::Read;
//!
//! use archiver_fetch::{ConsistencyCheckedFetcher, HttpHandler, UriConverter, UriHandler};
//! use archiver_model::Location;
//!
//! fn fetch() -> archiver_fetch::Result<Vec<u8>> {
//!     let network = ConsistencyCheckedFetcher::new(HttpHandler::new(HttpHandler::DEFAULT_TIMEOUT)?);
//!     let converter = UriConverter::new(network);
//!     let location = Location::parse("https://www.eclipse.org/setups/index.setup").unwrap();
//!     let mut bytes = Vec::new();
//!     converter
//!         .open(&location)?
//!         .read_to_end(&mut bytes)
//!         .map_err(|e| archiver_fetch::FetchError::io("read", &location, e))?;
//!     Ok(bytes)
//! }
//! ```

pub mod consistency;
pub mod converter;
pub mod error;
pub mod file;
pub mod handler;
pub mod http;

pub use consistency::ConsistencyCheckedFetcher;
pub use converter::{NETWORK_SCHEMES, UriConverter};
pub use error::{FetchError, Result};
pub use file::FileHandler;
pub use handler::{Attributes, ContentDescription, UriHandler, read_all};
pub use http::HttpHandler;
