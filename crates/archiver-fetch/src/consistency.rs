//! Double-fetch consistency checking.
//!
//! Some servers intermittently deliver truncated or garbage-suffixed
//! content. Every read through [`ConsistencyCheckedFetcher`] fetches the
//! location twice and only hands out the bytes when both copies agree, so a
//! corrupt download is never parsed or persisted.

use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use archiver_model::Location;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::error::{FetchError, Result};
use crate::handler::{Attributes, ContentDescription, UriHandler, read_all};

#[derive(Clone)]
struct VerifiedContent {
    bytes: Arc<[u8]>,
    digest: String,
}

/// Decorator that verifies every read by fetching twice.
///
/// Verified content is remembered per location until [`reset`] so that a
/// location is double-fetched exactly once per run. All operations other
/// than `open` pass straight through to the wrapped handler.
///
/// [`reset`]: ConsistencyCheckedFetcher::reset
pub struct ConsistencyCheckedFetcher<H> {
    inner: H,
    verified: Mutex<HashMap<Location, VerifiedContent>>,
}

impl<H: UriHandler> ConsistencyCheckedFetcher<H> {
    /// Wrap a handler.
    pub fn new(inner: H) -> Self {
        Self {
            inner,
            verified: Mutex::new(HashMap::new()),
        }
    }

    /// The wrapped handler.
    pub fn inner(&self) -> &H {
        &self.inner
    }

    /// Forget all verified content; called at the start of every run.
    pub fn reset(&self) {
        self.verified().clear();
    }

    /// Number of locations verified since the last reset.
    #[must_use]
    pub fn verified_count(&self) -> usize {
        self.verified().len()
    }

    fn verified(&self) -> MutexGuard<'_, HashMap<Location, VerifiedContent>> {
        self.verified.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn fetch_verified(&self, location: &Location) -> Result<Arc<[u8]>> {
        if let Some(content) = self.verified().get(location) {
            debug!(%location, "using verified content");
            return Ok(Arc::clone(&content.bytes));
        }

        let first = read_all(&self.inner, location)?;
        let second = read_all(&self.inner, location)?;
        if first != second {
            let first_digest = compute_sha256(&first);
            let second_digest = compute_sha256(&second);
            warn!(
                %location,
                first_len = first.len(),
                second_len = second.len(),
                %first_digest,
                %second_digest,
                "inconsistent content on consecutive reads"
            );
            return Err(FetchError::Inconsistent {
                location: location.clone(),
                first_digest,
                second_digest,
            });
        }

        let content = VerifiedContent {
            digest: compute_sha256(&first),
            bytes: Arc::from(first),
        };
        debug!(%location, digest = %content.digest, len = content.bytes.len(), "verified");
        let bytes = Arc::clone(&content.bytes);
        self.verified().insert(location.clone(), content);
        Ok(bytes)
    }
}

/// Computes the SHA-256 hash of the given data as lower-case hex.
#[must_use]
pub fn compute_sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

impl<H: UriHandler> UriHandler for ConsistencyCheckedFetcher<H> {
    fn can_handle(&self, location: &Location) -> bool {
        self.inner.can_handle(location)
    }

    fn open(&self, location: &Location) -> Result<Box<dyn Read + Send>> {
        let bytes = self.fetch_verified(location)?;
        Ok(Box::new(Cursor::new(bytes)))
    }

    fn exists(&self, location: &Location) -> Result<bool> {
        self.inner.exists(location)
    }

    fn delete(&self, location: &Location) -> Result<()> {
        self.inner.delete(location)
    }

    fn attributes(&self, location: &Location) -> Result<Attributes> {
        self.inner.attributes(location)
    }

    fn set_attributes(&self, location: &Location, attributes: &Attributes) -> Result<()> {
        self.inner.set_attributes(location, attributes)
    }

    fn content_description(&self, location: &Location) -> Result<ContentDescription> {
        self.inner.content_description(location)
    }
}
