//! Routing of locations to handlers.

use std::io::Read;

use archiver_model::Location;

use crate::error::{FetchError, Result};
use crate::file::FileHandler;
use crate::handler::{Attributes, ContentDescription, UriHandler};

/// Schemes served by the network handler.
pub const NETWORK_SCHEMES: &[&str] = &["http", "https"];

/// Fixed handler composition used by a mirroring run.
///
/// `http` and `https` go to the network handler `N`; `file` goes to the
/// local [`FileHandler`]. Any other scheme fails with
/// [`FetchError::NoHandler`].
pub struct UriConverter<N> {
    network: N,
    local: FileHandler,
}

impl<N: UriHandler> UriConverter<N> {
    /// Compose a converter around a network handler.
    pub fn new(network: N) -> Self {
        Self {
            network,
            local: FileHandler,
        }
    }

    /// The network handler.
    pub fn network(&self) -> &N {
        &self.network
    }

    fn handler_for(&self, location: &Location) -> Result<&dyn UriHandler> {
        if location.uses_scheme(NETWORK_SCHEMES) {
            Ok(&self.network)
        } else if self.local.can_handle(location) {
            Ok(&self.local)
        } else {
            Err(FetchError::NoHandler(location.clone()))
        }
    }
}

impl<N: UriHandler> UriHandler for UriConverter<N> {
    fn can_handle(&self, location: &Location) -> bool {
        self.handler_for(location).is_ok()
    }

    fn open(&self, location: &Location) -> Result<Box<dyn Read + Send>> {
        self.handler_for(location)?.open(location)
    }

    fn exists(&self, location: &Location) -> Result<bool> {
        self.handler_for(location)?.exists(location)
    }

    fn delete(&self, location: &Location) -> Result<()> {
        self.handler_for(location)?.delete(location)
    }

    fn attributes(&self, location: &Location) -> Result<Attributes> {
        self.handler_for(location)?.attributes(location)
    }

    fn set_attributes(&self, location: &Location, attributes: &Attributes) -> Result<()> {
        self.handler_for(location)?
            .set_attributes(location, attributes)
    }

    fn content_description(&self, location: &Location) -> Result<ContentDescription> {
        self.handler_for(location)?.content_description(location)
    }
}
