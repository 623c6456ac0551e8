//! Error types for fetch operations.

use archiver_model::Location;
use thiserror::Error;

/// Errors that can occur while reading or manipulating a location.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FetchError {
    /// Two consecutive fetches of the same location returned different bytes.
    #[error("the server is delivering inconsistent results for {location}")]
    Inconsistent {
        /// Location that was fetched.
        location: Location,
        /// SHA-256 of the first fetch.
        first_digest: String,
        /// SHA-256 of the second fetch.
        second_digest: String,
    },

    /// The server answered with a non-success status.
    #[error("request for {location} failed with status {status}")]
    Status {
        /// Requested location.
        location: Location,
        /// HTTP status code.
        status: u16,
    },

    /// The request could not be completed.
    #[error("network error for {location}: {source}")]
    Network {
        /// Requested location.
        location: Location,
        /// Underlying client error.
        #[source]
        source: reqwest::Error,
    },

    /// Local I/O failed.
    #[error("failed to {operation} {location}: {source}")]
    Io {
        /// Operation that failed.
        operation: &'static str,
        /// Affected location.
        location: Location,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The handler does not implement the operation.
    #[error("{operation} is not supported for {location}")]
    Unsupported {
        /// Requested operation.
        operation: &'static str,
        /// Affected location.
        location: Location,
    },

    /// No handler accepts the location's scheme.
    #[error("no handler for {0}")]
    NoHandler(Location),

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl FetchError {
    /// Shorthand for [`FetchError::Io`].
    pub fn io(operation: &'static str, location: &Location, source: std::io::Error) -> Self {
        Self::Io {
            operation,
            location: location.clone(),
            source,
        }
    }

    /// Returns a short explanation suitable for console output.
    #[must_use]
    pub fn user_message(&self) -> &str {
        match self {
            Self::Inconsistent { .. } => {
                "The server returned different content on consecutive reads; skipped for this run."
            }
            Self::Status { .. } | Self::Network { .. } => "The remote location could not be read.",
            Self::Io { .. } => "A local file could not be accessed.",
            Self::Unsupported { .. } | Self::NoHandler(_) => {
                "The location uses a scheme this tool cannot handle."
            }
            Self::Client(_) => "The HTTP client could not be initialized.",
        }
    }

    /// Returns whether a later run might succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Inconsistent { .. } | Self::Network { .. } | Self::Status { .. }
        )
    }
}

/// Result type alias for fetch operations.
pub type Result<T> = std::result::Result<T, FetchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inconsistent_message_names_location() {
        let location = Location::parse("https://host/a.setup").unwrap();
        let err = FetchError::Inconsistent {
            location,
            first_digest: "a".to_string(),
            second_digest: "b".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "the server is delivering inconsistent results for https://host/a.setup"
        );
        assert!(err.is_transient());
        assert!(err.user_message().contains("different content"));
    }

    #[test]
    fn test_no_handler_is_not_transient() {
        let location = Location::parse("ftp://host/a.setup").unwrap();
        assert!(!FetchError::NoHandler(location).is_transient());
    }
}
