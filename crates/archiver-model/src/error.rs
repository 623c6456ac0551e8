//! Error types for model operations.

use thiserror::Error;

/// Errors raised while building or resolving locations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ModelError {
    /// The input could not be parsed as an absolute location.
    #[error("invalid location '{input}': {reason}")]
    InvalidLocation {
        /// Text that failed to parse.
        input: String,
        /// Parser explanation.
        reason: String,
    },

    /// A relative reference could not be resolved against its base.
    #[error("cannot resolve '{reference}' against {base}: {reason}")]
    Unresolvable {
        /// Base location.
        base: String,
        /// Relative reference.
        reference: String,
        /// Parser explanation.
        reason: String,
    },

    /// A file system path could not be turned into a `file:` location.
    #[error("path is not absolute: {0}")]
    RelativePath(String),
}

/// Result type alias for model operations.
pub type Result<T> = std::result::Result<T, ModelError>;
