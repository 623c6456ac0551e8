//! Archive store error types.

use std::path::PathBuf;

use thiserror::Error;

/// Archive store operation error.
#[derive(Debug, Error)]
pub enum StoreError {
    /// File I/O error.
    #[error("Failed to {operation} {path}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The zip library rejected an operation.
    #[error("Failed to {operation} archive {path}")]
    Zip {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    /// The archive failed structural validation.
    #[error("Archive {path} is damaged: {reason}")]
    ArchiveDamaged { path: PathBuf, reason: String },

    /// An entry name does not have the `scheme/authority/path` shape.
    #[error("Entry name {name} does not map to a location: {reason}")]
    InvalidEntryName { name: String, reason: String },
}

impl StoreError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn zip(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: zip::result::ZipError,
    ) -> Self {
        Self::Zip {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn damaged(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::ArchiveDamaged {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Get a user-friendly message for this error.
    pub fn user_message(&self) -> String {
        match self {
            Self::Io {
                operation, path, ..
            } => format!("Could not {} {}", operation, path.display()),
            Self::Zip {
                operation, path, ..
            } => format!("Could not {} the zip archive at {}", operation, path.display()),
            Self::ArchiveDamaged { path, reason } => {
                format!("The archive at {} is damaged ({reason}).", path.display())
            }
            Self::InvalidEntryName { name, .. } => {
                format!("The archive entry '{name}' was not written by this tool.")
            }
        }
    }
}

/// Result type alias for archive store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
