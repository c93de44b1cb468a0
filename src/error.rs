//! Error types for the stowage library
//!
//! This module provides a unified error handling system using `thiserror` for
//! every storage backend. The `Display` messages form a stable vocabulary
//! ("file is not found", "failed storing file", ...) that is identical across
//! backends, so callers can branch on the error without parsing
//! backend-specific text. The collaborator's raw error rides along as the
//! `source` where one exists.

use thiserror::Error;

/// Boxed error returned by backend collaborators (SDK clients, filesystem).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The error type shared by every storage backend
#[derive(Error, Debug)]
pub enum StorageError {
    /// A required configuration parameter is missing or invalid, or the
    /// native client could not be constructed. Surfaced at construction
    /// time; no adapter is produced.
    #[error("{reason}")]
    InvalidConfig {
        /// Human-readable cause, e.g. "invalid aws s3 region"
        reason: String,
    },

    /// The execution context was already cancelled when the operation was
    /// invoked. Checked before any backend I/O is issued.
    #[error("invalid context")]
    InvalidContext,

    /// The request named an empty object identifier.
    #[error("invalid file name")]
    InvalidFileName,

    /// Upload target already holds an object under this identifier. The
    /// local and memory backends refuse to overwrite.
    #[error("file already exists")]
    FileAlreadyExists,

    /// No object is stored under the requested identifier.
    #[error("file is not found")]
    FileNotFound,

    /// The storage directory could not be created for the local backend.
    #[error("failed create storage dir: {path}")]
    CreateDirFailed {
        /// The directory that could not be created
        path: String,
        /// Raw filesystem error
        #[source]
        source: std::io::Error,
    },

    /// The underlying write/put operation failed, or a cloud writer could
    /// not be closed after the payload was copied into it.
    #[error("failed storing file")]
    StoreFailed {
        /// Raw collaborator error
        #[source]
        source: BoxError,
    },

    /// The underlying open/get/read operation failed.
    #[error("failed retrieve file")]
    RetrieveFailed {
        /// Raw collaborator error
        #[source]
        source: BoxError,
    },

    /// The underlying remove/delete operation failed.
    #[error("failed delete file")]
    DeleteFailed {
        /// Raw collaborator error
        #[source]
        source: BoxError,
    },
}

impl StorageError {
    /// Shorthand for a construction-time configuration error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }
}

/// Convenience type alias for storage results
pub type StorageResult<T> = std::result::Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display_is_bare_reason() {
        let err = StorageError::invalid_config("invalid aws s3 region");
        assert_eq!(err.to_string(), "invalid aws s3 region");
    }

    #[test]
    fn test_stable_operation_messages() {
        let store = StorageError::StoreFailed {
            source: Box::new(std::io::Error::other("disk full")),
        };
        assert_eq!(store.to_string(), "failed storing file");

        let retrieve = StorageError::RetrieveFailed {
            source: Box::new(std::io::Error::other("bad sector")),
        };
        assert_eq!(retrieve.to_string(), "failed retrieve file");

        let delete = StorageError::DeleteFailed {
            source: Box::new(std::io::Error::other("busy")),
        };
        assert_eq!(delete.to_string(), "failed delete file");
    }

    #[test]
    fn test_source_is_preserved() {
        use std::error::Error as _;

        let err = StorageError::StoreFailed {
            source: Box::new(std::io::Error::other("disk full")),
        };
        let source = err.source().expect("source attached");
        assert!(source.to_string().contains("disk full"));
    }

    #[test]
    fn test_precondition_messages() {
        assert_eq!(StorageError::InvalidContext.to_string(), "invalid context");
        assert_eq!(
            StorageError::FileAlreadyExists.to_string(),
            "file already exists"
        );
        assert_eq!(StorageError::FileNotFound.to_string(), "file is not found");
    }
}
