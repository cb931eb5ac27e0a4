//! Storage Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction. Engine errors (redb, filesystem, FileKv) stay in the
//! tree as children of the kind raised here.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A storage error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The key is absent or its record has expired.
    #[display("key not found: {_0}")]
    NotFound(#[error(not(source))] String),
    /// The backend does not implement this operation.
    #[display("{operation} is not supported by the {backend} backend")]
    Unsupported { backend: String, operation: &'static str },
    /// A stored record could not be decoded.
    #[display("corrupt record: {_0}")]
    InvalidData(#[error(not(source))] String),
    /// `incr` found a value that is not a decimal integer.
    #[display("value of {_0} is not an integer")]
    NotAnInteger(#[error(not(source))] String),
    /// The storage directory is unusable.
    #[display("invalid storage path: {}", _0.display())]
    InvalidPath(#[error(not(source))] PathBuf),
    /// Underlying filesystem I/O failed.
    #[display("I/O error")]
    Io,
    /// The embedded database engine failed.
    #[display("database error")]
    Database,
    /// The FileKv engine failed.
    #[display("file store error")]
    FileStore,
    /// The store was used after [`close`](crate::DiskStore::close).
    #[display("store is closed")]
    Closed,
    /// A scan handler from another layer stopped the scan.
    #[display("scan stopped by handler")]
    Visitor,
}

impl ErrorKind {
    /// Build an [`Unsupported`](Self::Unsupported) error for `backend`.
    #[track_caller]
    pub fn unsupported(backend: &str, operation: &'static str) -> Error {
        exn::Exn::from(ErrorKind::Unsupported { backend: backend.to_string(), operation })
    }

    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io | Self::Database | Self::FileStore)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_display() {
        assert_eq!(ErrorKind::NotFound("k".to_string()).to_string(), "key not found: k");
        assert_eq!(
            ErrorKind::Unsupported { backend: "file".to_string(), operation: "get" }.to_string(),
            "get is not supported by the file backend"
        );
        assert_eq!(ErrorKind::Closed.to_string(), "store is closed");
    }

    #[test]
    fn unsupported_helper() {
        let err = ErrorKind::unsupported("file", "incr");
        assert_eq!(*err, ErrorKind::Unsupported { backend: "file".to_string(), operation: "incr" });
        assert!(!err.is_retryable());
        assert!(err.is_unsupported());
    }
}
