//! Hybrid Store Error Types
//!
//! Failures from the tiers are raised into these kinds with the tier's own
//! error kept as the child frame.

use derive_more::{Display, Error};

/// A hybrid store error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for hybrid store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The options can never produce a working store.
    #[display("invalid store configuration: {_0}")]
    InvalidConfig(#[error(not(source))] String),
    /// The memory tier could not be built.
    #[display("memory tier error")]
    Cache,
    /// The disk tier failed.
    #[display("disk tier error")]
    Storage,
    /// Filesystem work around the disk tier failed.
    #[display("I/O error")]
    Io,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage | Self::Io)
    }
}
