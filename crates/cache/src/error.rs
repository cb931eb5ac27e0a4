//! Cache Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction. Reads and writes on a live cache never fail; errors
//! only come out of construction.

use derive_more::{Display, Error};

/// A cache error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for cache operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The options handed to the constructor can never produce a working cache.
    #[display("invalid cache configuration: {_0}")]
    InvalidConfig(#[error(not(source))] String),
    /// The background expiry sweeper could not be started.
    #[display("failed to start expiry sweeper")]
    Sweeper,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Sweeper)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_display() {
        assert_eq!(
            ErrorKind::InvalidConfig("sweep interval must be positive".to_string()).to_string(),
            "invalid cache configuration: sweep interval must be positive"
        );
        assert_eq!(ErrorKind::Sweeper.to_string(), "failed to start expiry sweeper");
    }

    #[test]
    fn error_kind_retryable() {
        assert!(!ErrorKind::InvalidConfig(String::new()).is_retryable());
        assert!(ErrorKind::Sweeper.is_retryable());
    }
}
