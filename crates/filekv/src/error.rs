//! FileKv Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction. Duplicates and filtered records are not errors; they
//! are reported through [`Insert`](crate::Insert) and [`Stats`](crate::Stats).

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A FileKv error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for FileKv operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The options can never produce a working store.
    #[display("invalid store configuration: {_0}")]
    InvalidConfig(#[error(not(source))] String),
    /// A path source could not be opened. Nothing from it was staged.
    #[display("cannot open source: {}", _0.display())]
    Source(#[error(not(source))] PathBuf),
    /// Merging stopped part way through; `written` records were staged before the failure.
    #[display("merge failed after {written} records")]
    Merge { written: u64 },
    /// A staging or final store file could not be read or written.
    #[display("I/O error")]
    Io,
    /// A record was longer than [`FileKvOptions::max_line_len`](crate::FileKvOptions::max_line_len).
    #[display("record longer than {limit} bytes")]
    LineTooLong { limit: usize },
    /// The compression layer could not be set up.
    #[display("compression error")]
    Compression,
    /// [`process`](crate::FileKv::process) was called a second time.
    #[display("store has already been processed")]
    AlreadyProcessed,
    /// The scan visitor returned an error.
    #[display("scan visitor failed")]
    Visitor,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Io | ErrorKind::Source(_))
    }
}
