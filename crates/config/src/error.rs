//! Configuration Error Types

use derive_more::{Display, Error};
use std::path::PathBuf;

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The settings file extension is not one of `toml`, `yaml`, `yml` or `json`.
    #[display("unsupported settings format: {}", _0.display())]
    UnsupportedFormat(#[error(not(source))] PathBuf),
    /// An explicitly requested settings file does not exist.
    #[display("settings file not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// The merged settings could not be deserialized.
    #[display("invalid settings")]
    Invalid,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed. Settings errors need a fix
    /// to the file or environment first.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
