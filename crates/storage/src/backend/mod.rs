//! Engine selection and construction.

mod btree;
mod directory;
mod file;
#[cfg(feature = "mock")]
mod memory;

pub use self::btree::RedbBackend;
pub use self::directory::DirectoryBackend;
pub use self::file::FileBackend;
#[cfg(feature = "mock")]
pub use self::memory::MemoryBackend;
use crate::DiskHandle;
use crate::error::{ErrorKind, Result};
use derive_more::Display;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tracing::instrument;

/// Available on-disk engines.
#[derive(Clone, Copy, Debug, Default, Display, PartialEq, Eq, Hash)]
pub enum Backend {
    #[default]
    #[display("redb")]
    Redb,
    #[display("directory")]
    Directory,
    #[display("file")]
    File,
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "redb" | "btree" => Ok(Backend::Redb),
            "directory" | "dir" => Ok(Backend::Directory),
            "file" | "filekv" => Ok(Backend::File),
            other => Err(format!("unknown disk backend: {other}")),
        }
    }
}

/// Open the engine selected by `backend` inside `dir`, creating the
/// directory if needed.
#[instrument(skip(dir), fields(dir = %dir.display()))]
pub fn open(backend: Backend, dir: &Path) -> Result<DiskHandle> {
    if dir.exists() && !dir.is_dir() {
        exn::bail!(ErrorKind::InvalidPath(dir.to_path_buf()));
    }
    let handle: DiskHandle = match backend {
        Backend::Redb => Arc::new(RedbBackend::open(dir)?),
        Backend::Directory => Arc::new(DirectoryBackend::open(dir)?),
        Backend::File => Arc::new(FileBackend::open(dir)?),
    };
    tracing::debug!(backend = handle.name(), "Opened disk store");
    Ok(handle)
}
