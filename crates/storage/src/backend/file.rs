//! Append-only record file engine.
//!
//! Wraps a [`FileKv`] final store: records are appended in write order and
//! replayed in that order by `scan`. The file cannot be searched by key, so
//! `get`, `del`, `incr` and `ttl` report [`Unsupported`](ErrorKind::Unsupported).
//! Writes are deduplicated by key like any other FileKv write, so a key
//! written twice keeps its first value. A hybrid store demoting the same key
//! again will still replay the older value.

use crate::error::{ErrorKind, Result};
use crate::{DiskStore, ScanOptions};
use exn::{OptionExt, ResultExt};
use parking_lot::RwLock;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tierkv_filekv::{FileKv, FileKvOptions, Insert};

/// Name of the record file inside the store directory.
pub const FILE_NAME: &str = "store.kv";

pub struct FileBackend {
    store: RwLock<Option<Arc<FileKv>>>,
}

impl FileBackend {
    pub fn open(dir: &Path) -> Result<Self> {
        Self::with_options(FileKvOptions::new(dir.join(FILE_NAME)).with_staging_dir(dir))
    }

    pub fn with_options(options: FileKvOptions) -> Result<Self> {
        let store = FileKv::open(options).or_raise(|| ErrorKind::FileStore)?;
        Ok(Self { store: RwLock::new(Some(Arc::new(store))) })
    }

    fn store(&self) -> Result<Arc<FileKv>> {
        self.store.read().clone().ok_or_raise(|| ErrorKind::Closed)
    }
}

impl DiskStore for FileBackend {
    fn name(&self) -> &str {
        "file"
    }

    /// The `ttl` is ignored: records in the file never expire.
    fn set(&self, key: &str, value: &[u8], _ttl: Option<Duration>) -> Result<()> {
        match self.store()?.set(key.as_bytes(), value).or_raise(|| ErrorKind::FileStore)? {
            Insert::Written => {},
            outcome => tracing::debug!(key, ?outcome, "Record not appended, earlier value kept"),
        }
        Ok(())
    }

    fn get(&self, _key: &str) -> Result<Vec<u8>> {
        Err(ErrorKind::unsupported(self.name(), "get"))
    }

    fn del(&self, _key: &str) -> Result<()> {
        Err(ErrorKind::unsupported(self.name(), "del"))
    }

    fn scan(&self, mut options: ScanOptions<'_>) -> Result<()> {
        let store = self.store()?;
        let mut failed = None;
        let outcome = store.scan(|key, value| {
            let key = String::from_utf8_lossy(key);
            if !options.matches(&key) {
                return Ok(());
            }
            match (options.handler)(&key, value) {
                Ok(()) => Ok(()),
                Err(err) => {
                    failed = Some(err);
                    exn::bail!(tierkv_filekv::error::ErrorKind::Visitor)
                },
            }
        });
        if let Some(err) = failed {
            return Err(err);
        }
        outcome.or_raise(|| ErrorKind::FileStore)
    }

    /// Size of the record file in bytes.
    fn size(&self) -> Result<u64> {
        self.store()?.size().or_raise(|| ErrorKind::FileStore)
    }

    fn close(&self) -> Result<()> {
        let Some(store) = self.store.write().take() else {
            return Ok(());
        };
        match Arc::try_unwrap(store) {
            Ok(store) => store.close().or_raise(|| ErrorKind::FileStore),
            Err(_) => {
                tracing::warn!("File store still in use by a running scan; files are left in place");
                Ok(())
            },
        }
    }
}
