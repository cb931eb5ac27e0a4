use crate::error::{ErrorKind, Result};
use crate::gc;
use crate::options::{HybridOptions, Mode};
use exn::ResultExt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tierkv_cache::{CacheOptions, EvictionCache, EvictionListener, EvictionReason};
use tierkv_storage::{DiskHandle, ScanOptions};
use tracing::instrument;

/// Memory tier listener that spills victims into the disk tier.
///
/// Holds its own handle to the disk tier so the cache never refers back to
/// the store that owns it.
struct Demoter {
    disk: Option<DiskHandle>,
    on_expired: bool,
    forward: Option<Arc<dyn EvictionListener>>,
}

impl Demoter {
    fn demote(&self, disk: &DiskHandle, key: &str, value: &[u8], reason: EvictionReason) {
        match disk.set(key, value, None) {
            Ok(()) => tracing::trace!(key, %reason, "Demoted entry to disk"),
            Err(err) => tracing::warn!(key, %reason, error = ?err, "Failed to demote entry to disk"),
        }
    }
}

impl EvictionListener for Demoter {
    fn on_evict(&self, key: &str, value: &[u8], reason: EvictionReason) {
        if let Some(disk) = &self.disk {
            match reason {
                EvictionReason::Capacity => self.demote(disk, key, value, reason),
                EvictionReason::Expired if self.on_expired => self.demote(disk, key, value, reason),
                // An older demoted copy must not outlive the expired value.
                EvictionReason::Expired => match disk.del(key) {
                    Ok(()) => {},
                    Err(err) if err.is_unsupported() => {},
                    Err(err) => tracing::warn!(key, error = ?err, "Failed to drop expired entry from disk"),
                },
                EvictionReason::Deleted => {},
            }
        }
        if let Some(listener) = &self.forward {
            listener.on_evict(key, value, reason);
        }
    }
}

/// Key/value store over a memory tier, a disk tier, or both.
///
/// In [`Mode::Hybrid`] writes land in memory. Entries pushed out of memory
/// by capacity or expiry are written to disk without an expiry, and disk
/// hits are copied back into memory. With expiry demotion turned off an
/// expired entry is removed from disk as well, so an older demoted value
/// never comes back. A promoted key stays on disk too, so it can be counted
/// by [`size`](Self::size) and visited by [`scan`](Self::scan) twice.
///
/// ```
/// use tierkv::{HybridOptions, HybridStore};
///
/// let dir = tempfile::tempdir().unwrap();
/// let store = HybridStore::new(HybridOptions::hybrid().with_max_memory_items(1).with_path(dir.path())).unwrap();
/// store.set("a", b"1").unwrap();
/// store.set("b", b"2").unwrap();
/// assert_eq!(store.len_memory(), 1);
/// assert_eq!(store.get("a").unwrap(), Some(b"1".to_vec()));
/// store.close().unwrap();
/// ```
pub struct HybridStore {
    mode: Mode,
    disk_expiration: Option<Duration>,
    cleanup: bool,
    memory: Option<EvictionCache>,
    disk: Option<DiskHandle>,
    path: Option<PathBuf>,
    allocated: bool,
}

impl HybridStore {
    #[instrument(skip(options), fields(mode = %options.mode, backend = %options.backend))]
    pub fn new(options: HybridOptions) -> Result<Self> {
        options.validate()?;
        let temp_root = options.temp_root.clone().unwrap_or_else(std::env::temp_dir);
        if options.collects_garbage()
            && let Some(age) = options.remove_older_than
        {
            let removed = gc::remove_stale_dirs(&temp_root, &options.temp_prefix, age)?;
            tracing::debug!(removed, "Collected stale disk tier directories");
        }

        let (disk, path, allocated) = if options.mode.uses_disk() {
            let (path, allocated) = match &options.path {
                Some(path) => (path.clone(), false),
                None => {
                    let dir = tempfile::Builder::new()
                        .prefix(&options.temp_prefix)
                        .tempdir_in(&temp_root)
                        .or_raise(|| ErrorKind::Io)?;
                    (dir.keep(), true)
                },
            };
            let disk = tierkv_storage::open(options.backend, &path).or_raise(|| ErrorKind::Storage)?;
            (Some(disk), Some(path), allocated)
        } else {
            (None, None, false)
        };

        let memory = if options.mode.uses_memory() {
            let demoter = Demoter {
                disk: disk.clone(),
                on_expired: options.move_to_disk_on_expiration,
                forward: options.on_evicted.clone(),
            };
            let mut cache_options = CacheOptions::default()
                .with_capacity(options.max_memory_items)
                .with_policy(options.policy)
                .with_listener(demoter);
            cache_options.default_ttl = options.memory_expiration;
            cache_options.sweep_interval = options.sweep_interval;
            Some(EvictionCache::new(cache_options).or_raise(|| ErrorKind::Cache)?)
        } else {
            None
        };

        tracing::debug!(path = ?path, "Opened store");
        Ok(Self {
            mode: options.mode,
            disk_expiration: options.disk_expiration,
            cleanup: options.cleanup,
            memory,
            disk,
            path,
            allocated,
        })
    }

    /// Store `value` under `key`. With a memory tier the write only touches
    /// memory; disk mode writes through with the disk expiration.
    pub fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        if let Some(memory) = &self.memory {
            memory.set(key, value);
        } else if let Some(disk) = &self.disk {
            disk.set(key, value, self.disk_expiration).or_raise(|| ErrorKind::Storage)?;
        }
        Ok(())
    }

    /// Look `key` up in memory, then on disk. A disk hit in hybrid mode is
    /// promoted into memory.
    pub fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        if let Some(memory) = &self.memory
            && let Some(value) = memory.get(key)
        {
            return Ok(Some(value));
        }
        let Some(disk) = &self.disk else {
            return Ok(None);
        };
        let value = match disk.get(key) {
            Ok(value) => value,
            Err(err) if err.is_not_found() => return Ok(None),
            Err(err) => return Err(err.raise(ErrorKind::Storage)),
        };
        if let Some(memory) = &self.memory {
            memory.set(key, value.clone());
            tracing::trace!(key, "Promoted entry to memory");
        }
        Ok(Some(value))
    }

    /// Remove `key` from every tier. Missing keys are not an error.
    pub fn del(&self, key: &str) -> Result<()> {
        if let Some(memory) = &self.memory {
            memory.delete(key);
        }
        if let Some(disk) = &self.disk {
            disk.del(key).or_raise(|| ErrorKind::Storage)?;
        }
        Ok(())
    }

    /// Visit the whole memory tier, then the whole disk tier. Keys present
    /// in both are visited twice. The first error from `visit` stops the
    /// scan and is returned unchanged.
    ///
    /// The memory tier is read-locked while it is visited, so `visit` must
    /// not write to this store.
    pub fn scan(&self, mut visit: impl FnMut(&str, &[u8]) -> Result<()>) -> Result<()> {
        if let Some(memory) = &self.memory {
            memory.scan(&mut visit)?;
        }
        let Some(disk) = &self.disk else {
            return Ok(());
        };
        let mut failed = None;
        let outcome = {
            let mut handler = |key: &str, value: &[u8]| -> tierkv_storage::error::Result<()> {
                visit(key, value).map_err(|err| {
                    failed = Some(err);
                    exn::Exn::from(tierkv_storage::error::ErrorKind::Visitor)
                })
            };
            disk.scan(ScanOptions::new(&mut handler))
        };
        if let Some(err) = failed {
            return Err(err);
        }
        outcome.or_raise(|| ErrorKind::Storage)
    }

    /// Memory entries plus whatever the disk tier reports as its size.
    pub fn size(&self) -> Result<u64> {
        let mut size = self.len_memory() as u64;
        if let Some(disk) = &self.disk {
            size += disk.size().or_raise(|| ErrorKind::Storage)?;
        }
        Ok(size)
    }

    /// Close the disk tier and, with cleanup enabled, remove the directory
    /// this store allocated for it.
    pub fn close(mut self) -> Result<()> {
        self.shutdown()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Directory of the disk tier, if there is one.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn len_memory(&self) -> usize {
        self.memory.as_ref().map_or(0, EvictionCache::item_count)
    }

    #[instrument(skip(self), fields(path = ?self.path, cleanup = self.cleanup))]
    fn shutdown(&mut self) -> Result<()> {
        // The memory tier holds a disk handle through its listener.
        if let Some(mut memory) = self.memory.take() {
            memory.stop_sweeper();
        }
        if let Some(disk) = self.disk.take() {
            disk.close().or_raise(|| ErrorKind::Storage)?;
        }
        if self.cleanup
            && self.allocated
            && let Some(path) = self.path.take()
        {
            fs::remove_dir_all(&path).or_raise(|| ErrorKind::Io)?;
            tracing::debug!(path = %path.display(), "Removed disk tier directory");
        }
        Ok(())
    }
}

impl Drop for HybridStore {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown() {
            tracing::warn!(error = ?err, "Failed to shut down store");
        }
    }
}

impl std::fmt::Debug for HybridStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HybridStore")
            .field("mode", &self.mode)
            .field("path", &self.path)
            .field("memory", &self.memory)
            .field("disk", &self.disk.as_ref().map(|disk| disk.name().to_string()))
            .finish()
    }
}
