//! In-memory engine for testing.

use crate::error::{ErrorKind, Result};
use crate::stamp::{self, NEVER, Stamped};
use crate::{DiskStore, ScanOptions};
use exn::OptionExt;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// In-memory [`DiskStore`] for tests.
///
/// Records live in a [`BTreeMap`] behind a [`RwLock`], so scans visit keys
/// in order and every method works on `&self`. Expiry and `incr` behave like
/// the redb engine.
///
/// # Examples
///
/// ```
/// use tierkv_storage::DiskStore;
/// use tierkv_storage::backend::MemoryBackend;
///
/// let store = MemoryBackend::with_records([("a", "1"), ("b", "2")]);
/// assert_eq!(store.get("a").unwrap(), b"1");
/// assert_eq!(store.size().unwrap(), 2);
/// ```
pub struct MemoryBackend {
    name: String,
    records: RwLock<BTreeMap<String, (u64, Vec<u8>)>>,
    closed: AtomicBool,
}

impl MemoryBackend {
    /// Create a store pre-populated with records that never expire.
    pub fn with_records(records: impl IntoIterator<Item = (impl Into<String>, impl Into<Vec<u8>>)>) -> Self {
        let records = records.into_iter().map(|(key, value)| (key.into(), (NEVER, value.into()))).collect();
        Self { name: "memory".to_string(), records: RwLock::new(records), closed: AtomicBool::new(false) }
    }

    /// Change the name reported by [`DiskStore::name`].
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Keys currently held, expired or not.
    pub fn keys(&self) -> Vec<String> {
        self.records.read().keys().cloned().collect()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            exn::bail!(ErrorKind::Closed);
        }
        Ok(())
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        let records: [(&str, &[u8]); 0] = [];
        Self::with_records(records)
    }
}

impl DiskStore for MemoryBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<()> {
        self.ensure_open()?;
        let deadline = stamp::deadline(ttl, stamp::now_millis());
        self.records.write().insert(key.to_string(), (deadline, value.to_vec()));
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Vec<u8>> {
        self.ensure_open()?;
        let now = stamp::now_millis();
        let mut records = self.records.write();
        let (deadline, value) = records.get(key).ok_or_raise(|| ErrorKind::NotFound(key.to_string()))?;
        if Stamped::new(*deadline, value).is_expired(now) {
            records.remove(key);
            exn::bail!(ErrorKind::NotFound(key.to_string()));
        }
        Ok(value.clone())
    }

    fn del(&self, key: &str) -> Result<()> {
        self.ensure_open()?;
        self.records.write().remove(key);
        Ok(())
    }

    fn scan(&self, mut options: ScanOptions<'_>) -> Result<()> {
        self.ensure_open()?;
        let now = stamp::now_millis();
        // Snapshot first so the handler may write back into the store.
        let live: Vec<(String, Vec<u8>)> = {
            let records = self.records.read();
            let start = options.prefix.unwrap_or_default().to_string();
            records
                .range(start..)
                .take_while(|(key, _)| options.matches(key))
                .filter(|(_, (deadline, value))| !Stamped::new(*deadline, value).is_expired(now))
                .map(|(key, (_, value))| (key.clone(), value.clone()))
                .collect()
        };
        for (key, value) in live {
            (options.handler)(&key, &value)?;
        }
        Ok(())
    }

    fn size(&self) -> Result<u64> {
        self.ensure_open()?;
        Ok(self.records.read().len() as u64)
    }

    fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }

    fn incr(&self, key: &str, by: i64) -> Result<i64> {
        self.ensure_open()?;
        let now = stamp::now_millis();
        let mut records = self.records.write();
        let (current, deadline) = match records.get(key) {
            Some((deadline, value)) if !Stamped::new(*deadline, value).is_expired(now) => {
                let current = std::str::from_utf8(value)
                    .ok()
                    .and_then(|text| text.trim().parse::<i64>().ok())
                    .ok_or_raise(|| ErrorKind::NotAnInteger(key.to_string()))?;
                (current, *deadline)
            },
            _ => (0, NEVER),
        };
        let next = current.checked_add(by).ok_or_raise(|| ErrorKind::NotAnInteger(key.to_string()))?;
        records.insert(key.to_string(), (deadline, next.to_string().into_bytes()));
        Ok(next)
    }

    fn ttl(&self, key: &str) -> Result<Option<Duration>> {
        self.ensure_open()?;
        let now = stamp::now_millis();
        let records = self.records.read();
        let (deadline, value) = records
            .get(key)
            .filter(|(deadline, value)| !Stamped::new(*deadline, value).is_expired(now))
            .ok_or_raise(|| ErrorKind::NotFound(key.to_string()))?;
        Ok(Stamped::new(*deadline, value).remaining(now))
    }
}
