use crate::error::{ErrorKind, Result};
use std::time::Duration;

/// Record visitor used by [`DiskStore::scan`].
pub type Handler<'a> = dyn FnMut(&str, &[u8]) -> Result<()> + 'a;

/// What to visit during a [`DiskStore::scan`].
pub struct ScanOptions<'a> {
    /// Only visit keys starting with this prefix.
    pub prefix: Option<&'a str>,
    /// Called once per live record. Returning an error stops the scan and
    /// the error is returned from `scan` as is.
    pub handler: &'a mut Handler<'a>,
}

impl<'a> ScanOptions<'a> {
    pub fn new(handler: &'a mut Handler<'a>) -> Self {
        Self { prefix: None, handler }
    }

    pub fn with_prefix(mut self, prefix: &'a str) -> Self {
        self.prefix = Some(prefix);
        self
    }

    pub(crate) fn matches(&self, key: &str) -> bool {
        self.prefix.is_none_or(|prefix| key.starts_with(prefix))
    }
}

/// Uniform interface over on-disk key/value engines.
///
/// Every engine is safe to share between threads and is used through a
/// [`DiskHandle`](crate::DiskHandle). A missing key is reported as
/// [`NotFound`](ErrorKind::NotFound); an operation an engine cannot perform
/// is reported as [`Unsupported`](ErrorKind::Unsupported) rather than
/// silently ignored.
///
/// # Expiration
/// Records written with a `ttl` read as missing once it has passed. Engines
/// expire lazily; there is no background compaction.
pub trait DiskStore: Send + Sync {
    /// Name of the engine, for logging and error messages.
    fn name(&self) -> &str;

    /// Store `value` under `key`, replacing any previous record. `None` or a
    /// zero `ttl` means the record never expires.
    fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<()>;

    fn get(&self, key: &str) -> Result<Vec<u8>>;

    /// Remove `key`. Removing a missing key succeeds.
    fn del(&self, key: &str) -> Result<()>;

    /// Visit live records. Visiting order is engine-specific.
    fn scan(&self, options: ScanOptions<'_>) -> Result<()>;

    /// Engine-specific size: a record count for keyed engines, a byte count
    /// for file-backed ones.
    fn size(&self) -> Result<u64>;

    /// Release the engine. Later calls fail with [`Closed`](ErrorKind::Closed).
    fn close(&self) -> Result<()>;

    /// Atomically add `by` to the decimal integer stored under `key`
    /// (missing counts as zero) and return the new value.
    fn incr(&self, key: &str, by: i64) -> Result<i64> {
        let _ = (key, by);
        Err(ErrorKind::unsupported(self.name(), "incr"))
    }

    /// Time left before `key` expires, `None` if it never does.
    fn ttl(&self, key: &str) -> Result<Option<Duration>> {
        let _ = key;
        Err(ErrorKind::unsupported(self.name(), "ttl"))
    }

    fn set_many(&self, records: &[(&str, &[u8])], ttl: Option<Duration>) -> Result<()> {
        records.iter().try_for_each(|(key, value)| self.set(key, value, ttl))
    }

    /// Fetch several keys; missing keys come back as `None`.
    fn get_many(&self, keys: &[&str]) -> Result<Vec<Option<Vec<u8>>>> {
        keys.iter()
            .map(|key| match self.get(key) {
                Ok(value) => Ok(Some(value)),
                Err(err) if err.is_not_found() => Ok(None),
                Err(err) => Err(err),
            })
            .collect()
    }

    fn del_many(&self, keys: &[&str]) -> Result<()> {
        keys.iter().try_for_each(|key| self.del(key))
    }
}
