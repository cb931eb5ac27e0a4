//! Embedded B-tree engine backed by redb.
//!
//! All records live in a single table of the `store.redb` file. Reads run
//! in their own read transaction, so a scan handler may write to the same
//! store without blocking.

use crate::error::{ErrorKind, Result};
use crate::stamp::{self, NEVER, Stamped};
use crate::{DiskStore, ScanOptions};
use exn::{OptionExt, ResultExt};
use parking_lot::RwLock;
use redb::{Database, ReadableTable, ReadableTableMetadata, TableDefinition};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

const RECORDS: TableDefinition<&str, &[u8]> = TableDefinition::new("records");

/// Name of the database file inside the store directory.
pub const FILE_NAME: &str = "store.redb";

pub struct RedbBackend {
    path: PathBuf,
    db: RwLock<Option<Arc<Database>>>,
}

impl RedbBackend {
    pub fn open(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir).or_raise(|| ErrorKind::Io)?;
        let path = dir.join(FILE_NAME);
        let db = Database::create(&path).or_raise(|| ErrorKind::Database)?;
        // Create the table up front so read transactions never miss it.
        let txn = db.begin_write().or_raise(|| ErrorKind::Database)?;
        txn.open_table(RECORDS).or_raise(|| ErrorKind::Database)?;
        txn.commit().or_raise(|| ErrorKind::Database)?;
        Ok(Self { path, db: RwLock::new(Some(Arc::new(db))) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn db(&self) -> Result<Arc<Database>> {
        self.db.read().clone().ok_or_raise(|| ErrorKind::Closed)
    }

    fn remove_expired(&self, db: &Database, key: &str) -> Result<()> {
        let txn = db.begin_write().or_raise(|| ErrorKind::Database)?;
        {
            let mut table = txn.open_table(RECORDS).or_raise(|| ErrorKind::Database)?;
            let expired = match table.get(key).or_raise(|| ErrorKind::Database)? {
                Some(raw) => Stamped::parse(raw.value())?.is_expired(stamp::now_millis()),
                None => false,
            };
            if expired {
                table.remove(key).or_raise(|| ErrorKind::Database)?;
            }
        }
        txn.commit().or_raise(|| ErrorKind::Database)
    }
}

impl DiskStore for RedbBackend {
    fn name(&self) -> &str {
        "redb"
    }

    fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<()> {
        let db = self.db()?;
        let raw = stamp::encode(value, stamp::deadline(ttl, stamp::now_millis()));
        let txn = db.begin_write().or_raise(|| ErrorKind::Database)?;
        {
            let mut table = txn.open_table(RECORDS).or_raise(|| ErrorKind::Database)?;
            table.insert(key, raw.as_slice()).or_raise(|| ErrorKind::Database)?;
        }
        txn.commit().or_raise(|| ErrorKind::Database)
    }

    fn get(&self, key: &str) -> Result<Vec<u8>> {
        let db = self.db()?;
        {
            let txn = db.begin_read().or_raise(|| ErrorKind::Database)?;
            let table = txn.open_table(RECORDS).or_raise(|| ErrorKind::Database)?;
            let Some(raw) = table.get(key).or_raise(|| ErrorKind::Database)? else {
                exn::bail!(ErrorKind::NotFound(key.to_string()));
            };
            let stamped = Stamped::parse(raw.value())?;
            if !stamped.is_expired(stamp::now_millis()) {
                return Ok(stamped.value.to_vec());
            }
        }
        if let Err(err) = self.remove_expired(&db, key) {
            tracing::warn!(key, error = ?err, "Failed to remove expired record");
        }
        exn::bail!(ErrorKind::NotFound(key.to_string()))
    }

    fn del(&self, key: &str) -> Result<()> {
        let db = self.db()?;
        let txn = db.begin_write().or_raise(|| ErrorKind::Database)?;
        {
            let mut table = txn.open_table(RECORDS).or_raise(|| ErrorKind::Database)?;
            table.remove(key).or_raise(|| ErrorKind::Database)?;
        }
        txn.commit().or_raise(|| ErrorKind::Database)
    }

    fn scan(&self, mut options: ScanOptions<'_>) -> Result<()> {
        let db = self.db()?;
        let txn = db.begin_read().or_raise(|| ErrorKind::Database)?;
        let table = txn.open_table(RECORDS).or_raise(|| ErrorKind::Database)?;
        let now = stamp::now_millis();
        let range = match options.prefix {
            Some(prefix) => table.range::<&str>(prefix..),
            None => table.range::<&str>(..),
        }
        .or_raise(|| ErrorKind::Database)?;
        for entry in range {
            let (key, raw) = entry.or_raise(|| ErrorKind::Database)?;
            let key = key.value();
            // Keys are sorted, so the prefix range ends at the first miss.
            if !options.matches(key) {
                break;
            }
            let stamped = Stamped::parse(raw.value())?;
            if stamped.is_expired(now) {
                continue;
            }
            (options.handler)(key, stamped.value)?;
        }
        Ok(())
    }

    fn size(&self) -> Result<u64> {
        let db = self.db()?;
        let txn = db.begin_read().or_raise(|| ErrorKind::Database)?;
        let table = txn.open_table(RECORDS).or_raise(|| ErrorKind::Database)?;
        table.len().or_raise(|| ErrorKind::Database)
    }

    fn close(&self) -> Result<()> {
        if self.db.write().take().is_some() {
            tracing::debug!(path = %self.path.display(), "Closed redb store");
        }
        Ok(())
    }

    fn incr(&self, key: &str, by: i64) -> Result<i64> {
        let db = self.db()?;
        let now = stamp::now_millis();
        let txn = db.begin_write().or_raise(|| ErrorKind::Database)?;
        let next = {
            let mut table = txn.open_table(RECORDS).or_raise(|| ErrorKind::Database)?;
            let (current, deadline) = match table.get(key).or_raise(|| ErrorKind::Database)? {
                Some(raw) => {
                    let stamped = Stamped::parse(raw.value())?;
                    if stamped.is_expired(now) {
                        (0, NEVER)
                    } else {
                        let current = std::str::from_utf8(stamped.value)
                            .ok()
                            .and_then(|text| text.trim().parse::<i64>().ok())
                            .ok_or_raise(|| ErrorKind::NotAnInteger(key.to_string()))?;
                        (current, stamped.deadline())
                    }
                },
                None => (0, NEVER),
            };
            let next = current.checked_add(by).ok_or_raise(|| ErrorKind::NotAnInteger(key.to_string()))?;
            let raw = stamp::encode(next.to_string().as_bytes(), deadline);
            table.insert(key, raw.as_slice()).or_raise(|| ErrorKind::Database)?;
            next
        };
        txn.commit().or_raise(|| ErrorKind::Database)?;
        Ok(next)
    }

    fn ttl(&self, key: &str) -> Result<Option<Duration>> {
        let db = self.db()?;
        let txn = db.begin_read().or_raise(|| ErrorKind::Database)?;
        let table = txn.open_table(RECORDS).or_raise(|| ErrorKind::Database)?;
        let raw = table.get(key).or_raise(|| ErrorKind::Database)?.ok_or_raise(|| ErrorKind::NotFound(key.to_string()))?;
        let stamped = Stamped::parse(raw.value())?;
        let now = stamp::now_millis();
        if stamped.is_expired(now) {
            exn::bail!(ErrorKind::NotFound(key.to_string()));
        }
        Ok(stamped.remaining(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, RedbBackend) {
        let dir = tempfile::tempdir().unwrap();
        let store = RedbBackend::open(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn set_get_del() {
        let (_dir, store) = store();
        store.set("a", b"1", None).unwrap();
        assert_eq!(store.get("a").unwrap(), b"1");
        store.del("a").unwrap();
        assert!(store.get("a").unwrap_err().is_not_found());
        store.del("a").unwrap();
    }

    #[test]
    fn expired_record_reads_as_missing() {
        let (_dir, store) = store();
        store.set("a", b"1", Some(Duration::from_millis(10))).unwrap();
        assert!(store.ttl("a").unwrap().is_some());
        std::thread::sleep(Duration::from_millis(30));
        assert!(store.get("a").unwrap_err().is_not_found());
        assert_eq!(store.size().unwrap(), 0);
    }

    #[test]
    fn prefix_scan_is_sorted() {
        let (_dir, store) = store();
        for key in ["user:2", "user:1", "group:1", "users"] {
            store.set(key, key.as_bytes(), None).unwrap();
        }
        let mut seen = Vec::new();
        let mut handler = |key: &str, _: &[u8]| -> Result<()> {
            seen.push(key.to_string());
            Ok(())
        };
        store.scan(ScanOptions::new(&mut handler).with_prefix("user:")).unwrap();
        assert_eq!(seen, vec!["user:1", "user:2"]);
    }

    #[test]
    fn incr_counts() {
        let (_dir, store) = store();
        assert_eq!(store.incr("hits", 2).unwrap(), 2);
        assert_eq!(store.incr("hits", -5).unwrap(), -3);
        assert_eq!(store.get("hits").unwrap(), b"-3");
        store.set("name", b"abc", None).unwrap();
        assert!(matches!(*store.incr("name", 1).unwrap_err(), ErrorKind::NotAnInteger(_)));
    }

    #[test]
    fn closed_store_rejects_calls() {
        let (_dir, store) = store();
        store.close().unwrap();
        store.close().unwrap();
        assert_eq!(*store.get("a").unwrap_err(), ErrorKind::Closed);
    }

    #[test]
    fn reopen_keeps_records() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = RedbBackend::open(dir.path()).unwrap();
            store.set("a", b"1", None).unwrap();
            store.close().unwrap();
        }
        let store = RedbBackend::open(dir.path()).unwrap();
        assert_eq!(store.get("a").unwrap(), b"1");
        assert_eq!(store.path(), dir.path().join(FILE_NAME));
    }
}
