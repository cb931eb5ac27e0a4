//! One-file-per-key storage engine.
//!
//! Each record is stored in the configured directory under the hex BLAKE3
//! hash of its key, so arbitrary keys map to safe file names. The file holds
//! the expiry header, the key (needed to list records) and the value:
//!
//! ```text
//! [deadline: u64 LE][key length: u32 LE][key][value]
//! ```
//!
//! Writes go to a temporary file in the same directory that is then renamed
//! over the record, so readers never see a partial record.

use crate::error::{ErrorKind, Result};
use crate::stamp::{self, Stamped};
use crate::{DiskStore, ScanOptions};
use exn::ResultExt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

const TEMP_PREFIX: &str = ".tmp-";
const KEY_LEN: usize = size_of::<u32>();

pub struct DirectoryBackend {
    root: PathBuf,
    closed: AtomicBool,
}

/// A decoded record file.
#[derive(Debug)]
struct Record<'a> {
    key: &'a str,
    stamped: Stamped<'a>,
}

impl<'a> Record<'a> {
    fn parse(raw: &'a [u8]) -> Result<Self> {
        let stamped = Stamped::parse(raw)?;
        let Some((len, rest)) = stamped.value.split_first_chunk::<KEY_LEN>() else {
            exn::bail!(ErrorKind::InvalidData("record without key length".to_string()));
        };
        let len = u32::from_le_bytes(*len) as usize;
        if rest.len() < len {
            exn::bail!(ErrorKind::InvalidData("record key is truncated".to_string()));
        }
        let (key, value) = rest.split_at(len);
        let key = std::str::from_utf8(key).or_raise(|| ErrorKind::InvalidData("record key is not UTF-8".to_string()))?;
        let stamped = Stamped::new(stamped.deadline(), value);
        Ok(Self { key, stamped })
    }

    fn encode(key: &str, value: &[u8], deadline: u64) -> Result<Vec<u8>> {
        let len = u32::try_from(key.len()).or_raise(|| ErrorKind::InvalidData("key too long".to_string()))?;
        let mut body = Vec::with_capacity(KEY_LEN + key.len() + value.len());
        body.extend_from_slice(&len.to_le_bytes());
        body.extend_from_slice(key.as_bytes());
        body.extend_from_slice(value);
        Ok(stamp::encode(&body, deadline))
    }
}

impl DirectoryBackend {
    /// Use `root` as the record directory, creating it if needed.
    pub fn open(root: &Path) -> Result<Self> {
        fs::create_dir_all(root).map_err(|err| Self::map_io_error(err, root))?;
        Ok(Self { root: root.to_path_buf(), closed: AtomicBool::new(false) })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn record_path(&self, key: &str) -> PathBuf {
        self.root.join(blake3::hash(key.as_bytes()).to_hex().as_str())
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            exn::bail!(ErrorKind::Closed);
        }
        Ok(())
    }

    fn map_io_error(err: io::Error, path: &Path) -> exn::Exn<ErrorKind> {
        match err.kind() {
            io::ErrorKind::NotFound | io::ErrorKind::NotADirectory => {
                exn::Exn::from(err).raise(ErrorKind::InvalidPath(path.to_path_buf()))
            },
            _ => exn::Exn::from(err).raise(ErrorKind::Io),
        }
    }

    /// Read the raw record for `key`, `None` if there is no file.
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match fs::read(self.record_path(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err).or_raise(|| ErrorKind::Io),
        }
    }

    fn live<'a>(key: &str, raw: &'a [u8], now: u64) -> Result<Option<Stamped<'a>>> {
        let record = Record::parse(raw)?;
        if record.key != key {
            exn::bail!(ErrorKind::InvalidData(format!("hash collision between {key} and {}", record.key)));
        }
        Ok((!record.stamped.is_expired(now)).then_some(record.stamped))
    }
}

impl DiskStore for DirectoryBackend {
    fn name(&self) -> &str {
        "directory"
    }

    fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<()> {
        self.ensure_open()?;
        let raw = Record::encode(key, value, stamp::deadline(ttl, stamp::now_millis()))?;
        let mut temp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempfile_in(&self.root)
            .map_err(|err| Self::map_io_error(err, &self.root))?;
        temp.write_all(&raw).or_raise(|| ErrorKind::Io)?;
        temp.persist(self.record_path(key)).or_raise(|| ErrorKind::Io)?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Vec<u8>> {
        self.ensure_open()?;
        let not_found = || exn::Exn::from(ErrorKind::NotFound(key.to_string()));
        let raw = self.read(key)?.ok_or_else(not_found)?;
        match Self::live(key, &raw, stamp::now_millis())? {
            Some(stamped) => Ok(stamped.value.to_vec()),
            None => {
                if let Err(err) = self.del(key) {
                    tracing::warn!(key, error = ?err, "Failed to remove expired record");
                }
                Err(not_found())
            },
        }
    }

    fn del(&self, key: &str) -> Result<()> {
        self.ensure_open()?;
        match fs::remove_file(self.record_path(key)) {
            Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err).or_raise(|| ErrorKind::Io),
            _ => Ok(()),
        }
    }

    fn scan(&self, mut options: ScanOptions<'_>) -> Result<()> {
        self.ensure_open()?;
        let now = stamp::now_millis();
        let entries = fs::read_dir(&self.root).map_err(|err| Self::map_io_error(err, &self.root))?;
        for entry in entries {
            let entry = entry.or_raise(|| ErrorKind::Io)?;
            if entry.file_name().to_string_lossy().starts_with(TEMP_PREFIX) {
                continue;
            }
            let raw = match fs::read(entry.path()) {
                Ok(raw) => raw,
                // Deleted since the directory was listed.
                Err(err) if err.kind() == io::ErrorKind::NotFound => continue,
                Err(err) => return Err(err).or_raise(|| ErrorKind::Io),
            };
            let record = Record::parse(&raw)?;
            if record.stamped.is_expired(now) || !options.matches(record.key) {
                continue;
            }
            (options.handler)(record.key, record.stamped.value)?;
        }
        Ok(())
    }

    fn size(&self) -> Result<u64> {
        self.ensure_open()?;
        let entries = fs::read_dir(&self.root).map_err(|err| Self::map_io_error(err, &self.root))?;
        let mut count = 0;
        for entry in entries {
            let entry = entry.or_raise(|| ErrorKind::Io)?;
            if !entry.file_name().to_string_lossy().starts_with(TEMP_PREFIX) {
                count += 1;
            }
        }
        Ok(count)
    }

    fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }

    fn ttl(&self, key: &str) -> Result<Option<Duration>> {
        self.ensure_open()?;
        let not_found = || exn::Exn::from(ErrorKind::NotFound(key.to_string()));
        let raw = self.read(key)?.ok_or_else(not_found)?;
        let now = stamp::now_millis();
        let stamped = Self::live(key, &raw, now)?.ok_or_else(not_found)?;
        Ok(stamped.remaining(now))
    }
}
