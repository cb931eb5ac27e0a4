use crate::error::{ErrorKind, Result};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tierkv_compress::Compression;

/// Membership bound used when [`FileKvOptions::max_items`] is not changed.
pub const DEFAULT_MAX_ITEMS: usize = i16::MAX as usize;
pub const DEFAULT_SEPARATOR: &str = ";;;";
pub const DEFAULT_LINE_TERMINATOR: u8 = b'\n';
/// Longest record, in bytes, read back from a source or store file.
pub const DEFAULT_MAX_LINE_LEN: usize = 64 * 1024 * 1024;

/// Record predicate: return `true` to keep the `(key, value)` pair.
pub type Filter = Arc<dyn Fn(&[u8], &[u8]) -> bool + Send + Sync>;

/// Construction options for a [`FileKv`](crate::FileKv).
#[derive(Clone)]
pub struct FileKvOptions {
    /// Final store file. Created if missing, appended to if present.
    pub path: PathBuf,
    /// Reject keys already accepted, within the bound of `max_items`.
    pub dedupe: bool,
    /// How many accepted keys the dedupe set remembers.
    pub max_items: usize,
    /// Stream transform applied to both the staging and the final store.
    pub compression: Compression,
    /// Reject records with an empty key.
    pub skip_empty: bool,
    pub filter: Option<Filter>,
    /// Remove the final store on [`close`](crate::FileKv::close).
    pub cleanup: bool,
    pub separator: String,
    pub line_terminator: u8,
    /// Longest record accepted when reading sources, staging or the final store.
    pub max_line_len: usize,
    /// Directory for the staging file. Defaults to the system temp directory.
    pub staging_dir: Option<PathBuf>,
    /// Decode byte sources that start with a known compression signature.
    pub detect_compression: bool,
}

impl FileKvOptions {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            dedupe: true,
            max_items: DEFAULT_MAX_ITEMS,
            compression: Compression::None,
            skip_empty: false,
            filter: None,
            cleanup: true,
            separator: DEFAULT_SEPARATOR.to_string(),
            line_terminator: DEFAULT_LINE_TERMINATOR,
            max_line_len: DEFAULT_MAX_LINE_LEN,
            staging_dir: None,
            detect_compression: true,
        }
    }

    pub fn with_dedupe(mut self, dedupe: bool) -> Self {
        self.dedupe = dedupe;
        self
    }

    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = max_items;
        self
    }

    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    pub fn with_skip_empty(mut self, skip_empty: bool) -> Self {
        self.skip_empty = skip_empty;
        self
    }

    pub fn with_filter(mut self, filter: impl Fn(&[u8], &[u8]) -> bool + Send + Sync + 'static) -> Self {
        self.filter = Some(Arc::new(filter));
        self
    }

    pub fn with_cleanup(mut self, cleanup: bool) -> Self {
        self.cleanup = cleanup;
        self
    }

    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    pub fn with_line_terminator(mut self, terminator: u8) -> Self {
        self.line_terminator = terminator;
        self
    }

    pub fn with_max_line_len(mut self, max_line_len: usize) -> Self {
        self.max_line_len = max_line_len;
        self
    }

    pub fn with_staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = Some(dir.into());
        self
    }

    pub fn with_detect_compression(mut self, detect: bool) -> Self {
        self.detect_compression = detect;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.path.as_os_str().is_empty() {
            exn::bail!(ErrorKind::InvalidConfig("store path is empty".to_string()));
        }
        if self.dedupe && self.max_items == 0 {
            exn::bail!(ErrorKind::InvalidConfig("dedupe requires max_items above zero".to_string()));
        }
        if self.max_line_len == 0 {
            exn::bail!(ErrorKind::InvalidConfig("max_line_len must be above zero".to_string()));
        }
        if self.separator.is_empty() {
            exn::bail!(ErrorKind::InvalidConfig("field separator is empty".to_string()));
        }
        if self.separator.as_bytes().contains(&self.line_terminator) {
            exn::bail!(ErrorKind::InvalidConfig("field separator contains the line terminator".to_string()));
        }
        Ok(())
    }

    /// Whether a record that passed dedupe should still be dropped.
    pub(crate) fn rejects(&self, key: &[u8], value: &[u8]) -> bool {
        (self.skip_empty && key.is_empty()) || self.filter.as_ref().is_some_and(|keep| !keep(key, value))
    }
}

impl fmt::Debug for FileKvOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileKvOptions")
            .field("path", &self.path)
            .field("dedupe", &self.dedupe)
            .field("max_items", &self.max_items)
            .field("compression", &self.compression)
            .field("skip_empty", &self.skip_empty)
            .field("filter", &self.filter.is_some())
            .field("cleanup", &self.cleanup)
            .field("separator", &self.separator)
            .field("line_terminator", &self.line_terminator)
            .field("max_line_len", &self.max_line_len)
            .field("staging_dir", &self.staging_dir)
            .field("detect_compression", &self.detect_compression)
            .finish()
    }
}
