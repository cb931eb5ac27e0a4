use crate::error::{ErrorKind, Result};
use crate::membership::Membership;
use crate::{FileKvOptions, Source, record};
use exn::ResultExt;
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Seek, SeekFrom, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tierkv_compress::Encoder;
use tracing::instrument;

const STAGING_PREFIX: &str = "filekv-staging-";

type RecordWriter = Encoder<BufWriter<File>>;

/// Counters kept by a [`FileKv`] until the next [`reset`](FileKv::reset).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    /// Lines drained from sources by [`merge`](FileKv::merge).
    pub merged: u64,
    /// Records written to the final store.
    pub items: u64,
    /// Records rejected because their key was already accepted.
    pub duplicates: u64,
    /// Records rejected by `skip_empty` or the filter.
    pub filtered: u64,
}

/// Outcome of a single [`set`](FileKv::set).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Insert {
    Written,
    Duplicate,
    Filtered,
}

/// A file-backed store that merges sources into a staging file, then
/// deduplicates and filters them into an ordered final store.
///
/// ```no_run
/// use tierkv_filekv::{FileKv, FileKvOptions};
///
/// # fn example() -> tierkv_filekv::error::Result<()> {
/// let store = FileKv::open(FileKvOptions::new("/tmp/hosts.db"))?;
/// store.merge([vec!["a.example", "b.example"], vec!["b.example", "c.example"]])?;
/// store.process()?;
/// store.scan(|key, _| {
///     println!("{}", String::from_utf8_lossy(key));
///     Ok(())
/// })?;
/// store.close()
/// # }
/// ```
pub struct FileKv {
    options: FileKvOptions,
    state: Mutex<State>,
}

struct State {
    staging: NamedTempFile,
    staging_writer: Option<RecordWriter>,
    final_writer: Option<RecordWriter>,
    membership: Option<Membership>,
    stats: Stats,
    processed: bool,
}

impl FileKv {
    /// Open (or create) the final store and a fresh staging file.
    #[instrument(skip(options), fields(path = %options.path.display()))]
    pub fn open(options: FileKvOptions) -> Result<Self> {
        options.validate()?;
        if let Some(parent) = options.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).or_raise(|| ErrorKind::Io)?;
        }
        Self::open_final(&options.path)?;
        let mut builder = tempfile::Builder::new();
        builder.prefix(STAGING_PREFIX);
        let staging = match &options.staging_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .or_raise(|| ErrorKind::Io)?;
        tracing::debug!(staging = %staging.path().display(), "Opened file store");
        let membership = options.dedupe.then(|| Membership::new(options.max_items));
        Ok(Self {
            options,
            state: Mutex::new(State {
                staging,
                staging_writer: None,
                final_writer: None,
                membership,
                stats: Stats::default(),
                processed: false,
            }),
        })
    }

    /// Drain every source, in order, into the staging file.
    ///
    /// Returns the number of lines staged. After [`process`](Self::process)
    /// lines go straight to the final store through [`set`](Self::set)
    /// instead. On failure the error carries the count staged so far in
    /// [`ErrorKind::Merge`]; those lines stay staged.
    #[instrument(skip_all, fields(path = %self.options.path.display()))]
    pub fn merge<I>(&self, sources: I) -> Result<u64>
    where
        I: IntoIterator,
        I::Item: Into<Source>,
    {
        let mut state = self.state.lock();
        let mut written = 0;
        let outcome = sources.into_iter().try_for_each(|source| {
            source.into().drain(&self.options, |line| {
                state.accept_merged(&self.options, line)?;
                written += 1;
                Ok(())
            })
        });
        match outcome {
            Ok(()) => {
                tracing::debug!(written, "Merged sources");
                Ok(written)
            },
            Err(err) => Err(err).or_raise(|| ErrorKind::Merge { written }),
        }
    }

    /// Move the staging file into the final store, applying dedupe and
    /// filters, in staged order. Can only run once per [`reset`](Self::reset).
    #[instrument(skip(self), fields(path = %self.options.path.display()))]
    pub fn process(&self) -> Result<Stats> {
        let mut state = self.state.lock();
        if state.processed {
            exn::bail!(ErrorKind::AlreadyProcessed);
        }
        state.finish_staging()?;
        let staged = state.staging.as_file().metadata().or_raise(|| ErrorKind::Io)?.len();
        if staged > 0 {
            let file = state.staging.reopen().or_raise(|| ErrorKind::Io)?;
            let decoded = self.options.compression.wrap_reader(BufReader::new(file)).or_raise(|| ErrorKind::Compression)?;
            let (terminator, max_len) = (self.options.line_terminator, self.options.max_line_len);
            record::read_lines(BufReader::new(decoded), terminator, max_len, |key| {
                state.insert(&self.options, key, &[]).map(|_| ())
            })?;
        }
        state.finish_final()?;
        state.processed = true;
        let stats = state.stats;
        tracing::info!(
            items = stats.items,
            duplicates = stats.duplicates,
            filtered = stats.filtered,
            "Processed staged records"
        );
        Ok(stats)
    }

    /// Append a single record to the final store, subject to dedupe and filters.
    pub fn set(&self, key: &[u8], value: &[u8]) -> Result<Insert> {
        self.state.lock().insert(&self.options, key, value)
    }

    /// Visit every final-store record in the order it was accepted.
    ///
    /// The store is not locked while `visit` runs. Stops at, and returns,
    /// the first error from `visit`.
    pub fn scan(&self, mut visit: impl FnMut(&[u8], &[u8]) -> Result<()>) -> Result<()> {
        self.state.lock().finish_final()?;
        let file = match File::open(&self.options.path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(err) => return Err(err).or_raise(|| ErrorKind::Io),
        };
        if file.metadata().or_raise(|| ErrorKind::Io)?.len() == 0 {
            return Ok(());
        }
        let decoded = self.options.compression.wrap_reader(BufReader::new(file)).or_raise(|| ErrorKind::Compression)?;
        let separator = self.options.separator.as_bytes();
        let (terminator, max_len) = (self.options.line_terminator, self.options.max_line_len);
        record::read_lines(BufReader::new(decoded), terminator, max_len, |line| {
            let (key, value) = record::split(line, separator);
            visit(key, value)
        })
    }

    /// Empty both files and forget every accepted key, so the store can be reused.
    #[instrument(skip(self), fields(path = %self.options.path.display()))]
    pub fn reset(&self) -> Result<()> {
        let mut state = self.state.lock();
        // Dropped writers still flush into the files, so truncate afterwards.
        state.staging_writer = None;
        state.final_writer = None;
        let staging = state.staging.as_file_mut();
        staging.set_len(0).or_raise(|| ErrorKind::Io)?;
        staging.seek(SeekFrom::Start(0)).or_raise(|| ErrorKind::Io)?;
        OpenOptions::new().write(true).truncate(true).open(&self.options.path).or_raise(|| ErrorKind::Io)?;
        if let Some(membership) = &mut state.membership {
            membership.clear();
        }
        state.stats = Stats::default();
        state.processed = false;
        Ok(())
    }

    /// Size of the final store in bytes, after flushing buffered records.
    pub fn size(&self) -> Result<u64> {
        let mut state = self.state.lock();
        if let Some(writer) = &mut state.final_writer {
            writer.flush().or_raise(|| ErrorKind::Io)?;
        }
        Ok(fs::metadata(&self.options.path).or_raise(|| ErrorKind::Io)?.len())
    }

    pub fn stats(&self) -> Stats {
        self.state.lock().stats
    }

    pub fn is_processed(&self) -> bool {
        self.state.lock().processed
    }

    pub fn path(&self) -> &Path {
        &self.options.path
    }

    pub fn options(&self) -> &FileKvOptions {
        &self.options
    }

    /// Flush the final store, remove the staging file and, with `cleanup`,
    /// the final store too.
    #[instrument(skip(self), fields(path = %self.options.path.display(), cleanup = self.options.cleanup))]
    pub fn close(self) -> Result<()> {
        let State { staging, staging_writer, final_writer, .. } = self.state.into_inner();
        drop(staging_writer);
        let flushed = match final_writer {
            Some(writer) => Self::finish(writer),
            None => Ok(()),
        };
        let staging_removed = staging.close().or_raise(|| ErrorKind::Io);
        if self.options.cleanup {
            match fs::remove_file(&self.options.path) {
                Err(err) if err.kind() != io::ErrorKind::NotFound => {
                    return Err(err).or_raise(|| ErrorKind::Io);
                },
                _ => {},
            }
        }
        flushed?;
        staging_removed
    }

    fn open_final(path: &Path) -> Result<File> {
        OpenOptions::new().create(true).append(true).open(path).or_raise(|| ErrorKind::Io)
    }

    fn finish(writer: RecordWriter) -> Result<()> {
        let mut inner = writer.finish().or_raise(|| ErrorKind::Compression)?;
        inner.flush().or_raise(|| ErrorKind::Io)
    }
}

impl State {
    fn accept_merged(&mut self, options: &FileKvOptions, line: &[u8]) -> Result<()> {
        self.stats.merged += 1;
        if self.processed {
            self.insert(options, line, &[])?;
            return Ok(());
        }
        let writer = match self.staging_writer.take() {
            Some(writer) => writer,
            None => {
                let file = self.staging.as_file().try_clone().or_raise(|| ErrorKind::Io)?;
                options.compression.encoder(BufWriter::new(file)).or_raise(|| ErrorKind::Compression)?
            },
        };
        let writer = self.staging_writer.insert(writer);
        record::write_line(writer, line, options.line_terminator)
    }

    fn insert(&mut self, options: &FileKvOptions, key: &[u8], value: &[u8]) -> Result<Insert> {
        if let Some(membership) = &mut self.membership
            && !membership.insert(key)
        {
            self.stats.duplicates += 1;
            return Ok(Insert::Duplicate);
        }
        if options.rejects(key, value) {
            self.stats.filtered += 1;
            return Ok(Insert::Filtered);
        }
        let writer = match self.final_writer.take() {
            Some(writer) => writer,
            None => {
                let file = FileKv::open_final(&options.path)?;
                options.compression.encoder(BufWriter::new(file)).or_raise(|| ErrorKind::Compression)?
            },
        };
        let writer = self.final_writer.insert(writer);
        record::write_record(writer, key, value, options.separator.as_bytes(), options.line_terminator)?;
        self.stats.items += 1;
        Ok(Insert::Written)
    }

    fn finish_staging(&mut self) -> Result<()> {
        match self.staging_writer.take() {
            Some(writer) => FileKv::finish(writer),
            None => Ok(()),
        }
    }

    /// Terminate the current compressed member; the next write starts a new one.
    fn finish_final(&mut self) -> Result<()> {
        match self.final_writer.take() {
            Some(writer) => FileKv::finish(writer),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for FileKv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileKv").field("options", &self.options).field("stats", &self.stats()).finish_non_exhaustive()
    }
}
