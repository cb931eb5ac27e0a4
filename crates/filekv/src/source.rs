use crate::error::{ErrorKind, Result};
use crate::options::FileKvOptions;
use crate::record;
use exn::ResultExt;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tierkv_compress::Compression;

/// Something [`FileKv::merge`](crate::FileKv::merge) can drain line by line.
pub enum Source {
    /// A file, opened at merge time.
    Path(PathBuf),
    /// Any byte stream.
    Reader(Box<dyn Read + Send>),
    /// Lines already in memory, staged verbatim.
    Lines(Vec<String>),
}

impl Source {
    pub fn reader(reader: impl Read + Send + 'static) -> Self {
        Source::Reader(Box::new(reader))
    }

    /// Call `visit` with each line of this source, in order.
    pub(crate) fn drain(self, options: &FileKvOptions, mut visit: impl FnMut(&[u8]) -> Result<()>) -> Result<()> {
        match self {
            Source::Lines(lines) => lines.iter().try_for_each(|line| visit(line.as_bytes())),
            Source::Path(path) => {
                let file = File::open(&path).or_raise(|| ErrorKind::Source(path.clone()))?;
                Self::drain_bytes(file, options, visit)
            },
            Source::Reader(reader) => Self::drain_bytes(reader, options, visit),
        }
    }

    fn drain_bytes(
        reader: impl Read + Send,
        options: &FileKvOptions,
        visit: impl FnMut(&[u8]) -> Result<()>,
    ) -> Result<()> {
        let (terminator, max_len) = (options.line_terminator, options.max_line_len);
        if !options.detect_compression {
            return record::read_lines(BufReader::new(reader), terminator, max_len, visit);
        }
        // The sniffed reader is already decoded.
        let (format, decoded) = Compression::detect_reader(reader).or_raise(|| ErrorKind::Compression)?;
        if format.is_compressed() {
            tracing::debug!(%format, "Decoding compressed source");
        }
        record::read_lines(BufReader::new(decoded), terminator, max_len, visit)
    }
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Source::Reader(_) => f.write_str("Reader(..)"),
            Source::Lines(lines) => f.debug_struct("Lines").field("len", &lines.len()).finish(),
        }
    }
}

impl From<PathBuf> for Source {
    fn from(path: PathBuf) -> Self {
        Source::Path(path)
    }
}

impl From<&Path> for Source {
    fn from(path: &Path) -> Self {
        Source::Path(path.to_path_buf())
    }
}

impl From<Vec<String>> for Source {
    fn from(lines: Vec<String>) -> Self {
        Source::Lines(lines)
    }
}

impl From<Vec<&str>> for Source {
    fn from(lines: Vec<&str>) -> Self {
        Source::Lines(lines.into_iter().map(str::to_owned).collect())
    }
}

impl From<Box<dyn Read + Send>> for Source {
    fn from(reader: Box<dyn Read + Send>) -> Self {
        Source::Reader(reader)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Cursor;

    fn options() -> FileKvOptions {
        FileKvOptions::new("unused.db")
    }

    fn collect(source: Source) -> Vec<String> {
        let mut lines = Vec::new();
        source
            .drain(&options(), |line| {
                lines.push(String::from_utf8_lossy(line).into_owned());
                Ok(())
            })
            .unwrap();
        lines
    }

    #[test]
    fn lines_are_verbatim() {
        assert_eq!(collect(Source::from(vec!["a", "", "b;;;c"])), vec!["a", "", "b;;;c"]);
    }

    #[test]
    fn reader_is_split_on_terminator() {
        assert_eq!(collect(Source::reader(Cursor::new(b"x\ny\n".to_vec()))), vec!["x", "y"]);
    }

    #[rstest]
    #[case(Compression::Gzip)]
    #[case(Compression::Bzip2)]
    fn compressed_reader_is_decoded(#[case] format: Compression) {
        let compressed = format.compress(b"1\n2\n3\n").unwrap();
        assert_eq!(collect(Source::reader(Cursor::new(compressed))), vec!["1", "2", "3"]);
    }

    #[test]
    fn compressed_path_is_decoded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.gz");
        std::fs::write(&path, Compression::Gzip.compress(b"a\nb\n").unwrap()).unwrap();
        assert_eq!(collect(Source::from(path)), vec!["a", "b"]);
    }

    #[test]
    fn detection_can_be_disabled() {
        let compressed = Compression::Gzip.compress(b"1\n").unwrap();
        let mut raw = Vec::new();
        Source::reader(Cursor::new(compressed.clone()))
            .drain(&options().with_detect_compression(false), |line| {
                raw.extend_from_slice(line);
                Ok(())
            })
            .unwrap();
        assert_eq!(raw, compressed);
    }

    #[test]
    fn missing_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.txt");
        let err = Source::from(missing.clone()).drain(&options(), |_| Ok(())).unwrap_err();
        assert_eq!(*err, ErrorKind::Source(missing));
    }
}
