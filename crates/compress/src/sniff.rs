//! Format sniffing for byte sources of unknown provenance.

use crate::Compression;
use crate::construct::MAGIC_LEN;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::io::{Cursor, Read};

impl Compression {
    /// Peek at the first bytes of `reader`, work out whether they carry a
    /// known compression signature, and return the format together with a
    /// reader yielding the decoded stream from the very first byte.
    ///
    /// Sources shorter than the longest signature (or plain text) come back
    /// as [`Compression::None`] with their bytes untouched.
    ///
    /// # Example
    ///
    /// ```
    /// use std::io::{Cursor, Read};
    /// use tierkv_compress::Compression;
    ///
    /// let compressed = Compression::Bzip2.compress(b"7\n8\n9\n").unwrap();
    /// let (format, mut reader) = Compression::detect_reader(Cursor::new(compressed)).unwrap();
    /// assert_eq!(format, Compression::Bzip2);
    /// let mut lines = String::new();
    /// reader.read_to_string(&mut lines).unwrap();
    /// assert_eq!(lines, "7\n8\n9\n");
    /// ```
    pub fn detect_reader<'a, R: Read + Send + 'a>(mut reader: R) -> Result<(Compression, Box<dyn Read + Send + 'a>)> {
        let mut head = Vec::with_capacity(MAGIC_LEN);
        (&mut reader).take(MAGIC_LEN as u64).read_to_end(&mut head).or_raise(|| ErrorKind::Io)?;
        let format = Compression::from_magic_bytes(&head);
        tracing::trace!(%format, peeked = head.len(), "Sniffed source format");
        // Replay the peeked bytes in front of the untouched remainder.
        let replay = Cursor::new(head).chain(reader);
        Ok((format, format.wrap_reader(replay)?))
    }
}
