//! Compression Operations

use crate::Compression;
use crate::error::{ErrorKind, Result};
use bzip2::{Compression as BzCompression, read::MultiBzDecoder, write::BzEncoder};
use exn::ResultExt;
use flate2::{Compression as GzCompression, read::MultiGzDecoder, write::GzEncoder};
use std::io::{self, Read, Write};
use tracing::instrument;
#[cfg(feature = "zstd")]
use zstd::stream::{read::Decoder as ZstdDecoder, write::Encoder as ZstdEncoder};

// Record files are written continuously while a store is live, so these
// favour throughput over ratio.
const BZIP2_LEVEL: BzCompression = BzCompression::fast();
const GZIP_LEVEL: GzCompression = GzCompression::fast();
#[cfg(feature = "zstd")]
const ZSTD_LEVEL: i32 = 3;

/// A writer that compresses everything written to it.
///
/// Unlike a boxed writer, an `Encoder` has to be [`finish`](Self::finish)ed
/// to terminate the compressed member; finishing hands back the inner writer
/// so the caller can flush or sync it. Dropping an unfinished encoder still
/// attempts to terminate the member, but any error is lost.
pub enum Encoder<W: Write> {
    Plain(W),
    Bzip2(BzEncoder<W>),
    Gzip(GzEncoder<W>),
    #[cfg(feature = "zstd")]
    Zstd(ZstdEncoder<'static, W>),
}

impl<W: Write> Encoder<W> {
    /// Terminate the compressed member and return the inner writer.
    pub fn finish(self) -> Result<W> {
        match self {
            Encoder::Plain(writer) => Ok(writer),
            Encoder::Bzip2(encoder) => encoder.finish().or_raise(|| ErrorKind::Io),
            Encoder::Gzip(encoder) => encoder.finish().or_raise(|| ErrorKind::Io),
            #[cfg(feature = "zstd")]
            Encoder::Zstd(encoder) => encoder.finish().or_raise(|| ErrorKind::Io),
        }
    }

    /// The format this encoder writes.
    pub fn format(&self) -> Compression {
        match self {
            Encoder::Plain(_) => Compression::None,
            Encoder::Bzip2(_) => Compression::Bzip2,
            Encoder::Gzip(_) => Compression::Gzip,
            #[cfg(feature = "zstd")]
            Encoder::Zstd(_) => Compression::Zstd,
        }
    }
}

impl<W: Write> Write for Encoder<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Encoder::Plain(writer) => writer.write(buf),
            Encoder::Bzip2(encoder) => encoder.write(buf),
            Encoder::Gzip(encoder) => encoder.write(buf),
            #[cfg(feature = "zstd")]
            Encoder::Zstd(encoder) => encoder.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Encoder::Plain(writer) => writer.flush(),
            Encoder::Bzip2(encoder) => encoder.flush(),
            Encoder::Gzip(encoder) => encoder.flush(),
            #[cfg(feature = "zstd")]
            Encoder::Zstd(encoder) => encoder.flush(),
        }
    }
}

impl Compression {
    /// Wrap a writer with the appropriate compression layer.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::io::Write;
    /// use tierkv_compress::Compression;
    ///
    /// let mut encoder = Compression::Gzip.encoder(Vec::new()).unwrap();
    /// encoder.write_all(b"0;;;\n1;;;\n").unwrap();
    /// let compressed = encoder.finish().unwrap();
    /// assert_eq!(Compression::from_magic_bytes(&compressed), Compression::Gzip);
    /// ```
    pub fn encoder<W: Write>(&self, writer: W) -> Result<Encoder<W>> {
        Ok(match self {
            Compression::None => Encoder::Plain(writer),
            Compression::Bzip2 => Encoder::Bzip2(BzEncoder::new(writer, BZIP2_LEVEL)),
            Compression::Gzip => Encoder::Gzip(GzEncoder::new(writer, GZIP_LEVEL)),
            #[cfg(feature = "zstd")]
            Compression::Zstd => Encoder::Zstd(ZstdEncoder::new(writer, ZSTD_LEVEL).or_raise(|| ErrorKind::Encoder)?),
        })
    }

    /// Wrap a reader with the appropriate decompression layer.
    ///
    /// Concatenated compressed members are decoded one after the other, as
    /// if they were a single stream.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::io::{Cursor, Read};
    /// use tierkv_compress::Compression;
    ///
    /// let mut data = Compression::Gzip.compress(b"first\n").unwrap();
    /// data.extend(Compression::Gzip.compress(b"second\n").unwrap());
    /// let mut reader = Compression::Gzip.wrap_reader(Cursor::new(data)).unwrap();
    /// let mut decompressed = String::new();
    /// reader.read_to_string(&mut decompressed).unwrap();
    /// assert_eq!(decompressed, "first\nsecond\n");
    /// ```
    pub fn wrap_reader<'a, R: Read + Send + 'a>(&self, reader: R) -> Result<Box<dyn Read + Send + 'a>> {
        Ok(match self {
            Compression::None => Box::new(reader),
            Compression::Bzip2 => Box::new(MultiBzDecoder::new(reader)),
            Compression::Gzip => Box::new(MultiGzDecoder::new(reader)),
            #[cfg(feature = "zstd")]
            Compression::Zstd => Box::new(ZstdDecoder::new(reader).or_raise(|| ErrorKind::Encoder)?),
        })
    }

    /// Compress a byte slice in memory.
    #[instrument(skip(input), fields(format = %self, input_size = input.len()))]
    pub fn compress(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut encoder = self.encoder(Vec::new())?;
        encoder.write_all(input).or_raise(|| ErrorKind::Io)?;
        encoder.finish()
    }

    /// Decompress a byte slice in memory.
    #[instrument(skip(input), fields(format = %self, input_size = input.len()))]
    pub fn decompress(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        self.wrap_reader(input)?.read_to_end(&mut output).or_raise(|| ErrorKind::InvalidData)?;
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use crate::Compression;
    use rstest::rstest;
    use std::io::{Cursor, Read, Write};

    #[rstest]
    #[case(Compression::None)]
    #[case(Compression::Bzip2)]
    #[case(Compression::Gzip)]
    #[cfg_attr(feature = "zstd", case(Compression::Zstd))]
    fn test_compress_decompress(#[case] format: Compression) {
        let original = b"0;;;\n1;;;\n2;;;\n";
        let compressed = format.compress(original).unwrap();
        let decompressed = format.decompress(&compressed).unwrap();
        assert_eq!(decompressed, original);
    }

    #[rstest]
    #[case(Compression::Bzip2)]
    #[case(Compression::Gzip)]
    #[cfg_attr(feature = "zstd", case(Compression::Zstd))]
    fn test_invalid_compressed_data(#[case] format: Compression) {
        assert!(format.decompress(b"This is not compressed data").is_err());
    }

    #[rstest]
    #[case(Compression::None)]
    #[case(Compression::Bzip2)]
    #[case(Compression::Gzip)]
    #[cfg_attr(feature = "zstd", case(Compression::Zstd))]
    fn test_concatenated_members(#[case] format: Compression) {
        // Each writing session appends a separate member to the same file.
        let mut file = Vec::new();
        for session in [&b"a;;;\nb;;;\n"[..], &b"c;;;\n"[..], &b"d;;;value\n"[..]] {
            let mut encoder = format.encoder(&mut file).unwrap();
            encoder.write_all(session).unwrap();
            encoder.finish().unwrap();
        }
        let mut reader = format.wrap_reader(Cursor::new(file)).unwrap();
        let mut decoded = Vec::new();
        reader.read_to_end(&mut decoded).unwrap();
        assert_eq!(decoded, b"a;;;\nb;;;\nc;;;\nd;;;value\n");
    }

    #[rstest]
    #[case(Compression::None)]
    #[case(Compression::Gzip)]
    fn test_encoder_reports_format(#[case] format: Compression) {
        let encoder = format.encoder(Vec::new()).unwrap();
        assert_eq!(encoder.format(), format);
    }

    #[test]
    fn test_empty_input() {
        let compressed = Compression::Gzip.compress(b"").unwrap();
        assert!(!compressed.is_empty());
        assert!(Compression::Gzip.decompress(&compressed).unwrap().is_empty());
    }
}
