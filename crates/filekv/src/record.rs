//! Line-oriented record encoding shared by the staging and final stores.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::io::{BufRead, Read, Write};

/// Feed every line of `reader` to `visit`, without its terminator.
///
/// With a `\n` terminator a trailing `\r` is dropped as well. A line longer
/// than `max_len` bytes fails with [`ErrorKind::LineTooLong`] before it is
/// fully buffered.
pub(crate) fn read_lines(
    mut reader: impl BufRead,
    terminator: u8,
    max_len: usize,
    mut visit: impl FnMut(&[u8]) -> Result<()>,
) -> Result<()> {
    let limit = u64::try_from(max_len).unwrap_or(u64::MAX).saturating_add(1);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if (&mut reader).take(limit).read_until(terminator, &mut buf).or_raise(|| ErrorKind::Io)? == 0 {
            return Ok(());
        }
        let mut line = buf.as_slice();
        if let Some(rest) = line.strip_suffix(&[terminator]) {
            line = rest;
        }
        if line.len() > max_len {
            exn::bail!(ErrorKind::LineTooLong { limit: max_len });
        }
        if terminator == b'\n'
            && let Some(rest) = line.strip_suffix(b"\r")
        {
            line = rest;
        }
        visit(line)?;
    }
}

/// Split a record on the first occurrence of `separator`. A record without
/// a separator is all key.
pub(crate) fn split<'a>(line: &'a [u8], separator: &[u8]) -> (&'a [u8], &'a [u8]) {
    match line.windows(separator.len()).position(|window| window == separator) {
        Some(at) => (&line[..at], &line[at + separator.len()..]),
        None => (line, &line[line.len()..]),
    }
}

pub(crate) fn write_line(mut writer: impl Write, line: &[u8], terminator: u8) -> Result<()> {
    writer.write_all(line).or_raise(|| ErrorKind::Io)?;
    writer.write_all(&[terminator]).or_raise(|| ErrorKind::Io)
}

pub(crate) fn write_record(
    mut writer: impl Write,
    key: &[u8],
    value: &[u8],
    separator: &[u8],
    terminator: u8,
) -> Result<()> {
    writer.write_all(key).or_raise(|| ErrorKind::Io)?;
    writer.write_all(separator).or_raise(|| ErrorKind::Io)?;
    write_line(writer, value, terminator)
}
