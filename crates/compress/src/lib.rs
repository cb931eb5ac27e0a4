//! Stream compression for record files.
//!
//! Record files (staging and final stores) may be wrapped in a compression
//! layer that is applied by the writer and removed by the reader without the
//! record format knowing about it. This crate hides the codecs behind the
//! [`Compression`] enum:
//!
//! - **Writing** through a finishing [`Encoder`] ([`Compression::encoder`]),
//!   so a caller can terminate a compressed member and get the inner writer
//!   back.
//! - **Reading** through [`Compression::wrap_reader`]. Decoders accept
//!   concatenated members, which lets a file be appended to in several
//!   writing sessions.
//! - **Sniffing** an unknown byte source ([`Compression::detect_reader`]) by
//!   its magic bytes.
//!
//! Bzip2 and Gzip are always available. Zstd is behind the `zstd` feature.

mod construct;
pub mod error;
mod ops;
mod sniff;
mod util;

pub use crate::ops::Encoder;

/// A supported compression format.
///
/// Defaults to [`None`](Self::None) (uncompressed).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Compression {
    /// Uncompressed
    #[default]
    None,
    /// Bzip2 compression
    Bzip2,
    /// Gzip compression
    Gzip,
    /// Zstd compression
    #[cfg(feature = "zstd")]
    Zstd,
}
