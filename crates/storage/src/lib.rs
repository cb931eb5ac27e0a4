//! On-disk key/value engines behind one contract.
//!
//! [`DiskStore`] is the interface the hybrid tier programs against. The
//! [`Backend`] enum picks an engine and [`open`] builds it inside a
//! directory:
//!
//! - [`Backend::Redb`]: embedded B-tree database, a single file.
//! - [`Backend::Directory`]: one file per key, written atomically.
//! - [`Backend::File`]: an append-only [`FileKv`](tierkv_filekv::FileKv)
//!   record file. Keeps insertion order but cannot look keys up.

pub mod backend;
pub mod error;
mod stamp;
mod store;

pub use crate::backend::{Backend, open};
pub use crate::store::{DiskStore, Handler, ScanOptions};
use std::sync::Arc;

pub type DiskHandle = Arc<dyn DiskStore>;
