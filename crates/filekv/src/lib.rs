//! Merge, deduplicate and replay large record sets.
//!
//! A [`FileKv`] moves through three phases:
//!
//! 1. [`merge`](FileKv::merge) drains any number of [`Source`]s (files,
//!    readers, in-memory lines) into an append-only staging file, keeping
//!    source order and line order.
//! 2. [`process`](FileKv::process) replays the staging file once, drops
//!    keys it has already accepted and keys rejected by the filters, and
//!    appends the survivors to the final store.
//! 3. [`scan`](FileKv::scan) replays the final store in first-accepted
//!    order, as often as needed.
//!
//! Both files hold one `key<separator>value` record per line and may be
//! wrapped in a [`Compression`](tierkv_compress::Compression) layer.
//!
//! Deduplication remembers at most [`FileKvOptions::max_items`] keys, so it
//! is exact only while the number of distinct keys stays within that bound.
//! Memory use is bounded by it too, which is what lets inputs larger than
//! memory flow through.

pub mod error;
mod membership;
mod options;
mod record;
mod source;
mod store;

pub use crate::options::{
    DEFAULT_LINE_TERMINATOR, DEFAULT_MAX_ITEMS, DEFAULT_MAX_LINE_LEN, DEFAULT_SEPARATOR, FileKvOptions, Filter,
};
pub use crate::source::Source;
pub use crate::store::{FileKv, Insert, Stats};
