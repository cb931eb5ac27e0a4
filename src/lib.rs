//! Capacity-bounded key/value store that spills to disk.
//!
//! [`HybridStore`] puts an [`EvictionCache`](tierkv_cache::EvictionCache) in
//! front of a [`DiskStore`](tierkv_storage::DiskStore). Entries evicted from
//! memory are demoted to disk and disk hits are promoted back into memory.
//! Either tier can also be used on its own through [`Mode`].
//!
//! The building blocks are re-exported:
//!
//! - [`cache`]: the eviction cache and its policies,
//! - [`storage`]: the disk engines,
//! - [`filekv`]: the merge and dedupe record store,
//! - [`config`]: layered settings, turned into options by [`settings`].

pub mod error;
mod gc;
mod hybrid;
mod options;
pub mod settings;

pub use crate::gc::remove_stale_dirs;
pub use crate::hybrid::HybridStore;
pub use crate::options::{DEFAULT_MAX_MEMORY_ITEMS, DEFAULT_TEMP_PREFIX, HybridOptions, Mode};
pub use tierkv_cache as cache;
pub use tierkv_config as config;
pub use tierkv_filekv as filekv;
pub use tierkv_storage as storage;
