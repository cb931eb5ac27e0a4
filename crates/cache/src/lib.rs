//! Capacity-bounded in-memory key/value cache.
//!
//! [`EvictionCache`] stores byte values under string keys, keeps at most
//! [`CacheOptions::capacity`] entries and picks victims with one of several
//! [`PolicyKind`]s (LRU, LFU, ARC or unordered). Entries may carry a
//! time-to-live: expired entries are invisible to reads straight away and are
//! physically removed either on the next touch or by an optional background
//! sweeper.
//!
//! Every removal other than [`EvictionCache::purge`] is reported to an
//! [`EvictionListener`] together with an [`EvictionReason`]. The listener
//! is invoked after the cache has released its internal locks, so it may
//! call back into the cache or do slow I/O (such as spilling the entry to
//! disk).
//!
//! ```
//! use tierkv_cache::{CacheOptions, EvictionCache, PolicyKind};
//!
//! let cache = EvictionCache::new(CacheOptions::default().with_capacity(2).with_policy(PolicyKind::Lru)).unwrap();
//! cache.set("a", b"1".to_vec());
//! cache.set("b", b"2".to_vec());
//! cache.get("a");
//! cache.set("c", b"3".to_vec());
//! assert!(cache.contains("a"));
//! assert!(!cache.contains("b"));
//! ```

mod cache;
mod entry;
pub mod error;
mod listener;
mod options;
mod policy;
mod sweeper;

pub use crate::cache::EvictionCache;
pub use crate::listener::{EvictionListener, EvictionReason};
pub use crate::options::{CacheOptions, DEFAULT_CAPACITY, PolicyKind};
