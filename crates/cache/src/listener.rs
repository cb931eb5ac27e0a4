use derive_more::Display;

/// Why an entry left the cache.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
pub enum EvictionReason {
    /// Chosen as a victim because an insert pushed the cache over capacity.
    #[display("capacity")]
    Capacity,
    /// Its time-to-live ran out and it was swept or touched.
    #[display("expired")]
    Expired,
    /// Removed by an explicit [`EvictionCache::delete`](crate::EvictionCache::delete).
    #[display("deleted")]
    Deleted,
}

/// Receives every entry removed from an [`EvictionCache`](crate::EvictionCache),
/// except those dropped by [`purge`](crate::EvictionCache::purge).
///
/// Called synchronously from whichever thread caused the removal, after the
/// cache's locks have been released.
pub trait EvictionListener: Send + Sync {
    fn on_evict(&self, key: &str, value: &[u8], reason: EvictionReason);
}

impl<F> EvictionListener for F
where
    F: Fn(&str, &[u8], EvictionReason) + Send + Sync,
{
    fn on_evict(&self, key: &str, value: &[u8], reason: EvictionReason) {
        self(key, value, reason)
    }
}
