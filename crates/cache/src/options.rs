use crate::EvictionListener;
use derive_more::Display;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Capacity used when [`CacheOptions::capacity`] is zero.
pub const DEFAULT_CAPACITY: usize = i32::MAX as usize;

/// Victim selection strategy.
#[derive(Clone, Copy, Debug, Default, Display, PartialEq, Eq, Hash)]
pub enum PolicyKind {
    /// Least recently used.
    #[default]
    #[display("lru")]
    Lru,
    /// Least frequently used, ties broken by recency.
    #[display("lfu")]
    Lfu,
    /// Adaptive replacement: balances recency and frequency with ghost lists.
    #[display("arc")]
    Arc,
    /// Any entry other than the one being inserted.
    #[display("unordered")]
    Unordered,
}

impl FromStr for PolicyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lru" => Ok(PolicyKind::Lru),
            "lfu" => Ok(PolicyKind::Lfu),
            "arc" => Ok(PolicyKind::Arc),
            "unordered" | "simple" => Ok(PolicyKind::Unordered),
            other => Err(format!("unknown eviction policy: {other}")),
        }
    }
}

/// Construction options for an [`EvictionCache`](crate::EvictionCache).
#[derive(Clone, Default)]
pub struct CacheOptions {
    /// Maximum number of entries. Zero means [`DEFAULT_CAPACITY`].
    pub capacity: usize,
    pub policy: PolicyKind,
    /// Time-to-live applied by [`set`](crate::EvictionCache::set). `None` or
    /// zero means entries never expire.
    pub default_ttl: Option<Duration>,
    /// Period of the background expiry sweep. `None` disables the sweeper;
    /// expired entries are then only removed when touched.
    pub sweep_interval: Option<Duration>,
    pub listener: Option<Arc<dyn EvictionListener>>,
}

impl CacheOptions {
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_policy(mut self, policy: PolicyKind) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = Some(ttl);
        self
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = Some(interval);
        self
    }

    pub fn with_listener(mut self, listener: impl EvictionListener + 'static) -> Self {
        self.listener = Some(Arc::new(listener));
        self
    }

    pub(crate) fn effective_capacity(&self) -> usize {
        if self.capacity == 0 { DEFAULT_CAPACITY } else { self.capacity }
    }
}

impl fmt::Debug for CacheOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheOptions")
            .field("capacity", &self.capacity)
            .field("policy", &self.policy)
            .field("default_ttl", &self.default_ttl)
            .field("sweep_interval", &self.sweep_interval)
            .field("listener", &self.listener.is_some())
            .finish()
    }
}
