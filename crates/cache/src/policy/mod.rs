//! Victim selection.
//!
//! A policy only sees keys. The cache reports every insert, hit and removal
//! and asks for a victim when it is over capacity; the policy owns whatever
//! bookkeeping it needs to answer.

mod arc;
mod lfu;
mod lru;
mod recency;
mod unordered;

use crate::PolicyKind;

pub(crate) trait Policy: Send {
    /// A key became resident.
    fn on_insert(&mut self, key: &str);
    /// A resident key was read.
    fn on_access(&mut self, key: &str);
    /// A resident key left the cache for any reason other than [`victim`](Self::victim).
    fn on_remove(&mut self, key: &str);
    /// Pick a resident key to evict and stop tracking it. Never returns
    /// `protect`, the key whose insert triggered the eviction.
    fn victim(&mut self, protect: &str) -> Option<String>;
    fn clear(&mut self);
}

pub(crate) fn build(kind: PolicyKind, capacity: usize) -> Box<dyn Policy> {
    match kind {
        PolicyKind::Lru => Box::new(lru::Lru::default()),
        PolicyKind::Lfu => Box::new(lfu::Lfu::default()),
        PolicyKind::Arc => Box::new(arc::Arc::new(capacity)),
        PolicyKind::Unordered => Box::new(unordered::Unordered::default()),
    }
}
