use rustc_hash::FxHashSet;
use std::collections::VecDeque;
use std::sync::Arc;

/// Bounded set of accepted keys.
///
/// Remembers at most `capacity` keys; inserting past the bound forgets the
/// oldest one, so a key seen long enough ago is accepted again. A hit does
/// not refresh a key's age.
#[derive(Debug)]
pub(crate) struct Membership {
    capacity: usize,
    seen: FxHashSet<Arc<[u8]>>,
    order: VecDeque<Arc<[u8]>>,
}

impl Membership {
    pub(crate) fn new(capacity: usize) -> Self {
        Self { capacity, seen: FxHashSet::default(), order: VecDeque::new() }
    }

    /// Returns `false` if `key` is already a member, otherwise records it.
    pub(crate) fn insert(&mut self, key: &[u8]) -> bool {
        if self.seen.contains(key) {
            return false;
        }
        let key: Arc<[u8]> = Arc::from(key);
        self.seen.insert(Arc::clone(&key));
        self.order.push_back(key);
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.seen.remove(&oldest);
            }
        }
        true
    }

    pub(crate) fn clear(&mut self) {
        self.seen.clear();
        self.order.clear();
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.order.len()
    }
}
