use rustc_hash::FxHashMap;
use std::collections::BTreeMap;

/// Keys ordered by last touch, least recent first.
///
/// Each touch stamps the key with a fresh tick; the ordered map gives O(log n)
/// access to the oldest key and the hash map finds a key's current stamp.
#[derive(Debug, Default)]
pub(crate) struct RecencyList {
    tick: u64,
    stamps: FxHashMap<String, u64>,
    order: BTreeMap<u64, String>,
}

impl RecencyList {
    /// Insert `key` as most recent, or move it there if present.
    pub(crate) fn touch(&mut self, key: &str) {
        self.tick += 1;
        let tick = self.tick;
        match self.stamps.get_mut(key) {
            Some(stamp) => {
                let previous = *stamp;
                if let Some(owned) = self.order.remove(&previous) {
                    self.order.insert(tick, owned);
                }
                *stamp = tick;
            },
            None => {
                self.stamps.insert(key.to_owned(), tick);
                self.order.insert(tick, key.to_owned());
            },
        }
    }

    pub(crate) fn remove(&mut self, key: &str) -> bool {
        match self.stamps.remove(key) {
            Some(stamp) => {
                self.order.remove(&stamp);
                true
            },
            None => false,
        }
    }

    pub(crate) fn contains(&self, key: &str) -> bool {
        self.stamps.contains_key(key)
    }

    /// Remove and return the least recent key that is not `protect`.
    pub(crate) fn pop_oldest_except(&mut self, protect: &str) -> Option<String> {
        let stamp = self.order.iter().find(|(_, key)| key.as_str() != protect).map(|(stamp, _)| *stamp)?;
        let key = self.order.remove(&stamp)?;
        self.stamps.remove(&key);
        Some(key)
    }

    pub(crate) fn pop_oldest(&mut self) -> Option<String> {
        let (_, key) = self.order.pop_first()?;
        self.stamps.remove(&key);
        Some(key)
    }

    pub(crate) fn len(&self) -> usize {
        self.stamps.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.stamps.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.stamps.clear();
        self.order.clear();
    }
}
