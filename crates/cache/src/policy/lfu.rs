use super::Policy;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;

/// Ordering key: lowest hit count first, then least recently touched.
type Rank = (u64, u64);

#[derive(Debug, Default)]
pub(crate) struct Lfu {
    tick: u64,
    ranks: FxHashMap<String, Rank>,
    order: BTreeMap<Rank, String>,
}

impl Lfu {
    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }
}

impl Policy for Lfu {
    fn on_insert(&mut self, key: &str) {
        let rank = (0, self.next_tick());
        if let Some(previous) = self.ranks.insert(key.to_owned(), rank) {
            self.order.remove(&previous);
        }
        self.order.insert(rank, key.to_owned());
    }

    fn on_access(&mut self, key: &str) {
        let tick = self.next_tick();
        let Some(rank) = self.ranks.get_mut(key) else {
            return;
        };
        let previous = *rank;
        let Some(owned) = self.order.remove(&previous) else {
            return;
        };
        *rank = (previous.0.saturating_add(1), tick);
        self.order.insert(*rank, owned);
    }

    fn on_remove(&mut self, key: &str) {
        if let Some(rank) = self.ranks.remove(key) {
            self.order.remove(&rank);
        }
    }

    fn victim(&mut self, protect: &str) -> Option<String> {
        let rank = *self.order.iter().find(|(_, key)| key.as_str() != protect)?.0;
        let key = self.order.remove(&rank)?;
        self.ranks.remove(&key);
        Some(key)
    }

    fn clear(&mut self) {
        self.ranks.clear();
        self.order.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_least_frequently_used() {
        let mut lfu = Lfu::default();
        lfu.on_insert("a");
        lfu.on_insert("b");
        lfu.on_insert("c");
        lfu.on_access("a");
        lfu.on_access("a");
        lfu.on_access("c");
        assert_eq!(lfu.victim("x").as_deref(), Some("b"));
        assert_eq!(lfu.victim("x").as_deref(), Some("c"));
        assert_eq!(lfu.victim("x").as_deref(), Some("a"));
    }

    #[test]
    fn ties_broken_by_recency() {
        let mut lfu = Lfu::default();
        lfu.on_insert("a");
        lfu.on_insert("b");
        lfu.on_access("b");
        lfu.on_access("a");
        assert_eq!(lfu.victim("x").as_deref(), Some("b"));
    }

    #[test]
    fn reinsert_resets_frequency() {
        let mut lfu = Lfu::default();
        lfu.on_insert("a");
        lfu.on_access("a");
        lfu.on_insert("b");
        lfu.on_remove("a");
        lfu.on_insert("a");
        assert_eq!(lfu.victim("x").as_deref(), Some("b"));
        assert_eq!(lfu.victim("a"), None);
    }
}
