use super::Policy;
use super::recency::RecencyList;

#[derive(Debug, Default)]
pub(crate) struct Lru {
    recency: RecencyList,
}

impl Policy for Lru {
    fn on_insert(&mut self, key: &str) {
        self.recency.touch(key);
    }

    fn on_access(&mut self, key: &str) {
        self.recency.touch(key);
    }

    fn on_remove(&mut self, key: &str) {
        self.recency.remove(key);
    }

    fn victim(&mut self, protect: &str) -> Option<String> {
        self.recency.pop_oldest_except(protect)
    }

    fn clear(&mut self) {
        self.recency.clear();
    }
}
