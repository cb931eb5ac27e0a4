//! Adaptive replacement.
//!
//! Resident keys live in `t1` (seen once) or `t2` (seen again). Evicted keys
//! are remembered in the ghost lists `b1` and `b2`, each bounded by the cache
//! capacity. A re-insert of a ghost key moves the target size `p` of `t1`
//! towards the list that would have kept it, so the policy drifts between
//! recency and frequency with the workload.

use super::Policy;
use super::recency::RecencyList;

#[derive(Debug)]
pub(crate) struct Arc {
    capacity: usize,
    p: usize,
    t1: RecencyList,
    t2: RecencyList,
    b1: RecencyList,
    b2: RecencyList,
    /// Whether the most recent insert came back from `b2`.
    ghost_b2_hit: bool,
}

impl Arc {
    pub(crate) fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            p: capacity / 2,
            t1: RecencyList::default(),
            t2: RecencyList::default(),
            b1: RecencyList::default(),
            b2: RecencyList::default(),
            ghost_b2_hit: false,
        }
    }

    fn adapt(&mut self, in_b1: bool) {
        let (hit, other) = if in_b1 { (self.b1.len(), self.b2.len()) } else { (self.b2.len(), self.b1.len()) };
        let delta = if hit == 0 || other <= hit { 1 } else { other.div_ceil(hit) };
        if in_b1 {
            self.p = (self.p + delta).min(self.capacity);
        } else {
            self.p = self.p.saturating_sub(delta);
        }
    }

    fn remember(ghosts: &mut RecencyList, key: &str, capacity: usize) {
        ghosts.touch(key);
        while ghosts.len() > capacity {
            ghosts.pop_oldest();
        }
    }

    fn prefer_t1(&self) -> bool {
        let t1 = self.t1.len();
        t1 > 0 && (t1 > self.p || (t1 == self.p && self.ghost_b2_hit) || self.t2.is_empty())
    }
}

impl Policy for Arc {
    fn on_insert(&mut self, key: &str) {
        self.ghost_b2_hit = false;
        if self.b1.contains(key) {
            self.adapt(true);
            self.b1.remove(key);
            self.t2.touch(key);
        } else if self.b2.contains(key) {
            self.adapt(false);
            self.b2.remove(key);
            self.ghost_b2_hit = true;
            self.t2.touch(key);
        } else {
            self.t1.touch(key);
        }
    }

    fn on_access(&mut self, key: &str) {
        if self.t1.remove(key) || self.t2.contains(key) {
            self.t2.touch(key);
        }
    }

    fn on_remove(&mut self, key: &str) {
        if !self.t1.remove(key) {
            self.t2.remove(key);
        }
    }

    fn victim(&mut self, protect: &str) -> Option<String> {
        let from_t1 = self.prefer_t1();
        let (first, second) = if from_t1 { (&mut self.t1, &mut self.t2) } else { (&mut self.t2, &mut self.t1) };
        let (key, took_first) = match first.pop_oldest_except(protect) {
            Some(key) => (key, true),
            None => (second.pop_oldest_except(protect)?, false),
        };
        if from_t1 == took_first {
            Self::remember(&mut self.b1, &key, self.capacity);
        } else {
            Self::remember(&mut self.b2, &key, self.capacity);
        }
        Some(key)
    }

    fn clear(&mut self) {
        self.p = self.capacity / 2;
        self.t1.clear();
        self.t2.clear();
        self.b1.clear();
        self.b2.clear();
        self.ghost_b2_hit = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_access_promotes_to_frequent() {
        let mut arc = Arc::new(4);
        for key in ["a", "b", "c", "d"] {
            arc.on_insert(key);
        }
        arc.on_access("a");
        assert!(arc.t2.contains("a"));
        assert!(arc.t1.contains("b"));
        assert_eq!(arc.victim("x").as_deref(), Some("b"));
        assert!(arc.b1.contains("b"));
    }

    #[test]
    fn scan_does_not_flush_frequent_keys() {
        let mut arc = Arc::new(4);
        for key in ["a", "b"] {
            arc.on_insert(key);
            arc.on_access(key);
        }
        for key in ["c", "d", "e", "f", "g", "h"] {
            arc.on_insert(key);
            if arc.t1.len() + arc.t2.len() > 4 {
                let victim = arc.victim(key).unwrap();
                assert_ne!(victim, "a");
                assert_ne!(victim, "b");
            }
        }
        assert!(arc.t2.contains("a"));
        assert!(arc.t2.contains("b"));
    }

    #[test]
    fn ghost_hit_adapts_target() {
        let mut arc = Arc::new(2);
        assert_eq!(arc.p, 1);
        arc.on_insert("a");
        arc.on_insert("b");
        arc.on_insert("c");
        assert_eq!(arc.victim("c").as_deref(), Some("a"));
        arc.on_insert("a");
        assert_eq!(arc.p, 2);
        assert!(arc.t2.contains("a"));
    }

    #[test]
    fn ghost_lists_are_bounded() {
        let mut arc = Arc::new(2);
        for i in 0..10 {
            let key = i.to_string();
            arc.on_insert(&key);
            while arc.t1.len() + arc.t2.len() > 2 {
                arc.victim(&key);
            }
        }
        assert!(arc.b1.len() <= 2);
        assert!(arc.b2.len() <= 2);
    }
}
