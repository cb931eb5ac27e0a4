use super::Policy;
use rustc_hash::FxHashSet;

/// No ordering at all: any resident key other than the protected one goes.
#[derive(Debug, Default)]
pub(crate) struct Unordered {
    keys: FxHashSet<String>,
}

impl Policy for Unordered {
    fn on_insert(&mut self, key: &str) {
        self.keys.insert(key.to_owned());
    }

    fn on_access(&mut self, _key: &str) {}

    fn on_remove(&mut self, key: &str) {
        self.keys.remove(key);
    }

    fn victim(&mut self, protect: &str) -> Option<String> {
        let key = self.keys.iter().find(|key| key.as_str() != protect)?.clone();
        self.keys.remove(&key);
        Some(key)
    }

    fn clear(&mut self) {
        self.keys.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_evicts_protected_key() {
        let mut policy = Unordered::default();
        policy.on_insert("a");
        policy.on_insert("b");
        assert_eq!(policy.victim("b").as_deref(), Some("a"));
        assert_eq!(policy.victim("b"), None);
    }
}
