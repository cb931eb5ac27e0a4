use crate::entry::Entry;
use crate::error::{ErrorKind, Result};
use crate::policy::{self, Policy};
use crate::sweeper::Sweeper;
use crate::{CacheOptions, EvictionListener, EvictionReason, PolicyKind};
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Entries removed under the locks, reported to the listener once they are released.
type Removed = Vec<(String, Vec<u8>, EvictionReason)>;

/// A thread-safe, capacity-bounded map from string keys to byte values.
///
/// Lock order is always table, then policy. Neither lock is held while the
/// [`EvictionListener`] runs.
pub struct EvictionCache {
    shared: Arc<Shared>,
    sweeper: Option<Sweeper>,
}

pub(crate) struct Shared {
    capacity: usize,
    kind: PolicyKind,
    default_ttl: Duration,
    table: RwLock<FxHashMap<String, Entry>>,
    policy: Mutex<Box<dyn Policy>>,
    listener: Option<Arc<dyn EvictionListener>>,
}

impl EvictionCache {
    /// Build a cache and, if a sweep interval is configured, start its sweeper.
    pub fn new(options: CacheOptions) -> Result<Self> {
        if options.sweep_interval.is_some_and(|interval| interval.is_zero()) {
            exn::bail!(ErrorKind::InvalidConfig("sweep interval must be positive".to_string()));
        }
        let capacity = options.effective_capacity();
        let shared = Arc::new(Shared {
            capacity,
            kind: options.policy,
            default_ttl: options.default_ttl.unwrap_or(Duration::ZERO),
            table: RwLock::new(FxHashMap::default()),
            policy: Mutex::new(policy::build(options.policy, capacity)),
            listener: options.listener,
        });
        let sweeper = match options.sweep_interval {
            Some(interval) => Some(Sweeper::start(Arc::downgrade(&shared), interval)?),
            None => None,
        };
        tracing::debug!(capacity, policy = %options.policy, "Created eviction cache");
        Ok(Self { shared, sweeper })
    }

    /// Insert or overwrite `key` with the default time-to-live.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Vec<u8>>) {
        self.shared.set(key.into(), value.into(), self.shared.default_ttl);
    }

    /// Insert or overwrite `key`. A zero `ttl` means the entry never expires.
    pub fn set_with_ttl(&self, key: impl Into<String>, value: impl Into<Vec<u8>>, ttl: Duration) {
        self.shared.set(key.into(), value.into(), ttl);
    }

    /// Read `key`, counting as a use for the eviction policy. Expired entries
    /// read as absent.
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.shared.get(key, true)
    }

    /// Read `key` without touching the eviction policy.
    pub fn peek(&self, key: &str) -> Option<Vec<u8>> {
        self.shared.get(key, false)
    }

    pub fn contains(&self, key: &str) -> bool {
        let now = Instant::now();
        self.shared.table.read().get(key).is_some_and(|entry| !entry.is_expired(now))
    }

    /// Remove `key`, returning its value if it was live. The listener sees
    /// the removal as [`EvictionReason::Deleted`], or as
    /// [`EvictionReason::Expired`] if the entry had already run out.
    pub fn delete(&self, key: &str) -> Option<Vec<u8>> {
        self.shared.delete(key)
    }

    /// Visit every live entry under a read lock. Stops at the first error.
    ///
    /// The visitor must not write to this cache.
    pub fn scan<E>(&self, mut visit: impl FnMut(&str, &[u8]) -> std::result::Result<(), E>) -> std::result::Result<(), E> {
        let now = Instant::now();
        let table = self.shared.table.read();
        for (key, entry) in table.iter().filter(|(_, entry)| !entry.is_expired(now)) {
            visit(key, &entry.value)?;
        }
        Ok(())
    }

    /// Number of live entries.
    pub fn item_count(&self) -> usize {
        let now = Instant::now();
        self.shared.table.read().values().filter(|entry| !entry.is_expired(now)).count()
    }

    /// Drop every entry without notifying the listener.
    pub fn purge(&self) {
        let mut table = self.shared.table.write();
        let mut policy = self.shared.policy.lock();
        table.clear();
        policy.clear();
    }

    /// Remove every expired entry now, returning how many were removed.
    pub fn delete_expired(&self) -> usize {
        self.shared.delete_expired()
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    pub fn policy(&self) -> PolicyKind {
        self.shared.kind
    }

    /// Stop the background sweeper, if any. Called automatically on drop.
    pub fn stop_sweeper(&mut self) {
        if let Some(mut sweeper) = self.sweeper.take() {
            sweeper.stop();
        }
    }
}

impl Drop for EvictionCache {
    fn drop(&mut self) {
        self.stop_sweeper();
    }
}

impl std::fmt::Debug for EvictionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvictionCache")
            .field("capacity", &self.shared.capacity)
            .field("policy", &self.shared.kind)
            .field("sweeper", &self.sweeper.is_some())
            .finish_non_exhaustive()
    }
}

impl Shared {
    fn set(&self, key: String, value: Vec<u8>, ttl: Duration) {
        let now = Instant::now();
        let mut removed = Removed::new();
        {
            let mut table = self.table.write();
            let mut policy = self.policy.lock();
            let previous = table.insert(key.clone(), Entry::new(value, ttl, now));
            // An overwrite is a fresh entry: frequency and recency history start over.
            if previous.is_some() {
                policy.on_remove(&key);
            }
            policy.on_insert(&key);
            while table.len() > self.capacity {
                let Some(victim) = policy.victim(&key) else {
                    break;
                };
                if let Some(entry) = table.remove(&victim) {
                    let reason = if entry.is_expired(now) { EvictionReason::Expired } else { EvictionReason::Capacity };
                    removed.push((victim, entry.value, reason));
                }
            }
        }
        self.notify(removed);
    }

    fn get(&self, key: &str, touch: bool) -> Option<Vec<u8>> {
        let now = Instant::now();
        {
            let table = self.table.read();
            let entry = table.get(key)?;
            if !entry.is_expired(now) {
                if touch {
                    self.policy.lock().on_access(key);
                }
                return Some(entry.value.clone());
            }
        }
        self.remove_if(key, |entry| entry.is_expired(now), EvictionReason::Expired);
        None
    }

    fn delete(&self, key: &str) -> Option<Vec<u8>> {
        let now = Instant::now();
        let removed = {
            let mut table = self.table.write();
            let entry = table.remove(key)?;
            self.policy.lock().on_remove(key);
            entry
        };
        if removed.is_expired(now) {
            self.notify(vec![(key.to_owned(), removed.value, EvictionReason::Expired)]);
            return None;
        }
        if let Some(listener) = &self.listener {
            listener.on_evict(key, &removed.value, EvictionReason::Deleted);
        }
        Some(removed.value)
    }

    /// Remove `key` only if `predicate` still holds once the write lock is taken.
    fn remove_if(&self, key: &str, predicate: impl Fn(&Entry) -> bool, reason: EvictionReason) {
        let removed = {
            let mut table = self.table.write();
            if !table.get(key).is_some_and(&predicate) {
                return;
            }
            let Some(entry) = table.remove(key) else {
                return;
            };
            self.policy.lock().on_remove(key);
            entry
        };
        self.notify(vec![(key.to_owned(), removed.value, reason)]);
    }

    pub(crate) fn delete_expired(&self) -> usize {
        let now = Instant::now();
        let mut removed = Removed::new();
        {
            let mut table = self.table.write();
            let mut policy = self.policy.lock();
            let expired: Vec<String> =
                table.iter().filter(|(_, entry)| entry.is_expired(now)).map(|(key, _)| key.clone()).collect();
            for key in expired {
                if let Some(entry) = table.remove(&key) {
                    policy.on_remove(&key);
                    removed.push((key, entry.value, EvictionReason::Expired));
                }
            }
        }
        let count = removed.len();
        self.notify(removed);
        count
    }

    fn notify(&self, removed: Removed) {
        let Some(listener) = &self.listener else {
            return;
        };
        for (key, value, reason) in removed {
            listener.on_evict(&key, &value, reason);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting(capacity: usize, policy: PolicyKind) -> (EvictionCache, Arc<AtomicUsize>) {
        let evicted = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&evicted);
        let cache = EvictionCache::new(
            CacheOptions::default().with_capacity(capacity).with_policy(policy).with_listener(
                move |_: &str, _: &[u8], _: EvictionReason| {
                    counter.fetch_add(1, Ordering::SeqCst);
                },
            ),
        )
        .unwrap();
        (cache, evicted)
    }

    #[rstest]
    #[case(PolicyKind::Lru)]
    #[case(PolicyKind::Lfu)]
    #[case(PolicyKind::Arc)]
    #[case(PolicyKind::Unordered)]
    fn never_exceeds_capacity(#[case] policy: PolicyKind) {
        let (cache, evicted) = counting(100, policy);
        for i in 0..250 {
            cache.set(i.to_string(), i.to_string());
            assert!(cache.item_count() <= 100);
        }
        assert_eq!(cache.item_count(), 100);
        assert_eq!(evicted.load(Ordering::SeqCst), 150);
        assert!(cache.contains("249"));
    }

    #[rstest]
    #[case(PolicyKind::Lru)]
    #[case(PolicyKind::Lfu)]
    #[case(PolicyKind::Arc)]
    #[case(PolicyKind::Unordered)]
    fn overwrite_does_not_evict(#[case] policy: PolicyKind) {
        let (cache, evicted) = counting(2, policy);
        cache.set("a", b"1".to_vec());
        cache.set("b", b"2".to_vec());
        cache.set("a", b"3".to_vec());
        assert_eq!(evicted.load(Ordering::SeqCst), 0);
        assert_eq!(cache.get("a").as_deref(), Some(&b"3"[..]));
        assert_eq!(cache.item_count(), 2);
    }

    #[test]
    fn lru_keeps_recently_read() {
        let (cache, _) = counting(3, PolicyKind::Lru);
        for key in ["a", "b", "c"] {
            cache.set(key, key.as_bytes().to_vec());
        }
        cache.get("a");
        cache.set("d", b"d".to_vec());
        assert!(cache.contains("a"));
        assert!(!cache.contains("b"));
    }

    #[test]
    fn peek_does_not_refresh() {
        let (cache, _) = counting(2, PolicyKind::Lru);
        cache.set("a", b"a".to_vec());
        cache.set("b", b"b".to_vec());
        assert_eq!(cache.peek("a").as_deref(), Some(&b"a"[..]));
        cache.set("c", b"c".to_vec());
        assert!(!cache.contains("a"));
        assert!(cache.contains("b"));
    }

    #[test]
    fn lfu_keeps_frequently_read() {
        let (cache, _) = counting(3, PolicyKind::Lfu);
        for key in ["a", "b", "c"] {
            cache.set(key, key.as_bytes().to_vec());
        }
        for _ in 0..3 {
            cache.get("a");
            cache.get("b");
        }
        cache.get("c");
        cache.set("d", b"d".to_vec());
        assert!(cache.contains("a"));
        assert!(cache.contains("b"));
        assert!(!cache.contains("c"));
    }

    #[test]
    fn lfu_overwrite_resets_frequency() {
        let (cache, _) = counting(2, PolicyKind::Lfu);
        cache.set("a", b"1".to_vec());
        for _ in 0..3 {
            cache.get("a");
        }
        cache.set("b", b"b".to_vec());
        cache.get("b");
        cache.set("a", b"2".to_vec());
        cache.set("c", b"c".to_vec());
        assert!(!cache.contains("a"));
        assert!(cache.contains("b"));
        assert!(cache.contains("c"));
    }

    #[test]
    fn expired_entries_are_invisible() {
        let (cache, evicted) = counting(10, PolicyKind::Lru);
        cache.set_with_ttl("short", b"v".to_vec(), Duration::from_millis(20));
        cache.set_with_ttl("forever", b"v".to_vec(), Duration::ZERO);
        std::thread::sleep(Duration::from_millis(40));
        assert!(!cache.contains("short"));
        assert_eq!(cache.item_count(), 1);
        assert_eq!(cache.get("short"), None);
        assert_eq!(evicted.load(Ordering::SeqCst), 1);
        assert_eq!(cache.get("forever").as_deref(), Some(&b"v"[..]));
    }

    #[test]
    fn delete_expired_reports_each_entry() {
        let reasons = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&reasons);
        let cache = EvictionCache::new(
            CacheOptions::default().with_default_ttl(Duration::from_millis(10)).with_listener(
                move |key: &str, _: &[u8], reason: EvictionReason| sink.lock().push((key.to_owned(), reason)),
            ),
        )
        .unwrap();
        cache.set("a", b"1".to_vec());
        cache.set("b", b"2".to_vec());
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(cache.delete_expired(), 2);
        assert_eq!(cache.delete_expired(), 0);
        let mut seen = reasons.lock().clone();
        seen.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(
            seen,
            vec![("a".to_string(), EvictionReason::Expired), ("b".to_string(), EvictionReason::Expired)]
        );
    }

    #[test]
    fn delete_notifies_listener() {
        let reasons = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&reasons);
        let cache = EvictionCache::new(CacheOptions::default().with_listener(
            move |_: &str, value: &[u8], reason: EvictionReason| sink.lock().push((value.to_vec(), reason)),
        ))
        .unwrap();
        cache.set("a", b"1".to_vec());
        assert_eq!(cache.delete("a").as_deref(), Some(&b"1"[..]));
        assert_eq!(cache.delete("a"), None);
        assert_eq!(*reasons.lock(), vec![(b"1".to_vec(), EvictionReason::Deleted)]);
    }

    #[test]
    fn purge_is_silent() {
        let (cache, evicted) = counting(10, PolicyKind::Arc);
        cache.set("a", b"1".to_vec());
        cache.set("b", b"2".to_vec());
        cache.purge();
        assert_eq!(cache.item_count(), 0);
        assert_eq!(evicted.load(Ordering::SeqCst), 0);
        cache.set("c", b"3".to_vec());
        assert!(cache.contains("c"));
    }

    #[test]
    fn scan_stops_on_error() {
        let (cache, _) = counting(10, PolicyKind::Lru);
        for i in 0..5 {
            cache.set(i.to_string(), vec![i]);
        }
        let mut seen = 0;
        let result = cache.scan(|_, _| {
            seen += 1;
            if seen == 3 { Err("stop") } else { Ok(()) }
        });
        assert_eq!(result, Err("stop"));
        assert_eq!(seen, 3);
    }

    #[test]
    fn listener_may_reenter_cache() {
        let cache = Arc::new(parking_lot::Mutex::new(None::<Arc<EvictionCache>>));
        let handle = Arc::clone(&cache);
        let inner = Arc::new(
            EvictionCache::new(CacheOptions::default().with_capacity(1).with_listener(
                move |key: &str, _: &[u8], _: EvictionReason| {
                    if let Some(cache) = handle.lock().as_ref() {
                        assert!(!cache.contains(key));
                    }
                },
            ))
            .unwrap(),
        );
        *cache.lock() = Some(Arc::clone(&inner));
        inner.set("a", b"1".to_vec());
        inner.set("b", b"2".to_vec());
        assert!(inner.contains("b"));
        cache.lock().take();
    }

    #[test]
    fn zero_sweep_interval_rejected() {
        let err = EvictionCache::new(CacheOptions::default().with_sweep_interval(Duration::ZERO)).unwrap_err();
        assert!(matches!(*err, ErrorKind::InvalidConfig(_)));
    }

    #[test]
    fn zero_capacity_uses_default() {
        let cache = EvictionCache::new(CacheOptions::default()).unwrap();
        assert_eq!(cache.capacity(), crate::DEFAULT_CAPACITY);
        assert_eq!(cache.policy(), PolicyKind::Lru);
    }
}
