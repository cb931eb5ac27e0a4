use rstest::rstest;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use tierkv::cache::EvictionReason;
use tierkv::storage::Backend;
use tierkv::{HybridOptions, HybridStore, Mode};

fn counting(options: HybridOptions) -> (HybridOptions, Arc<AtomicUsize>) {
    let evicted = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&evicted);
    let options = options.with_on_evicted(move |_: &str, _: &[u8], _: EvictionReason| {
        counter.fetch_add(1, Ordering::Relaxed);
    });
    (options, evicted)
}

#[rstest]
#[case(Backend::Redb, 2500, 5000)]
#[case(Backend::Directory, 100, 250)]
fn every_key_survives_spilling(#[case] backend: Backend, #[case] in_memory: usize, #[case] total: usize) {
    let dir = tempfile::tempdir().unwrap();
    let (options, evicted) = counting(
        HybridOptions::hybrid().with_backend(backend).with_max_memory_items(in_memory).with_path(dir.path()),
    );
    let store = HybridStore::new(options).unwrap();
    for i in 0..total {
        let key = i.to_string();
        store.set(&key, key.as_bytes()).unwrap();
    }
    assert_eq!(evicted.load(Ordering::Relaxed), total - in_memory);
    assert_eq!(store.len_memory(), in_memory);

    for i in 0..total {
        let key = i.to_string();
        assert_eq!(store.get(&key).unwrap(), Some(key.into_bytes()), "key {i}");
    }
    store.close().unwrap();
}

#[test]
fn disk_mode_writes_through() {
    let dir = tempfile::tempdir().unwrap();
    let store = HybridStore::new(HybridOptions::disk().with_path(dir.path())).unwrap();
    assert_eq!(store.mode(), Mode::Disk);
    store.set("a", b"1").unwrap();
    assert_eq!(store.len_memory(), 0);
    assert_eq!(store.size().unwrap(), 1);
    drop(store);

    let store = HybridStore::new(HybridOptions::disk().with_path(dir.path())).unwrap();
    assert_eq!(store.get("a").unwrap(), Some(b"1".to_vec()));
}

#[test]
fn memory_mode_forgets_victims() {
    let (options, evicted) = counting(HybridOptions::memory().with_max_memory_items(10));
    let store = HybridStore::new(options).unwrap();
    for i in 0..20 {
        store.set(&i.to_string(), b"v").unwrap();
    }
    assert_eq!(evicted.load(Ordering::Relaxed), 10);
    assert_eq!(store.size().unwrap(), 10);
    assert_eq!(store.get("0").unwrap(), None);
}

#[test]
fn file_backend_keeps_demotion_order() {
    let dir = tempfile::tempdir().unwrap();
    let options = HybridOptions::hybrid()
        .with_backend(Backend::File)
        .with_max_memory_items(2)
        .with_path(dir.path())
        .with_policy(tierkv::cache::PolicyKind::Lru);
    let store = HybridStore::new(options).unwrap();
    for key in ["a", "b", "c", "d"] {
        store.set(key, key.as_bytes()).unwrap();
    }
    let mut keys = Vec::new();
    store
        .scan(|key, _| {
            keys.push(key.to_string());
            Ok(())
        })
        .unwrap();
    let (memory, disk) = keys.split_at(2);
    let mut memory = memory.to_vec();
    memory.sort();
    assert_eq!(memory, vec!["c", "d"]);
    assert_eq!(disk, ["a", "b"]);
}

#[test]
fn concurrent_callers() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(
        HybridStore::new(HybridOptions::hybrid().with_max_memory_items(50).with_path(dir.path())).unwrap(),
    );
    let workers: Vec<_> = (0..4)
        .map(|worker| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for i in 0..100 {
                    let key = format!("{worker}/{i}");
                    store.set(&key, key.as_bytes()).unwrap();
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }
    for worker in 0..4 {
        for i in 0..100 {
            let key = format!("{worker}/{i}");
            assert_eq!(store.get(&key).unwrap(), Some(key.clone().into_bytes()));
        }
    }
}
