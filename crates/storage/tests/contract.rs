use rstest::rstest;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;
use tierkv_storage::backend::MemoryBackend;
use tierkv_storage::error::{ErrorKind, Result};
use tierkv_storage::{Backend, DiskHandle, ScanOptions, open};

enum Engine {
    Disk(Backend),
    Memory,
}

fn store(engine: Engine) -> (TempDir, DiskHandle) {
    let dir = tempfile::tempdir().unwrap();
    let handle: DiskHandle = match engine {
        Engine::Disk(backend) => open(backend, dir.path()).unwrap(),
        Engine::Memory => Arc::new(MemoryBackend::default()),
    };
    (dir, handle)
}

fn collect(store: &DiskHandle, prefix: Option<&str>) -> Vec<(String, Vec<u8>)> {
    let mut records = Vec::new();
    let mut handler = |key: &str, value: &[u8]| -> Result<()> {
        records.push((key.to_string(), value.to_vec()));
        Ok(())
    };
    let options = ScanOptions::new(&mut handler);
    let options = match prefix {
        Some(prefix) => options.with_prefix(prefix),
        None => options,
    };
    store.scan(options).unwrap();
    records.sort();
    records
}

#[rstest]
#[case(Engine::Disk(Backend::Redb))]
#[case(Engine::Disk(Backend::Directory))]
#[case(Engine::Memory)]
fn keyed_engines_round_trip(#[case] engine: Engine) {
    let (_dir, store) = store(engine);
    store.set("user/1", b"alice", None).unwrap();
    store.set("user/2", b"bob", None).unwrap();
    store.set("group/1", b"admins", None).unwrap();
    assert_eq!(store.get("user/1").unwrap(), b"alice");
    assert_eq!(store.size().unwrap(), 3);

    let users = collect(&store, Some("user/"));
    assert_eq!(users, vec![("user/1".to_string(), b"alice".to_vec()), ("user/2".to_string(), b"bob".to_vec())]);
    assert_eq!(collect(&store, None).len(), 3);

    store.del("user/1").unwrap();
    store.del("user/1").unwrap();
    assert!(store.get("user/1").unwrap_err().is_not_found());
    assert_eq!(store.get_many(&["user/1", "user/2"]).unwrap(), vec![None, Some(b"bob".to_vec())]);
    store.close().unwrap();
}

#[rstest]
#[case(Engine::Disk(Backend::Redb))]
#[case(Engine::Disk(Backend::Directory))]
#[case(Engine::Memory)]
fn expired_records_vanish(#[case] engine: Engine) {
    let (_dir, store) = store(engine);
    store.set("short", b"1", Some(Duration::from_millis(20))).unwrap();
    store.set("long", b"2", Some(Duration::from_secs(3600))).unwrap();
    store.set("forever", b"3", Some(Duration::ZERO)).unwrap();
    let left = store.ttl("long").unwrap().unwrap();
    assert!(left > Duration::from_secs(3590));
    assert_eq!(store.ttl("forever").unwrap(), None);

    thread::sleep(Duration::from_millis(50));
    assert!(store.get("short").unwrap_err().is_not_found());
    let keys: Vec<_> = collect(&store, None).into_iter().map(|(key, _)| key).collect();
    assert_eq!(keys, vec!["forever", "long"]);
}

#[rstest]
#[case(Engine::Disk(Backend::Redb))]
#[case(Engine::Disk(Backend::Directory))]
#[case(Engine::Memory)]
fn handler_error_stops_scan(#[case] engine: Engine) {
    let (_dir, store) = store(engine);
    store.set_many(&[("a", b"1".as_slice()), ("b", b"2".as_slice()), ("c", b"3".as_slice())], None).unwrap();
    let mut visited = 0;
    let mut handler = |key: &str, _: &[u8]| -> Result<()> {
        visited += 1;
        exn::bail!(ErrorKind::NotFound(key.to_string()))
    };
    let err = store.scan(ScanOptions::new(&mut handler)).unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(visited, 1);
}

#[rstest]
#[case(Engine::Disk(Backend::Redb))]
#[case(Engine::Memory)]
fn concurrent_incr_is_atomic(#[case] engine: Engine) {
    let (_dir, store) = store(engine);
    let workers: Vec<_> = (0..4)
        .map(|_| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for _ in 0..25 {
                    store.incr("hits", 1).unwrap();
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }
    assert_eq!(store.get("hits").unwrap(), b"100");
}

#[test]
fn file_engine_keeps_insertion_order() {
    let (_dir, store) = store(Engine::Disk(Backend::File));
    store.set("b", b"2", None).unwrap();
    store.set("a", b"1", Some(Duration::from_secs(1))).unwrap();
    let mut keys = Vec::new();
    let mut handler = |key: &str, _: &[u8]| -> Result<()> {
        keys.push(key.to_string());
        Ok(())
    };
    store.scan(ScanOptions::new(&mut handler)).unwrap();
    assert_eq!(keys, vec!["b", "a"]);
    assert!(matches!(*store.get("a").unwrap_err(), ErrorKind::Unsupported { .. }));
    store.close().unwrap();
}
