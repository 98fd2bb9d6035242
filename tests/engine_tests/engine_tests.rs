//! Engine Tests
//!
//! Tests verify the behaviour the durable backend relies on:
//! - Writes survive a drop without close (WAL replay)
//! - Deletes stay deleted across flushes and restarts
//! - Scans from a start key over the memtable and SSTables
//! - A failed flush does not fail an already logged write

use std::fs;
use std::path::Path;
use std::thread;

use routekv::config::{Config, WalSyncStrategy};
use routekv::engine::Engine;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn open_with_limit(dir: &Path, memtable_size_limit: usize) -> Engine {
    let config = Config::builder()
        .data_dir(dir)
        .wal_sync_strategy(WalSyncStrategy::EveryWrite)
        .memtable_size_limit(memtable_size_limit)
        .build();
    Engine::open(&config.data_dir, &config).unwrap()
}

fn open(dir: &Path) -> Engine {
    open_with_limit(dir, 1024 * 1024)
}

fn names(entries: &[(Vec<u8>, Vec<u8>)]) -> Vec<String> {
    entries
        .iter()
        .map(|(k, _)| String::from_utf8(k.clone()).unwrap())
        .collect()
}

// =============================================================================
// Open Tests
// =============================================================================

#[test]
fn test_open_creates_nested_layout() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("data").join("routes.db");

    let engine = open(&dir);

    assert_eq!(engine.dir(), dir.as_path());
    assert!(dir.join("sstables").is_dir());
    assert!(dir.join("wal.log").is_file());
}

// =============================================================================
// Recovery Tests
// =============================================================================

#[test]
fn test_unclosed_writes_are_replayed() {
    let temp = TempDir::new().unwrap();
    {
        let engine = open(temp.path());
        engine.put(b"go", b"http://go.dev").unwrap();
        engine.put(b"home", b"http://example.com").unwrap();
        engine.delete(b"home").unwrap();
        // Dropped without close
    }

    let engine = open(temp.path());

    assert_eq!(engine.get(b"go").unwrap(), Some(b"http://go.dev".to_vec()));
    assert_eq!(engine.get(b"home").unwrap(), None);
    // Replayed entries were flushed and the log emptied
    assert_eq!(engine.sstable_count(), 1);
    assert_eq!(engine.memtable_entry_count(), 0);
    assert_eq!(fs::metadata(temp.path().join("wal.log")).unwrap().len(), 0);
}

#[test]
fn test_torn_log_tail_keeps_earlier_writes() {
    let temp = TempDir::new().unwrap();
    {
        let engine = open(temp.path());
        engine.put(b"go", b"http://go.dev").unwrap();
    }
    let wal = temp.path().join("wal.log");
    let mut bytes = fs::read(&wal).unwrap();
    bytes.extend_from_slice(&[0x01, 0x00, 0x00]);
    fs::write(&wal, bytes).unwrap();

    let engine = open(temp.path());

    assert_eq!(engine.get(b"go").unwrap(), Some(b"http://go.dev".to_vec()));
    engine.put(b"wiki", b"http://wikipedia.org").unwrap();
    drop(engine);

    let engine = open(temp.path());
    assert_eq!(names(&engine.scan(b"").unwrap()), vec!["go", "wiki"]);
}

// =============================================================================
// Tombstone Tests
// =============================================================================

#[test]
fn test_delete_shadows_flushed_value() {
    let temp = TempDir::new().unwrap();
    let engine = open(temp.path());

    engine.put(b"go", b"http://go.dev").unwrap();
    engine.flush().unwrap();
    engine.delete(b"go").unwrap();

    assert_eq!(engine.get(b"go").unwrap(), None);

    engine.flush().unwrap();
    assert_eq!(engine.sstable_count(), 2);
    assert_eq!(engine.get(b"go").unwrap(), None);
    assert!(engine.scan(b"").unwrap().is_empty());

    engine.close().unwrap();
    drop(engine);

    let engine = open(temp.path());
    assert_eq!(engine.get(b"go").unwrap(), None);
}

#[test]
fn test_put_after_delete_revives_name() {
    let temp = TempDir::new().unwrap();
    let engine = open(temp.path());

    engine.put(b"go", b"http://old").unwrap();
    engine.flush().unwrap();
    engine.delete(b"go").unwrap();
    engine.flush().unwrap();
    engine.put(b"go", b"http://new").unwrap();

    assert_eq!(engine.get(b"go").unwrap(), Some(b"http://new".to_vec()));
}

// =============================================================================
// Scan Tests
// =============================================================================

#[test]
fn test_scan_merges_memtable_over_sstables() {
    let temp = TempDir::new().unwrap();
    let engine = open(temp.path());

    engine.put(b"a", b"1").unwrap();
    engine.put(b"go", b"old").unwrap();
    engine.put(b"wiki", b"w").unwrap();
    engine.flush().unwrap();
    engine.put(b"go", b"new").unwrap();
    engine.put(b"home", b"h").unwrap();
    engine.delete(b"wiki").unwrap();

    let from_b = engine.scan(b"b").unwrap();

    assert_eq!(
        from_b,
        vec![
            (b"go".to_vec(), b"new".to_vec()),
            (b"home".to_vec(), b"h".to_vec()),
        ]
    );
    assert_eq!(names(&engine.scan(b"").unwrap()), vec!["a", "go", "home"]);
    assert!(engine.scan(b"x").unwrap().is_empty());
}

#[test]
fn test_size_limit_flushes_automatically() {
    let temp = TempDir::new().unwrap();
    let engine = open_with_limit(temp.path(), 100);

    for i in 0..20 {
        engine
            .put(format!("r{:02}", i).as_bytes(), b"http://example.com/long")
            .unwrap();
    }

    assert!(engine.sstable_count() > 0);
    assert!(engine.memtable_size() < 100);
    assert_eq!(engine.scan(b"").unwrap().len(), 20);
}

// =============================================================================
// Flush Failure Tests
// =============================================================================

#[test]
fn test_failed_flush_keeps_write_acknowledged() {
    let temp = TempDir::new().unwrap();
    let engine = open_with_limit(temp.path(), 128);

    // SSTables cannot be created until the directory is back
    fs::remove_dir_all(engine.storage_dir()).unwrap();

    let target = vec![b'x'; 200];
    engine.put(b"big", &target).unwrap();
    assert_eq!(engine.get(b"big").unwrap(), Some(target.clone()));
    assert_eq!(engine.sstable_count(), 0);

    fs::create_dir(engine.storage_dir()).unwrap();
    engine.put(b"next", b"http://example.com").unwrap();
    assert_eq!(engine.sstable_count(), 1);
    assert_eq!(engine.memtable_entry_count(), 0);
    drop(engine);

    let engine = open(temp.path());
    assert_eq!(engine.get(b"big").unwrap(), Some(target));
    assert_eq!(
        engine.get(b"next").unwrap(),
        Some(b"http://example.com".to_vec())
    );
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_writers_with_flushes() {
    let temp = TempDir::new().unwrap();
    let engine = open_with_limit(temp.path(), 256);

    thread::scope(|s| {
        for t in 0..4 {
            let engine = &engine;
            s.spawn(move || {
                for i in 0..50 {
                    let name = format!("t{}-{:02}", t, i);
                    engine.put(name.as_bytes(), b"http://example.com").unwrap();
                }
            });
        }
    });

    let all = engine.scan(b"").unwrap();
    assert_eq!(all.len(), 200);
    assert!(all.windows(2).all(|w| w[0].0 < w[1].0));
}
