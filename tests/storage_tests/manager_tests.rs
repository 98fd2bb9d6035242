//! StorageManager Tests
//!
//! Tests verify:
//! - Newer tables shadow older ones, tombstones included
//! - Merged scans from a start key
//! - Reopening discovers tables and continues their numbering

use std::fs;

use routekv::memtable::MemTable;
use routekv::storage::StorageManager;
use routekv::EngineError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn flush(storage: &StorageManager, puts: &[(&str, &str)], deletes: &[&str]) {
    let memtable = MemTable::new();
    for (name, url) in puts {
        memtable.put(name.as_bytes().to_vec(), url.as_bytes().to_vec());
    }
    for name in deletes {
        memtable.delete(name.as_bytes().to_vec());
    }
    storage.flush(&memtable).unwrap();
}

// =============================================================================
// Flush Tests
// =============================================================================

#[test]
fn test_flush_writes_numbered_table() {
    let temp = TempDir::new().unwrap();
    let storage = StorageManager::open(temp.path()).unwrap();

    flush(&storage, &[("go", "http://go.dev")], &[]);

    assert!(temp.path().join("sstable_000001.sst").exists());
    assert_eq!(storage.sstable_count(), 1);
    assert_eq!(storage.next_sstable_id(), 2);
}

#[test]
fn test_empty_memtable_is_not_flushed() {
    let temp = TempDir::new().unwrap();
    let storage = StorageManager::open(temp.path()).unwrap();

    let result = storage.flush(&MemTable::new());

    assert!(matches!(result, Err(EngineError::Storage(_))));
    assert_eq!(storage.sstable_count(), 0);
}

// =============================================================================
// Lookup Tests
// =============================================================================

#[test]
fn test_newer_table_wins() {
    let temp = TempDir::new().unwrap();
    let storage = StorageManager::open(temp.path()).unwrap();

    flush(&storage, &[("go", "http://old"), ("home", "http://home")], &[]);
    flush(&storage, &[("go", "http://new")], &[]);

    assert_eq!(storage.get(b"go").unwrap(), Some(b"http://new".to_vec()));
    // Falls through to the older table
    assert_eq!(storage.get(b"home").unwrap(), Some(b"http://home".to_vec()));
    assert_eq!(storage.get(b"missing").unwrap(), None);
}

#[test]
fn test_tombstone_hides_older_value() {
    let temp = TempDir::new().unwrap();
    let storage = StorageManager::open(temp.path()).unwrap();

    flush(&storage, &[("go", "http://go.dev")], &[]);
    flush(&storage, &[], &["go"]);

    assert_eq!(storage.get(b"go").unwrap(), None);
}

// =============================================================================
// Scan Tests
// =============================================================================

#[test]
fn test_scan_merges_tables_and_keeps_tombstones() {
    let temp = TempDir::new().unwrap();
    let storage = StorageManager::open(temp.path()).unwrap();

    flush(&storage, &[("a", "1"), ("go", "old"), ("wiki", "w")], &[]);
    flush(&storage, &[("go", "new"), ("home", "h")], &["wiki"]);

    let merged = storage.scan_from(b"b").unwrap();
    let entries: Vec<_> = merged.into_iter().collect();

    assert_eq!(
        entries,
        vec![
            (b"go".to_vec(), Some(b"new".to_vec())),
            (b"home".to_vec(), Some(b"h".to_vec())),
            (b"wiki".to_vec(), None),
        ]
    );
}

// =============================================================================
// Reopen Tests
// =============================================================================

#[test]
fn test_reopen_finds_tables_and_continues_ids() {
    let temp = TempDir::new().unwrap();
    {
        let storage = StorageManager::open(temp.path()).unwrap();
        flush(&storage, &[("go", "http://old")], &[]);
        flush(&storage, &[("go", "http://new")], &[]);
    }
    // Not a table, must be ignored
    fs::write(temp.path().join("notes.txt"), b"hello").unwrap();

    let storage = StorageManager::open(temp.path()).unwrap();

    assert_eq!(storage.sstable_count(), 2);
    assert_eq!(storage.next_sstable_id(), 3);
    assert_eq!(storage.get(b"go").unwrap(), Some(b"http://new".to_vec()));
}

#[test]
fn test_open_creates_missing_directory() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("a").join("sstables");

    let storage = StorageManager::open(&dir).unwrap();

    assert!(dir.is_dir());
    assert_eq!(storage.data_dir(), dir.as_path());
    assert_eq!(storage.sstable_count(), 0);
}
