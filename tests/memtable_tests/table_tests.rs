//! MemTable Tests
//!
//! Tests verify:
//! - Latest write wins, deletes leave tombstones
//! - Size accounting that drives flushes
//! - Sorted snapshots and start-key ranges used by route listing
//! - Concurrent readers alongside a writer

use std::sync::Arc;
use std::thread;

use routekv::memtable::{MemTable, MemTableEntry};

// =============================================================================
// Helper Functions
// =============================================================================

fn value(url: &str) -> MemTableEntry {
    MemTableEntry::Value(url.as_bytes().to_vec())
}

fn keys(entries: &[(Vec<u8>, MemTableEntry)]) -> Vec<&[u8]> {
    entries.iter().map(|(k, _)| k.as_slice()).collect()
}

// =============================================================================
// Write Tests
// =============================================================================

#[test]
fn test_latest_put_wins() {
    let memtable = MemTable::new();

    memtable.put(b"go".to_vec(), b"http://old".to_vec());
    memtable.put(b"go".to_vec(), b"http://new".to_vec());

    assert_eq!(memtable.get(b"go"), Some(value("http://new")));
    assert_eq!(memtable.entry_count(), 1);
}

#[test]
fn test_delete_records_tombstone() {
    let memtable = MemTable::new();

    memtable.put(b"go".to_vec(), b"http://x".to_vec());
    memtable.delete(b"go".to_vec());
    // Deleting a name the memtable never saw must still shadow older tables
    memtable.delete(b"never".to_vec());

    assert_eq!(memtable.get(b"go"), Some(MemTableEntry::Tombstone));
    assert_eq!(memtable.get(b"never"), Some(MemTableEntry::Tombstone));
    assert_eq!(memtable.get(b"other"), None);
    assert!(!memtable.is_empty());
}

// =============================================================================
// Size Tests
// =============================================================================

#[test]
fn test_size_counts_keys_and_values() {
    let memtable = MemTable::new();

    assert_eq!(memtable.put(b"abc".to_vec(), b"12345".to_vec()), 8);
    // Overwrite replaces the old value's bytes
    assert_eq!(memtable.put(b"abc".to_vec(), b"1".to_vec()), 4);
    // Tombstone keeps only the key
    assert_eq!(memtable.delete(b"abc".to_vec()), 3);
    assert_eq!(memtable.size(), 3);
}

#[test]
fn test_clear_resets_everything() {
    let memtable = MemTable::new();
    memtable.put(b"a".to_vec(), b"1".to_vec());
    memtable.delete(b"b".to_vec());

    memtable.clear();

    assert!(memtable.is_empty());
    assert_eq!(memtable.size(), 0);
    assert_eq!(memtable.get(b"a"), None);
}

// =============================================================================
// Ordering Tests
// =============================================================================

#[test]
fn test_iter_is_sorted_and_keeps_tombstones() {
    let memtable = MemTable::new();
    memtable.put(b"zeta".to_vec(), b"z".to_vec());
    memtable.delete(b"docs".to_vec());
    memtable.put(b"abc".to_vec(), b"a".to_vec());

    let entries = memtable.iter();

    assert_eq!(keys(&entries), vec![&b"abc"[..], b"docs", b"zeta"]);
    assert_eq!(entries[1].1, MemTableEntry::Tombstone);
}

#[test]
fn test_range_from_starts_at_first_key_not_less() {
    let memtable = MemTable::new();
    for name in ["ab", "abd", "b", "abc"] {
        memtable.put(name.as_bytes().to_vec(), b"x".to_vec());
    }

    assert_eq!(keys(&memtable.range_from(b"abc")), vec![&b"abc"[..], b"abd", b"b"]);
    assert_eq!(keys(&memtable.range_from(b"abca")), vec![&b"abd"[..], b"b"]);
    assert_eq!(memtable.range_from(b"").len(), 4);
    assert!(memtable.range_from(b"c").is_empty());
}

#[test]
fn test_snapshot_is_detached_from_later_writes() {
    let memtable = MemTable::new();
    memtable.put(b"a".to_vec(), b"1".to_vec());

    let snapshot = memtable.range_from(b"");
    memtable.put(b"b".to_vec(), b"2".to_vec());

    assert_eq!(snapshot.len(), 1);
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_readers_during_writes() {
    let memtable = Arc::new(MemTable::new());

    let writer = {
        let memtable = Arc::clone(&memtable);
        thread::spawn(move || {
            for i in 0..200 {
                memtable.put(format!("key{:03}", i).into_bytes(), b"v".to_vec());
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let memtable = Arc::clone(&memtable);
            thread::spawn(move || {
                for _ in 0..50 {
                    let snapshot = memtable.iter();
                    // Always sorted, whatever the writer is doing
                    assert!(snapshot.windows(2).all(|w| w[0].0 < w[1].0));
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }

    assert_eq!(memtable.entry_count(), 200);
}
