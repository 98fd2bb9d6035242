//! MemTable implementation
//!
//! BTreeMap-based memtable with RwLock for concurrency.

use std::collections::BTreeMap;
use std::ops::Bound;

use parking_lot::RwLock;

use super::MemTableEntry;

/// In-memory table for recent writes
pub struct MemTable {
    inner: RwLock<Inner>,
}

struct Inner {
    data: BTreeMap<Vec<u8>, MemTableEntry>,
    /// Sum of key and value lengths (a tombstone counts its key only)
    size: usize,
}

impl MemTable {
    /// Create a new empty MemTable
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                data: BTreeMap::new(),
                size: 0,
            }),
        }
    }

    /// Get the entry for a key (read lock)
    ///
    /// `Some(Tombstone)` means the key was deleted and older tables must not
    /// be consulted.
    pub fn get(&self, key: &[u8]) -> Option<MemTableEntry> {
        self.inner.read().data.get(key).cloned()
    }

    /// Put a key-value pair (write lock), returning the new approximate size
    pub fn put(&self, key: Vec<u8>, value: Vec<u8>) -> usize {
        self.insert(key, MemTableEntry::Value(value))
    }

    /// Delete a key (write lock, inserts tombstone), returning the new size
    pub fn delete(&self, key: Vec<u8>) -> usize {
        self.insert(key, MemTableEntry::Tombstone)
    }

    fn insert(&self, key: Vec<u8>, entry: MemTableEntry) -> usize {
        let mut inner = self.inner.write();
        let added = entry_size(&key, &entry);

        if let Some(old) = inner.data.insert(key.clone(), entry) {
            inner.size -= entry_size(&key, &old);
        }
        inner.size += added;

        inner.size
    }

    /// Get approximate size in bytes
    pub fn size(&self) -> usize {
        self.inner.read().size
    }

    /// Get entry count (tombstones included)
    pub fn entry_count(&self) -> usize {
        self.inner.read().data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().data.is_empty()
    }

    /// Snapshot of all entries in sorted key order (for flush)
    pub fn iter(&self) -> Vec<(Vec<u8>, MemTableEntry)> {
        self.inner
            .read()
            .data
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Snapshot of entries with key >= `start`, in sorted key order
    pub fn range_from(&self, start: &[u8]) -> Vec<(Vec<u8>, MemTableEntry)> {
        let inner = self.inner.read();
        inner
            .data
            .range::<[u8], _>((Bound::Included(start), Bound::Unbounded))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Clear all entries (after successful flush)
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.data.clear();
        inner.size = 0;
    }
}

impl Default for MemTable {
    fn default() -> Self {
        Self::new()
    }
}

fn entry_size(key: &[u8], entry: &MemTableEntry) -> usize {
    let value_len = match entry {
        MemTableEntry::Value(v) => v.len(),
        MemTableEntry::Tombstone => 0,
    };
    key.len() + value_len
}
