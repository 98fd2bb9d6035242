//! Storage Manager
//!
//! Manages multiple SSTables and coordinates reads/writes.
//!
//! ## Responsibilities
//! - Discover existing SSTables on startup
//! - Search SSTables newest → oldest for reads
//! - Create new SSTables from MemTable flushes
//! - Merge SSTables for ordered range scans

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::error::{EngineError, EngineResult};
use crate::memtable::{MemTable, MemTableEntry};

use super::{create_dir_synced, sync_dir, SSTableBuilder, SSTableMeta, SSTableReader};

/// Manages the storage layer
///
/// ## Concurrency:
/// - `sstables`: RwLock over the reader list; readers lock their own file
///   handle, so lookups and scans only need the read lock
/// - `next_sstable_id`: Atomic counter (lock-free)
pub struct StorageManager {
    /// Directory where SSTables are stored
    data_dir: PathBuf,

    /// Open SSTable readers, ordered newest → oldest
    sstables: RwLock<Vec<SSTableReader>>,

    /// Next ID for creating new SSTables
    next_sstable_id: AtomicU64,
}

impl StorageManager {
    /// Open or create storage in the given directory
    ///
    /// On startup:
    /// 1. Create directory if it doesn't exist
    /// 2. Discover existing SSTable files
    /// 3. Open readers for each (loads indexes into RAM)
    /// 4. Order by ID descending (newest first)
    pub fn open(path: &Path) -> EngineResult<Self> {
        create_dir_synced(path)?;

        let mut sstable_ids: Vec<u64> = Vec::new();
        for entry in fs::read_dir(path)? {
            let file_path = entry?.path();
            if file_path.is_file() {
                if let Some(id) = Self::parse_sstable_id(&file_path) {
                    sstable_ids.push(id);
                }
            }
        }

        sstable_ids.sort_unstable_by(|a, b| b.cmp(a));

        let sstables = sstable_ids
            .iter()
            .map(|&id| SSTableReader::open(&Self::sstable_path_with_dir(path, id)))
            .collect::<EngineResult<Vec<_>>>()?;

        let next_id = sstable_ids.first().map(|&id| id + 1).unwrap_or(1);

        tracing::debug!(
            dir = %path.display(),
            sstables = sstables.len(),
            "storage opened"
        );

        Ok(Self {
            data_dir: path.to_path_buf(),
            sstables: RwLock::new(sstables),
            next_sstable_id: AtomicU64::new(next_id),
        })
    }

    /// Get a value by key (searches all SSTables newest → oldest)
    ///
    /// Returns:
    /// - `Ok(Some(value))` — key found with value
    /// - `Ok(None)` — key not found, or found tombstone (deleted)
    pub fn get(&self, key: &[u8]) -> EngineResult<Option<Vec<u8>>> {
        let sstables = self.sstables.read();

        for reader in sstables.iter() {
            if !reader.might_contain(key) {
                continue;
            }

            match reader.get(key) {
                Ok(found) => return Ok(found),
                Err(EngineError::KeyNotFound) => continue,
                Err(e) => return Err(e),
            }
        }

        Ok(None)
    }

    /// Merge every SSTable's entries with key >= `start`
    ///
    /// Newer tables override older ones. Tombstones are kept as `None` so the
    /// caller can overlay the memtable before dropping them.
    pub fn scan_from(&self, start: &[u8]) -> EngineResult<BTreeMap<Vec<u8>, Option<Vec<u8>>>> {
        let sstables = self.sstables.read();
        let mut merged = BTreeMap::new();

        // Oldest first so newer entries overwrite
        for reader in sstables.iter().rev() {
            for item in reader.iter_from(start)? {
                let (key, value) = item?;
                merged.insert(key, value);
            }
        }

        Ok(merged)
    }

    /// Flush a MemTable to a new SSTable
    ///
    /// The file and its directory entry are synced before the reader is
    /// published at the front of the list.
    pub fn flush(&self, memtable: &MemTable) -> EngineResult<SSTableMeta> {
        if memtable.is_empty() {
            return Err(EngineError::Storage(
                "Cannot flush empty MemTable".to_string(),
            ));
        }

        let id = self.next_sstable_id.fetch_add(1, Ordering::SeqCst);
        let path = self.sstable_path(id);

        let mut builder = SSTableBuilder::new(&path)?;
        for (key, entry) in memtable.iter() {
            match entry {
                MemTableEntry::Value(v) => builder.add(&key, &v)?,
                MemTableEntry::Tombstone => builder.add_tombstone(&key)?,
            }
        }
        let meta = builder.finish()?;
        sync_dir(&self.data_dir)?;

        let reader = SSTableReader::open(&path)?;
        self.sstables.write().insert(0, reader);

        tracing::debug!(
            sstable = %path.display(),
            entries = meta.entry_count,
            bytes = meta.file_size,
            "memtable flushed"
        );

        Ok(meta)
    }

    /// Get the number of SSTables
    pub fn sstable_count(&self) -> usize {
        self.sstables.read().len()
    }

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Get the next SSTable ID (for testing/debugging)
    pub fn next_sstable_id(&self) -> u64 {
        self.next_sstable_id.load(Ordering::SeqCst)
    }

    fn sstable_path(&self, id: u64) -> PathBuf {
        Self::sstable_path_with_dir(&self.data_dir, id)
    }

    fn sstable_path_with_dir(dir: &Path, id: u64) -> PathBuf {
        dir.join(format!("sstable_{:06}.sst", id))
    }

    /// "sstable_000042.sst" → Some(42)
    fn parse_sstable_id(path: &Path) -> Option<u64> {
        if path.extension()? != "sst" {
            return None;
        }
        let name = path.file_stem()?.to_string_lossy();
        name.strip_prefix("sstable_")?.parse().ok()
    }
}
