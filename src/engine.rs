//! Engine Module
//!
//! The embedded storage engine that coordinates all components.
//!
//! ## Responsibilities
//! - Coordinate WAL, MemTable, and Storage
//! - Handle concurrent read/write access
//! - Trigger flushes when MemTable is full
//! - Manage crash recovery on startup
//! - Ordered range scans across MemTable and SSTables

use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::config::Config;
use crate::error::EngineResult;
use crate::memtable::{MemTable, MemTableEntry};
use crate::storage::{create_dir_synced, sync_dir, StorageManager};
use crate::wal::{Operation, WalRecovery, WalWriter};

/// The storage engine
///
/// ## Concurrency Model: Single-Writer / Multiple-Reader (SWMR)
///
/// - **Writes** (put/delete/flush): Serialized by `write_lock`
///   - Must acquire: write_lock → WAL → memtable → storage (write)
///
/// - **Reads** (get/scan): Never take `write_lock`
///   - MemTable uses an internal RwLock
///   - StorageManager takes its read lock; each SSTable reader locks its own
///     file handle
pub struct Engine {
    /// Directory holding the WAL and the SSTable directory
    dir: PathBuf,

    /// MemTable flush threshold (bytes)
    memtable_size_limit: usize,

    /// Write-ahead log for durability (exclusive access needed)
    wal: Mutex<WalWriter>,

    /// In-memory table for recent writes (internal RwLock)
    memtable: MemTable,

    /// Persistent storage manager (internal RwLock on sstables vec)
    storage: StorageManager,

    /// Serializes write operations (put/delete/flush)
    write_lock: Mutex<()>,
}

impl Engine {
    const WAL_FILENAME: &'static str = "wal.log";
    const SSTABLE_DIR: &'static str = "sstables";

    /// Open or create an engine rooted at `dir`
    ///
    /// On startup:
    /// 1. Open/create the directory
    /// 2. Load existing SSTables
    /// 3. Replay the WAL into the memtable
    /// 4. Flush recovered entries to an SSTable, then truncate the WAL
    pub fn open(dir: &Path, config: &Config) -> EngineResult<Self> {
        create_dir_synced(dir)?;

        let storage_dir = dir.join(Self::SSTABLE_DIR);
        let wal_path = dir.join(Self::WAL_FILENAME);

        let storage = StorageManager::open(&storage_dir)?;
        let memtable = MemTable::new();

        if wal_path.exists() {
            let (entries, recovery) = WalRecovery::recover(&wal_path)?;

            if recovery.entries_recovered > 0 || recovery.entries_corrupted > 0 {
                tracing::info!(
                    recovered = recovery.entries_recovered,
                    corrupted = recovery.entries_corrupted,
                    last_lsn = recovery.last_lsn,
                    truncated = recovery.was_truncated,
                    "WAL recovery"
                );
            }

            for entry in entries {
                match entry.operation {
                    Operation::Put { key, value } => {
                        memtable.put(key, value);
                    }
                    Operation::Delete { key } => {
                        memtable.delete(key);
                    }
                }
            }

            // Recovered data must be durable in an SSTable before the WAL is
            // emptied
            if !memtable.is_empty() {
                tracing::info!(entries = memtable.entry_count(), "flushing recovered entries");
                storage.flush(&memtable)?;
                memtable.clear();
            }
        }

        let fresh_wal = !wal_path.exists();
        let mut wal = WalWriter::open(&wal_path, config.wal_sync_strategy)?;
        wal.truncate()?;
        if fresh_wal {
            // The log's directory entry must survive a crash as well
            sync_dir(dir)?;
        }

        Ok(Self {
            dir: dir.to_path_buf(),
            memtable_size_limit: config.memtable_size_limit,
            wal: Mutex::new(wal),
            memtable,
            storage,
            write_lock: Mutex::new(()),
        })
    }

    /// Get a value by key
    ///
    /// Search order:
    /// 1. MemTable (most recent writes)
    /// 2. SSTables (newest to oldest)
    pub fn get(&self, key: &[u8]) -> EngineResult<Option<Vec<u8>>> {
        if let Some(entry) = self.memtable.get(key) {
            return Ok(match entry {
                MemTableEntry::Value(value) => Some(value),
                MemTableEntry::Tombstone => None,
            });
        }

        self.storage.get(key)
    }

    /// Put a key-value pair
    ///
    /// Steps:
    /// 1. Acquire write lock
    /// 2. Write to WAL (durability)
    /// 3. Write to MemTable
    /// 4. Check if flush needed
    ///
    /// Once the WAL append succeeds the write is committed and `Ok` is
    /// returned; a failed flush afterwards is retried later.
    pub fn put(&self, key: &[u8], value: &[u8]) -> EngineResult<()> {
        let _write_guard = self.write_lock.lock();

        self.wal.lock().append(Operation::Put {
            key: key.to_vec(),
            value: value.to_vec(),
        })?;

        let new_size = self.memtable.put(key.to_vec(), value.to_vec());
        self.flush_if_full(new_size);

        Ok(())
    }

    /// Delete a key (deleting a missing key still records a tombstone)
    pub fn delete(&self, key: &[u8]) -> EngineResult<()> {
        let _write_guard = self.write_lock.lock();

        self.wal.lock().append(Operation::Delete { key: key.to_vec() })?;

        let new_size = self.memtable.delete(key.to_vec());
        self.flush_if_full(new_size);

        Ok(())
    }

    /// All live entries with key >= `start`, in ascending key order
    ///
    /// The memtable is snapshotted before the SSTables are read: a flush that
    /// lands in between moves entries into an SSTable the scan then sees, and
    /// the snapshot still wins for any key it holds.
    pub fn scan(&self, start: &[u8]) -> EngineResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let recent = self.memtable.range_from(start);
        let mut merged = self.storage.scan_from(start)?;

        for (key, entry) in recent {
            let value = match entry {
                MemTableEntry::Value(v) => Some(v),
                MemTableEntry::Tombstone => None,
            };
            merged.insert(key, value);
        }

        Ok(merged
            .into_iter()
            .filter_map(|(key, value)| value.map(|v| (key, v)))
            .collect())
    }

    /// Flush memtable to disk (public API)
    ///
    /// Forces a flush regardless of memtable size
    pub fn flush(&self) -> EngineResult<()> {
        let _write_guard = self.write_lock.lock();
        self.flush_internal()
    }

    /// Called with write lock held, after the write is already in the WAL.
    ///
    /// A failed flush leaves the memtable and WAL intact, so nothing is lost;
    /// the next write over the limit (or `close`) tries again.
    fn flush_if_full(&self, memtable_size: usize) {
        if memtable_size < self.memtable_size_limit {
            return;
        }

        if let Err(e) = self.flush_internal() {
            tracing::warn!(
                error = %e,
                memtable_bytes = memtable_size,
                "memtable flush failed, keeping entries in WAL"
            );
        }
    }

    /// Called with write lock held
    fn flush_internal(&self) -> EngineResult<()> {
        if self.memtable.is_empty() {
            return Ok(());
        }

        self.storage.flush(&self.memtable)?;
        self.memtable.clear();

        // Entries are now durable in the SSTable
        self.wal.lock().truncate()?;

        Ok(())
    }

    /// Flush pending data and sync the WAL
    pub fn close(&self) -> EngineResult<()> {
        self.flush()?;
        self.wal.lock().sync()?;
        Ok(())
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Directory the engine lives in
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Directory where SSTables are stored
    pub fn storage_dir(&self) -> &Path {
        self.storage.data_dir()
    }

    pub fn memtable_size(&self) -> usize {
        self.memtable.size()
    }

    pub fn memtable_entry_count(&self) -> usize {
        self.memtable.entry_count()
    }

    pub fn sstable_count(&self) -> usize {
        self.storage.sstable_count()
    }
}
