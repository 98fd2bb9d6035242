//! WAL Writer
//!
//! Handles appending entries to the WAL file.
//!
//! A failed append never leaves bytes behind: the log is cut back to the end
//! of the last acknowledged entry before the error is returned, so recovery
//! can always read past it.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::mem;
use std::path::{Path, PathBuf};

use crate::config::WalSyncStrategy;
use crate::error::{EngineError, EngineResult};

use super::recovery::WalRecovery;
use super::{Operation, WalEntry};

/// Writes entries to the WAL file
pub struct WalWriter {
    /// Location of the log (for diagnostics)
    path: PathBuf,

    /// Buffered append handle
    writer: BufWriter<File>,

    /// Length of the log up to the end of the last acknowledged entry
    committed_len: u64,

    /// LSN the next appended entry receives
    next_lsn: u64,

    /// When to fsync
    sync_strategy: WalSyncStrategy,

    /// Entries written since the last fsync
    uncommitted: usize,

    /// Set when a failed append could not be rolled back
    poisoned: bool,
}

impl WalWriter {
    /// Open or create a WAL file
    ///
    /// LSNs continue from the last valid entry. A damaged tail is cut off
    /// first so new entries are never written behind it.
    pub fn open(path: &Path, sync_strategy: WalSyncStrategy) -> EngineResult<Self> {
        let last_lsn = if path.exists() {
            let report = WalRecovery::verify(path)?;
            if report.was_truncated {
                WalRecovery::recover(path)?.1.last_lsn
            } else {
                report.last_lsn
            }
        } else {
            0
        };

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let committed_len = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            committed_len,
            next_lsn: last_lsn + 1,
            sync_strategy,
            uncommitted: 0,
            poisoned: false,
        })
    }

    /// Append an operation to the WAL, returning its LSN
    ///
    /// With `EveryWrite` the entry is on stable storage when this returns.
    /// On error the entry is not in the log and the LSN is not consumed.
    pub fn append(&mut self, operation: Operation) -> EngineResult<u64> {
        if self.poisoned {
            return Err(EngineError::WalCorruption(format!(
                "{} has an unrecovered partial write",
                self.path.display()
            )));
        }

        let lsn = self.next_lsn;
        let frame = WalEntry::new(lsn, operation).serialize()?;

        if let Err(e) = self.write_frame(&frame) {
            self.rollback()?;
            return Err(e);
        }

        self.committed_len += frame.len() as u64;
        self.next_lsn += 1;
        Ok(lsn)
    }

    fn write_frame(&mut self, frame: &[u8]) -> EngineResult<()> {
        self.writer.write_all(frame)?;
        self.uncommitted += 1;

        let should_sync = match self.sync_strategy {
            WalSyncStrategy::EveryWrite => true,
            WalSyncStrategy::EveryNEntries { count } => self.uncommitted >= count.max(1),
        };

        if should_sync {
            self.sync()
        } else {
            // Hand the bytes to the OS even when not syncing
            self.writer.flush()?;
            Ok(())
        }
    }

    /// Cut the log back to `committed_len`, discarding anything still
    /// buffered. If that fails too, the writer refuses further appends.
    fn rollback(&mut self) -> EngineResult<()> {
        let result = self.reset_to_committed();
        if let Err(e) = &result {
            self.poisoned = true;
            tracing::error!(
                path = %self.path.display(),
                error = %e,
                "failed to roll back WAL append, refusing further writes"
            );
        }
        result
    }

    fn reset_to_committed(&mut self) -> EngineResult<()> {
        let file = self.writer.get_ref().try_clone()?;
        file.set_len(self.committed_len)?;
        file.sync_all()?;

        // Drop the old buffer without flushing it
        let stale = mem::replace(&mut self.writer, BufWriter::new(file));
        let (_, _discarded) = stale.into_parts();
        self.uncommitted = 0;

        tracing::warn!(
            path = %self.path.display(),
            len = self.committed_len,
            "rolled back failed WAL append"
        );
        Ok(())
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> EngineResult<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_data()?;
        self.uncommitted = 0;
        Ok(())
    }

    /// Drop every entry (after they were flushed to an SSTable)
    ///
    /// The log restarts at LSN 1.
    pub fn truncate(&mut self) -> EngineResult<()> {
        self.writer.flush()?;
        let file = self.writer.get_mut();
        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        file.sync_all().map_err(|e| {
            EngineError::Storage(format!("failed to sync truncated WAL {:?}: {}", self.path, e))
        })?;
        self.committed_len = 0;
        self.next_lsn = 1;
        self.uncommitted = 0;
        self.poisoned = false;
        Ok(())
    }

    /// Get the LSN the next entry will receive
    pub fn current_lsn(&self) -> u64 {
        self.next_lsn
    }

    /// Number of entries appended since the last fsync
    pub fn uncommitted_count(&self) -> usize {
        self.uncommitted
    }
}
