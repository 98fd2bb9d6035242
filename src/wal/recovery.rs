//! WAL Recovery
//!
//! Handles crash recovery by replaying the WAL.

use std::fs::{self, OpenOptions};
use std::path::Path;

use crate::error::EngineResult;

use super::entry::Frame;
use super::WalEntry;

/// Handles WAL recovery after crash
pub struct WalRecovery;

/// Result of a recovery operation
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecoveryResult {
    /// Number of entries successfully recovered
    pub entries_recovered: u64,

    /// Number of corrupted entries skipped
    pub entries_corrupted: u64,

    /// Last valid LSN
    pub last_lsn: u64,

    /// Whether the WAL was truncated (partial writes removed)
    pub was_truncated: bool,
}

/// Scan outcome shared by `recover` and `verify`
struct Scan {
    entries: Vec<WalEntry>,
    result: RecoveryResult,
    /// Length of the log up to the end of the last whole frame
    valid_len: u64,
    /// Total length of the file as read
    file_len: u64,
}

impl WalRecovery {
    /// Recover entries from a WAL file
    ///
    /// This will:
    /// 1. Read valid entries up to the first damaged one
    /// 2. Count a checksum failure as one corrupted entry
    /// 3. Truncate the log at the damage (corrupt entry or partial write)
    /// 4. Return the valid prefix in order
    pub fn recover(path: &Path) -> EngineResult<(Vec<WalEntry>, RecoveryResult)> {
        let mut scan = Self::scan(path)?;

        if scan.valid_len < scan.file_len {
            let file = OpenOptions::new().write(true).open(path)?;
            file.set_len(scan.valid_len)?;
            file.sync_all()?;
            scan.result.was_truncated = true;

            tracing::warn!(
                path = %path.display(),
                dropped_bytes = scan.file_len - scan.valid_len,
                "truncated damaged WAL tail"
            );
        }

        if scan.result.entries_corrupted > 0 {
            tracing::warn!(
                path = %path.display(),
                corrupted = scan.result.entries_corrupted,
                "discarded WAL from first corrupted entry"
            );
        }

        Ok((scan.entries, scan.result))
    }

    /// Verify integrity of a WAL file without modifying it
    ///
    /// `was_truncated` reports whether `recover` would truncate.
    pub fn verify(path: &Path) -> EngineResult<RecoveryResult> {
        let mut scan = Self::scan(path)?;
        scan.result.was_truncated = scan.valid_len < scan.file_len;
        Ok(scan.result)
    }

    fn scan(path: &Path) -> EngineResult<Scan> {
        let data = fs::read(path)?;
        let mut entries = Vec::new();
        let mut result = RecoveryResult::default();
        let mut pos = 0usize;

        while pos < data.len() {
            match WalEntry::decode_frame(&data[pos..]) {
                Frame::Complete(entry, size) => {
                    result.entries_recovered += 1;
                    result.last_lsn = result.last_lsn.max(entry.lsn);
                    entries.push(entry);
                    pos += size;
                }
                // Nothing after a bad checksum can be trusted to be framed
                // correctly
                Frame::Corrupt => {
                    result.entries_corrupted += 1;
                    break;
                }
                Frame::Partial => break,
            }
        }

        Ok(Scan {
            entries,
            result,
            valid_len: pos as u64,
            file_len: data.len() as u64,
        })
    }
}
