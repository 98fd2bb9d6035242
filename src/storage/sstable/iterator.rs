//! SSTable Iterator
//!
//! Sequential iteration over a run of entries in an SSTable.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};

use parking_lot::MutexGuard;

use crate::error::{EngineError, EngineResult};

use super::reader::read_u32;
use super::TOMBSTONE_MARKER;

/// Iterator over SSTable entries in sorted key order
///
/// Holds the reader's file lock for its whole lifetime.
pub struct SSTableIterator<'a> {
    file: MutexGuard<'a, BufReader<File>>,
    /// Stop reading when we reach this offset (start of index block)
    end_offset: u64,
    /// Current position in file
    current_offset: u64,
}

impl<'a> SSTableIterator<'a> {
    pub(super) fn new(
        mut file: MutexGuard<'a, BufReader<File>>,
        start_offset: u64,
        end_offset: u64,
    ) -> EngineResult<Self> {
        file.seek(SeekFrom::Start(start_offset))?;
        Ok(Self {
            file,
            end_offset,
            current_offset: start_offset,
        })
    }

    fn read_entry(&mut self) -> EngineResult<(Vec<u8>, Option<Vec<u8>>)> {
        let mut header = [0u8; 8];
        self.file.read_exact(&mut header)?;

        let key_len = read_u32(&header[0..4]) as usize;
        let val_len = read_u32(&header[4..8]);

        let mut key = vec![0u8; key_len];
        self.file.read_exact(&mut key)?;

        let mut entry_size = 8 + key_len as u64;

        let value = if val_len == TOMBSTONE_MARKER {
            None
        } else {
            let mut v = vec![0u8; val_len as usize];
            self.file.read_exact(&mut v)?;
            entry_size += val_len as u64;
            Some(v)
        };

        self.current_offset += entry_size;
        if self.current_offset > self.end_offset {
            return Err(EngineError::Storage(format!(
                "SSTable entry overruns data block ({} > {})",
                self.current_offset, self.end_offset
            )));
        }

        Ok((key, value))
    }
}

impl<'a> Iterator for SSTableIterator<'a> {
    /// (key, Option<value>) — None value means tombstone
    type Item = EngineResult<(Vec<u8>, Option<Vec<u8>>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_offset >= self.end_offset {
            return None;
        }

        match self.read_entry() {
            Ok(entry) => Some(Ok(entry)),
            Err(e) => {
                // Stop iteration after the first error
                self.current_offset = self.end_offset;
                Some(Err(e))
            }
        }
    }
}
