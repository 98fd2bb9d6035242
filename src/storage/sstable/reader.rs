//! SSTable Reader
//!
//! Opens SSTable files and provides O(log n) key lookups via in-memory index.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::ops::Bound;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::error::{EngineError, EngineResult};

use super::iterator::SSTableIterator;
use super::{FOOTER_SIZE, HEADER_SIZE, MAGIC, TOMBSTONE_MARKER, VERSION};

/// Reader for SSTable files with in-memory index for O(log n) lookups
///
/// The file handle sits behind a mutex so lookups take `&self` and the
/// storage manager can serve concurrent readers under a read lock.
pub struct SSTableReader {
    path: PathBuf,
    /// File handle for reading entries (seek position is shared state)
    file: Mutex<BufReader<File>>,
    /// In-memory index: key → file offset
    index: BTreeMap<Vec<u8>, u64>,
    entry_count: u64,
    /// Start of the index block == end of the data block
    index_offset: u64,
}

impl SSTableReader {
    /// Open an SSTable for reading
    ///
    /// Validates header and data checksum, then loads the index into memory.
    pub fn open(path: &Path) -> EngineResult<Self> {
        let mut file = File::open(path)?;
        let file_size = file.metadata()?.len();

        if file_size < HEADER_SIZE + FOOTER_SIZE {
            return Err(corrupt(path, format!("file too short ({} bytes)", file_size)));
        }

        let mut header = [0u8; HEADER_SIZE as usize];
        file.read_exact(&mut header)?;

        if &header[0..4] != MAGIC {
            return Err(corrupt(path, format!("bad magic {:?}", &header[0..4])));
        }

        let version = u16::from_le_bytes([header[4], header[5]]);
        if version != VERSION {
            return Err(corrupt(path, format!("unsupported version {}", version)));
        }

        let entry_count = read_u64(&header[6..14]);

        file.seek(SeekFrom::End(-(FOOTER_SIZE as i64)))?;
        let mut footer = [0u8; FOOTER_SIZE as usize];
        file.read_exact(&mut footer)?;

        let index_offset = read_u64(&footer[0..8]);
        let data_crc = read_u32(&footer[8..12]);

        if index_offset < HEADER_SIZE || index_offset > file_size - FOOTER_SIZE {
            return Err(corrupt(path, format!("index offset {} out of range", index_offset)));
        }

        // Data block checksum
        file.seek(SeekFrom::Start(HEADER_SIZE))?;
        let mut data = vec![0u8; (index_offset - HEADER_SIZE) as usize];
        file.read_exact(&mut data)?;
        if crc32fast::hash(&data) != data_crc {
            return Err(corrupt(path, "data block checksum mismatch".to_string()));
        }

        let mut index_data = vec![0u8; (file_size - FOOTER_SIZE - index_offset) as usize];
        file.read_exact(&mut index_data)?;
        let index = parse_index(path, &index_data)?;

        if index.len() as u64 != entry_count {
            return Err(corrupt(
                path,
                format!("header claims {} entries, index has {}", entry_count, index.len()),
            ));
        }

        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(BufReader::new(file)),
            index,
            entry_count,
            index_offset,
        })
    }

    /// Get a value by key — O(log n) lookup via in-memory index
    ///
    /// Returns:
    /// - `Ok(Some(value))` — key found with value
    /// - `Ok(None)` — key found but is a tombstone (deleted)
    /// - `Err(KeyNotFound)` — key not in this SSTable
    pub fn get(&self, key: &[u8]) -> EngineResult<Option<Vec<u8>>> {
        let offset = match self.index.get(key) {
            Some(&off) => off,
            None => return Err(EngineError::KeyNotFound),
        };

        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset))?;

        let mut header = [0u8; 8];
        file.read_exact(&mut header)?;
        let key_len = read_u32(&header[0..4]);
        let val_len = read_u32(&header[4..8]);

        file.seek_relative(key_len as i64)?;

        if val_len == TOMBSTONE_MARKER {
            return Ok(None);
        }

        let mut value = vec![0u8; val_len as usize];
        file.read_exact(&mut value)?;

        Ok(Some(value))
    }

    /// Get entry count
    pub fn entry_count(&self) -> u64 {
        self.entry_count
    }

    /// Path of the underlying file
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn min_key(&self) -> Option<&[u8]> {
        self.index.keys().next().map(|k| k.as_slice())
    }

    pub fn max_key(&self) -> Option<&[u8]> {
        self.index.keys().next_back().map(|k| k.as_slice())
    }

    /// Quick check if a key might be in this SSTable (range check)
    /// Returns false only if the key is definitely outside [min_key, max_key]
    pub fn might_contain(&self, key: &[u8]) -> bool {
        match (self.min_key(), self.max_key()) {
            (Some(min), Some(max)) => key >= min && key <= max,
            _ => false,
        }
    }

    /// Iterate over all entries in key order
    pub fn iter(&self) -> EngineResult<SSTableIterator<'_>> {
        SSTableIterator::new(self.file.lock(), HEADER_SIZE, self.index_offset)
    }

    /// Iterate over entries with key >= `start`, in key order
    pub fn iter_from(&self, start: &[u8]) -> EngineResult<SSTableIterator<'_>> {
        let begin = self
            .index
            .range::<[u8], _>((Bound::Included(start), Bound::Unbounded))
            .next()
            .map(|(_, &offset)| offset)
            .unwrap_or(self.index_offset);

        SSTableIterator::new(self.file.lock(), begin, self.index_offset)
    }
}

/// Parse index entries: [key_len(4)][offset(8)][key]
fn parse_index(path: &Path, data: &[u8]) -> EngineResult<BTreeMap<Vec<u8>, u64>> {
    let mut index = BTreeMap::new();
    let mut pos = 0;

    while pos < data.len() {
        if pos + 12 > data.len() {
            return Err(corrupt(path, format!("truncated index entry at {}", pos)));
        }
        let key_len = read_u32(&data[pos..pos + 4]) as usize;
        let offset = read_u64(&data[pos + 4..pos + 12]);
        pos += 12;

        if pos + key_len > data.len() {
            return Err(corrupt(path, format!("truncated index key at {}", pos)));
        }
        index.insert(data[pos..pos + key_len].to_vec(), offset);
        pos += key_len;
    }

    Ok(index)
}

fn corrupt(path: &Path, detail: String) -> EngineError {
    EngineError::Storage(format!("corrupt SSTable {}: {}", path.display(), detail))
}

pub(super) fn read_u32(bytes: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[..4]);
    u32::from_le_bytes(buf)
}

pub(super) fn read_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[..8]);
    u64::from_le_bytes(buf)
}
