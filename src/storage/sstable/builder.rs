//! SSTable Builder
//!
//! Writes sorted key-value entries to a new SSTable file.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::{EngineError, EngineResult};

use super::{SSTableMeta, HEADER_SIZE, MAGIC, TOMBSTONE_MARKER, VERSION};

/// Builder for creating new SSTables from sorted entries
pub struct SSTableBuilder {
    path: PathBuf,
    writer: BufWriter<File>,
    entry_count: u64,
    /// Offset where the next entry starts
    current_offset: u64,
    /// key → offset of its entry, in key order
    index: Vec<(Vec<u8>, u64)>,
    /// Running CRC of the data block
    data_hasher: crc32fast::Hasher,
}

impl SSTableBuilder {
    /// Create a new SSTable builder
    ///
    /// Writes the header immediately; call `add()`/`add_tombstone()` in
    /// strictly ascending key order, then `finish()`.
    pub fn new(path: &Path) -> EngineResult<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        let mut writer = BufWriter::new(file);

        // Entry count is patched in by finish()
        writer.write_all(MAGIC)?;
        writer.write_all(&VERSION.to_le_bytes())?;
        writer.write_all(&0u64.to_le_bytes())?;

        Ok(Self {
            path: path.to_path_buf(),
            writer,
            entry_count: 0,
            current_offset: HEADER_SIZE,
            index: Vec::new(),
            data_hasher: crc32fast::Hasher::new(),
        })
    }

    /// Add a key-value pair
    pub fn add(&mut self, key: &[u8], value: &[u8]) -> EngineResult<()> {
        self.write_entry(key, Some(value))
    }

    /// Add a tombstone
    pub fn add_tombstone(&mut self, key: &[u8]) -> EngineResult<()> {
        self.write_entry(key, None)
    }

    fn write_entry(&mut self, key: &[u8], value: Option<&[u8]>) -> EngineResult<()> {
        if let Some((last, _)) = self.index.last() {
            if key <= last.as_slice() {
                return Err(EngineError::Storage(format!(
                    "SSTable keys out of order: {:?} after {:?}",
                    String::from_utf8_lossy(key),
                    String::from_utf8_lossy(last)
                )));
            }
        }

        let key_len = u32::try_from(key.len())
            .map_err(|_| EngineError::Storage(format!("key too large: {} bytes", key.len())))?;
        let val_len = match value {
            // u32::MAX is reserved for the tombstone marker
            Some(v) if v.len() >= TOMBSTONE_MARKER as usize => {
                return Err(EngineError::Storage(format!(
                    "value too large: {} bytes",
                    v.len()
                )))
            }
            Some(v) => v.len() as u32,
            None => TOMBSTONE_MARKER,
        };

        let mut header = [0u8; 8];
        header[0..4].copy_from_slice(&key_len.to_le_bytes());
        header[4..8].copy_from_slice(&val_len.to_le_bytes());

        self.writer.write_all(&header)?;
        self.writer.write_all(key)?;
        self.data_hasher.update(&header);
        self.data_hasher.update(key);

        let mut entry_size = header.len() as u64 + key.len() as u64;
        if let Some(v) = value {
            self.writer.write_all(v)?;
            self.data_hasher.update(v);
            entry_size += v.len() as u64;
        }

        self.index.push((key.to_vec(), self.current_offset));
        self.current_offset += entry_size;
        self.entry_count += 1;

        Ok(())
    }

    /// Write index block and footer, fsync, and return metadata
    pub fn finish(mut self) -> EngineResult<SSTableMeta> {
        let index_offset = self.current_offset;

        for (key, offset) in &self.index {
            self.writer.write_all(&(key.len() as u32).to_le_bytes())?;
            self.writer.write_all(&offset.to_le_bytes())?;
            self.writer.write_all(key)?;
        }

        let data_crc = self.data_hasher.finalize();
        self.writer.write_all(&index_offset.to_le_bytes())?;
        self.writer.write_all(&data_crc.to_le_bytes())?;
        self.writer.write_all(&[0u8; 4])?;
        self.writer.flush()?;

        let mut file = self.writer.into_inner().map_err(|e| {
            EngineError::Storage(format!("Failed to flush SSTable: {}", e))
        })?;
        file.seek(SeekFrom::Start(6))?; // After magic + version
        file.write_all(&self.entry_count.to_le_bytes())?;
        file.sync_all()?;

        let file_size = file.metadata()?.len();
        let min_key = self.index.first().map(|(k, _)| k.clone()).unwrap_or_default();
        let max_key = self.index.last().map(|(k, _)| k.clone()).unwrap_or_default();

        Ok(SSTableMeta {
            path: self.path,
            entry_count: self.entry_count,
            min_key,
            max_key,
            file_size,
        })
    }
}
