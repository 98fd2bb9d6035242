//! WAL Entry definitions
//!
//! Defines the structure of individual WAL log entries and their framing.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Frame header size: LSN (8) + CRC (4) + Len (4)
pub const HEADER_SIZE: usize = 16;

/// A single entry in the WAL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalEntry {
    /// Log Sequence Number - monotonically increasing
    pub lsn: u64,

    /// The operation to perform
    pub operation: Operation,

    /// Timestamp (unix millis) when entry was created
    pub timestamp: u64,
}

/// Operations that can be logged
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operation {
    /// Put a key-value pair
    Put { key: Vec<u8>, value: Vec<u8> },

    /// Delete a key
    Delete { key: Vec<u8> },
}

/// Outcome of decoding one frame from the front of a buffer
#[derive(Debug)]
pub(crate) enum Frame {
    /// A valid entry and the number of bytes it occupied
    Complete(WalEntry, usize),

    /// Header and length are readable but the payload failed validation
    Corrupt,

    /// Not enough bytes for a full frame (torn write at the tail)
    Partial,
}

impl WalEntry {
    /// Create a new entry stamped with the current time
    pub fn new(lsn: u64, operation: Operation) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        Self {
            lsn,
            operation,
            timestamp,
        }
    }

    /// Serialize into a framed record: `[LSN][CRC][Len][Data]`
    pub fn serialize(&self) -> EngineResult<Vec<u8>> {
        let data = bincode::serialize(self)?;
        let len = u32::try_from(data.len()).map_err(|_| {
            EngineError::Serialization(format!("WAL entry too large: {} bytes", data.len()))
        })?;

        let mut frame = Vec::with_capacity(HEADER_SIZE + data.len());
        frame.extend_from_slice(&self.lsn.to_le_bytes());
        frame.extend_from_slice(&compute_crc(&data).to_le_bytes());
        frame.extend_from_slice(&len.to_le_bytes());
        frame.extend_from_slice(&data);

        Ok(frame)
    }

    /// Deserialize exactly one framed record
    pub fn deserialize(bytes: &[u8]) -> EngineResult<Self> {
        match Self::decode_frame(bytes) {
            Frame::Complete(entry, _) => Ok(entry),
            Frame::Corrupt => Err(EngineError::WalCorruption(
                "checksum or payload mismatch".to_string(),
            )),
            Frame::Partial => Err(EngineError::WalCorruption(format!(
                "incomplete entry ({} bytes)",
                bytes.len()
            ))),
        }
    }

    /// Decode the frame at the start of `buf`
    pub(crate) fn decode_frame(buf: &[u8]) -> Frame {
        if buf.len() < HEADER_SIZE {
            return Frame::Partial;
        }

        let lsn = u64::from_le_bytes(buf[0..8].try_into().unwrap_or_default());
        let crc = u32::from_le_bytes(buf[8..12].try_into().unwrap_or_default());
        let len = u32::from_le_bytes(buf[12..16].try_into().unwrap_or_default()) as usize;

        let frame_size = HEADER_SIZE + len;
        if buf.len() < frame_size {
            return Frame::Partial;
        }

        let data = &buf[HEADER_SIZE..frame_size];
        if compute_crc(data) != crc {
            return Frame::Corrupt;
        }

        match bincode::deserialize::<WalEntry>(data) {
            Ok(entry) if entry.lsn == lsn => Frame::Complete(entry, frame_size),
            _ => Frame::Corrupt,
        }
    }
}

/// CRC32 over an entry payload
pub fn compute_crc(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}
