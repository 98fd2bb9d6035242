//! Route records
//!
//! A [`Route`] is what a short name resolves to. Its binary form is
//! self-contained:
//!
//! ```text
//! ┌───────────────────────┬──────────────────────────────┐
//! │ Time (i64 LE, 8)      │ URL (UTF-8, rest of buffer)  │
//! └───────────────────────┴──────────────────────────────┘
//! ```
//!
//! Time is the creation instant in nanoseconds since the Unix epoch.

use std::io::{self, Read, Write};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use thiserror::Error;

/// Size of the fixed timestamp prefix
pub const TIME_SIZE: usize = 8;

/// A redirect target plus its metadata
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Route {
    /// Where the short name redirects to
    pub url: String,

    /// Creation time, nanoseconds since the Unix epoch
    pub time: i64,
}

/// Why a byte buffer is not a valid route
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("record truncated: {len} bytes, need at least {}", TIME_SIZE)]
    Truncated { len: usize },

    #[error("url is not valid UTF-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error("read failed: {0}")]
    Io(#[from] io::Error),
}

impl Route {
    /// Route to `url` stamped with the current time
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_time(url, SystemTime::now())
    }

    /// Route to `url` stamped with `time`
    ///
    /// Instants outside the i64 nanosecond range saturate.
    pub fn with_time(url: impl Into<String>, time: SystemTime) -> Self {
        let nanos = match time.duration_since(UNIX_EPOCH) {
            Ok(after) => i64::try_from(after.as_nanos()).unwrap_or(i64::MAX),
            Err(before) => i64::try_from(before.duration().as_nanos())
                .map(|n| -n)
                .unwrap_or(i64::MIN),
        };

        Self {
            url: url.into(),
            time: nanos,
        }
    }

    /// Creation time as a `SystemTime`
    pub fn created_at(&self) -> SystemTime {
        let magnitude = Duration::from_nanos(self.time.unsigned_abs());
        if self.time >= 0 {
            UNIX_EPOCH + magnitude
        } else {
            UNIX_EPOCH - magnitude
        }
    }

    /// Write the binary form to `w`
    pub fn write<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(&self.time.to_le_bytes())?;
        w.write_all(self.url.as_bytes())
    }

    /// Read a route, consuming `r` to the end
    pub fn read<R: Read>(r: &mut R) -> Result<Self, DecodeError> {
        let mut buf = Vec::new();
        r.read_to_end(&mut buf)?;
        Self::decode(&buf)
    }

    /// Binary form as a new buffer
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(TIME_SIZE + self.url.len());
        buf.extend_from_slice(&self.time.to_le_bytes());
        buf.extend_from_slice(self.url.as_bytes());
        buf
    }

    /// Parse the binary form
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.len() < TIME_SIZE {
            return Err(DecodeError::Truncated { len: bytes.len() });
        }

        let (time, url) = bytes.split_at(TIME_SIZE);
        let mut time_bytes = [0u8; TIME_SIZE];
        time_bytes.copy_from_slice(time);

        Ok(Self {
            url: String::from_utf8(url.to_vec())?,
            time: i64::from_le_bytes(time_bytes),
        })
    }
}
