//! Error types for routekv
//!
//! Two layers of errors:
//! - [`EngineError`]: failures inside the embedded storage engine (WAL,
//!   memtable, SSTables). Never user-facing on its own.
//! - [`Error`]: the route store taxonomy callers branch on (missing route,
//!   corrupt record, broken backend, failed allocation, aborted context).

use std::path::PathBuf;

use thiserror::Error;

use crate::route::DecodeError;

/// Result type alias using the route store [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Result type alias for storage engine internals
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Error type for route store operations
#[derive(Debug, Error)]
pub enum Error {
    // -------------------------------------------------------------------------
    // Lookup Errors
    // -------------------------------------------------------------------------
    #[error("route not found: {0}")]
    RouteNotFound(String),

    // -------------------------------------------------------------------------
    // Data Errors
    // -------------------------------------------------------------------------
    #[error("stored record for {key:?} is not a valid route: {source}")]
    Decode {
        key: String,
        #[source]
        source: DecodeError,
    },

    // -------------------------------------------------------------------------
    // Backend Errors
    // -------------------------------------------------------------------------
    #[error("backend error: {0}")]
    Backend(#[from] EngineError),

    #[error("backend is closed")]
    Closed,

    // -------------------------------------------------------------------------
    // Identifier Counter Errors
    // -------------------------------------------------------------------------
    #[error("identifier allocation failed: {0}")]
    Allocation(#[source] std::io::Error),

    #[error("counter file {path:?} is corrupt ({len} bytes, expected 8)")]
    CorruptCounter { path: PathBuf, len: u64 },

    // -------------------------------------------------------------------------
    // Context Errors
    // -------------------------------------------------------------------------
    #[error("operation cancelled")]
    Cancelled,

    #[error("deadline exceeded")]
    DeadlineExceeded,
}

impl Error {
    /// True when the error means "no such route" rather than a failure
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::RouteNotFound(_))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Backend(EngineError::Io(err))
    }
}

/// Error type for the storage engine
#[derive(Debug, Error)]
pub enum EngineError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // WAL Errors
    // -------------------------------------------------------------------------
    #[error("WAL corruption detected: {0}")]
    WalCorruption(String),

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    #[error("Storage error: {0}")]
    Storage(String),

    /// Key is not present in a single SSTable (lookup moves on to the next one)
    #[error("Key not found")]
    KeyNotFound,

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<bincode::Error> for EngineError {
    fn from(err: bincode::Error) -> Self {
        EngineError::Serialization(err.to_string())
    }
}
