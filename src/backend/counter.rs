//! Durable identifier counter
//!
//! A single u64 kept in its own 8-byte little-endian file. Every allocation
//! is written and synced before it is handed out, and the in-memory value only
//! moves after the write succeeded, so a failed allocation leaves no trace and
//! a restart never reissues a value.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::context::Context;
use crate::error::{Error, Result};
use crate::storage::sync_parent;

/// Monotonic identifier allocator backed by a file
pub struct IdCounter {
    path: PathBuf,
    /// Last durably allocated value; the mutex serializes allocation
    current: Mutex<u64>,
}

impl IdCounter {
    /// Counter file name inside a backend directory
    pub const FILENAME: &'static str = "id";

    /// Open the counter at `path`, creating it with value 0 if missing
    ///
    /// A file that is not exactly 8 bytes is rejected rather than reset.
    pub fn open(path: &Path) -> Result<Self> {
        let current = match fs::read(path) {
            Ok(bytes) => {
                let raw: [u8; 8] = bytes.as_slice().try_into().map_err(|_| {
                    Error::CorruptCounter {
                        path: path.to_path_buf(),
                        len: bytes.len() as u64,
                    }
                })?;
                u64::from_le_bytes(raw)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                commit(path, 0)?;
                tracing::debug!(path = %path.display(), "created identifier counter");
                0
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path: path.to_path_buf(),
            current: Mutex::new(current),
        })
    }

    /// Allocate the next identifier
    ///
    /// Waits for the allocation lock no longer than the context's deadline.
    /// On failure the counter is unchanged and a retry proposes the same
    /// value.
    pub fn next(&self, ctx: &Context) -> Result<u64> {
        ctx.check()?;

        let mut current = match ctx.deadline() {
            Some(deadline) => self
                .current
                .try_lock_until(deadline)
                .ok_or(Error::DeadlineExceeded)?,
            None => self.current.lock(),
        };
        ctx.check()?;

        let candidate = current.checked_add(1).ok_or_else(|| {
            Error::Allocation(io::Error::new(
                io::ErrorKind::Other,
                "identifier counter exhausted",
            ))
        })?;

        commit(&self.path, candidate).map_err(|e| {
            tracing::warn!(path = %self.path.display(), candidate, error = %e, "failed to persist identifier");
            Error::Allocation(e)
        })?;

        *current = candidate;
        tracing::trace!(id = candidate, "allocated identifier");
        Ok(candidate)
    }

    /// Last allocated identifier (0 before the first allocation)
    pub fn current(&self) -> u64 {
        *self.current.lock()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Replace the counter file with `id`: write a temp file, sync, rename, sync
/// the directory. The file on disk is always a whole 8-byte value.
fn commit(path: &Path, id: u64) -> io::Result<()> {
    let tmp = path.with_extension("tmp");

    let mut file = File::create(&tmp)?;
    file.write_all(&id.to_le_bytes())?;
    file.sync_all()?;
    drop(file);

    fs::rename(&tmp, path)?;
    sync_parent(path)
}
