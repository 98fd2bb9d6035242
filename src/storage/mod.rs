//! Storage Module
//!
//! Persistent storage layer using SSTable-like format.
//!
//! ## Responsibilities
//! - Persist data to disk in sorted format
//! - Point lookups and ordered range scans
//! - Checksummed data blocks for corruption detection
//!
//! See [`sstable`] for the file layout.

pub mod sstable;
mod manager;

use std::fs;
use std::io;
use std::path::Path;

pub use sstable::{SSTableBuilder, SSTableIterator, SSTableMeta, SSTableReader};
pub use manager::StorageManager;

/// fsync a directory so entries created or renamed in it survive a crash
pub(crate) fn sync_dir(path: &Path) -> io::Result<()> {
    #[cfg(unix)]
    {
        std::fs::File::open(path)?.sync_all()?;
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
    Ok(())
}

/// fsync the directory holding `path`
pub(crate) fn sync_parent(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => sync_dir(dir),
        _ => sync_dir(Path::new(".")),
    }
}

/// `create_dir_all`, then fsync the parent of every directory it created
pub(crate) fn create_dir_synced(path: &Path) -> io::Result<()> {
    let mut missing = Vec::new();
    let mut next = Some(path);
    while let Some(dir) = next {
        if dir.as_os_str().is_empty() || dir.exists() {
            break;
        }
        missing.push(dir);
        next = dir.parent();
    }

    fs::create_dir_all(path)?;

    // Outermost first, so each new entry is durable before its children
    for dir in missing.iter().rev() {
        sync_parent(dir)?;
    }
    Ok(())
}
