//! Backend Module
//!
//! The byte-level storage contract the route store is written against, plus
//! its implementations.
//!
//! ## Implementations
//! - [`DurableBackend`]: embedded WAL/SSTable engine plus a durable
//!   identifier counter file
//! - [`MemoryBackend`]: in-process map, for tests and embedding
//!
//! ## Directory Layout (DurableBackend)
//! ```text
//! {dir}/
//!   ├── id           (u64 little-endian, last allocated identifier)
//!   └── routes.db/   (engine: wal.log + sstables/)
//! ```

mod counter;
mod durable;
mod memory;

use std::collections::BTreeMap;

use crate::context::Context;
use crate::error::{EngineError, Error, Result};
use crate::route::Route;

pub use counter::IdCounter;
pub use durable::DurableBackend;
pub use memory::MemoryBackend;

/// Durable key-value storage with an identifier allocator
///
/// All methods take `&self`; implementations are shared across threads.
pub trait Backend: Send + Sync {
    /// Value stored under `key`, or `RouteNotFound`
    fn get(&self, ctx: &Context, key: &str) -> Result<Vec<u8>>;

    /// Upsert; durable once this returns
    fn put(&self, ctx: &Context, key: &str, value: &[u8]) -> Result<()>;

    /// Remove `key`; removing a missing key succeeds
    fn delete(&self, ctx: &Context, key: &str) -> Result<()>;

    /// Every record with key >= `start`, decoded
    ///
    /// An empty `start` lists everything. One undecodable record fails the
    /// whole call.
    fn list(&self, ctx: &Context, start: &str) -> Result<BTreeMap<String, Route>>;

    fn get_all(&self, ctx: &Context) -> Result<BTreeMap<String, Route>> {
        self.list(ctx, "")
    }

    /// Allocate the next identifier; persisted before it is returned
    fn next_id(&self, ctx: &Context) -> Result<u64>;

    /// Release resources; later calls fail with `Closed`
    fn close(&self) -> Result<()>;
}

/// Decode raw `(key, value)` records in order, failing on the first bad one
pub(crate) fn decode_records<I>(ctx: &Context, records: I) -> Result<BTreeMap<String, Route>>
where
    I: IntoIterator<Item = (Vec<u8>, Vec<u8>)>,
{
    let mut routes = BTreeMap::new();

    for (raw_key, value) in records {
        ctx.check()?;

        let key = String::from_utf8(raw_key).map_err(|e| {
            EngineError::Storage(format!(
                "non UTF-8 key {:?}",
                String::from_utf8_lossy(e.as_bytes())
            ))
        })?;

        let route = Route::decode(&value).map_err(|source| {
            tracing::warn!(key = %key, error = %source, "undecodable route record");
            Error::Decode {
                key: key.clone(),
                source,
            }
        })?;

        routes.insert(key, route);
    }

    Ok(routes)
}
