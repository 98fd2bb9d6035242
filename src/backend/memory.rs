//! In-memory backend
//!
//! Same contract as the durable backend without persistence. Each instance
//! has its own map and counter.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, RwLock};

use crate::context::Context;
use crate::error::{Error, Result};
use crate::route::Route;

use super::{decode_records, Backend};

#[derive(Default)]
pub struct MemoryBackend {
    records: RwLock<BTreeMap<String, Vec<u8>>>,
    counter: Mutex<u64>,
    closed: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the identifier sequence after `last_id`
    pub fn with_last_id(last_id: u64) -> Self {
        Self {
            counter: Mutex::new(last_id),
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    fn ensure_usable(&self, ctx: &Context) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::Closed);
        }
        ctx.check()
    }
}

impl Backend for MemoryBackend {
    fn get(&self, ctx: &Context, key: &str) -> Result<Vec<u8>> {
        self.ensure_usable(ctx)?;
        self.records
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| Error::RouteNotFound(key.to_string()))
    }

    fn put(&self, ctx: &Context, key: &str, value: &[u8]) -> Result<()> {
        self.ensure_usable(ctx)?;
        self.records.write().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, ctx: &Context, key: &str) -> Result<()> {
        self.ensure_usable(ctx)?;
        self.records.write().remove(key);
        Ok(())
    }

    fn list(&self, ctx: &Context, start: &str) -> Result<BTreeMap<String, Route>> {
        self.ensure_usable(ctx)?;

        let snapshot: Vec<(Vec<u8>, Vec<u8>)> = self
            .records
            .read()
            .range::<str, _>((Bound::Included(start), Bound::Unbounded))
            .map(|(k, v)| (k.clone().into_bytes(), v.clone()))
            .collect();

        decode_records(ctx, snapshot)
    }

    fn next_id(&self, ctx: &Context) -> Result<u64> {
        self.ensure_usable(ctx)?;

        let mut current = self.counter.lock();
        let next = current.checked_add(1).ok_or_else(|| {
            Error::Allocation(std::io::Error::new(
                std::io::ErrorKind::Other,
                "identifier counter exhausted",
            ))
        })?;
        *current = next;
        Ok(next)
    }

    fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}
