//! Route Store
//!
//! Typed layer over a [`Backend`]: routes in, routes out. No caching and no
//! validation beyond the route encoding itself.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::backend::Backend;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::route::Route;

/// The link store handed to request handlers
#[derive(Clone)]
pub struct RouteStore {
    backend: Arc<dyn Backend>,
}

impl RouteStore {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Convenience for wrapping a backend that is not shared yet
    pub fn from_backend<B: Backend + 'static>(backend: B) -> Self {
        Self::new(Arc::new(backend))
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    /// Route stored under `key`
    ///
    /// `RouteNotFound` when absent; `Decode` when the stored bytes are bad.
    pub fn get_link(&self, ctx: &Context, key: &str) -> Result<Route> {
        let bytes = self.backend.get(ctx, key)?;

        Route::decode(&bytes).map_err(|source| {
            tracing::warn!(key, error = %source, "undecodable route record");
            Error::Decode {
                key: key.to_string(),
                source,
            }
        })
    }

    /// Routes with key >= `start` (all routes when `start` is empty)
    pub fn get_links(&self, ctx: &Context, start: &str) -> Result<BTreeMap<String, Route>> {
        if start.is_empty() {
            self.backend.get_all(ctx)
        } else {
            self.backend.list(ctx, start)
        }
    }

    pub fn update_link(&self, ctx: &Context, key: &str, route: &Route) -> Result<()> {
        self.backend.put(ctx, key, &route.encode())
    }

    pub fn delete_link(&self, ctx: &Context, key: &str) -> Result<()> {
        self.backend.delete(ctx, key)
    }

    pub fn next_id(&self, ctx: &Context) -> Result<u64> {
        self.backend.next_id(ctx)
    }

    pub fn close(&self) -> Result<()> {
        self.backend.close()
    }
}
