//! Durable backend: storage engine + identifier counter in one directory

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::Config;
use crate::context::Context;
use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::route::Route;
use crate::storage::create_dir_synced;

use super::{decode_records, Backend, IdCounter};

/// Backend that survives restarts
///
/// Owns the engine and the counter exclusively; one instance per directory.
pub struct DurableBackend {
    dir: PathBuf,
    engine: Engine,
    counter: IdCounter,
    closed: AtomicBool,
}

impl DurableBackend {
    /// Engine directory name inside the backend directory
    pub const ROUTES_DB: &'static str = "routes.db";

    /// Open or create a backend in `config.data_dir`
    pub fn open(config: Config) -> Result<Self> {
        let dir = config.data_dir.clone();
        create_dir_synced(&dir)?;

        let engine = Engine::open(&dir.join(Self::ROUTES_DB), &config)?;
        let counter = IdCounter::open(&dir.join(IdCounter::FILENAME))?;

        tracing::info!(
            dir = %dir.display(),
            last_id = counter.current(),
            sstables = engine.sstable_count(),
            "route backend opened"
        );

        Ok(Self {
            dir,
            engine,
            counter,
            closed: AtomicBool::new(false),
        })
    }

    /// Open with default config rooted at `path`
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::open(Config::builder().data_dir(path.as_ref()).build())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The underlying engine (for inspection)
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    fn ensure_usable(&self, ctx: &Context) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::Closed);
        }
        ctx.check()
    }
}

impl Backend for DurableBackend {
    fn get(&self, ctx: &Context, key: &str) -> Result<Vec<u8>> {
        self.ensure_usable(ctx)?;

        self.engine
            .get(key.as_bytes())?
            .ok_or_else(|| Error::RouteNotFound(key.to_string()))
    }

    fn put(&self, ctx: &Context, key: &str, value: &[u8]) -> Result<()> {
        self.ensure_usable(ctx)?;
        self.engine.put(key.as_bytes(), value)?;
        Ok(())
    }

    fn delete(&self, ctx: &Context, key: &str) -> Result<()> {
        self.ensure_usable(ctx)?;
        self.engine.delete(key.as_bytes())?;
        Ok(())
    }

    fn list(&self, ctx: &Context, start: &str) -> Result<BTreeMap<String, Route>> {
        self.ensure_usable(ctx)?;
        let records = self.engine.scan(start.as_bytes())?;
        decode_records(ctx, records)
    }

    fn next_id(&self, ctx: &Context) -> Result<u64> {
        self.ensure_usable(ctx)?;
        self.counter.next(ctx)
    }

    fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        self.engine.close()?;
        tracing::info!(dir = %self.dir.display(), last_id = self.counter.current(), "route backend closed");
        Ok(())
    }
}
