//! # routekv
//!
//! A durable route store: short names mapped to redirect targets.
//! - Backend trait: byte-level get/put/delete/list plus a durable
//!   identifier allocator
//! - Write-Ahead Logging (WAL) with crash recovery
//! - SSTables for flushed, sorted, checksummed data
//! - Typed route store on top of any backend
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      RouteStore                              │
//! │               (Route in, Route out)                          │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │  dyn Backend
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                  DurableBackend                              │
//! └──────────┬──────────────────────────────────┬───────────────┘
//!            │                                  │
//!            ▼                                  ▼
//!   ┌─────────────────┐                 ┌─────────────┐
//!   │     Engine      │                 │  IdCounter  │
//!   │ WAL + MemTable  │                 │  (id file)  │
//!   └────────┬────────┘                 └─────────────┘
//!            │
//!            ▼
//!    ┌─────────────┐
//!    │   Storage   │
//!    │  (SSTable)  │
//!    └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;
pub mod context;
pub mod route;

pub mod wal;
pub mod memtable;
pub mod storage;
pub mod engine;

pub mod backend;
pub mod store;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use backend::{Backend, DurableBackend, IdCounter, MemoryBackend};
pub use config::{Config, WalSyncStrategy};
pub use context::Context;
pub use engine::Engine;
pub use error::{EngineError, Error, Result};
pub use route::{DecodeError, Route};
pub use store::RouteStore;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of routekv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
