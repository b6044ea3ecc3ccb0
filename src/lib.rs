//! # Shardex
//!
//! A local, disk-backed multimap index:
//! - Maps text or numeric keys to insertion-ordered sets of string values
//! - Shards values across a fixed set of 26 bucket files
//! - Loads buckets lazily and only writes back the ones it touched
//! - Coalesces flushes into one write per interval
//! - Migrates the legacy (unversioned) on-disk layout on open
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Registry                             │
//! │                (one Engine per data directory)               │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                          Engine                              │
//! │              put / get / delete / update / search            │
//! └──────┬──────────────────────┬───────────────────────┬───────┘
//!        │                      │                       │
//!        ▼                      ▼                       ▼
//!  ┌───────────┐         ┌─────────────┐        ┌──────────────┐
//!  │ KeyTable  │         │ ShardRouter │        │FlushScheduler│
//!  │ key → id  │         │ id → bucket │        │ (coalescing) │
//!  └───────────┘         └──────┬──────┘        └──────┬───────┘
//!                               │                      │
//!                               ▼                      ▼
//!                        ┌─────────────────────────────────┐
//!                        │           BlockStore            │
//!                        │  (file store / no-op / custom)  │
//!                        └─────────────────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod key;
pub mod value_set;
pub mod keytable;
pub mod storage;
pub mod router;
pub mod migration;
pub mod flush;
pub mod engine;
pub mod registry;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{ShardexError, Result};
pub use config::Config;
pub use key::Key;
pub use engine::Engine;
pub use registry::Registry;
pub use storage::{BlockStore, StorageFactory};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of Shardex
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
