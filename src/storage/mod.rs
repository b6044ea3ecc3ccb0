//! Storage Module
//!
//! The block store contract the index engine persists through, plus the
//! two stock implementations.
//!
//! ## Responsibilities
//! - Read/write/clear one shard block by label
//! - Read/write the master record (key → identifier table)
//! - Decode the master record into an explicit format version
//!
//! ## Durable Layout
//! ```text
//! {data_dir}/
//!   ├── __allKeys    {"version":2,"items":[[key,id],...]}
//!   │                (legacy: ["key", "key", ...])
//!   ├── a            {"<id>":["value", ...], ...}
//!   ├── b
//!   └── ... z
//! ```

mod file;
mod noop;

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde_json::Value;

use crate::config::Config;
use crate::error::{Result, ShardexError};
use crate::key::Key;
use crate::keytable::KeyId;

pub use file::FileBlockStore;
pub use noop::NoopBlockStore;

/// Current master record format version
pub const CURRENT_VERSION: u32 = 2;

/// Raw shard contents: entry label → ordered values.
///
/// Current layout labels entries by identifier; the legacy layout labels
/// them by the key's string form.
pub type RawBlock = BTreeMap<String, Vec<String>>;

// =============================================================================
// Block Store Contract
// =============================================================================

/// Durable byte storage addressed by shard label
pub trait BlockStore: Send + Sync {
    /// Read one shard block. A block never written reads as empty.
    fn read_block(&self, label: &str) -> Result<RawBlock>;

    /// Replace one shard block
    fn write_block(&self, label: &str, block: &RawBlock) -> Result<()>;

    /// Remove one shard block
    fn clear_block(&self, label: &str) -> Result<()>;

    /// Read the master record, `None` if it was never written
    fn read_master(&self) -> Result<Option<MasterRecord>>;

    /// Replace the master record
    fn write_master(&self, items: &[(Key, KeyId)], version: u32) -> Result<()>;
}

// =============================================================================
// Master Record
// =============================================================================

/// Persisted Key Table, tagged by format version
#[derive(Debug, Clone, PartialEq)]
pub enum MasterRecord {
    /// Version 1: bare ordered key list, identifiers implied by position
    Legacy(Vec<Key>),

    /// Version 2: explicit `(key, identifier)` pairs
    V2(Vec<(Key, KeyId)>),
}

impl MasterRecord {
    /// Decode a master record body.
    ///
    /// A bare JSON array is the legacy layout. An object must carry a
    /// `version` tag this build understands.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(bytes)?;
        match value {
            Value::Array(_) => Ok(MasterRecord::Legacy(serde_json::from_value(value)?)),
            Value::Object(mut fields) => {
                let version = fields
                    .get("version")
                    .and_then(Value::as_u64)
                    .ok_or_else(|| {
                        ShardexError::Serialization("master record has no version tag".to_string())
                    })?;
                let version = u32::try_from(version)
                    .map_err(|_| ShardexError::UnsupportedVersion(u32::MAX))?;

                match version {
                    CURRENT_VERSION => {
                        let items = fields.remove("items").unwrap_or(Value::Array(Vec::new()));
                        Ok(MasterRecord::V2(serde_json::from_value(items)?))
                    }
                    other => Err(ShardexError::UnsupportedVersion(other)),
                }
            }
            other => Err(ShardexError::Serialization(format!(
                "unexpected master record body: {}",
                other
            ))),
        }
    }

    /// Encode the current-version body for `items`
    pub fn encode(items: &[(Key, KeyId)], version: u32) -> Result<Vec<u8>> {
        let body = serde_json::json!({ "version": version, "items": items });
        Ok(serde_json::to_vec(&body)?)
    }

    /// Format version this record was stored with
    pub fn version(&self) -> u32 {
        match self {
            MasterRecord::Legacy(_) => 1,
            MasterRecord::V2(_) => 2,
        }
    }
}

// =============================================================================
// Store Construction
// =============================================================================

type FactoryFn = dyn Fn(&Path) -> Result<Box<dyn BlockStore>> + Send + Sync;

/// Caller supplied constructor for a block store
#[derive(Clone)]
pub struct StorageFactory(Arc<FactoryFn>);

impl StorageFactory {
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn(&Path) -> Result<Box<dyn BlockStore>> + Send + Sync + 'static,
    {
        Self(Arc::new(factory))
    }

    /// Build a store for `path`
    pub fn build(&self, path: &Path) -> Result<Box<dyn BlockStore>> {
        (self.0)(path)
    }
}

impl fmt::Debug for StorageFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StorageFactory(..)")
    }
}

/// Pick the block store a config asks for
pub fn open_store(config: &Config) -> Result<Box<dyn BlockStore>> {
    match &config.storage_factory {
        Some(factory) => factory.build(&config.data_dir),
        None if config.persist => Ok(Box::new(FileBlockStore::new(&config.data_dir))),
        None => Ok(Box::new(NoopBlockStore)),
    }
}
