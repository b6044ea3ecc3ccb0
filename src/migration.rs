//! Migration Loader
//!
//! Runs once while an engine opens, before any mutation is accepted.
//!
//! ## Format Versions
//! - absent master record → empty index
//! - version 2 → `(key, identifier)` pairs loaded as-is, shards stay lazy
//! - legacy (no version tag) → keys numbered by position starting at
//!   [`LEGACY_ID_BASE`], every legacy shard re-read and its values re-filed
//!   under the new identifiers
//! - any other version → [`ShardexError::UnsupportedVersion`]
//!
//! [`ShardexError::UnsupportedVersion`]: crate::error::ShardexError::UnsupportedVersion

use std::collections::HashMap;

use crate::error::Result;
use crate::key::Key;
use crate::keytable::{KeyId, KeyTable};
use crate::router::{ShardRouter, SHARD_LABELS};
use crate::storage::{BlockStore, MasterRecord};

/// Identifier given to the first key of a legacy master record
pub const LEGACY_ID_BASE: KeyId = 1;

/// In-memory state rebuilt from the block store
#[derive(Debug)]
pub struct LoadedIndex {
    /// Restored key table
    pub keys: KeyTable,

    /// Router with whatever buckets loading had to materialize
    pub router: ShardRouter,

    /// Format version found on disk (`None` if nothing was stored)
    pub source_version: Option<u32>,
}

impl LoadedIndex {
    /// Whether the on-disk layout must be rewritten by the next flush
    pub fn needs_rewrite(&self) -> bool {
        matches!(self.source_version, Some(v) if v < crate::storage::CURRENT_VERSION)
    }
}

/// Load the index state from `store`, migrating legacy layouts
pub fn load(store: &dyn BlockStore) -> Result<LoadedIndex> {
    match store.read_master()? {
        None => Ok(LoadedIndex {
            keys: KeyTable::new(),
            router: ShardRouter::new(),
            source_version: None,
        }),
        Some(MasterRecord::V2(items)) => {
            let keys = KeyTable::from_entries(items.into_iter().filter(|(key, _)| key.is_valid()))?;
            tracing::debug!("Loaded {} keys from version 2 master record", keys.count());
            Ok(LoadedIndex {
                keys,
                router: ShardRouter::new(),
                source_version: Some(2),
            })
        }
        Some(MasterRecord::Legacy(list)) => migrate_legacy(list, store),
    }
}

/// Rebuild a legacy dataset under current addressing
fn migrate_legacy(list: Vec<Key>, store: &dyn BlockStore) -> Result<LoadedIndex> {
    let entries = list
        .into_iter()
        .zip(LEGACY_ID_BASE..)
        .filter(|(key, _)| {
            if !key.is_valid() {
                tracing::warn!("Dropping invalid legacy key {:?}", key);
            }
            key.is_valid()
        });
    let keys = KeyTable::from_entries(entries)?;

    // Legacy shards file values under the key's string form
    let mut by_label: HashMap<String, KeyId> = HashMap::with_capacity(keys.count());
    for (key, id) in keys.entries() {
        by_label.entry(key.to_string()).or_insert(id);
    }

    // Every shard is rewritten from scratch, legacy entries never survive
    let mut router = ShardRouter::new();
    router.reset_all();

    let mut moved = 0usize;
    for label in SHARD_LABELS {
        let raw = match store.read_block(label) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("Legacy shard {} unreadable, skipping: {}", label, e);
                continue;
            }
        };

        for (key_label, values) in raw {
            let Some(&id) = by_label.get(&key_label) else {
                tracing::debug!("Legacy shard {} holds unknown key {:?}", label, key_label);
                continue;
            };
            for value in values.into_iter().filter(|v| !v.is_empty()) {
                if router.add_value(id, value, store) {
                    moved += 1;
                }
            }
        }
    }

    tracing::info!(
        "Migrated legacy index: {} keys, {} values re-sharded",
        keys.count(),
        moved
    );

    Ok(LoadedIndex {
        keys,
        router,
        source_version: Some(1),
    })
}
