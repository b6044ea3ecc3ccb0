//! Shard Router
//!
//! Decides which bucket an identifier lives in and lazily materializes
//! buckets from the block store.
//!
//! ## Addressing
//! `bucket = SHARD_LABELS[id % SHARD_COUNT]`. The mapping is part of the
//! durable format: changing it orphans every existing shard file.
//!
//! ## Residency
//! Each slot is `None` until first touched (not loaded) and `Some(bucket)`
//! afterwards, even when the bucket is empty. Only resident buckets are
//! written back on flush.

use std::collections::HashMap;

use crate::keytable::KeyId;
use crate::storage::{BlockStore, RawBlock};
use crate::value_set::ValueSet;

/// Number of shard buckets
pub const SHARD_COUNT: usize = 26;

/// Stable label of each shard, indexed by shard number
pub const SHARD_LABELS: [&str; SHARD_COUNT] = [
    "a", "b", "c", "d", "e", "f", "g", "h", "i", "j", "k", "l", "m", "n", "o", "p", "q", "r",
    "s", "t", "u", "v", "w", "x", "y", "z",
];

/// In-memory contents of one shard
pub type Bucket = HashMap<KeyId, ValueSet>;

/// Routes identifiers to lazily loaded buckets
#[derive(Debug)]
pub struct ShardRouter {
    /// One slot per shard; `None` = never loaded
    buckets: Vec<Option<Bucket>>,
}

impl ShardRouter {
    /// Create a router with no resident buckets
    pub fn new() -> Self {
        Self {
            buckets: vec![None; SHARD_COUNT],
        }
    }

    /// Shard number owning an identifier
    pub fn shard_for(id: KeyId) -> usize {
        (id % SHARD_COUNT as u64) as usize
    }

    /// Label of the bucket owning an identifier
    pub fn bucket_for(id: KeyId) -> &'static str {
        SHARD_LABELS[Self::shard_for(id)]
    }

    /// The bucket owning `id`, loading it from `store` on first touch
    pub fn get_bucket(&mut self, id: KeyId, store: &dyn BlockStore) -> &mut Bucket {
        let shard = Self::shard_for(id);
        self.buckets[shard].get_or_insert_with(|| Self::load(shard, store))
    }

    /// Values for `id`, loading its bucket if needed
    pub fn values(&mut self, id: KeyId, store: &dyn BlockStore) -> Option<&ValueSet> {
        let bucket = self.get_bucket(id, store);
        bucket.get(&id)
    }

    /// Insert `value` under `id`; returns false if it was already there
    pub fn add_value(&mut self, id: KeyId, value: impl Into<String>, store: &dyn BlockStore) -> bool {
        self.get_bucket(id, store).entry(id).or_default().insert(value)
    }

    /// Drop every value under `id`
    pub fn remove(&mut self, id: KeyId, store: &dyn BlockStore) -> Option<ValueSet> {
        self.get_bucket(id, store).remove(&id)
    }

    /// Mark every shard resident and empty
    pub fn reset_all(&mut self) {
        for slot in &mut self.buckets {
            *slot = Some(Bucket::new());
        }
    }

    /// Whether the shard with this label has been loaded
    pub fn is_loaded(&self, label: &str) -> bool {
        SHARD_LABELS
            .iter()
            .position(|l| *l == label)
            .map(|shard| self.buckets[shard].is_some())
            .unwrap_or(false)
    }

    /// Labels of every resident bucket, in shard order
    pub fn resident_labels(&self) -> Vec<&'static str> {
        self.resident().map(|(label, _)| label).collect()
    }

    /// Resident buckets with their labels, in shard order
    pub fn resident(&self) -> impl Iterator<Item = (&'static str, &Bucket)> {
        self.buckets
            .iter()
            .enumerate()
            .filter_map(|(shard, slot)| slot.as_ref().map(|bucket| (SHARD_LABELS[shard], bucket)))
    }

    // =========================================================================
    // Block Conversion
    // =========================================================================

    /// Convert a raw block keyed by identifier into a bucket.
    /// Entries whose label is not an identifier are skipped.
    pub fn decode_block(raw: RawBlock) -> Bucket {
        let mut bucket = Bucket::with_capacity(raw.len());
        for (label, values) in raw {
            match label.parse::<KeyId>() {
                Ok(id) => bucket.entry(id).or_default().extend(values),
                Err(_) => tracing::debug!("Skipping non-identifier entry {:?} in shard", label),
            }
        }
        bucket
    }

    /// Convert a bucket into a raw block, keeping entries `keep` accepts
    pub fn encode_bucket(bucket: &Bucket, keep: impl Fn(KeyId) -> bool) -> RawBlock {
        bucket
            .iter()
            .filter(|(id, set)| !set.is_empty() && keep(**id))
            .map(|(id, set)| (id.to_string(), set.to_vec()))
            .collect()
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Load a shard, substituting an empty bucket for an unreadable block
    fn load(shard: usize, store: &dyn BlockStore) -> Bucket {
        let label = SHARD_LABELS[shard];
        match store.read_block(label) {
            Ok(raw) => {
                let bucket = Self::decode_block(raw);
                tracing::debug!("Loaded shard {} ({} entries)", label, bucket.len());
                bucket
            }
            Err(e) => {
                tracing::warn!("Shard {} unreadable, treating as empty: {}", label, e);
                Bucket::new()
            }
        }
    }
}

impl Default for ShardRouter {
    fn default() -> Self {
        Self::new()
    }
}
