//! Key Table
//!
//! Bidirectional mapping between logical keys and stable integer
//! identifiers. The table owns the identifier counter.
//!
//! ## Ordering
//! Identifiers are handed out in increasing order and never reused, so
//! enumerating by identifier yields keys in the order they were first
//! inserted. A key that is deleted and later re-inserted gets a fresh
//! identifier and moves to the end.

use std::collections::{BTreeMap, HashMap};

use crate::error::{Result, ShardexError};
use crate::key::Key;

/// Identifier assigned to a key
pub type KeyId = u64;

/// Key → identifier table
#[derive(Debug, Default)]
pub struct KeyTable {
    /// Lookup by key
    ids: HashMap<Key, KeyId>,

    /// Enumeration order (identifier → key)
    order: BTreeMap<KeyId, Key>,

    /// Next identifier to hand out
    next_id: KeyId,
}

impl KeyTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a table from restored `(key, identifier)` pairs.
    ///
    /// The counter resumes one past the highest identifier seen. Later pairs
    /// win: a key listed twice keeps its last identifier, and an identifier
    /// claimed twice keeps its last key.
    ///
    /// Fails on an identifier the counter could never move past.
    pub fn from_entries(entries: impl IntoIterator<Item = (Key, KeyId)>) -> Result<Self> {
        let mut table = Self::new();
        for (key, id) in entries {
            let after = id.checked_add(1).ok_or_else(|| {
                ShardexError::Serialization(format!("identifier {} of key {:?} out of range", id, key))
            })?;
            if let Some(old) = table.ids.insert(key.clone(), id) {
                if old != id {
                    tracing::warn!("Key {:?} listed twice, keeping identifier {} over {}", key, id, old);
                    table.order.remove(&old);
                }
            }
            if let Some(displaced) = table.order.insert(id, key.clone()) {
                if displaced != key {
                    tracing::warn!("Identifier {} claimed twice, dropping key {:?} for {:?}", id, displaced, key);
                    table.ids.remove(&displaced);
                }
            }
            table.next_id = table.next_id.max(after);
        }
        Ok(table)
    }

    /// Return the key's identifier, allocating the next one if the key is new
    pub fn resolve_or_create(&mut self, key: Key) -> Result<KeyId> {
        let key = key.validate()?;
        if let Some(&id) = self.ids.get(&key) {
            return Ok(id);
        }

        let id = self.next_id;
        self.next_id = id
            .checked_add(1)
            .ok_or_else(|| ShardexError::Storage("identifier space exhausted".to_string()))?;
        self.ids.insert(key.clone(), id);
        self.order.insert(id, key);
        Ok(id)
    }

    /// Pure lookup, no allocation
    pub fn lookup(&self, key: &Key) -> Option<KeyId> {
        self.ids.get(key).copied()
    }

    /// Remove a key; returns its identifier if it was present
    pub fn remove(&mut self, key: &Key) -> Option<KeyId> {
        let id = self.ids.remove(key)?;
        self.order.remove(&id);
        Some(id)
    }

    /// Whether an identifier belongs to a live key
    pub fn contains_id(&self, id: KeyId) -> bool {
        self.order.contains_key(&id)
    }

    /// Every live key whose string form contains `needle`, in enumeration order
    pub fn search(&self, needle: &str) -> Vec<Key> {
        self.order
            .values()
            .filter(|key| key.to_string().contains(needle))
            .cloned()
            .collect()
    }

    /// Live keys in enumeration order
    pub fn enumerate(&self) -> Vec<Key> {
        self.order.values().cloned().collect()
    }

    /// Live `(key, identifier)` pairs in enumeration order
    pub fn entries(&self) -> impl Iterator<Item = (&Key, KeyId)> {
        self.order.iter().map(|(id, key)| (key, *id))
    }

    /// Number of live keys
    pub fn count(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Identifier the next new key will receive
    pub fn next_id(&self) -> KeyId {
        self.next_id
    }

    /// Drop every entry and reset the counter
    pub fn clear(&mut self) {
        self.ids.clear();
        self.order.clear();
        self.next_id = 0;
    }
}
