//! Engine Module
//!
//! The index engine that composes the key table, shard router, migration
//! loader and flush scheduler into the public multimap operations.
//!
//! ## Responsibilities
//! - Validate keys and values
//! - Resolve keys to identifiers and route them to buckets
//! - Serve queries from memory, loading buckets on demand
//! - Persist the master record and every resident bucket

use std::path::Path;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::config::Config;
use crate::error::{Result, ShardexError};
use crate::flush::{FlushScheduler, FlushTarget};
use crate::key::Key;
use crate::keytable::{KeyId, KeyTable};
use crate::migration;
use crate::router::ShardRouter;
use crate::storage::{self, BlockStore, RawBlock, CURRENT_VERSION};

/// Handle to an index engine.
///
/// Cloning is cheap; every clone shares the same in-memory state.
///
/// ## Concurrency Model
///
/// - **State** (key table + bucket cache): one `Mutex`, held across every
///   read-modify-write sequence (resolve-or-create, bucket load, mutation)
/// - **Flushes**: serialized by `flush_lock`; the state is snapshotted under
///   the state lock and written after releasing it, so mutations never wait
///   on disk writes
/// - **Scheduled flushes** run on the scheduler's worker thread
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

/// Shared engine state
struct EngineInner {
    /// Engine configuration
    config: Config,

    /// Where blocks are read from and written to
    store: Box<dyn BlockStore>,

    /// Key table and bucket cache
    state: Mutex<IndexState>,

    /// Serializes persistence passes
    flush_lock: Mutex<()>,

    /// Coalesces flush signals
    scheduler: FlushScheduler<EngineInner>,

    /// Last failed scheduled flush, if not yet taken
    flush_error: Mutex<Option<ShardexError>>,
}

/// Everything guarded by the state lock
#[derive(Debug)]
struct IndexState {
    keys: KeyTable,
    router: ShardRouter,
}

/// Snapshot of what one persistence pass writes
struct FlushSnapshot {
    items: Vec<(Key, KeyId)>,
    blocks: Vec<(&'static str, RawBlock)>,
}

impl Engine {
    /// Open or create an index with the given config
    ///
    /// On startup:
    /// 1. Build the block store (factory, file store or no-op store)
    /// 2. Load the master record, migrating legacy layouts
    /// 3. Start the flush scheduler
    /// 4. Schedule a rewrite if the data was migrated
    pub fn open(config: Config) -> Result<Self> {
        let store = storage::open_store(&config)?;
        let loaded = migration::load(store.as_ref())?;
        let needs_rewrite = loaded.needs_rewrite();

        tracing::info!(
            "Opened index at {} ({} keys, format {:?})",
            config.data_dir.display(),
            loaded.keys.count(),
            loaded.source_version
        );

        let interval = config.flush_interval;
        let mut spawn_error = None;
        let inner = Arc::new_cyclic(|weak: &Weak<EngineInner>| {
            let scheduler = FlushScheduler::spawn(interval, weak.clone()).unwrap_or_else(|e| {
                spawn_error = Some(e);
                FlushScheduler::inline(weak.clone())
            });
            EngineInner {
                config,
                store,
                state: Mutex::new(IndexState {
                    keys: loaded.keys,
                    router: loaded.router,
                }),
                flush_lock: Mutex::new(()),
                scheduler,
                flush_error: Mutex::new(None),
            }
        });
        if let Some(e) = spawn_error {
            return Err(e);
        }

        let engine = Self { inner };
        if needs_rewrite {
            engine.inner.scheduler.signal();
        }
        Ok(engine)
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        Self::open(Config::builder().data_dir(path).build())
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Add `value` to the values stored under `key`
    ///
    /// Adding a value the key already holds is a no-op.
    pub fn put(&self, key: impl Into<Key>, value: impl Into<String>) -> Result<()> {
        let key = key.into().validate()?;
        let value = Self::validate_value(value.into())?;

        {
            let mut guard = self.inner.state.lock();
            let state = &mut *guard;
            let store = self.inner.store.as_ref();
            let id = Self::resolve_locked(state, key, store)?;
            state.router.add_value(id, value, store);
        }

        self.inner.scheduler.signal();
        Ok(())
    }

    /// Remove `key` and all its values; returns whether the key existed
    pub fn delete(&self, key: impl Into<Key>) -> Result<bool> {
        let key = key.into().validate()?;

        let existed = {
            let mut guard = self.inner.state.lock();
            let state = &mut *guard;
            Self::remove_locked(state, &key, self.inner.store.as_ref())
        };

        if existed {
            self.inner.scheduler.signal();
        }
        Ok(existed)
    }

    /// Replace every value stored under `key` with `value`
    pub fn update(&self, key: impl Into<Key>, value: impl Into<String>) -> Result<()> {
        let key = key.into().validate()?;
        let value = Self::validate_value(value.into())?;

        {
            let mut guard = self.inner.state.lock();
            let state = &mut *guard;
            let store = self.inner.store.as_ref();
            Self::remove_locked(state, &key, store);
            let id = Self::resolve_locked(state, key, store)?;
            state.router.add_value(id, value, store);
        }

        self.inner.scheduler.signal();
        Ok(())
    }

    /// Drop every key and bucket, then flush immediately
    pub fn clear(&self) -> Result<()> {
        {
            let mut state = self.inner.state.lock();
            state.keys.clear();
            state.router.reset_all();
        }
        tracing::info!("Cleared index at {}", self.inner.config.data_dir.display());
        self.flush(true)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Values stored under `key`, in insertion order (empty if absent)
    pub fn get(&self, key: impl Into<Key>) -> Result<Vec<String>> {
        let key = key.into().validate()?;

        let mut guard = self.inner.state.lock();
        let state = &mut *guard;
        let Some(id) = state.keys.lookup(&key) else {
            return Ok(Vec::new());
        };
        Ok(state
            .router
            .values(id, self.inner.store.as_ref())
            .map(|set| set.to_vec())
            .unwrap_or_default())
    }

    /// Whether `key` is live (invalid keys are never live)
    pub fn contains(&self, key: impl Into<Key>) -> bool {
        let key = key.into();
        self.inner.state.lock().keys.lookup(&key).is_some()
    }

    /// Live keys whose string form contains `needle`
    pub fn search(&self, needle: &str) -> Vec<Key> {
        self.inner.state.lock().keys.search(needle)
    }

    /// Live keys in the order they were first inserted
    pub fn keys(&self) -> Vec<Key> {
        self.inner.state.lock().keys.enumerate()
    }

    /// Number of live keys
    pub fn size(&self) -> usize {
        self.inner.state.lock().keys.count()
    }

    /// Every live key with its values, in key order
    pub fn to_map(&self) -> Vec<(Key, Vec<String>)> {
        let mut guard = self.inner.state.lock();
        let state = &mut *guard;
        let store = self.inner.store.as_ref();

        let entries: Vec<(Key, KeyId)> = state
            .keys
            .entries()
            .map(|(key, id)| (key.clone(), id))
            .collect();
        entries
            .into_iter()
            .map(|(key, id)| {
                let values = state
                    .router
                    .values(id, store)
                    .map(|set| set.to_vec())
                    .unwrap_or_default();
                (key, values)
            })
            .collect()
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Persist state: `force` writes now, otherwise the write is coalesced
    pub fn flush(&self, force: bool) -> Result<()> {
        if force {
            // Disarm first: anything mutated after this point re-arms the timer
            self.inner.scheduler.cancel();
            self.inner.persist()
        } else {
            self.inner.scheduler.signal();
            Ok(())
        }
    }

    /// Take the error of the last failed scheduled flush, if any
    pub fn take_flush_error(&self) -> Option<ShardexError> {
        self.inner.flush_error.lock().take()
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.inner.config.data_dir
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Whether the bucket with this label is resident in memory
    pub fn is_bucket_loaded(&self, label: &str) -> bool {
        self.inner.state.lock().router.is_loaded(label)
    }

    /// Labels of every resident bucket
    pub fn resident_buckets(&self) -> Vec<&'static str> {
        self.inner.state.lock().router.resident_labels()
    }

    /// Identifier the next new key will receive
    pub fn next_id(&self) -> KeyId {
        self.inner.state.lock().keys.next_id()
    }

    /// Whether two handles share one engine
    pub fn same_instance(a: &Engine, b: &Engine) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn validate_value(value: String) -> Result<String> {
        if value.is_empty() {
            return Err(ShardexError::InvalidValue("empty value".to_string()));
        }
        Ok(value)
    }

    /// Resolve a key, dropping any stale bucket entry under a freshly issued
    /// identifier (called with the state lock held)
    fn resolve_locked(state: &mut IndexState, key: Key, store: &dyn BlockStore) -> Result<KeyId> {
        let fresh = state.keys.lookup(&key).is_none();
        let id = state.keys.resolve_or_create(key)?;
        if fresh && state.router.remove(id, store).is_some() {
            tracing::debug!("Dropped orphaned entry for identifier {}", id);
        }
        Ok(id)
    }

    /// Remove a key and its bucket entry (called with the state lock held)
    fn remove_locked(state: &mut IndexState, key: &Key, store: &dyn BlockStore) -> bool {
        match state.keys.lookup(key) {
            Some(id) => {
                state.router.remove(id, store);
                state.keys.remove(key);
                true
            }
            None => false,
        }
    }
}

impl EngineInner {
    /// One persistence pass: master record, then every resident bucket
    fn persist(&self) -> Result<()> {
        let _flush_guard = self.flush_lock.lock();
        let snapshot = self.snapshot();

        self.store.write_master(&snapshot.items, CURRENT_VERSION)?;

        let mut written = 0usize;
        let mut cleared = 0usize;
        for (label, block) in &snapshot.blocks {
            if block.is_empty() {
                self.store.clear_block(label)?;
                cleared += 1;
            } else {
                self.store.write_block(label, block)?;
                written += 1;
            }
        }

        tracing::debug!(
            "Flushed {} keys ({} shards written, {} cleared)",
            snapshot.items.len(),
            written,
            cleared
        );
        Ok(())
    }

    /// Copy out the master record and resident buckets under the state lock
    fn snapshot(&self) -> FlushSnapshot {
        let state = self.state.lock();
        let items = state
            .keys
            .entries()
            .map(|(key, id)| (key.clone(), id))
            .collect();
        let blocks = state
            .router
            .resident()
            .map(|(label, bucket)| {
                let block = ShardRouter::encode_bucket(bucket, |id| state.keys.contains_id(id));
                (label, block)
            })
            .collect();
        FlushSnapshot { items, blocks }
    }
}

impl FlushTarget for EngineInner {
    fn flush_now(&self) -> Result<()> {
        self.persist()
    }

    fn flush_failed(&self, err: ShardexError) {
        tracing::error!(
            "Scheduled flush of {} failed: {}",
            self.config.data_dir.display(),
            err
        );
        *self.flush_error.lock() = Some(err);
    }
}
