//! Shared test helpers

#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use shardex::error::{Result, ShardexError};
use shardex::key::Key;
use shardex::keytable::KeyId;
use shardex::storage::{BlockStore, MasterRecord, RawBlock, StorageFactory};

/// Block store kept in memory that records every call
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    blocks: Mutex<BTreeMap<String, RawBlock>>,
    master: Mutex<Option<Vec<u8>>>,
    log: Mutex<Vec<String>>,
    unreadable: Mutex<HashSet<String>>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Factory handing out this store (all handles share state)
    pub fn factory(&self) -> StorageFactory {
        let store = self.clone();
        StorageFactory::new(move |_path| Ok(Box::new(store.clone()) as Box<dyn BlockStore>))
    }

    /// Calls made so far, e.g. `read:a`, `write:b`, `clear:c`, `write_master`
    pub fn log(&self) -> Vec<String> {
        self.inner.log.lock().clone()
    }

    pub fn reset_log(&self) {
        self.inner.log.lock().clear();
    }

    pub fn count(&self, op: &str) -> usize {
        self.inner.log.lock().iter().filter(|entry| entry.as_str() == op).count()
    }

    pub fn block(&self, label: &str) -> Option<RawBlock> {
        self.inner.blocks.lock().get(label).cloned()
    }

    pub fn set_block(&self, label: &str, block: RawBlock) {
        self.inner.blocks.lock().insert(label.to_string(), block);
    }

    pub fn master(&self) -> Option<MasterRecord> {
        self.inner
            .master
            .lock()
            .as_ref()
            .map(|bytes| MasterRecord::decode(bytes).unwrap())
    }

    pub fn set_master_raw(&self, body: &str) {
        *self.inner.master.lock() = Some(body.as_bytes().to_vec());
    }

    /// Make reads of `label` fail
    pub fn make_unreadable(&self, label: &str) {
        self.inner.unreadable.lock().insert(label.to_string());
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.inner.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn record(&self, entry: String) {
        self.inner.log.lock().push(entry);
    }

    fn check_writable(&self) -> Result<()> {
        if self.inner.fail_writes.load(Ordering::SeqCst) {
            return Err(ShardexError::Storage("injected write failure".to_string()));
        }
        Ok(())
    }
}

impl BlockStore for MemoryStore {
    fn read_block(&self, label: &str) -> Result<RawBlock> {
        self.record(format!("read:{}", label));
        if self.inner.unreadable.lock().contains(label) {
            return Err(ShardexError::Serialization("garbage".to_string()));
        }
        Ok(self.inner.blocks.lock().get(label).cloned().unwrap_or_default())
    }

    fn write_block(&self, label: &str, block: &RawBlock) -> Result<()> {
        self.check_writable()?;
        self.record(format!("write:{}", label));
        self.inner.blocks.lock().insert(label.to_string(), block.clone());
        Ok(())
    }

    fn clear_block(&self, label: &str) -> Result<()> {
        self.check_writable()?;
        self.record(format!("clear:{}", label));
        self.inner.blocks.lock().remove(label);
        Ok(())
    }

    fn read_master(&self) -> Result<Option<MasterRecord>> {
        match self.inner.master.lock().as_ref() {
            Some(bytes) => MasterRecord::decode(bytes).map(Some),
            None => Ok(None),
        }
    }

    fn write_master(&self, items: &[(Key, KeyId)], version: u32) -> Result<()> {
        self.check_writable()?;
        self.record("write_master".to_string());
        *self.inner.master.lock() = Some(MasterRecord::encode(items, version)?);
        Ok(())
    }
}

/// Build a raw block from `(label, values)` pairs
pub fn raw_block(entries: &[(&str, Vec<&str>)]) -> RawBlock {
    entries
        .iter()
        .map(|(label, values)| {
            (
                label.to_string(),
                values.iter().map(|v| v.to_string()).collect(),
            )
        })
        .collect()
}
