//! Discarding block store
//!
//! Backs a purely in-memory index: reads find nothing, writes vanish.

use crate::error::Result;
use crate::key::Key;
use crate::keytable::KeyId;

use super::{BlockStore, MasterRecord, RawBlock};

/// Block store that persists nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopBlockStore;

impl BlockStore for NoopBlockStore {
    fn read_block(&self, _label: &str) -> Result<RawBlock> {
        Ok(RawBlock::new())
    }

    fn write_block(&self, _label: &str, _block: &RawBlock) -> Result<()> {
        Ok(())
    }

    fn clear_block(&self, _label: &str) -> Result<()> {
        Ok(())
    }

    fn read_master(&self) -> Result<Option<MasterRecord>> {
        Ok(None)
    }

    fn write_master(&self, _items: &[(Key, KeyId)], _version: u32) -> Result<()> {
        Ok(())
    }
}
