//! File Block Store
//!
//! One JSON file per shard label plus the `__allKeys` master file, all in a
//! single directory. Files are replaced through a temp file and a rename.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::key::Key;
use crate::keytable::KeyId;

use super::{BlockStore, MasterRecord, RawBlock};

/// Durable block store rooted at a directory
#[derive(Debug, Clone)]
pub struct FileBlockStore {
    /// Directory holding the master file and the shard files
    dir: PathBuf,
}

impl FileBlockStore {
    /// Name of the master record file
    pub const MASTER_FILENAME: &'static str = "__allKeys";

    /// Create a store rooted at `dir`; the directory is created on first write
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    /// Root directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing a shard label
    pub fn block_path(&self, label: &str) -> PathBuf {
        self.dir.join(label)
    }

    /// Path of the master record file
    pub fn master_path(&self) -> PathBuf {
        self.dir.join(Self::MASTER_FILENAME)
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Read a whole file; a missing file reads as empty
    fn read_file(path: &Path) -> Result<Vec<u8>> {
        match fs::read(path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Replace a file's contents via `<name>.tmp` + rename
    fn write_file(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}

impl BlockStore for FileBlockStore {
    fn read_block(&self, label: &str) -> Result<RawBlock> {
        let bytes = Self::read_file(&self.block_path(label))?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(RawBlock::new());
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn write_block(&self, label: &str, block: &RawBlock) -> Result<()> {
        let bytes = serde_json::to_vec(block)?;
        self.write_file(&self.block_path(label), &bytes)
    }

    fn clear_block(&self, label: &str) -> Result<()> {
        match fs::remove_file(self.block_path(label)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn read_master(&self) -> Result<Option<MasterRecord>> {
        let bytes = Self::read_file(&self.master_path())?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        MasterRecord::decode(&bytes).map(Some)
    }

    fn write_master(&self, items: &[(Key, KeyId)], version: u32) -> Result<()> {
        let bytes = MasterRecord::encode(items, version)?;
        self.write_file(&self.master_path(), &bytes)
    }
}
