//! Configuration for Shardex
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;
use std::time::Duration;

use crate::storage::StorageFactory;

/// Main configuration for a Shardex index
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Directory holding the index files
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── __allKeys        (master record: key → identifier table)
    ///     └── a .. z           (one shard file per bucket label)
    pub data_dir: PathBuf,

    /// Use the durable file store (`true`) or discard every write (`false`)
    pub persist: bool,

    /// Custom block store constructor; takes precedence over `persist`
    pub storage_factory: Option<StorageFactory>,

    // -------------------------------------------------------------------------
    // Flush Configuration
    // -------------------------------------------------------------------------
    /// Coalescing window for flush signals.
    /// `Duration::ZERO` flushes synchronously on every mutation.
    pub flush_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./shardex_data"),
            persist: true,
            storage_factory: None,
            flush_interval: Duration::from_millis(500),
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Enable or disable durable storage
    pub fn persist(mut self, persist: bool) -> Self {
        self.config.persist = persist;
        self
    }

    /// Override how the block store is built from the data directory
    pub fn storage_factory(mut self, factory: StorageFactory) -> Self {
        self.config.storage_factory = Some(factory);
        self
    }

    /// Set the flush coalescing window
    pub fn flush_interval(mut self, interval: Duration) -> Self {
        self.config.flush_interval = interval;
        self
    }

    /// Set the flush coalescing window (in milliseconds)
    pub fn flush_interval_ms(self, ms: u64) -> Self {
        self.flush_interval(Duration::from_millis(ms))
    }

    pub fn build(self) -> Config {
        self.config
    }
}
