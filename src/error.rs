//! Error types for Shardex
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using ShardexError
pub type Result<T> = std::result::Result<T, ShardexError>;

/// Unified error type for Shardex operations
#[derive(Debug, Error)]
pub enum ShardexError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Input Errors
    // -------------------------------------------------------------------------
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    // -------------------------------------------------------------------------
    // Format Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Unsupported index format version: {0}")]
    UnsupportedVersion(u32),

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    #[error("Storage error: {0}")]
    Storage(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Background Flush Errors
    // -------------------------------------------------------------------------
    #[error("Flush worker error: {0}")]
    FlushWorker(String),
}

impl From<serde_json::Error> for ShardexError {
    fn from(err: serde_json::Error) -> Self {
        ShardexError::Serialization(err.to_string())
    }
}
