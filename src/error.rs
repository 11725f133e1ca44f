//! Error types for the commit log
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using LogError
pub type Result<T> = std::result::Result<T, LogError>;

/// Unified error type for commit log operations
#[derive(Debug, Error)]
pub enum LogError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    /// No entry at the requested position (empty index, or past the
    /// populated high-water mark). Not fatal.
    #[error("end of data")]
    EndOfData,

    /// The index cannot take another entry
    #[error("index full: capacity {capacity} bytes")]
    IndexFull { capacity: u64 },

    /// A store frame points past the end of the store
    #[error("store corruption detected: {0}")]
    Corruption(String),

    // -------------------------------------------------------------------------
    // Log Errors
    // -------------------------------------------------------------------------
    #[error("offset out of range: {0}")]
    OffsetOutOfRange(u64),

    #[error("log is closed")]
    Closed,

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<bincode::Error> for LogError {
    fn from(e: bincode::Error) -> Self {
        LogError::Serialization(e.to_string())
    }
}
