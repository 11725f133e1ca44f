//! Configuration for the commit log
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{LogError, Result};
use crate::storage::ENTRY_WIDTH;

/// Default rotation threshold for both the store and the index (bytes)
pub const DEFAULT_MAX_SEGMENT_BYTES: u64 = 1024;

/// Main configuration for a commit log instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Directory holding the segment files
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── 0.store      (framed record bytes)
    ///     ├── 0.index      (offset → position entries)
    ///     ├── 16.store
    ///     └── 16.index
    pub data_dir: PathBuf,

    // -------------------------------------------------------------------------
    // Segment Configuration
    // -------------------------------------------------------------------------
    pub segment: SegmentConfig,
}

/// Per-segment thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentConfig {
    /// Rotate once the store reaches this many bytes
    pub max_store_bytes: u64,

    /// Rotate once the index can take no more entries; also the size the
    /// index file is pre-grown to before mapping
    pub max_index_bytes: u64,

    /// Base offset of the first segment of a brand-new log
    pub initial_offset: u64,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            max_store_bytes: DEFAULT_MAX_SEGMENT_BYTES,
            max_index_bytes: DEFAULT_MAX_SEGMENT_BYTES,
            initial_offset: 0,
        }
    }
}

impl SegmentConfig {
    /// Replace unset (zero) thresholds with defaults and reject an index
    /// too small to hold a single entry.
    pub fn normalized(mut self) -> Result<Self> {
        if self.max_store_bytes == 0 {
            self.max_store_bytes = DEFAULT_MAX_SEGMENT_BYTES;
        }
        if self.max_index_bytes == 0 {
            self.max_index_bytes = DEFAULT_MAX_SEGMENT_BYTES;
        }
        if self.max_index_bytes < ENTRY_WIDTH {
            return Err(LogError::Config(format!(
                "max_index_bytes must be at least {} (one index entry), got {}",
                ENTRY_WIDTH, self.max_index_bytes
            )));
        }
        Ok(self)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./commitlog_data"),
            segment: SegmentConfig::default(),
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
    /// Set the data directory (one directory per log)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the store rotation threshold (in bytes)
    pub fn max_store_bytes(mut self, bytes: u64) -> Self {
        self.config.segment.max_store_bytes = bytes;
        self
    }

    /// Set the index capacity / rotation threshold (in bytes)
    pub fn max_index_bytes(mut self, bytes: u64) -> Self {
        self.config.segment.max_index_bytes = bytes;
        self
    }

    /// Set the base offset used when bootstrapping an empty log
    pub fn initial_offset(mut self, offset: u64) -> Self {
        self.config.segment.initial_offset = offset;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
