//! Segment
//!
//! Binds one store and one index under a common base offset.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::SegmentConfig;
use crate::error::{LogError, Result};
use crate::record::{BincodeCodec, Record, RecordCodec};

use super::{Index, Store, LAST_ENTRY};

/// Extension of a segment's store file
pub const STORE_EXTENSION: &str = "store";

/// Extension of a segment's index file
pub const INDEX_EXTENSION: &str = "index";

/// A bounded, contiguous range of the log: `[base_offset, next_offset)`
pub struct Segment<C: RecordCodec = BincodeCodec> {
    /// Shared so a `LogReader` can keep draining it after rotation
    store: Arc<Store>,
    index: Index,
    base_offset: u64,
    next_offset: u64,
    config: SegmentConfig,
    codec: Arc<C>,
}

impl<C: RecordCodec> Segment<C> {
    /// Open (or create) the `<base>.store` / `<base>.index` pair in `dir`
    ///
    /// `next_offset` continues after the index's last entry, or starts at
    /// `base_offset` when the index is empty.
    pub fn open(
        dir: &Path,
        base_offset: u64,
        config: SegmentConfig,
        codec: Arc<C>,
    ) -> Result<Self> {
        let store = Store::open(&Self::file_path(dir, base_offset, STORE_EXTENSION))?;
        let index = Index::open(
            &Self::file_path(dir, base_offset, INDEX_EXTENSION),
            config.max_index_bytes,
        )?;

        let next_offset = match Self::recover(&store, &index, base_offset) {
            Ok(next_offset) => next_offset,
            Err(e) => {
                // Shrink the pre-grown index back before bailing out
                if let Err(close_err) = index.close() {
                    tracing::warn!("Failed to close index after open error: {}", close_err);
                }
                return Err(e);
            }
        };

        tracing::debug!(
            "Opened segment base={} next={} store_bytes={} index_bytes={}",
            base_offset,
            next_offset,
            store.size(),
            index.size()
        );

        Ok(Self {
            store: Arc::new(store),
            index,
            base_offset,
            next_offset,
            config,
            codec,
        })
    }

    /// Append a record, assigning it the next offset
    ///
    /// If the store write succeeds but the index write fails, the frame
    /// stays in the store unindexed and `next_offset` does not move. The
    /// next open cuts it off.
    pub fn append(&mut self, mut record: Record) -> Result<u64> {
        let offset = self.next_offset;
        let relative = u32::try_from(offset - self.base_offset).map_err(|_| {
            LogError::IndexFull {
                capacity: self.index.capacity(),
            }
        })?;

        record.offset = offset;
        let bytes = self.codec.encode(&record)?;

        let (_, position) = self.store.append(&bytes)?;
        self.index.write(relative, position)?;

        self.next_offset += 1;
        Ok(offset)
    }

    /// Read the record at absolute `offset`
    pub fn read(&self, offset: u64) -> Result<Record> {
        if offset < self.base_offset || offset >= self.next_offset {
            return Err(LogError::EndOfData);
        }

        let relative = i64::try_from(offset - self.base_offset).map_err(|_| LogError::EndOfData)?;
        let (_, position) = self.index.read(relative)?;
        let bytes = self.store.read(position)?;
        self.codec.decode(&bytes)
    }

    /// True once the store or the index has reached its threshold
    ///
    /// Many small records exhaust the index first; few large ones exhaust
    /// the store first.
    pub fn is_maxed(&self) -> bool {
        self.store.size() >= self.config.max_store_bytes
            || self.index.size() >= self.config.max_index_bytes
            || self.index.is_full()
    }

    /// Close the segment and delete both files
    pub fn remove(self) -> Result<()> {
        let index_path = self.index.name().to_path_buf();
        let store_path = self.store.name().to_path_buf();
        let base_offset = self.base_offset;

        self.close()?;
        fs::remove_file(&index_path)?;
        fs::remove_file(&store_path)?;

        tracing::debug!("Removed segment base={}", base_offset);
        Ok(())
    }

    /// Close the index, then the store
    pub fn close(self) -> Result<()> {
        self.index.close()?;
        self.store.close()
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Absolute offset of the first record
    pub fn base_offset(&self) -> u64 {
        self.base_offset
    }

    /// Absolute offset the next append will receive
    pub fn next_offset(&self) -> u64 {
        self.next_offset
    }

    /// True when no record has been appended
    pub fn is_empty(&self) -> bool {
        self.next_offset == self.base_offset
    }

    /// Current store size in bytes
    pub fn store_size(&self) -> u64 {
        self.store.size()
    }

    /// Populated index size in bytes
    pub fn index_size(&self) -> u64 {
        self.index.size()
    }

    pub(crate) fn store(&self) -> &Arc<Store> {
        &self.store
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// "<dir>/<base>.<ext>"
    fn file_path(dir: &Path, base_offset: u64, extension: &str) -> PathBuf {
        dir.join(format!("{}.{}", base_offset, extension))
    }

    /// Repair the tail left by an unclean shutdown and derive `next_offset`
    fn recover(store: &Store, index: &Index, base_offset: u64) -> Result<u64> {
        let valid_end = Self::discard_dangling_entries(store, index)?;

        if store.size() > valid_end {
            tracing::warn!(
                "Store {} holds {} torn or unindexed bytes past {}: truncating",
                store.name().display(),
                store.size() - valid_end,
                valid_end
            );
            store.truncate(valid_end)?;
        }

        match index.read(LAST_ENTRY) {
            Ok((relative, _)) => Ok(base_offset + u64::from(relative) + 1),
            Err(LogError::EndOfData) => Ok(base_offset),
            Err(e) => Err(e),
        }
    }

    /// Drop trailing index entries whose frame is not fully in the store
    ///
    /// Returns the end of the last frame still indexed.
    fn discard_dangling_entries(store: &Store, index: &Index) -> Result<u64> {
        let total = index.entries();
        let mut kept = total;
        let mut valid_end = 0;
        while kept > 0 {
            let (_, position) = index.read(kept as i64 - 1)?;
            if let Some(end) = store.frame_end(position)? {
                valid_end = end;
                break;
            }
            kept -= 1;
        }

        if kept < total {
            tracing::warn!(
                "Index {} points past end of {}: discarding {} entries",
                index.name().display(),
                store.name().display(),
                total - kept
            );
            index.truncate_entries(kept);
        }
        Ok(valid_end)
    }
}
