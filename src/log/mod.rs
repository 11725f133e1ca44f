//! Log Module
//!
//! The commit log: an ordered set of segments behind one reader/writer lock.
//!
//! ## Responsibilities
//! - Rebuild segments from an existing directory on startup
//! - Route appends to the active (last) segment and rotate when it maxes out
//! - Route reads to the segment owning the offset
//! - Drop whole segments below a retention boundary
//! - Stream the raw bytes of every store, oldest first

mod reader;

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::Config;
use crate::error::{LogError, Result};
use crate::record::{BincodeCodec, Record, RecordCodec};
use crate::storage::{Segment, INDEX_EXTENSION, STORE_EXTENSION};

pub use reader::LogReader;

/// Segmented append-only log
///
/// ## Concurrency:
/// - `segments`: one RwLock over the list; the active segment is the last
///   element
/// - `append` / `truncate` / `close` / `remove` / `reset` take the write lock
/// - `read` / offsets / `reader` take the read lock
/// - Each store and index additionally serializes its own state
pub struct Log<C: RecordCodec = BincodeCodec> {
    /// Log configuration (thresholds already normalized)
    config: Config,

    /// Codec shared by every segment
    codec: Arc<C>,

    /// Segments sorted ascending by base offset
    segments: RwLock<Vec<Segment<C>>>,
}

impl Log<BincodeCodec> {
    /// Open or create a log with the default codec
    pub fn open(config: Config) -> Result<Self> {
        Self::with_codec(config, BincodeCodec)
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        let mut config = Config::default();
        config.data_dir = path.to_path_buf();
        Self::open(config)
    }
}

impl<C: RecordCodec> Log<C> {
    /// Open or create a log using `codec` for record payloads
    ///
    /// On startup:
    /// 1. Normalize thresholds (zero means default)
    /// 2. Create the data directory if missing
    /// 3. Open one segment per base offset found on disk, oldest first
    /// 4. Bootstrap a segment at `initial_offset` if there were none
    pub fn with_codec(mut config: Config, codec: C) -> Result<Self> {
        config.segment = config.segment.normalized()?;

        let log = Self {
            config,
            codec: Arc::new(codec),
            segments: RwLock::new(Vec::new()),
        };

        {
            let mut segments = log.segments.write();
            log.setup(&mut segments)?;
            tracing::info!(
                "Opened log at {} with {} segment(s)",
                log.config.data_dir.display(),
                segments.len()
            );
        }

        Ok(log)
    }

    /// Append a record and return its assigned offset
    ///
    /// Rotates to a new segment at `offset + 1` once the active one is maxed.
    pub fn append(&self, record: Record) -> Result<u64> {
        let mut segments = self.segments.write();

        let active = segments.last_mut().ok_or(LogError::Closed)?;
        let offset = active.append(record)?;

        if active.is_maxed() {
            tracing::debug!(
                "Segment base={} maxed (store={} index={}), rotating at {}",
                active.base_offset(),
                active.store_size(),
                active.index_size(),
                offset + 1
            );
            let segment = self.open_segment(offset + 1)?;
            segments.push(segment);
        }

        Ok(offset)
    }

    /// Read the record at `offset`
    pub fn read(&self, offset: u64) -> Result<Record> {
        let segments = self.segments.read();

        let segment = segments
            .iter()
            .find(|s| s.base_offset() <= offset && offset < s.next_offset())
            .ok_or(LogError::OffsetOutOfRange(offset))?;

        segment.read(offset)
    }

    /// Base offset of the oldest segment
    pub fn lowest_offset(&self) -> Result<u64> {
        let segments = self.segments.read();
        segments
            .first()
            .map(|s| s.base_offset())
            .ok_or(LogError::Closed)
    }

    /// Offset of the newest record (0 for a log that starts at 0 and is empty)
    pub fn highest_offset(&self) -> Result<u64> {
        let segments = self.segments.read();
        segments
            .last()
            .map(|s| s.next_offset().saturating_sub(1))
            .ok_or(LogError::Closed)
    }

    /// Remove every segment whose highest offset is below `lowest`
    ///
    /// Meant to be called periodically once consumers are past `lowest`.
    /// If every segment goes, a fresh active segment starts where the old
    /// log ended so offsets never go backwards.
    pub fn truncate(&self, lowest: u64) -> Result<()> {
        let mut segments = self.segments.write();

        let resume_at = match segments.last() {
            Some(active) => active.next_offset(),
            None => return Err(LogError::Closed),
        };
        let boundary = lowest.saturating_add(1);

        let mut remaining = std::mem::take(&mut *segments).into_iter();
        while let Some(segment) = remaining.next() {
            if segment.next_offset() <= boundary {
                if let Err(e) = segment.remove() {
                    segments.extend(remaining);
                    if segments.is_empty() {
                        // The failed segment was the active one
                        let segment = self.open_segment(resume_at)?;
                        segments.push(segment);
                    }
                    return Err(e);
                }
            } else {
                segments.push(segment);
            }
        }

        if segments.is_empty() {
            tracing::debug!("Truncation removed every segment, restarting at {}", resume_at);
            let segment = self.open_segment(resume_at)?;
            segments.push(segment);
        }

        Ok(())
    }

    /// Stream the framed bytes of every store, oldest segment first
    pub fn reader(&self) -> LogReader {
        let segments = self.segments.read();
        LogReader::new(segments.iter().map(|s| Arc::clone(s.store())).collect())
    }

    /// Close every segment
    ///
    /// The log is unusable afterwards (operations return `Closed`) until
    /// `reset`.
    pub fn close(&self) -> Result<()> {
        let mut segments = self.segments.write();
        Self::close_segments(&mut segments)
    }

    /// Close the log and delete its directory
    pub fn remove(&self) -> Result<()> {
        let mut segments = self.segments.write();
        self.remove_locked(&mut segments)
    }

    /// Remove the log, then bootstrap a fresh one in the same directory
    pub fn reset(&self) -> Result<()> {
        let mut segments = self.segments.write();
        self.remove_locked(&mut segments)?;
        self.setup(&mut segments)?;
        tracing::info!("Reset log at {}", self.config.data_dir.display());
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Get the data directory path
    pub fn dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the number of open segments
    pub fn segment_count(&self) -> usize {
        self.segments.read().len()
    }

    /// Base offsets of the open segments, ascending
    pub fn base_offsets(&self) -> Vec<u64> {
        self.segments.read().iter().map(|s| s.base_offset()).collect()
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Load segments from disk, or bootstrap the first one
    fn setup(&self, segments: &mut Vec<Segment<C>>) -> Result<()> {
        let dir = &self.config.data_dir;
        fs::create_dir_all(dir)?;

        // A store and its index share a prefix; the set keeps one of each.
        let mut base_offsets = BTreeSet::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file() {
                if let Some(base_offset) = Self::parse_base_offset(&path) {
                    base_offsets.insert(base_offset);
                }
            }
        }

        for base_offset in base_offsets {
            match self.open_segment(base_offset) {
                Ok(segment) => segments.push(segment),
                Err(e) => {
                    // Failures are logged; the open error is the one reported
                    let _ = Self::close_segments(segments);
                    return Err(e);
                }
            }
        }

        if segments.is_empty() {
            let segment = self.open_segment(self.config.segment.initial_offset)?;
            segments.push(segment);
        }

        Ok(())
    }

    fn open_segment(&self, base_offset: u64) -> Result<Segment<C>> {
        Segment::open(
            &self.config.data_dir,
            base_offset,
            self.config.segment,
            Arc::clone(&self.codec),
        )
    }

    /// Close all segments, reporting the first failure
    fn close_segments(segments: &mut Vec<Segment<C>>) -> Result<()> {
        let mut first_error = None;
        for segment in segments.drain(..) {
            if let Err(e) = segment.close() {
                tracing::warn!("Failed to close segment: {}", e);
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn remove_locked(&self, segments: &mut Vec<Segment<C>>) -> Result<()> {
        Self::close_segments(segments)?;
        match fs::remove_dir_all(&self.config.data_dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// "42.store" / "42.index" → Some(42); anything else → None
    fn parse_base_offset(path: &Path) -> Option<u64> {
        let extension = path.extension()?.to_str()?;
        if extension != STORE_EXTENSION && extension != INDEX_EXTENSION {
            return None;
        }
        path.file_stem()?.to_str()?.parse().ok()
    }
}
