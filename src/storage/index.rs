//! Index
//!
//! Memory-mapped table of fixed-width entries mapping a record's offset
//! (relative to the segment's base) to its frame position in the store.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use bytes::{Buf, BufMut};
use memmap2::{MmapMut, MmapOptions};
use parking_lot::Mutex;

use crate::error::{LogError, Result};

/// Relative offsets are u32
pub const OFFSET_WIDTH: u64 = 4;

/// Store positions are u64
pub const POSITION_WIDTH: u64 = 8;

/// Entry `n` lives at byte `n * ENTRY_WIDTH`
pub const ENTRY_WIDTH: u64 = OFFSET_WIDTH + POSITION_WIDTH;

/// Entry number meaning "the last populated entry"
pub const LAST_ENTRY: i64 = -1;

/// Offset index of one segment
///
/// The file is grown to its full capacity before mapping, because a live
/// mapping cannot be resized. `size` is the high-water mark of populated
/// entries; `close` cuts the file back down to it so the next `open` can
/// take the file length as the populated size.
pub struct Index {
    /// Path of the backing file
    path: PathBuf,

    /// File, mapping and high-water mark, guarded together
    inner: Mutex<IndexInner>,
}

struct IndexInner {
    file: File,
    mmap: MmapMut,
    /// Populated bytes; always a multiple of ENTRY_WIDTH and <= mmap.len()
    size: u64,
}

impl Index {
    /// Open or create the index file at `path` with room for
    /// `max_index_bytes` of entries
    ///
    /// On startup:
    /// 1. Take the file length (rounded down to whole entries) as populated size
    /// 2. Grow the file to capacity and map it read-write
    /// 3. Drop trailing zero padding left behind if the last close never ran
    pub fn open(path: &Path, max_index_bytes: u64) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(path)?;

        let file_len = file.metadata()?.len();
        let populated = file_len - file_len % ENTRY_WIDTH;

        // Never map less than what is already on disk.
        let capacity = max_index_bytes.max(file_len);
        if capacity < ENTRY_WIDTH {
            return Err(LogError::Config(format!(
                "index capacity {} is smaller than one entry ({} bytes)",
                capacity, ENTRY_WIDTH
            )));
        }
        let map_len = usize::try_from(capacity).map_err(|_| {
            LogError::Config(format!("index capacity {} does not fit in memory", capacity))
        })?;

        file.set_len(capacity)?;

        // SAFETY: the file is open read-write, has just been sized to
        // `map_len`, and is owned by this index for the mapping's lifetime.
        // Only `close` shrinks it, after the mapping is dropped.
        let mmap = unsafe { MmapOptions::new().len(map_len).map_mut(&file)? };

        let entries = populated / ENTRY_WIDTH;
        let valid = Self::recover_entries(&mmap, entries);
        if valid < entries {
            tracing::warn!(
                "Index {} was not closed cleanly: keeping {} of {} entries",
                path.display(),
                valid,
                entries
            );
        }

        Ok(Self {
            path: path.to_path_buf(),
            inner: Mutex::new(IndexInner {
                file,
                mmap,
                size: valid * ENTRY_WIDTH,
            }),
        })
    }

    /// Read entry number `entry`, or the last entry for `LAST_ENTRY`
    ///
    /// Returns `(relative_offset, position)`, or `EndOfData` when the index
    /// is empty or the entry lies past the populated region.
    pub fn read(&self, entry: i64) -> Result<(u32, u64)> {
        let inner = self.inner.lock();
        if inner.size == 0 {
            return Err(LogError::EndOfData);
        }

        let entry = if entry == LAST_ENTRY {
            inner.size / ENTRY_WIDTH - 1
        } else {
            u64::try_from(entry).map_err(|_| LogError::EndOfData)?
        };

        let at = entry.checked_mul(ENTRY_WIDTH).ok_or(LogError::EndOfData)?;
        match at.checked_add(ENTRY_WIDTH) {
            Some(end) if end <= inner.size => Ok(decode_entry(&inner.mmap, at as usize)),
            _ => Err(LogError::EndOfData),
        }
    }

    /// Append an entry at the high-water mark
    ///
    /// Fails with `IndexFull` once the mapped capacity is exhausted.
    pub fn write(&self, offset: u32, position: u64) -> Result<()> {
        let mut inner = self.inner.lock();
        let capacity = inner.mmap.len() as u64;
        if inner.size + ENTRY_WIDTH > capacity {
            return Err(LogError::IndexFull { capacity });
        }

        let at = inner.size as usize;
        encode_entry(&mut inner.mmap, at, offset, position);
        inner.size += ENTRY_WIDTH;
        Ok(())
    }

    /// Path of the backing file
    pub fn name(&self) -> &Path {
        &self.path
    }

    /// Populated bytes (high-water mark)
    pub fn size(&self) -> u64 {
        self.inner.lock().size
    }

    /// Mapped capacity in bytes
    pub fn capacity(&self) -> u64 {
        self.inner.lock().mmap.len() as u64
    }

    /// Number of populated entries
    pub fn entries(&self) -> u64 {
        self.size() / ENTRY_WIDTH
    }

    /// True when another entry would not fit
    pub fn is_full(&self) -> bool {
        let inner = self.inner.lock();
        inner.size + ENTRY_WIDTH > inner.mmap.len() as u64
    }

    /// Lower the high-water mark to `entries` (never raises it)
    pub(crate) fn truncate_entries(&self, entries: u64) {
        let mut inner = self.inner.lock();
        inner.size = inner.size.min(entries.saturating_mul(ENTRY_WIDTH));
    }

    /// Sync the mapping and the file, cut the file back to the populated
    /// size, then close it
    pub fn close(self) -> Result<()> {
        let IndexInner { file, mmap, size } = self.inner.into_inner();
        mmap.flush()?;
        file.sync_all()?;
        drop(mmap);
        file.set_len(size)?;
        Ok(())
    }

    /// Count the leading entries that can be genuine
    ///
    /// Entry `n >= 1` must carry relative offset `n`; zero padding fails
    /// that check. Entry 0 is checked against the store by the segment.
    fn recover_entries(mmap: &[u8], entries: u64) -> u64 {
        let mut valid = entries;
        while valid > 1 {
            let (offset, _) = decode_entry(mmap, ((valid - 1) * ENTRY_WIDTH) as usize);
            if u64::from(offset) == valid - 1 {
                break;
            }
            valid -= 1;
        }
        valid
    }
}

fn decode_entry(mmap: &[u8], at: usize) -> (u32, u64) {
    let mut buf = &mmap[at..at + ENTRY_WIDTH as usize];
    let offset = buf.get_u32();
    let position = buf.get_u64();
    (offset, position)
}

fn encode_entry(mmap: &mut [u8], at: usize, offset: u32, position: u64) {
    let mut buf = &mut mmap[at..at + ENTRY_WIDTH as usize];
    buf.put_u32(offset);
    buf.put_u64(position);
}
