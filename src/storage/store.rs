//! Store
//!
//! Append-only container of length-prefixed byte frames over a single file.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use bytes::{Buf, BufMut};
use parking_lot::Mutex;

use crate::error::{LogError, Result};

/// Width of the big-endian length prefix in front of every frame
pub const LEN_WIDTH: u64 = 8;

/// Append-only byte store
///
/// ## Concurrency:
/// - Writes go through a `BufWriter` to batch small appends into fewer syscalls
/// - Reads go to the raw file, so every read flushes the buffer first
/// - `inner` serializes append / read / flush; all methods take `&self`
pub struct Store {
    /// Path of the backing file
    path: PathBuf,

    /// Buffered writer and running size, guarded together
    inner: Mutex<StoreInner>,
}

struct StoreInner {
    /// Buffered writer over the file (opened in append mode)
    writer: BufWriter<File>,

    /// Bytes written so far, framing included
    size: u64,
}

impl Store {
    /// Open or create the store file at `path`
    ///
    /// The file may already hold frames from before a restart, so the
    /// starting size is the file's current length.
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;
        let size = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            inner: Mutex::new(StoreInner {
                writer: BufWriter::new(file),
                size,
            }),
        })
    }

    /// Append one frame holding `data`
    ///
    /// Returns `(bytes_written, position)` where `position` is the byte
    /// offset of the frame's length prefix.
    pub fn append(&self, data: &[u8]) -> Result<(u64, u64)> {
        let mut inner = self.inner.lock();
        let position = inner.size;

        let mut header = [0u8; LEN_WIDTH as usize];
        (&mut header[..]).put_u64(data.len() as u64);
        inner.writer.write_all(&header)?;
        inner.writer.write_all(data)?;

        let written = LEN_WIDTH + data.len() as u64;
        inner.size += written;
        Ok((written, position))
    }

    /// Read the payload of the frame starting at `position`
    pub fn read(&self, position: u64) -> Result<Vec<u8>> {
        let mut inner = self.inner.lock();
        inner.writer.flush()?;

        let size = inner.size;
        match position.checked_add(LEN_WIDTH) {
            Some(end) if end <= size => {}
            _ => return Err(LogError::EndOfData),
        }

        let file = inner.writer.get_mut();
        let len = read_len(file, position)?;

        let frame_end = (position + LEN_WIDTH).checked_add(len);
        if frame_end.map_or(true, |end| end > size) {
            return Err(LogError::Corruption(format!(
                "frame at {} declares {} bytes but store holds {}",
                position, len, size
            )));
        }

        let mut data = vec![0u8; len as usize];
        file.read_exact(&mut data)?;
        Ok(data)
    }

    /// Positioned read of raw store bytes into `buf`
    ///
    /// Fills as much of `buf` as the store holds past `offset` and returns
    /// the count; 0 means `offset` is at or past the end.
    pub fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<usize> {
        let mut inner = self.inner.lock();
        inner.writer.flush()?;

        if offset >= inner.size || buf.is_empty() {
            return Ok(0);
        }

        let file = inner.writer.get_mut();
        file.seek(SeekFrom::Start(offset))?;

        let mut filled = 0;
        while filled < buf.len() {
            match file.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(filled)
    }

    /// End of the frame starting at `position`, if the whole frame is stored
    ///
    /// `None` when the length prefix or the payload runs past the end.
    pub fn frame_end(&self, position: u64) -> Result<Option<u64>> {
        let mut inner = self.inner.lock();
        inner.writer.flush()?;

        let size = inner.size;
        match position.checked_add(LEN_WIDTH) {
            Some(end) if end <= size => {}
            _ => return Ok(None),
        }

        let len = read_len(inner.writer.get_mut(), position)?;
        Ok((position + LEN_WIDTH)
            .checked_add(len)
            .filter(|&end| end <= size))
    }

    /// Cut the store back to `size` bytes; a no-op if it is already smaller
    pub fn truncate(&self, size: u64) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.writer.flush()?;

        if size < inner.size {
            inner.writer.get_ref().set_len(size)?;
            inner.size = size;
        }
        Ok(())
    }

    /// Current size in bytes, including buffered frames
    pub fn size(&self) -> u64 {
        self.inner.lock().size
    }

    /// Path of the backing file
    pub fn name(&self) -> &Path {
        &self.path
    }

    /// Flush buffered frames and sync the file
    ///
    /// The descriptor itself is released when the last handle drops, so a
    /// `LogReader` holding this store can still drain it.
    pub fn close(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.writer.flush()?;
        inner.writer.get_ref().sync_all()?;
        Ok(())
    }
}

/// Read the length prefix of the frame at `position`
fn read_len(file: &mut File, position: u64) -> Result<u64> {
    file.seek(SeekFrom::Start(position))?;

    let mut header = [0u8; LEN_WIDTH as usize];
    file.read_exact(&mut header)?;
    Ok((&header[..]).get_u64())
}
