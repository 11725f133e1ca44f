//! Log Reader
//!
//! Sequential byte stream over every store of a log.

use std::collections::VecDeque;
use std::io::{self, Read};
use std::sync::Arc;

use crate::error::LogError;
use crate::storage::Store;

/// Concatenation of store contents, oldest segment first, each read from
/// byte 0 to its current end
///
/// The yielded bytes are the raw length-prefixed frames, suitable for
/// snapshotting or transferring a whole log. The reader holds its own
/// handles on the stores, so it does not block appends or truncation.
pub struct LogReader {
    /// Stores not yet exhausted; the front one is being read
    stores: VecDeque<Arc<Store>>,

    /// Position within the front store
    position: u64,
}

impl LogReader {
    pub(crate) fn new(stores: VecDeque<Arc<Store>>) -> Self {
        Self {
            stores,
            position: 0,
        }
    }
}

impl Read for LogReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        while let Some(store) = self.stores.front() {
            let n = store.read_at(buf, self.position).map_err(|e| match e {
                LogError::Io(e) => e,
                other => io::Error::other(other),
            })?;

            if n > 0 {
                self.position += n as u64;
                return Ok(n);
            }

            self.stores.pop_front();
            self.position = 0;
        }

        Ok(0)
    }
}
