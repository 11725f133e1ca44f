//! Record Module
//!
//! The unit of data appended to the log, and the codec that turns it into
//! the opaque bytes a store frame carries.
//!
//! The storage layer never looks inside `value`; it only assigns `offset`
//! before handing the record to the codec.

mod codec;

use serde::{Deserialize, Serialize};

pub use codec::{BincodeCodec, RecordCodec};

/// A single record in the log
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Record {
    /// Absolute offset, assigned by the segment on append
    pub offset: u64,

    /// Opaque payload
    pub value: Vec<u8>,
}

impl Record {
    /// Create a record with an unassigned (zero) offset
    pub fn new(value: impl Into<Vec<u8>>) -> Self {
        Self {
            offset: 0,
            value: value.into(),
        }
    }
}
