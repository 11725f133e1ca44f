//! Record codec
//!
//! Encoding and decoding of records to the bytes stored in a segment.

use crate::error::Result;

use super::Record;

/// Turns records into store payloads and back
pub trait RecordCodec: Send + Sync {
    /// Serialize a record (offset already assigned)
    fn encode(&self, record: &Record) -> Result<Vec<u8>>;

    /// Deserialize a record previously produced by `encode`
    fn decode(&self, bytes: &[u8]) -> Result<Record>;
}

/// Default codec: bincode's compact binary format
#[derive(Debug, Clone, Copy, Default)]
pub struct BincodeCodec;

impl RecordCodec for BincodeCodec {
    fn encode(&self, record: &Record) -> Result<Vec<u8>> {
        Ok(bincode::serialize(record)?)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Record> {
        Ok(bincode::deserialize(bytes)?)
    }
}
