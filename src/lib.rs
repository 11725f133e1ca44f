//! # commitlog
//!
//! A durable, append-only record log with:
//! - Monotonically increasing integer offsets
//! - Rotating segments, each a length-prefixed store plus a mmap'd index
//! - Offset-based routing of reads to the owning segment
//! - Segment-granular retention (truncation) and whole-log streaming
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                           Log                                │
//! │         (RwLock over segments, active = last segment)        │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!     ┌─────────────────┼─────────────────┐
//!     ▼                 ▼                 ▼
//! ┌─────────┐      ┌─────────┐      ┌─────────┐
//! │ Segment │      │ Segment │      │ Segment │  ← active
//! │ base=0  │      │ base=16 │      │ base=32 │
//! └────┬────┘      └─────────┘      └─────────┘
//!      │
//!      ├──────────────────┐
//!      ▼                  ▼
//! ┌─────────────┐   ┌─────────────┐
//! │    Store    │   │    Index    │
//! │ 0.store     │   │ 0.index     │
//! │ [len][data] │   │ [rel][pos]  │
//! └─────────────┘   └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod record;
pub mod storage;
pub mod log;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{LogError, Result};
pub use config::{Config, SegmentConfig};
pub use log::{Log, LogReader};
pub use record::{BincodeCodec, Record, RecordCodec};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of commitlog
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
