//! Storage Module
//!
//! The three on-disk building blocks of the log.
//!
//! ## Responsibilities
//! - `Store`: append-only, length-prefixed record bytes
//! - `Index`: fixed-width relative offset → store position table (mmap)
//! - `Segment`: one store + one index sharing a base offset
//!
//! ## Store File Format (`<base>.store`)
//! ```text
//! ┌────────────────────────────────────────┐
//! │ Frame 1                                │
//! │ ┌──────────────────┬─────────────────┐ │
//! │ │ Len: u64 BE (8)  │  Payload (Len)  │ │
//! │ └──────────────────┴─────────────────┘ │
//! ├────────────────────────────────────────┤
//! │ Frame 2 ...                            │
//! └────────────────────────────────────────┘
//! ```
//!
//! ## Index File Format (`<base>.index`)
//! ```text
//! ┌────────────────────────────────────────┐
//! │ Entry (12 bytes)                       │
//! │ ┌──────────────────┬─────────────────┐ │
//! │ │ RelOff: u32 BE   │ Position: u64 BE│ │
//! │ └──────────────────┴─────────────────┘ │
//! │ ... repeated, strictly in append order │
//! ├────────────────────────────────────────┤
//! │ Zero padding up to max_index_bytes     │
//! │ (only while open; cut off on close)    │
//! └────────────────────────────────────────┘
//! ```

mod index;
mod segment;
mod store;

pub use index::{Index, ENTRY_WIDTH, LAST_ENTRY, OFFSET_WIDTH, POSITION_WIDTH};
pub use segment::{Segment, INDEX_EXTENSION, STORE_EXTENSION};
pub use store::{Store, LEN_WIDTH};
