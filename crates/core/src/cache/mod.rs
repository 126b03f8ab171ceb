//! Storage tiers for snapshots.
//!
//! Two tiers sit in front of the search API:
//!
//! - [`MemoryCache`]: in-process LRU with a per-entry time-to-live
//! - [`RecordDb`]: durable SQLite store with async access via tokio-rusqlite,
//!   WAL mode and versioned migrations
//!
//! Both store the JSON-encoded snapshot and decode it on every read.

pub mod connection;
mod lock;
pub mod memory;
pub mod migrations;
pub mod records;
pub mod tier;

pub use crate::Error;

pub use connection::RecordDb;
pub use memory::MemoryCache;
pub use tier::{FastCache, RecordStore};
