//! Storage Engine Module
//!
//! The in-memory keyspace: typed entries, a sharded concurrent map, and the
//! per-kind operations the command layer calls.
//!
//! ## Features
//!
//! - **Typed Entries**: strings, lists, sets and hashes (sorted sets are
//!   modeled but have no commands)
//! - **Sharded Storage**: 64 independent shards reduce lock contention
//! - **Lazy Expiry**: expired keys are removed when next accessed
//! - **Atomic Commands**: each operation runs in one critical section
//!
//! ## Example
//!
//! ```
//! use emberkv::storage::{Entry, StorageEngine};
//! use bytes::Bytes;
//! use std::time::Duration;
//!
//! let engine = StorageEngine::new();
//!
//! engine.set_string(Bytes::from("color"), Bytes::from("blue"));
//! assert_eq!(engine.get_string(b"color"), Some(Bytes::from("blue")));
//!
//! engine.set_entry(
//!     Bytes::from("session"),
//!     Entry::string("token123").with_ttl(Duration::from_secs(3600)),
//! );
//! assert_eq!(engine.ttl(b"session"), Some(3600));
//! ```

pub mod engine;
pub mod entry;
mod hashes;
mod lists;
mod sets;

pub use engine::{StorageEngine, StorageResult, StorageStats, WrongType};
pub use entry::{Entry, Value, ValueKind};
