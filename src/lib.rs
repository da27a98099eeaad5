//! # EmberKV - An In-Memory Key-Value Server
//!
//! EmberKV speaks a RESP-style wire protocol over TCP and keeps typed values
//! (strings, lists, sets, hashes) in a sharded in-memory keyspace with
//! per-key expiry.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              EmberKV                                    │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐                  │
//! │  │ TCP Server  │───>│ Connection  │───>│  Command    │                  │
//! │  │ (Listener)  │    │  Handler    │    │  Handler    │                  │
//! │  └─────────────┘    └──────┬──────┘    └──────┬──────┘                  │
//! │                            │                  │                         │
//! │                            ▼                  ▼                         │
//! │  ┌─────────────────────────────┐  ┌──────────────────────────────────┐  │
//! │  │   RespReader / RespWriter   │  │          StorageEngine           │  │
//! │  │   (one per socket half)     │  │  ┌────────┐ ┌────────┐ ┌──────┐  │  │
//! │  └─────────────────────────────┘  │  │Shard 0 │ │Shard 1 │ │...N  │  │  │
//! │                                   │  └────────┘ └────────┘ └──────┘  │  │
//! │                                   └──────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use emberkv::commands::CommandHandler;
//! use emberkv::connection::{handle_connection, ConnectionStats};
//! use emberkv::protocol::ProtocolLimits;
//! use emberkv::storage::StorageEngine;
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let storage = Arc::new(StorageEngine::new());
//!     let stats = Arc::new(ConnectionStats::new());
//!     let listener = TcpListener::bind("127.0.0.1:6379").await?;
//!
//!     loop {
//!         let (stream, addr) = listener.accept().await?;
//!         let handler = CommandHandler::new(Arc::clone(&storage));
//!         let stats = Arc::clone(&stats);
//!
//!         tokio::spawn(handle_connection(
//!             stream,
//!             addr,
//!             handler,
//!             ProtocolLimits::default(),
//!             stats,
//!         ));
//!     }
//! }
//! ```
//!
//! ## Module Overview
//!
//! - [`protocol`]: RESP value type, parser, and async reader/writer
//! - [`storage`]: Thread-safe typed keyspace with lazy expiry
//! - [`commands`]: Request validation and command execution
//! - [`connection`]: Per-client connection loop
//! - [`config`]: Command-line flags for the binaries
//!
//! ## Design Highlights
//!
//! ### One Lock per Operation
//!
//! The storage engine uses 64 independent `RwLock`ed shards. Every command
//! touches one key and runs inside one critical section of that key's shard,
//! so read-modify-write commands such as `LPUSH` are atomic.
//!
//! ### Lazy Expiry
//!
//! An expired key is removed by the first operation that looks at it. A read
//! that finds an expired entry re-checks it under the write lock before
//! removing it.
//!
//! ### Bounded Decoding
//!
//! Requests come from untrusted clients, so nesting depth, array length and
//! bulk length are all capped by [`protocol::ProtocolLimits`].

pub mod commands;
pub mod config;
pub mod connection;
pub mod protocol;
pub mod storage;

// Re-export commonly used types for convenience
pub use commands::{CommandError, CommandHandler, Response};
pub use connection::{handle_connection, ConnectionStats};
pub use protocol::{ParseError, ProtocolLimits, RespParser, RespValue};
pub use storage::StorageEngine;

/// The default port EmberKV listens on (same as Redis)
pub const DEFAULT_PORT: u16 = 6379;

/// The default host EmberKV binds to
pub const DEFAULT_HOST: &str = "localhost";

/// Version of EmberKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
