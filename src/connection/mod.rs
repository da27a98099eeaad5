//! Connection Handler Module
//!
//! Manages individual client connections. Each accepted socket is handed to
//! its own async task, so one slow client never holds up another.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     TCP Listener                            │
//! │                    (main.rs)                                │
//! └──────────────────────┬──────────────────────────────────────┘
//!                        │
//!                        │ accept() + spawn task
//!                        ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 ConnectionHandler                           │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐     │
//! │  │ RespReader  │───>│  dispatch   │───>│ RespWriter  │     │
//! │  │ (read half) │    │             │    │ (write half)│     │
//! │  └─────────────┘    └─────────────┘    └─────────────┘     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use emberkv::commands::CommandHandler;
//! use emberkv::connection::{handle_connection, ConnectionStats};
//! use emberkv::protocol::ProtocolLimits;
//! use emberkv::storage::StorageEngine;
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//!
//! # async fn serve() -> std::io::Result<()> {
//! let listener = TcpListener::bind("127.0.0.1:6379").await?;
//! let storage = Arc::new(StorageEngine::new());
//! let stats = Arc::new(ConnectionStats::new());
//!
//! loop {
//!     let (stream, addr) = listener.accept().await?;
//!     let handler = CommandHandler::new(Arc::clone(&storage));
//!     let limits = ProtocolLimits::default();
//!     tokio::spawn(handle_connection(stream, addr, handler, limits, Arc::clone(&stats)));
//! }
//! # }
//! ```

pub mod handler;

pub use handler::{handle_connection, ConnectionError, ConnectionHandler, ConnectionStats};
