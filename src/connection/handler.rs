//! Connection Handler
//!
//! Each client gets its own task running a strictly sequential loop: read one
//! request, dispatch it, write the reply, repeat.
//!
//! ## Connection Lifecycle
//!
//! ```text
//!   AwaitingRequest ──request──> Dispatching ──reply written──> AwaitingRequest
//!         │                           │
//!         │ EOF / decode error        │ QUIT / write error
//!         ▼                           ▼
//!       Closed <──────────────────────┘
//! ```
//!
//! The read and write halves of the socket are owned separately by a
//! [`RespReader`] and a [`RespWriter`]. Pipelined requests stay buffered in
//! the reader until the loop comes back for them.

use crate::commands::CommandHandler;
use crate::protocol::{ProtocolLimits, ReadError, RespReader, RespWriter};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::BufWriter;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::{debug, info, trace, warn};

/// Statistics for connection handling
#[derive(Debug, Default)]
pub struct ConnectionStats {
    /// Total number of connections accepted
    pub connections_accepted: AtomicU64,
    /// Currently active connections
    pub active_connections: AtomicU64,
    /// Total commands processed
    pub commands_processed: AtomicU64,
    /// Total bytes read
    pub bytes_read: AtomicU64,
    /// Total bytes written
    pub bytes_written: AtomicU64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn command_processed(&self) {
        self.commands_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bytes_read(&self, count: u64) {
        self.bytes_read.fetch_add(count, Ordering::Relaxed);
    }

    pub fn bytes_written(&self, count: u64) {
        self.bytes_written.fetch_add(count, Ordering::Relaxed);
    }
}

/// Errors that end a connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// The request stream could not be decoded or read
    #[error("read failed: {0}")]
    Read(#[from] ReadError),

    /// A reply could not be written
    #[error("write failed: {0}")]
    Write(#[from] std::io::Error),
}

impl ConnectionError {
    /// A reset by the peer is routine and logged quietly.
    fn is_reset(&self) -> bool {
        let io_err = match self {
            ConnectionError::Read(ReadError::Io(e)) => e,
            ConnectionError::Write(e) => e,
            _ => return false,
        };
        matches!(
            io_err.kind(),
            std::io::ErrorKind::ConnectionReset | std::io::ErrorKind::BrokenPipe
        )
    }
}

/// Why a connection loop ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Closed {
    /// The peer closed its side between requests
    Eof,
    /// The client sent `QUIT`
    Quit,
}

/// Handles a single client connection.
pub struct ConnectionHandler {
    reader: RespReader<OwnedReadHalf>,
    writer: RespWriter<BufWriter<OwnedWriteHalf>>,

    /// Client's address (for logging)
    addr: SocketAddr,

    /// The command handler (shared across connections)
    command_handler: CommandHandler,

    /// Connection statistics (shared)
    stats: Arc<ConnectionStats>,
}

impl ConnectionHandler {
    /// Creates a new connection handler.
    ///
    /// # Arguments
    ///
    /// * `stream` - The TCP stream for this connection
    /// * `addr` - The client's socket address
    /// * `command_handler` - The command handler for executing commands
    /// * `limits` - Decoding limits applied to every request
    /// * `stats` - Shared connection statistics
    pub fn new(
        stream: TcpStream,
        addr: SocketAddr,
        command_handler: CommandHandler,
        limits: ProtocolLimits,
        stats: Arc<ConnectionStats>,
    ) -> Self {
        stats.connection_opened();

        let (read_half, write_half) = stream.into_split();

        Self {
            reader: RespReader::with_limits(read_half, limits),
            writer: RespWriter::new(BufWriter::new(write_half)),
            addr,
            command_handler,
            stats,
        }
    }

    /// Runs the connection until the client leaves or an error occurs.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        info!(client = %self.addr, "Client connected");

        let result = self.main_loop().await;

        match &result {
            Ok(Closed::Quit) => info!(client = %self.addr, "Client sent QUIT"),
            Ok(Closed::Eof) => info!(client = %self.addr, "Client disconnected gracefully"),
            Err(e) if e.is_reset() => {
                debug!(client = %self.addr, "Connection reset by client")
            }
            Err(e) => warn!(client = %self.addr, error = %e, "Connection error"),
        }

        self.stats.connection_closed();
        result.map(|_| ())
    }

    async fn main_loop(&mut self) -> Result<Closed, ConnectionError> {
        loop {
            let before = self.reader.bytes_read();
            let request = self.reader.read().await;
            self.stats.bytes_read(self.reader.bytes_read() - before);

            let Some(request) = request? else {
                return Ok(Closed::Eof);
            };
            trace!(client = %self.addr, "Received request");

            let response = self.command_handler.dispatch(request);
            self.stats.command_processed();

            let before = self.writer.bytes_written();
            self.writer.write(&response.reply).await?;
            self.stats.bytes_written(self.writer.bytes_written() - before);

            if response.close {
                return Ok(Closed::Quit);
            }
        }
    }
}

/// Handles a client connection.
///
/// Creates a [`ConnectionHandler`] and runs it to completion. Errors are
/// logged by the handler and go no further.
pub async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    command_handler: CommandHandler,
    limits: ProtocolLimits,
    stats: Arc<ConnectionStats>,
) {
    let handler = ConnectionHandler::new(stream, addr, command_handler, limits, stats);
    if let Err(e) = handler.run().await {
        trace!(client = %addr, error = %e, "Connection ended with error");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StorageEngine;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::time::{timeout, Duration};

    async fn create_test_server() -> (SocketAddr, Arc<StorageEngine>, Arc<ConnectionStats>) {
        create_test_server_with_limits(ProtocolLimits::default()).await
    }

    async fn create_test_server_with_limits(
        limits: ProtocolLimits,
    ) -> (SocketAddr, Arc<StorageEngine>, Arc<ConnectionStats>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let storage = Arc::new(StorageEngine::new());
        let stats = Arc::new(ConnectionStats::new());

        let storage_clone = Arc::clone(&storage);
        let stats_clone = Arc::clone(&stats);

        tokio::spawn(async move {
            while let Ok((stream, client_addr)) = listener.accept().await {
                let handler = CommandHandler::new(Arc::clone(&storage_clone));
                let stats = Arc::clone(&stats_clone);
                tokio::spawn(handle_connection(
                    stream,
                    client_addr,
                    handler,
                    limits,
                    stats,
                ));
            }
        });

        (addr, storage, stats)
    }

    /// Reads exactly `expected.len()` bytes and compares them.
    async fn expect_reply(client: &mut TcpStream, expected: &[u8]) {
        let mut buf = vec![0u8; expected.len()];
        timeout(Duration::from_secs(2), client.read_exact(&mut buf))
            .await
            .expect("timed out waiting for reply")
            .unwrap();
        assert_eq!(
            buf,
            expected,
            "got {:?}",
            String::from_utf8_lossy(&buf)
        );
    }

    /// Asserts the server closed the connection.
    async fn expect_closed(client: &mut TcpStream) {
        let mut buf = [0u8; 16];
        let n = timeout(Duration::from_secs(2), client.read(&mut buf))
            .await
            .expect("timed out waiting for close")
            .unwrap_or(0);
        assert_eq!(n, 0);
    }

    #[tokio::test]
    async fn test_ping_pong() {
        let (addr, _, _) = create_test_server().await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        client.write_all(b"*1\r\n$4\r\nPING\r\n").await.unwrap();
        expect_reply(&mut client, b"+PONG\r\n").await;
    }

    #[tokio::test]
    async fn test_set_get_del_get_exchange() {
        let (addr, _, _) = create_test_server().await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        client
            .write_all(b"*3\r\n$3\r\nSET\r\n$1\r\nk\r\n$1\r\nv\r\n")
            .await
            .unwrap();
        expect_reply(&mut client, b"+OK\r\n").await;

        client.write_all(b"*2\r\n$3\r\nGET\r\n$1\r\nk\r\n").await.unwrap();
        expect_reply(&mut client, b"$1\r\nv\r\n").await;

        client.write_all(b"*2\r\n$3\r\nDEL\r\n$1\r\nk\r\n").await.unwrap();
        expect_reply(&mut client, b":1\r\n").await;

        client.write_all(b"*2\r\n$3\r\nGET\r\n$1\r\nk\r\n").await.unwrap();
        expect_reply(&mut client, b"$-1\r\n").await;
    }

    #[tokio::test]
    async fn test_pipelined_requests() {
        let (addr, _, _) = create_test_server().await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        client
            .write_all(b"*3\r\n$3\r\nSET\r\n$2\r\nk1\r\n$2\r\nv1\r\n*3\r\n$3\r\nSET\r\n$2\r\nk2\r\n$2\r\nv2\r\n*2\r\n$3\r\nGET\r\n$2\r\nk1\r\n*2\r\n$3\r\nGET\r\n$2\r\nk2\r\n")
            .await
            .unwrap();

        expect_reply(&mut client, b"+OK\r\n+OK\r\n$2\r\nv1\r\n$2\r\nv2\r\n").await;
    }

    #[tokio::test]
    async fn test_request_split_across_writes() {
        let (addr, _, _) = create_test_server().await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        client.write_all(b"*2\r\n$4\r\nLL").await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        client.write_all(b"EN\r\n$1\r\nq\r\n").await.unwrap();

        expect_reply(&mut client, b":0\r\n").await;
    }

    #[tokio::test]
    async fn test_command_error_keeps_connection() {
        let (addr, _, _) = create_test_server().await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        client.write_all(b"*1\r\n$3\r\nDEL\r\n").await.unwrap();
        expect_reply(
            &mut client,
            b"-ERR wrong number of arguments for 'del' command\r\n",
        )
        .await;

        client.write_all(b"*1\r\n$4\r\nPING\r\n").await.unwrap();
        expect_reply(&mut client, b"+PONG\r\n").await;
    }

    #[tokio::test]
    async fn test_quit_closes_connection() {
        let (addr, _, _) = create_test_server().await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        // The PING after QUIT is never answered.
        client
            .write_all(b"*1\r\n$4\r\nQUIT\r\n*1\r\n$4\r\nPING\r\n")
            .await
            .unwrap();
        expect_reply(&mut client, b"+OK\r\n").await;
        expect_closed(&mut client).await;
    }

    #[tokio::test]
    async fn test_decode_error_closes_connection() {
        let (addr, _, _) = create_test_server().await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        client.write_all(b"?garbage\r\n").await.unwrap();
        expect_closed(&mut client).await;
    }

    #[tokio::test]
    async fn test_nesting_limit_closes_connection() {
        let limits = ProtocolLimits {
            max_depth: 2,
            ..ProtocolLimits::default()
        };
        let (addr, _, _) = create_test_server_with_limits(limits).await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        client.write_all(b"*1\r\n*1\r\n*1\r\n:1\r\n").await.unwrap();
        expect_closed(&mut client).await;
    }

    #[tokio::test]
    async fn test_overlong_line_closes_connection() {
        let limits = ProtocolLimits {
            max_line_len: 1024,
            ..ProtocolLimits::default()
        };
        let (addr, _, _) = create_test_server_with_limits(limits).await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        let mut line = vec![b'a'; 8 * 1024];
        line[0] = b'+';
        // The server may hang up before the whole line is written.
        let _ = client.write_all(&line).await;
        expect_closed(&mut client).await;
    }

    #[tokio::test]
    async fn test_clients_share_storage() {
        let (addr, storage, _) = create_test_server().await;
        let mut first = TcpStream::connect(addr).await.unwrap();
        let mut second = TcpStream::connect(addr).await.unwrap();

        first
            .write_all(b"*3\r\n$5\r\nRPUSH\r\n$1\r\nq\r\n$3\r\njob\r\n")
            .await
            .unwrap();
        expect_reply(&mut first, b":1\r\n").await;

        second.write_all(b"*2\r\n$4\r\nLPOP\r\n$1\r\nq\r\n").await.unwrap();
        expect_reply(&mut second, b"$3\r\njob\r\n").await;

        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn test_connection_stats() {
        let (addr, _, stats) = create_test_server().await;

        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 0);

        let mut client = TcpStream::connect(addr).await.unwrap();

        // Give the server time to accept the connection
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(stats.connections_accepted.load(Ordering::Relaxed), 1);
        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 1);

        client.write_all(b"*1\r\n$4\r\nPING\r\n").await.unwrap();
        expect_reply(&mut client, b"+PONG\r\n").await;

        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(stats.commands_processed.load(Ordering::Relaxed), 1);
        assert_eq!(stats.bytes_read.load(Ordering::Relaxed), 14);
        assert_eq!(stats.bytes_written.load(Ordering::Relaxed), 7);

        drop(client);

        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 0);
    }
}
