//! Stream Reader and Writer
//!
//! Attaches the RESP parser and serializer to an async byte stream.
//! [`RespReader`] and [`RespWriter`] are independent, so a connection can be
//! split into its read and write halves and each half wrapped separately.

use crate::protocol::parser::{Decoder, ParseError, ProtocolLimits};
use crate::protocol::types::RespValue;
use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::trace;

/// Initial read buffer capacity
const INITIAL_BUFFER_SIZE: usize = 4096;

/// Errors returned by [`RespReader::read`].
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// The stream ended in the middle of a value
    #[error("unexpected end of stream ({buffered} bytes of a partial value received)")]
    UnexpectedEof { buffered: usize },

    /// A single value grew past the configured frame limit
    #[error("frame exceeds {max} bytes")]
    FrameTooLarge { max: usize },
}

/// Reads one RESP value at a time from an async byte stream.
///
/// Bytes that arrive after a complete value stay buffered for the next call.
/// A value split across reads is decoded piece by piece as its bytes arrive;
/// completed pieces are never parsed again.
#[derive(Debug)]
pub struct RespReader<R> {
    inner: R,
    buffer: BytesMut,
    decoder: Decoder,
    bytes_read: u64,
}

impl<R: AsyncRead + Unpin> RespReader<R> {
    pub fn new(inner: R) -> Self {
        Self::with_limits(inner, ProtocolLimits::default())
    }

    pub fn with_limits(inner: R, limits: ProtocolLimits) -> Self {
        Self {
            inner,
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            decoder: Decoder::new(limits),
            bytes_read: 0,
        }
    }

    /// Reads the next complete value.
    ///
    /// Returns `Ok(None)` when the peer closed the stream cleanly, i.e. with
    /// no partial value buffered. A close in the middle of a value is
    /// [`ReadError::UnexpectedEof`].
    pub async fn read(&mut self) -> Result<Option<RespValue>, ReadError> {
        loop {
            if let Some(value) = self.decoder.decode(&mut self.buffer)? {
                trace!(remaining = self.buffer.len(), "Parsed value");
                return Ok(Some(value));
            }

            let pending = self.decoder.frame_len() + self.buffer.len();
            let max = self.decoder.limits().max_frame_len();
            if pending >= max {
                return Err(ReadError::FrameTooLarge { max });
            }

            if self.buffer.capacity() - self.buffer.len() < 1024 {
                self.buffer.reserve(INITIAL_BUFFER_SIZE);
            }

            let n = self.inner.read_buf(&mut self.buffer).await?;
            if n == 0 {
                if pending == 0 && self.decoder.is_idle() {
                    return Ok(None);
                }
                return Err(ReadError::UnexpectedEof { buffered: pending });
            }

            self.bytes_read += n as u64;
            trace!(bytes = n, "Read data");
        }
    }

    /// Total bytes pulled from the underlying stream.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }
}

/// Writes RESP values to an async byte stream.
#[derive(Debug)]
pub struct RespWriter<W> {
    inner: W,
    scratch: Vec<u8>,
    bytes_written: u64,
}

impl<W: AsyncWrite + Unpin> RespWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            scratch: Vec::with_capacity(INITIAL_BUFFER_SIZE),
            bytes_written: 0,
        }
    }

    /// Serializes `value`, writes it and flushes the sink.
    pub async fn write(&mut self, value: &RespValue) -> std::io::Result<()> {
        self.scratch.clear();
        value.serialize_into(&mut self.scratch);

        self.inner.write_all(&self.scratch).await?;
        self.inner.flush().await?;

        self.bytes_written += self.scratch.len() as u64;
        trace!(bytes = self.scratch.len(), "Wrote value");
        Ok(())
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }
}
