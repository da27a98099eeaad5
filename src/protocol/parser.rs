//! RESP Protocol Parser
//!
//! Decodes RESP values out of a byte buffer. [`RespParser`] works on a
//! complete slice and reports how many bytes a value occupied; the stream
//! reader drives the same decoder incrementally, feeding it bytes as they
//! arrive.
//!
//! `parse()` returns:
//! - `Ok(Some((value, consumed)))` - a complete value, `consumed` bytes long
//! - `Ok(None)` - the buffer holds only a prefix of a value
//! - `Err(ParseError)` - the bytes can never form a valid value
//!
//! Malformed input is unrecoverable: once framing is lost there is no way to
//! find the start of the next value, so callers must drop the connection.
//!
//! Line length, array nesting, element count and bulk size are bounded by
//! [`ProtocolLimits`].

use crate::protocol::types::{prefix, RespValue, CRLF};
use bytes::{Buf, Bytes, BytesMut};
use std::num::ParseIntError;
use thiserror::Error;

/// Errors that can occur during RESP parsing.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    /// Leading byte is not one of `+ - : $ *`
    #[error("unknown type tag: {0:#04x}")]
    UnknownPrefix(u8),

    #[error("invalid integer: {0}")]
    InvalidInteger(String),

    /// Invalid UTF-8 in an integer or length line
    #[error("invalid UTF-8: {0}")]
    InvalidUtf8(String),

    /// Bulk string length is negative (but not -1 for null)
    #[error("invalid bulk string length: {0}")]
    InvalidBulkLength(i64),

    /// Array length is negative (but not -1 for null)
    #[error("invalid array length: {0}")]
    InvalidArrayLength(i64),

    /// Protocol violation (missing CRLF, etc.)
    #[error("protocol error: {0}")]
    ProtocolError(String),

    /// A `+ - : $ *` line ran past the line limit without a CRLF
    #[error("line too long (max: {max} bytes)")]
    LineTooLong { max: usize },

    #[error("bulk string too large: {size} bytes (max: {max})")]
    MessageTooLarge { size: usize, max: usize },

    #[error("maximum nesting depth exceeded: {max}")]
    NestingTooDeep { max: usize },

    #[error("array too large: {count} elements (max: {max})")]
    TooManyElements { count: usize, max: usize },
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Maximum size for a single bulk string (512 MB, same as Redis)
pub const MAX_BULK_SIZE: usize = 512 * 1024 * 1024;

/// Maximum length of a simple string, error or header line (64 KB)
pub const MAX_LINE_LEN: usize = 64 * 1024;

/// Maximum array nesting depth
pub const MAX_NESTING_DEPTH: usize = 32;

/// Maximum number of elements in one array
pub const MAX_ARRAY_ELEMENTS: usize = 1024 * 1024;

/// Bounds applied while decoding untrusted input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolLimits {
    /// Deepest array nesting accepted (a flat request array is depth 1)
    pub max_depth: usize,
    /// Largest element count accepted for a single array
    pub max_array_elements: usize,
    /// Largest bulk string payload accepted
    pub max_bulk_len: usize,
    /// Longest `+ - : $ *` line accepted, excluding tag and CRLF
    pub max_line_len: usize,
}

impl Default for ProtocolLimits {
    fn default() -> Self {
        Self {
            max_depth: MAX_NESTING_DEPTH,
            max_array_elements: MAX_ARRAY_ELEMENTS,
            max_bulk_len: MAX_BULK_SIZE,
            max_line_len: MAX_LINE_LEN,
        }
    }
}

impl ProtocolLimits {
    /// Largest number of bytes one value may span on the wire.
    pub fn max_frame_len(&self) -> usize {
        self.max_bulk_len.saturating_add(self.max_line_len)
    }
}

/// A RESP protocol parser.
///
/// # Example
///
/// ```
/// use emberkv::protocol::{RespParser, RespValue};
///
/// let parser = RespParser::new();
/// let buffer = b"*2\r\n$3\r\nGET\r\n$4\r\nname\r\n";
///
/// let (value, consumed) = parser.parse(buffer).unwrap().unwrap();
/// assert_eq!(consumed, buffer.len());
/// assert_eq!(value, RespValue::command(["GET", "name"]));
/// ```
#[derive(Debug, Default, Clone)]
pub struct RespParser {
    limits: ProtocolLimits,
}

impl RespParser {
    /// Creates a parser with the default limits.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(limits: ProtocolLimits) -> Self {
        Self { limits }
    }

    /// Attempts to parse one RESP value from the start of `buf`.
    pub fn parse(&self, buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
        let mut input = BytesMut::from(buf);
        let mut decoder = Decoder::new(self.limits);

        Ok(decoder
            .decode(&mut input)?
            .map(|value| (value, buf.len() - input.len())))
    }
}

/// An array still collecting its elements.
#[derive(Debug)]
struct PartialArray {
    remaining: usize,
    elements: Vec<RespValue>,
}

/// One decoding step: a finished scalar or the header of a non-empty array.
enum Item {
    Value(RespValue),
    ArrayStart(usize),
}

/// Resumable decoder that takes bytes off the front of a buffer as each
/// piece of a value completes.
///
/// Finished array elements, a pending bulk length and the CRLF scan position
/// survive between calls, so every buffered byte is examined once however
/// the input is split. After an error the decoder state is meaningless.
#[derive(Debug)]
pub(crate) struct Decoder {
    limits: ProtocolLimits,
    /// Open arrays, innermost last
    stack: Vec<PartialArray>,
    /// Length of a bulk string whose header is already consumed
    bulk_len: Option<usize>,
    /// Offset up to which the current line holds no CRLF
    scanned: usize,
    /// Bytes of the current value already taken from the buffer
    frame_len: usize,
}

impl Decoder {
    pub(crate) fn new(limits: ProtocolLimits) -> Self {
        Self {
            limits,
            stack: Vec::new(),
            bulk_len: None,
            scanned: 0,
            frame_len: 0,
        }
    }

    pub(crate) fn limits(&self) -> &ProtocolLimits {
        &self.limits
    }

    /// True when no value is partly decoded.
    pub(crate) fn is_idle(&self) -> bool {
        self.stack.is_empty() && self.bulk_len.is_none()
    }

    /// Bytes of the value in progress that are no longer in the buffer.
    pub(crate) fn frame_len(&self) -> usize {
        self.frame_len
    }

    /// Decodes the next complete value, consuming its bytes from `buf`.
    ///
    /// Returns `Ok(None)` once `buf` is exhausted without completing a value;
    /// call again with more bytes appended.
    pub(crate) fn decode(&mut self, buf: &mut BytesMut) -> ParseResult<Option<RespValue>> {
        'items: loop {
            let mut value = match self.next_item(buf)? {
                None => return Ok(None),
                Some(Item::Value(value)) => value,
                Some(Item::ArrayStart(count)) => {
                    // The declared count is untrusted; grow as elements arrive.
                    self.stack.push(PartialArray {
                        remaining: count,
                        elements: Vec::with_capacity(count.min(64)),
                    });
                    continue;
                }
            };

            while let Some(top) = self.stack.last_mut() {
                top.elements.push(value);
                top.remaining -= 1;
                if top.remaining > 0 {
                    continue 'items;
                }
                let elements = self.stack.pop().map(|a| a.elements).unwrap_or_default();
                value = RespValue::Array(elements);
            }

            self.frame_len = 0;
            return Ok(Some(value));
        }
    }

    fn next_item(&mut self, buf: &mut BytesMut) -> ParseResult<Option<Item>> {
        if let Some(length) = self.bulk_len {
            return self.bulk_payload(buf, length);
        }

        let Some(&tag) = buf.first() else {
            return Ok(None);
        };

        if !matches!(
            tag,
            prefix::SIMPLE_STRING
                | prefix::ERROR
                | prefix::INTEGER
                | prefix::BULK_STRING
                | prefix::ARRAY
        ) {
            return Err(ParseError::UnknownPrefix(tag));
        }

        let Some(line) = self.take_line(buf)? else {
            return Ok(None);
        };

        match tag {
            prefix::SIMPLE_STRING => Ok(Some(Item::Value(RespValue::SimpleString(line)))),
            prefix::ERROR => Ok(Some(Item::Value(RespValue::Error(line)))),
            prefix::INTEGER => Ok(Some(Item::Value(RespValue::Integer(parse_decimal(&line)?)))),
            prefix::BULK_STRING => self.bulk_header(buf, parse_decimal(&line)?),
            _ => self.array_header(parse_decimal(&line)?),
        }
    }

    /// Takes one CRLF-terminated line off `buf` and returns the text between
    /// the tag byte and the CRLF.
    fn take_line(&mut self, buf: &mut BytesMut) -> ParseResult<Option<Bytes>> {
        let max = self.limits.max_line_len;
        let start = self.scanned.max(1);

        let Some(pos) = find_crlf(&buf[start..]) else {
            // A trailing '\r' may be completed by the next read.
            self.scanned = buf.len().saturating_sub(1).max(1);

            // Tag, `max` bytes and CR are all here and still no LF.
            if buf.len() > max.saturating_add(2) {
                return Err(ParseError::LineTooLong { max });
            }
            return Ok(None);
        };

        let end = start + pos;
        if end - 1 > max {
            return Err(ParseError::LineTooLong { max });
        }

        self.scanned = 0;
        self.frame_len += end + 2;

        let mut line = buf.split_to(end + 2);
        line.truncate(end);
        line.advance(1);
        Ok(Some(line.freeze()))
    }

    fn bulk_header(&mut self, buf: &mut BytesMut, length: i64) -> ParseResult<Option<Item>> {
        if length == -1 {
            return Ok(Some(Item::Value(RespValue::Null)));
        }
        if length < 0 {
            return Err(ParseError::InvalidBulkLength(length));
        }

        let length = usize::try_from(length).unwrap_or(usize::MAX);
        if length > self.limits.max_bulk_len {
            return Err(ParseError::MessageTooLarge {
                size: length,
                max: self.limits.max_bulk_len,
            });
        }

        self.bulk_len = Some(length);
        self.bulk_payload(buf, length)
    }

    /// Takes `<data>\r\n` once all of it is buffered.
    fn bulk_payload(&mut self, buf: &mut BytesMut, length: usize) -> ParseResult<Option<Item>> {
        let total = length.saturating_add(2);
        if buf.len() < total {
            return Ok(None);
        }

        if &buf[length..total] != CRLF {
            return Err(ParseError::ProtocolError(
                "bulk string missing trailing CRLF".to_string(),
            ));
        }

        let data = buf.split_to(length).freeze();
        buf.advance(2);
        self.bulk_len = None;
        self.frame_len += total;

        Ok(Some(Item::Value(RespValue::BulkString(data))))
    }

    fn array_header(&mut self, count: i64) -> ParseResult<Option<Item>> {
        if count == -1 {
            return Ok(Some(Item::Value(RespValue::NullArray)));
        }
        if count < 0 {
            return Err(ParseError::InvalidArrayLength(count));
        }

        let count = usize::try_from(count).unwrap_or(usize::MAX);
        if count > self.limits.max_array_elements {
            return Err(ParseError::TooManyElements {
                count,
                max: self.limits.max_array_elements,
            });
        }
        if self.stack.len() >= self.limits.max_depth {
            return Err(ParseError::NestingTooDeep {
                max: self.limits.max_depth,
            });
        }

        if count == 0 {
            return Ok(Some(Item::Value(RespValue::Array(Vec::new()))));
        }
        Ok(Some(Item::ArrayStart(count)))
    }
}

/// Reads the signed decimal on a `:`, `$` or `*` line.
fn parse_decimal(line: &[u8]) -> ParseResult<i64> {
    let text =
        std::str::from_utf8(line).map_err(|e| ParseError::InvalidUtf8(e.to_string()))?;

    text.parse()
        .map_err(|e: ParseIntError| ParseError::InvalidInteger(format!("{:?}: {}", text, e)))
}

/// Finds the position of CRLF in the buffer.
///
/// Returns the position of `\r` if found, or None if CRLF is not present.
#[inline]
fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == CRLF)
}

/// Parses a single RESP message with default limits.
pub fn parse_message(buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
    RespParser::new().parse(buf)
}
