//! RESP Protocol Implementation
//!
//! The wire codec: a value model, a buffer parser, and async stream
//! reader/writer wrappers around them.
//!
//! ## Modules
//!
//! - `types`: the `RespValue` enum and its serialization
//! - `parser`: bounded parser for incoming RESP data
//! - `codec`: `RespReader` / `RespWriter` over async byte streams
//!
//! ## Example
//!
//! ```
//! use emberkv::protocol::{parse_message, RespValue};
//! use bytes::Bytes;
//!
//! let data = b"*2\r\n$3\r\nGET\r\n$4\r\nname\r\n";
//! let (value, consumed) = parse_message(data).unwrap().unwrap();
//! assert_eq!(consumed, data.len());
//! assert_eq!(value, RespValue::command(["GET", "name"]));
//!
//! let response = RespValue::bulk_string(Bytes::from("blue"));
//! assert_eq!(response.serialize(), b"$4\r\nblue\r\n");
//! ```

pub mod codec;
pub mod parser;
pub mod types;

pub use codec::{ReadError, RespReader, RespWriter};
pub use parser::{parse_message, ParseError, ParseResult, ProtocolLimits, RespParser};
pub use types::RespValue;
