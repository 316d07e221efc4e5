//! Wire Types
//!
//! This module defines the two values that cross the wire: the [`Request`]
//! a client sends and the [`Reply`] the server answers with.
//!
//! ## Protocol Format
//!
//! Requests are always an array of bulk strings:
//!
//! ```text
//! *<N>\r\n
//! $<len>\r\n<payload>\r\n     (repeated N times)
//! ```
//!
//! Replies use one of four encodings:
//! - Simple String: `+OK\r\n`
//! - Error: `-ERR unknown command 'foo'\r\n`
//! - Bulk String: `$5\r\nhello\r\n`
//! - Null Bulk String: `$-1\r\n`

use bytes::Bytes;
use std::fmt;

/// The CRLF terminator used in the protocol
pub const CRLF: &[u8] = b"\r\n";

/// Protocol type prefixes
pub mod prefix {
    pub const SIMPLE_STRING: u8 = b'+';
    pub const ERROR: u8 = b'-';
    pub const BULK_STRING: u8 = b'$';
    pub const ARRAY: u8 = b'*';
}

/// A decoded client request.
///
/// The command name is kept exactly as the client sent it; matching is
/// case-insensitive and happens at dispatch time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// First element of the frame
    pub command: Bytes,
    /// Remaining elements, in order
    pub args: Vec<Bytes>,
}

impl Request {
    /// Creates a request from a command name and its arguments.
    ///
    /// # Example
    /// ```
    /// use quillkv::protocol::Request;
    /// let req = Request::new("GET", ["name"]);
    /// assert_eq!(req.args.len(), 1);
    /// ```
    pub fn new<C, I, A>(command: C, args: I) -> Self
    where
        C: Into<Bytes>,
        I: IntoIterator<Item = A>,
        A: Into<Bytes>,
    {
        Self {
            command: command.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the command name lowercased, for dispatch and error messages.
    pub fn command_name(&self) -> String {
        String::from_utf8_lossy(&self.command).to_ascii_lowercase()
    }

    /// Encodes the request as an array-of-bulk-strings frame.
    ///
    /// # Example
    /// ```
    /// use quillkv::protocol::Request;
    /// let frame = Request::new("ECHO", ["hi"]).to_frame();
    /// assert_eq!(frame, b"*2\r\n$4\r\nECHO\r\n$2\r\nhi\r\n");
    /// ```
    pub fn to_frame(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.push(prefix::ARRAY);
        buf.extend_from_slice((self.args.len() + 1).to_string().as_bytes());
        buf.extend_from_slice(CRLF);
        for element in std::iter::once(&self.command).chain(self.args.iter()) {
            write_bulk(&mut buf, element);
        }
        buf
    }
}

/// A typed reply produced by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Status text without CRLF.
    /// Format: `+<string>\r\n`
    SimpleString(String),

    /// Binary-safe payload.
    /// Format: `$<length>\r\n<data>\r\n`
    BulkString(Bytes),

    /// Null bulk string: `$-1\r\n`
    Null,

    /// Error message, conventionally starting with `ERR`.
    /// Format: `-<error message>\r\n`
    Error(String),
}

impl Reply {
    /// Creates a new simple string reply.
    pub fn simple_string(s: impl Into<String>) -> Self {
        Reply::SimpleString(s.into())
    }

    /// Creates a new bulk string reply.
    ///
    /// # Example
    /// ```
    /// use quillkv::protocol::Reply;
    /// let bulk = Reply::bulk_string("hello");
    /// assert_eq!(bulk.serialize(), b"$5\r\nhello\r\n");
    /// ```
    pub fn bulk_string(data: impl Into<Bytes>) -> Self {
        Reply::BulkString(data.into())
    }

    /// Creates a null reply.
    pub fn null() -> Self {
        Reply::Null
    }

    /// Creates a new error reply.
    pub fn error(s: impl Into<String>) -> Self {
        Reply::Error(s.into())
    }

    pub fn ok() -> Self {
        Reply::SimpleString("OK".to_string())
    }

    pub fn pong() -> Self {
        Reply::SimpleString("PONG".to_string())
    }

    /// Serializes the reply to its wire format.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.serialize_into(&mut buf);
        buf
    }

    /// Serializes the reply into an existing buffer.
    pub fn serialize_into(&self, buf: &mut Vec<u8>) {
        match self {
            Reply::SimpleString(s) => {
                buf.push(prefix::SIMPLE_STRING);
                buf.extend_from_slice(s.as_bytes());
                buf.extend_from_slice(CRLF);
            }
            Reply::BulkString(data) => write_bulk(buf, data),
            Reply::Null => {
                buf.push(prefix::BULK_STRING);
                buf.extend_from_slice(b"-1");
                buf.extend_from_slice(CRLF);
            }
            Reply::Error(msg) => {
                buf.push(prefix::ERROR);
                buf.extend_from_slice(msg.as_bytes());
                buf.extend_from_slice(CRLF);
            }
        }
    }
}

/// Encodes a reply. Shorthand for [`Reply::serialize`].
pub fn encode(reply: &Reply) -> Vec<u8> {
    reply.serialize()
}

fn write_bulk(buf: &mut Vec<u8>, data: &[u8]) {
    buf.push(prefix::BULK_STRING);
    buf.extend_from_slice(data.len().to_string().as_bytes());
    buf.extend_from_slice(CRLF);
    buf.extend_from_slice(data);
    buf.extend_from_slice(CRLF);
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::SimpleString(s) => write!(f, "{}", s),
            Reply::BulkString(data) => match std::str::from_utf8(data) {
                Ok(s) => write!(f, "\"{}\"", s),
                Err(_) => write!(f, "(binary data, {} bytes)", data.len()),
            },
            Reply::Null => write!(f, "(nil)"),
            Reply::Error(s) => write!(f, "(error) {}", s),
        }
    }
}
