//! Incremental Request Parser
//!
//! Requests arrive as a single array of bulk strings. The parser walks the
//! frame structurally: it reads the element count, then for each element reads
//! the declared length and consumes exactly that many payload bytes. Nothing is
//! located by fixed offsets, so any valid frame decodes regardless of how the
//! bytes were split across socket reads.
//!
//! ## How the Parser Works
//!
//! The parser reads from a buffer and returns either:
//! - `Ok(Some((request, consumed)))` - A complete frame, `consumed` bytes were used
//! - `Ok(None)` - Need more data, the frame is incomplete
//! - `Err(ParseError)` - Invalid protocol data
//!
//! `consumed` covers the first frame only. Any bytes after it belong to the
//! next frame and are left for the caller.

use crate::protocol::types::{prefix, Request, CRLF};
use bytes::Bytes;
use thiserror::Error;

/// Errors that can occur while decoding a request frame.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    /// The buffer ended before the frame was complete
    #[error("incomplete frame")]
    Incomplete,

    /// A type prefix byte was not the one the frame layout requires
    #[error("expected '{expected}', got {found:#04x}")]
    UnexpectedByte { expected: char, found: u8 },

    /// A length line did not hold an integer
    #[error("invalid integer: {0}")]
    InvalidInteger(String),

    /// Array length is negative
    #[error("invalid array length: {0}")]
    InvalidArrayLength(i64),

    /// Bulk string length is negative
    #[error("invalid bulk string length: {0}")]
    InvalidBulkLength(i64),

    /// `*0\r\n` carries no command name
    #[error("empty command")]
    EmptyCommand,

    /// Payload was not followed by CRLF
    #[error("bulk string missing trailing CRLF")]
    MissingCrlf,

    /// A length header ran on without CRLF
    #[error("length header too long")]
    HeaderTooLong,

    /// The frame declares more data than we are willing to buffer
    #[error("message too large: {size} (max: {max})")]
    MessageTooLarge { size: usize, max: usize },
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Maximum size for a single bulk string (512 MB, same as Redis)
pub const MAX_BULK_SIZE: usize = 512 * 1024 * 1024;

/// Maximum number of elements in one request
pub const MAX_ARGS: usize = 1024 * 1024;

/// Longest length header we buffer while waiting for its CRLF.
/// Covers the prefix, a sign, every digit of an i64 and the CRLF itself.
const MAX_HEADER_LEN: usize = 24;

/// An incremental request parser.
///
/// # Example
///
/// ```
/// use quillkv::protocol::RespParser;
///
/// let mut parser = RespParser::new();
/// let buf = b"*2\r\n$3\r\nGET\r\n$4\r\nname\r\n";
///
/// let (request, consumed) = parser.parse(buf).unwrap().unwrap();
/// assert_eq!(consumed, buf.len());
/// assert_eq!(&request.command[..], b"GET");
/// ```
#[derive(Debug, Clone)]
pub struct RespParser {
    /// Largest bulk string accepted
    max_bulk_size: usize,
}

impl Default for RespParser {
    fn default() -> Self {
        Self::new()
    }
}

impl RespParser {
    /// Creates a new parser with the default bulk size limit.
    pub fn new() -> Self {
        Self {
            max_bulk_size: MAX_BULK_SIZE,
        }
    }

    /// Creates a parser that rejects bulk strings longer than `max`.
    pub fn with_max_bulk_size(max: usize) -> Self {
        Self { max_bulk_size: max }
    }

    /// Attempts to parse one request frame from the front of `buf`.
    pub fn parse(&mut self, buf: &[u8]) -> ParseResult<Option<(Request, usize)>> {
        if buf.is_empty() {
            return Ok(None);
        }

        let (count, mut consumed) = match read_length(buf, prefix::ARRAY)? {
            Some(header) => header,
            None => return Ok(None),
        };

        if count == 0 {
            return Err(ParseError::EmptyCommand);
        }
        if count < 0 {
            return Err(ParseError::InvalidArrayLength(count));
        }

        let count = count as usize;
        if count > MAX_ARGS {
            return Err(ParseError::MessageTooLarge {
                size: count,
                max: MAX_ARGS,
            });
        }

        // Never trust the declared count for the allocation
        let mut elements = Vec::with_capacity(count.min(16));

        for _ in 0..count {
            match self.parse_bulk_string(&buf[consumed..])? {
                Some((data, used)) => {
                    elements.push(data);
                    consumed += used;
                }
                None => return Ok(None),
            }
        }

        let mut elements = elements.into_iter();
        let command = elements.next().ok_or(ParseError::EmptyCommand)?;
        let request = Request {
            command,
            args: elements.collect(),
        };

        Ok(Some((request, consumed)))
    }

    /// Parses a bulk string: `$<length>\r\n<data>\r\n`
    fn parse_bulk_string(&self, buf: &[u8]) -> ParseResult<Option<(Bytes, usize)>> {
        let (length, data_start) = match read_length(buf, prefix::BULK_STRING)? {
            Some(header) => header,
            None => return Ok(None),
        };

        if length < 0 {
            return Err(ParseError::InvalidBulkLength(length));
        }

        let length = length as usize;
        if length > self.max_bulk_size {
            return Err(ParseError::MessageTooLarge {
                size: length,
                max: self.max_bulk_size,
            });
        }

        let total_needed = data_start + length + CRLF.len();
        if buf.len() < total_needed {
            return Ok(None);
        }

        if &buf[data_start + length..total_needed] != CRLF {
            return Err(ParseError::MissingCrlf);
        }

        let data = Bytes::copy_from_slice(&buf[data_start..data_start + length]);
        Ok(Some((data, total_needed)))
    }
}

/// Reads a `<prefix><integer>\r\n` header.
///
/// Returns the integer and the number of header bytes, or `None` if the CRLF
/// has not arrived yet.
fn read_length(buf: &[u8], expected: u8) -> ParseResult<Option<(i64, usize)>> {
    let found = match buf.first() {
        Some(&b) => b,
        None => return Ok(None),
    };
    if found != expected {
        return Err(ParseError::UnexpectedByte {
            expected: expected as char,
            found,
        });
    }

    let end = match find_crlf(&buf[1..]) {
        Some(pos) => pos,
        None if buf.len() > MAX_HEADER_LEN => return Err(ParseError::HeaderTooLong),
        None => return Ok(None),
    };

    let digits = &buf[1..1 + end];
    let n = std::str::from_utf8(digits)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| ParseError::InvalidInteger(String::from_utf8_lossy(digits).into_owned()))?;

    // prefix + digits + CRLF
    Ok(Some((n, 1 + end + CRLF.len())))
}

/// Finds the position of CRLF in the buffer.
///
/// Returns the position of `\r` if found, or None if CRLF is not present.
#[inline]
fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == CRLF)
}

/// Parses a single request frame from the front of `buf`.
pub fn parse_message(buf: &[u8]) -> ParseResult<Option<(Request, usize)>> {
    RespParser::new().parse(buf)
}

/// Decodes a buffer that must hold one complete frame.
///
/// Bytes after the first frame are ignored; an incomplete frame is an error.
pub fn decode(buf: &[u8]) -> ParseResult<Request> {
    match parse_message(buf)? {
        Some((request, _)) => Ok(request),
        None => Err(ParseError::Incomplete),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::types::Reply;

    #[test]
    fn test_parse_ping() {
        let input = b"*1\r\n$4\r\nPING\r\n";
        let (req, consumed) = parse_message(input).unwrap().unwrap();
        assert_eq!(req.command, Bytes::from("PING"));
        assert!(req.args.is_empty());
        assert_eq!(consumed, input.len());
    }

    #[test]
    fn test_parse_set_command() {
        let input = b"*3\r\n$3\r\nSET\r\n$8\r\nuser:101\r\n$4\r\nAlma\r\n";
        let req = decode(input).unwrap();
        assert_eq!(req, Request::new("SET", ["user:101", "Alma"]));
    }

    #[test]
    fn test_parse_multi_digit_lengths() {
        let value = "v".repeat(120);
        let frame = Request::new("SET", ["k".to_string(), value.clone()]).to_frame();
        let req = decode(&frame).unwrap();
        assert_eq!(req.args[1], Bytes::from(value));
    }

    #[test]
    fn test_parse_empty_bulk_string() {
        let req = decode(b"*2\r\n$4\r\nECHO\r\n$0\r\n\r\n").unwrap();
        assert_eq!(req.args, vec![Bytes::new()]);
    }

    #[test]
    fn test_binary_safe_bulk_string() {
        let req = decode(b"*2\r\n$4\r\nECHO\r\n$5\r\nhel\x00o\r\n").unwrap();
        assert_eq!(req.args[0], Bytes::from(&b"hel\x00o"[..]));
    }

    #[test]
    fn test_payload_may_contain_crlf() {
        // Lengths, not delimiters, decide where a payload ends
        let req = decode(b"*2\r\n$4\r\nECHO\r\n$4\r\na\r\nb\r\n").unwrap();
        assert_eq!(req.args[0], Bytes::from("a\r\nb"));
    }

    #[test]
    fn test_incomplete_frames() {
        let frame = b"*2\r\n$3\r\nGET\r\n$4\r\nname\r\n";
        for cut in 1..frame.len() {
            assert_eq!(
                parse_message(&frame[..cut]).unwrap(),
                None,
                "prefix of length {} should be incomplete",
                cut
            );
        }
        assert!(parse_message(b"").unwrap().is_none());
    }

    #[test]
    fn test_decode_incomplete_is_error() {
        assert_eq!(decode(b"*2\r\n$3\r\nGET\r\n"), Err(ParseError::Incomplete));
        assert_eq!(decode(b"*1\r\n$4\r\nPI"), Err(ParseError::Incomplete));
    }

    #[test]
    fn test_consumes_only_first_frame() {
        let first = Request::new("SET", ["k", "v"]).to_frame();
        let second = Request::new("GET", ["k"]).to_frame();
        let mut buf = first.clone();
        buf.extend_from_slice(&second[..7]);

        let (req, consumed) = parse_message(&buf).unwrap().unwrap();
        assert_eq!(req.command, Bytes::from("SET"));
        assert_eq!(consumed, first.len());
    }

    #[test]
    fn test_empty_array_is_malformed() {
        assert_eq!(decode(b"*0\r\n"), Err(ParseError::EmptyCommand));
    }

    #[test]
    fn test_negative_lengths_are_malformed() {
        assert_eq!(decode(b"*-1\r\n"), Err(ParseError::InvalidArrayLength(-1)));
        assert_eq!(
            decode(b"*1\r\n$-1\r\n"),
            Err(ParseError::InvalidBulkLength(-1))
        );
    }

    #[test]
    fn test_non_integer_length_is_malformed() {
        assert!(matches!(
            decode(b"*x\r\n"),
            Err(ParseError::InvalidInteger(_))
        ));
        assert!(matches!(
            decode(b"*1\r\n$four\r\nPING\r\n"),
            Err(ParseError::InvalidInteger(_))
        ));
    }

    #[test]
    fn test_wrong_prefix_is_malformed() {
        assert_eq!(
            decode(b"PING\r\n"),
            Err(ParseError::UnexpectedByte {
                expected: '*',
                found: b'P'
            })
        );
        assert_eq!(
            decode(b"*1\r\n+PING\r\n"),
            Err(ParseError::UnexpectedByte {
                expected: '$',
                found: b'+'
            })
        );
    }

    #[test]
    fn test_declared_length_mismatch_is_malformed() {
        // Declared 3 bytes, but 4 precede the CRLF
        assert_eq!(
            decode(b"*1\r\n$3\r\nPING\r\n"),
            Err(ParseError::MissingCrlf)
        );
    }

    #[test]
    fn test_header_without_crlf_is_bounded() {
        let input = b"*11111111111111111111111111111111";
        assert_eq!(parse_message(input), Err(ParseError::HeaderTooLong));
    }

    #[test]
    fn test_bulk_size_limit() {
        let mut parser = RespParser::with_max_bulk_size(4);
        assert_eq!(
            parser.parse(b"*1\r\n$5\r\n"),
            Err(ParseError::MessageTooLarge { size: 5, max: 4 })
        );
    }

    #[test]
    fn test_too_many_elements() {
        let input = format!("*{}\r\n", MAX_ARGS + 1);
        assert!(matches!(
            parse_message(input.as_bytes()),
            Err(ParseError::MessageTooLarge { .. })
        ));
    }

    #[test]
    fn test_echo_roundtrip() {
        for s in ["hello", "", "with spaces", "ünïcödé", "1234567890"] {
            let req = decode(&Request::new("ECHO", [s.to_string()]).to_frame()).unwrap();
            assert_eq!(req.args, vec![Bytes::from(s.to_string())]);
            assert_eq!(
                Reply::bulk_string(req.args[0].clone()).serialize(),
                Reply::bulk_string(s.to_string()).serialize()
            );
        }
    }
}
