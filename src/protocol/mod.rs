//! Wire Protocol
//!
//! Requests are arrays of bulk strings; replies are simple strings, bulk
//! strings, nulls or errors.
//!
//! ## Modules
//!
//! - `types`: `Request` and `Reply`, plus reply encoding
//! - `parser`: incremental frame decoder
//!
//! ## Example
//!
//! ```
//! use quillkv::protocol::{decode, encode, Reply};
//!
//! let request = decode(b"*2\r\n$3\r\nGET\r\n$4\r\nname\r\n").unwrap();
//! assert_eq!(request.command_name(), "get");
//!
//! assert_eq!(encode(&Reply::bulk_string("Alma")), b"$4\r\nAlma\r\n");
//! ```

pub mod parser;
pub mod types;

pub use parser::{decode, parse_message, ParseError, ParseResult, RespParser};
pub use types::{encode, Reply, Request};
