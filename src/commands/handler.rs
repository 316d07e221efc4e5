//! Command Handler
//!
//! Receives decoded requests, validates arity and options, runs them against
//! the storage engine and returns the reply.
//!
//! ## Supported Commands
//!
//! - `PING [message]` - Test connection
//! - `ECHO message` - Echo message
//! - `SET key value [PX milliseconds]` - Set a key, optionally with a TTL
//! - `GET key` - Get a key's value
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     CommandHandler                          │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐     │
//! │  │  decode()   │───>│ dispatch()  │───>│  encode()   │     │
//! │  └─────────────┘    └──────┬──────┘    └─────────────┘     │
//! │                            │                                │
//! │                            ▼                                │
//! │                      StorageEngine                          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every handler checks its argument count before it touches the store, so
//! a rejected command never leaves a partial write behind.

use crate::protocol::{decode, ParseError, Reply, Request};
use crate::storage::StorageEngine;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors a command can fail with. Each one is sent back to the client as an
/// error reply; none of them closes the connection.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("ERR wrong number of arguments for '{0}' command")]
    WrongArity(String),

    #[error("ERR syntax error")]
    Syntax,

    #[error("ERR value is not an integer or out of range")]
    NotAnInteger,

    #[error("ERR invalid expire time in '{0}' command")]
    InvalidExpireTime(String),

    #[error("ERR unknown command '{0}'")]
    UnknownCommand(String),
}

impl From<CommandError> for Reply {
    fn from(err: CommandError) -> Self {
        Reply::error(err.to_string())
    }
}

pub type CommandResult = Result<Reply, CommandError>;

/// Dispatches requests to the appropriate handlers.
#[derive(Debug, Clone)]
pub struct CommandHandler {
    storage: Arc<StorageEngine>,
}

impl CommandHandler {
    /// Creates a new command handler with the given storage engine.
    pub fn new(storage: Arc<StorageEngine>) -> Self {
        Self { storage }
    }

    /// Decodes one frame, executes it and encodes the reply.
    ///
    /// A malformed frame has no well-defined reply, so it is returned as an
    /// error for the caller to close the connection on.
    ///
    /// # Example
    ///
    /// ```
    /// use quillkv::commands::CommandHandler;
    /// use quillkv::storage::StorageEngine;
    /// use std::sync::Arc;
    ///
    /// let handler = CommandHandler::new(Arc::new(StorageEngine::new()));
    /// assert_eq!(handler.handle(b"*1\r\n$4\r\nPING\r\n").unwrap(), b"+PONG\r\n");
    /// assert!(handler.handle(b"*0\r\n").is_err());
    /// ```
    pub fn handle(&self, frame: &[u8]) -> Result<Vec<u8>, ParseError> {
        let request = decode(frame)?;
        Ok(self.execute(&request).serialize())
    }

    /// Executes a request and returns the reply, turning command errors into
    /// error replies.
    pub fn execute(&self, request: &Request) -> Reply {
        self.dispatch(request).unwrap_or_else(Reply::from)
    }

    /// Dispatches a request to its handler.
    pub fn dispatch(&self, request: &Request) -> CommandResult {
        let name = request.command_name();
        let args = &request.args[..];

        match name.as_str() {
            "ping" => cmd_ping(args),
            "echo" => cmd_echo(args),
            "set" => self.cmd_set(args),
            "get" => self.cmd_get(args),
            _ => Err(CommandError::UnknownCommand(printable(&request.command))),
        }
    }

    /// SET key value [PX milliseconds]
    fn cmd_set(&self, args: &[Bytes]) -> CommandResult {
        let ttl = match args.len() {
            0 | 1 => return Err(CommandError::WrongArity("set".to_string())),
            2 => None,
            4 if args[2].eq_ignore_ascii_case(b"px") => Some(parse_px(&args[3])?),
            _ => return Err(CommandError::Syntax),
        };

        self.storage.set(args[0].clone(), args[1].clone(), ttl);
        Ok(Reply::ok())
    }

    /// GET key
    fn cmd_get(&self, args: &[Bytes]) -> CommandResult {
        let [key] = args else {
            return Err(CommandError::WrongArity("get".to_string()));
        };

        Ok(match self.storage.get(key) {
            Some(value) => Reply::bulk_string(value),
            None => Reply::null(),
        })
    }
}

/// PING [message]
fn cmd_ping(args: &[Bytes]) -> CommandResult {
    match args {
        [] => Ok(Reply::pong()),
        [message] => Ok(Reply::simple_string(printable(message))),
        _ => Err(CommandError::WrongArity("ping".to_string())),
    }
}

/// ECHO message
fn cmd_echo(args: &[Bytes]) -> CommandResult {
    match args {
        [message] => Ok(Reply::bulk_string(message.clone())),
        _ => Err(CommandError::WrongArity("echo".to_string())),
    }
}

/// Parses the PX argument: a non-negative number of milliseconds.
fn parse_px(raw: &[u8]) -> Result<Duration, CommandError> {
    let ms: i64 = std::str::from_utf8(raw)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or(CommandError::NotAnInteger)?;

    if ms < 0 {
        return Err(CommandError::InvalidExpireTime("set".to_string()));
    }

    Ok(Duration::from_millis(ms as u64))
}

/// Renders client-supplied bytes for a single-line reply. CR and LF would
/// break the reply framing, so they become spaces.
fn printable(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).replace(|c: char| c == '\r' || c == '\n', " ")
}
