//! # quillkv - A Small In-Memory Key-Value Server
//!
//! quillkv speaks a Redis-compatible request/response protocol over TCP.
//! Clients send commands as arrays of bulk strings; the server decodes each
//! request, runs it against an in-memory keyspace and writes back a reply in
//! the same wire format.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                             quillkv                              │
//! │                                                                  │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐           │
//! │  │ TCP Server  │───>│ Connection  │───>│  Command    │           │
//! │  │ (Listener)  │    │  Handler    │    │  Handler    │           │
//! │  └─────────────┘    └──────┬──────┘    └──────┬──────┘           │
//! │                            │                  │                  │
//! │                            ▼                  ▼                  │
//! │                     ┌─────────────┐    ┌──────────────────────┐  │
//! │                     │   Request   │    │    StorageEngine     │  │
//! │                     │   Parser    │    │ Mutex<HashMap> + TTL │  │
//! │                     └─────────────┘    └──────────────────────┘  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use quillkv::commands::CommandHandler;
//! use quillkv::connection::{handle_connection, ConnectionStats, DEFAULT_MAX_FRAME_SIZE};
//! use quillkv::storage::StorageEngine;
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() {
//!     let storage = Arc::new(StorageEngine::new());
//!     let stats = Arc::new(ConnectionStats::new());
//!     let listener = TcpListener::bind("127.0.0.1:6379").await.unwrap();
//!
//!     loop {
//!         let (stream, addr) = listener.accept().await.unwrap();
//!         let handler = CommandHandler::new(Arc::clone(&storage));
//!         let stats = Arc::clone(&stats);
//!
//!         tokio::spawn(handle_connection(stream, addr, handler, stats, DEFAULT_MAX_FRAME_SIZE));
//!     }
//! }
//! ```
//!
//! ## Supported Commands
//!
//! - `PING [message]`
//! - `ECHO message`
//! - `SET key value [PX milliseconds]`
//! - `GET key`
//!
//! Command names are case-insensitive. Anything else is answered with
//! `-ERR unknown command '<name>'`.
//!
//! ## Module Overview
//!
//! - [`protocol`]: request decoding and reply encoding
//! - [`storage`]: the keyspace with lazy TTL expiry
//! - [`commands`]: arity checks and dispatch
//! - [`connection`]: per-client read/execute/write loop
//! - [`config`]: command-line and environment settings

pub mod commands;
pub mod config;
pub mod connection;
pub mod protocol;
pub mod storage;

pub use commands::{CommandError, CommandHandler};
pub use config::Config;
pub use connection::{handle_connection, ConnectionStats};
pub use protocol::{decode, encode, ParseError, Reply, Request, RespParser};
pub use storage::{StorageEngine, StorageStats};

/// The default port (same as Redis)
pub const DEFAULT_PORT: u16 = 6379;

/// The default host to bind to
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Version of quillkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
