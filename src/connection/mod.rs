//! Connection Handler Module
//!
//! This module manages individual client connections.
//! Each client connection is handled by its own async task, so one slow or
//! misbehaving client never holds up the others.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     TCP Listener                            │
//! │                    (main.rs)                                │
//! └──────────────────────┬──────────────────────────────────────┘
//!                        │ accept() + spawn
//!                        ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 ConnectionHandler                           │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐     │
//! │  │ Read frame  │───>│ Decode      │───>│ Execute cmd │     │
//! │  └─────────────┘    └─────────────┘    └──────┬──────┘     │
//! │         ▲                                      │            │
//! │         │            ┌─────────────┐           │            │
//! │         └────────────│ Send reply  │<──────────┘            │
//! │                      └─────────────┘                        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use quillkv::connection::{handle_connection, ConnectionStats, DEFAULT_MAX_FRAME_SIZE};
//! use quillkv::commands::CommandHandler;
//! use quillkv::storage::StorageEngine;
//! use std::sync::Arc;
//!
//! let storage = Arc::new(StorageEngine::new());
//! let stats = Arc::new(ConnectionStats::new());
//! let handler = CommandHandler::new(storage);
//!
//! let (stream, addr) = listener.accept().await?;
//! tokio::spawn(handle_connection(stream, addr, handler, stats, DEFAULT_MAX_FRAME_SIZE));
//! ```

pub mod handler;

pub use handler::{
    handle_connection, ConnectionError, ConnectionHandler, ConnectionStats, DEFAULT_MAX_FRAME_SIZE,
};
