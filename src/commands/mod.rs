//! Command Module
//!
//! This module implements the command processing layer.
//! It receives decoded requests, executes them against the storage engine,
//! and returns typed replies.
//!
//! ```text
//! Client Request
//!       │
//!       ▼
//! ┌─────────────────┐
//! │ Request Parser  │  (protocol module)
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ CommandHandler  │  (this module)
//! │                 │
//! │  - Validate     │
//! │  - Dispatch     │
//! │  - Execute      │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ StorageEngine   │  (storage module)
//! └─────────────────┘
//! ```

pub mod handler;

pub use handler::{CommandError, CommandHandler, CommandResult};
