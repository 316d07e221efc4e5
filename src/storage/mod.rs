//! Storage Module
//!
//! The in-memory keyspace with lazy TTL expiry.
//!
//! ## Features
//!
//! - **Single Lock**: One mutex guards the whole map; every operation is atomic
//! - **TTL Support**: Keys can carry an absolute deadline
//! - **Lazy Expiry**: Expired keys are removed by the read that finds them
//! - **Pluggable Clock**: Time comes from a [`Clock`] so tests control it
//!
//! ## Example
//!
//! ```
//! use quillkv::storage::StorageEngine;
//! use bytes::Bytes;
//! use std::time::Duration;
//!
//! let engine = StorageEngine::new();
//!
//! engine.set(Bytes::from("name"), Bytes::from("Alma"), None);
//! assert_eq!(engine.get(b"name"), Some(Bytes::from("Alma")));
//!
//! engine.set(
//!     Bytes::from("session"),
//!     Bytes::from("token123"),
//!     Some(Duration::from_secs(3600)),
//! );
//! ```

pub mod clock;
pub mod engine;

pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{Entry, StorageEngine, StorageStats};
