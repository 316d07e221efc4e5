//! Thread-Safe Storage Engine with Lazy Expiry
//!
//! This module implements the keyspace: a `HashMap` of byte-string keys to
//! entries with an optional deadline.
//!
//! ## Design Decisions
//!
//! 1. **One Lock**: The whole map sits behind a single `parking_lot::Mutex`.
//!    Every operation takes it exactly once, and it is never held across an
//!    `.await`, so a dropped connection cannot leave it locked.
//! 2. **Lazy Expiry**: A key past its deadline is removed by the `get` that
//!    notices it. There is no background sweep.
//! 3. **Injected Clock**: `now` comes from a [`Clock`], so expiry can be tested
//!    deterministically.
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │              StorageEngine               │
//! │  ┌────────────────────────────────────┐  │
//! │  │ Mutex<HashMap<Bytes, Entry>>       │  │
//! │  └────────────────────────────────────┘  │
//! │  Arc<dyn Clock>        atomic counters   │
//! └──────────────────────────────────────────┘
//! ```

use crate::storage::clock::{Clock, SystemClock};
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A stored value with its optional deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub value: Bytes,
    /// When this entry expires (None = never expires)
    pub expires_at: Option<Instant>,
}

impl Entry {
    /// Creates an entry. A TTL too large to represent as an `Instant` means
    /// the entry never expires.
    pub fn new(value: Bytes, ttl: Option<Duration>, now: Instant) -> Self {
        Self {
            value,
            expires_at: ttl.and_then(|ttl| now.checked_add(ttl)),
        }
    }

    /// An entry is expired once `now` reaches its deadline.
    #[inline]
    pub fn is_expired_at(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|exp| now >= exp)
    }
}

/// A snapshot of the engine's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StorageStats {
    pub keys: u64,
    pub get_count: u64,
    pub set_count: u64,
    pub hits: u64,
    pub misses: u64,
    pub expired_count: u64,
}

/// The keyspace shared by every connection.
///
/// # Example
///
/// ```
/// use quillkv::storage::StorageEngine;
/// use bytes::Bytes;
/// use std::time::Duration;
///
/// let engine = StorageEngine::new();
///
/// engine.set(Bytes::from("name"), Bytes::from("Alma"), None);
/// assert_eq!(engine.get(b"name"), Some(Bytes::from("Alma")));
///
/// engine.set(Bytes::from("session"), Bytes::from("abc123"), Some(Duration::from_secs(60)));
/// ```
pub struct StorageEngine {
    data: Mutex<HashMap<Bytes, Entry>>,
    clock: Arc<dyn Clock>,

    get_count: AtomicU64,
    set_count: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    expired_count: AtomicU64,
}

impl std::fmt::Debug for StorageEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageEngine")
            .field("keys", &self.len())
            .field("clock", &self.clock)
            .field("get_count", &self.get_count.load(Ordering::Relaxed))
            .field("set_count", &self.set_count.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for StorageEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageEngine {
    /// Creates an empty engine backed by the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Creates an empty engine that reads time from `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            data: Mutex::new(HashMap::new()),
            clock,
            get_count: AtomicU64::new(0),
            set_count: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            expired_count: AtomicU64::new(0),
        }
    }

    /// Stores `value` under `key`, replacing any previous entry and its TTL.
    ///
    /// With `ttl`, the entry expires at `now + ttl`; a zero TTL is already
    /// expired on the next read.
    pub fn set(&self, key: Bytes, value: Bytes, ttl: Option<Duration>) {
        self.set_count.fetch_add(1, Ordering::Relaxed);

        let entry = Entry::new(value, ttl, self.clock.now());
        self.data.lock().insert(key, entry);
    }

    /// Gets the value for a key.
    ///
    /// Returns `None` if the key doesn't exist or has expired. An expired
    /// entry is removed under the same lock acquisition that found it.
    pub fn get(&self, key: &[u8]) -> Option<Bytes> {
        self.get_count.fetch_add(1, Ordering::Relaxed);
        let now = self.clock.now();

        let value = {
            let mut data = self.data.lock();
            match data.get(key) {
                None => None,
                Some(entry) if entry.is_expired_at(now) => {
                    data.remove(key);
                    self.expired_count.fetch_add(1, Ordering::Relaxed);
                    None
                }
                Some(entry) => Some(entry.value.clone()),
            }
        };

        let counter = if value.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        value
    }

    /// Removes a key, expired or not.
    ///
    /// Returns `true` if an entry was removed.
    pub fn delete(&self, key: &[u8]) -> bool {
        self.data.lock().remove(key).is_some()
    }

    /// Number of stored entries, including expired ones nobody has read yet.
    pub fn len(&self) -> u64 {
        self.data.lock().len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.lock().is_empty()
    }

    pub fn stats(&self) -> StorageStats {
        StorageStats {
            keys: self.len(),
            get_count: self.get_count.load(Ordering::Relaxed),
            set_count: self.set_count.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            expired_count: self.expired_count.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::clock::ManualClock;

    fn engine_with_manual_clock() -> (StorageEngine, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        (StorageEngine::with_clock(clock.clone()), clock)
    }

    #[test]
    fn test_set_and_get() {
        let engine = StorageEngine::new();

        engine.set(Bytes::from("key"), Bytes::from("value"), None);
        assert_eq!(engine.get(b"key"), Some(Bytes::from("value")));
    }

    #[test]
    fn test_get_nonexistent() {
        let engine = StorageEngine::new();
        assert_eq!(engine.get(b"nonexistent"), None);
    }

    #[test]
    fn test_set_overwrites() {
        let engine = StorageEngine::new();

        engine.set(Bytes::from("key"), Bytes::from("one"), None);
        engine.set(Bytes::from("key"), Bytes::from("two"), None);
        assert_eq!(engine.get(b"key"), Some(Bytes::from("two")));
        assert_eq!(engine.len(), 1);
    }

    #[test]
    fn test_overwrite_clears_ttl() {
        let (engine, clock) = engine_with_manual_clock();

        engine.set(
            Bytes::from("key"),
            Bytes::from("v1"),
            Some(Duration::from_millis(10)),
        );
        engine.set(Bytes::from("key"), Bytes::from("v2"), None);

        clock.advance(Duration::from_secs(60));
        assert_eq!(engine.get(b"key"), Some(Bytes::from("v2")));
    }

    #[test]
    fn test_delete() {
        let engine = StorageEngine::new();

        engine.set(Bytes::from("key"), Bytes::from("value"), None);
        assert!(engine.delete(b"key"));
        assert_eq!(engine.get(b"key"), None);
        assert!(!engine.delete(b"key")); // Already deleted
    }

    #[test]
    fn test_expiry_is_lazy() {
        let (engine, clock) = engine_with_manual_clock();

        engine.set(
            Bytes::from("key"),
            Bytes::from("value"),
            Some(Duration::from_millis(100)),
        );

        clock.advance(Duration::from_millis(99));
        assert_eq!(engine.get(b"key"), Some(Bytes::from("value")));

        clock.advance(Duration::from_millis(1));
        // Still stored until someone reads it
        assert_eq!(engine.len(), 1);
        assert_eq!(engine.get(b"key"), None);
        assert_eq!(engine.len(), 0);
        assert_eq!(engine.stats().expired_count, 1);
    }

    #[test]
    fn test_zero_ttl() {
        let (engine, clock) = engine_with_manual_clock();

        engine.set(Bytes::from("key"), Bytes::from("value"), Some(Duration::ZERO));
        clock.advance(Duration::from_millis(1));

        assert_eq!(engine.get(b"key"), None);
        assert_eq!(engine.get(b"key"), None);
        assert!(engine.is_empty());
        // Removed once, not re-derived on the second read
        assert_eq!(engine.stats().expired_count, 1);
    }

    #[test]
    fn test_huge_ttl_never_expires() {
        let (engine, clock) = engine_with_manual_clock();

        engine.set(
            Bytes::from("key"),
            Bytes::from("value"),
            Some(Duration::from_millis(u64::MAX)),
        );
        clock.advance(Duration::from_secs(3600));
        assert_eq!(engine.get(b"key"), Some(Bytes::from("value")));
    }

    #[test]
    fn test_stats() {
        let engine = StorageEngine::new();

        engine.set(Bytes::from("a"), Bytes::from("1"), None);
        engine.get(b"a");
        engine.get(b"b");

        let stats = engine.stats();
        assert_eq!(stats.keys, 1);
        assert_eq!(stats.set_count, 1);
        assert_eq!(stats.get_count, 2);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_concurrent_access() {
        use std::thread;

        let engine = Arc::new(StorageEngine::new());
        let mut handles = vec![];

        for i in 0..10 {
            let engine = Arc::clone(&engine);
            handles.push(thread::spawn(move || {
                for j in 0..100 {
                    let key = format!("key-{}-{}", i, j);
                    engine.set(Bytes::from(key.clone()), Bytes::from("value"), None);
                    engine.get(key.as_bytes());
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(engine.len(), 1000);
    }

    #[test]
    fn test_concurrent_reads_are_never_torn() {
        use std::thread;

        let engine = Arc::new(StorageEngine::new());
        let a = Bytes::from("a".repeat(4096));
        let b = Bytes::from("b".repeat(4096));
        engine.set(Bytes::from("key"), a.clone(), None);

        let writer = {
            let engine = Arc::clone(&engine);
            let (a, b) = (a.clone(), b.clone());
            thread::spawn(move || {
                for i in 0..2000 {
                    let value = if i % 2 == 0 { b.clone() } else { a.clone() };
                    engine.set(Bytes::from("key"), value, None);
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let engine = Arc::clone(&engine);
                let (a, b) = (a.clone(), b.clone());
                thread::spawn(move || {
                    for _ in 0..2000 {
                        let value = engine.get(b"key").unwrap();
                        assert!(value == a || value == b);
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
    }
}
