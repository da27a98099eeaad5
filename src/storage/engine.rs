//! Thread-Safe Storage Engine with Lazy Expiry
//!
//! Maps keys to typed [`Entry`] values. Every operation touches exactly one
//! key, so each operation runs inside one critical section of the shard that
//! owns the key.
//!
//! ## Design Decisions
//!
//! 1. **Sharded Locks**: keys are spread across independent `RwLock`ed maps
//!    to reduce contention between unrelated keys.
//! 2. **Lazy Expiry**: an expired entry is removed the first time an accessor
//!    sees it. There is no background sweep.
//! 3. **Closures for read-modify-write**: [`StorageEngine::update`] runs a
//!    whole command's mutation under one write lock, so concurrent pushes to
//!    the same list never lose an element.
//!
//! ## Concurrency Model
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     StorageEngine                           │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐           │
//! │  │ Shard 0 │ │ Shard 1 │ │ Shard 2 │ │ Shard N │           │
//! │  │ RwLock  │ │ RwLock  │ │ RwLock  │ │ RwLock  │           │
//! │  │ HashMap │ │ HashMap │ │ HashMap │ │ HashMap │           │
//! │  └─────────┘ └─────────┘ └─────────┘ └─────────┘           │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use crate::storage::entry::Entry;
use bytes::Bytes;
use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Number of shards for the storage engine.
const NUM_SHARDS: usize = 64;

/// A typed operation found a different kind of value at the key.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("WRONGTYPE Operation against a key holding the wrong kind of value")]
pub struct WrongType;

/// Result type for typed storage operations.
pub type StorageResult<T> = Result<T, WrongType>;

type ShardMap = HashMap<Bytes, Entry>;

/// A single shard containing a portion of the keyspace.
#[derive(Debug, Default)]
struct Shard {
    data: RwLock<ShardMap>,
}

impl Shard {
    // Every critical section leaves the map consistent, so a panic in another
    // holder does not invalidate the data.
    fn read(&self) -> RwLockReadGuard<'_, ShardMap> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ShardMap> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The keyspace shared by every client connection.
///
/// Wrap it in an `Arc` and hand a clone to each connection task.
///
/// # Example
///
/// ```
/// use emberkv::storage::StorageEngine;
/// use bytes::Bytes;
///
/// let engine = StorageEngine::new();
///
/// engine.set_string(Bytes::from("color"), Bytes::from("blue"));
/// assert_eq!(engine.get_string(b"color"), Some(Bytes::from("blue")));
///
/// engine.lpush(Bytes::from("queue"), vec![Bytes::from("job")]).unwrap();
/// assert_eq!(engine.key_type(b"queue"), "list");
/// assert!(engine.get_string(b"queue").is_none());
/// ```
pub struct StorageEngine {
    shards: Vec<Shard>,

    /// Statistics: read accesses
    get_count: AtomicU64,

    /// Statistics: writes (installs and in-place updates)
    set_count: AtomicU64,

    /// Statistics: explicit deletions
    del_count: AtomicU64,

    /// Statistics: entries removed because they were found expired
    expired_count: AtomicU64,
}

impl std::fmt::Debug for StorageEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageEngine")
            .field("shards", &self.shards.len())
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
    /// Creates an empty storage engine.
    pub fn new() -> Self {
        let shards = (0..NUM_SHARDS).map(|_| Shard::default()).collect();

        Self {
            shards,
            get_count: AtomicU64::new(0),
            set_count: AtomicU64::new(0),
            del_count: AtomicU64::new(0),
            expired_count: AtomicU64::new(0),
        }
    }

    #[inline]
    fn shard_index(&self, key: &[u8]) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() as usize) % NUM_SHARDS
    }

    #[inline]
    fn get_shard(&self, key: &[u8]) -> &Shard {
        &self.shards[self.shard_index(key)]
    }

    fn record_expired(&self) {
        self.expired_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Runs `f` against the live entry at `key`.
    ///
    /// Returns `None` if the key is absent or expired. The fast path holds
    /// only the read lock. When the entry turns out to be expired the read
    /// lock is released, the write lock taken, and expiry checked again
    /// before removing anything: a writer may have replaced the key in
    /// between, in which case the fresh entry is used.
    pub fn read<T>(&self, key: &[u8], f: impl FnOnce(&Entry) -> T) -> Option<T> {
        self.get_count.fetch_add(1, Ordering::Relaxed);

        let shard = self.get_shard(key);

        {
            let data = shard.read();
            match data.get(key) {
                Some(entry) if !entry.is_expired() => return Some(f(entry)),
                Some(_) => {}
                None => return None,
            }
        }

        let mut data = shard.write();
        match data.get(key) {
            Some(entry) if entry.is_expired() => {
                data.remove(key);
                self.record_expired();
                None
            }
            Some(entry) => Some(f(entry)),
            None => None,
        }
    }

    /// Runs a read-modify-write on `key` under one write lock.
    ///
    /// `f` sees `None` when the key is absent or expired (the expired entry
    /// is already gone). Whatever `f` leaves in the slot is stored back,
    /// except that `None` or an empty collection removes the key.
    pub fn update<T>(&self, key: &Bytes, f: impl FnOnce(&mut Option<Entry>) -> T) -> T {
        self.set_count.fetch_add(1, Ordering::Relaxed);

        let shard = self.get_shard(key);
        let mut data = shard.write();

        let mut slot = data.remove(key);
        if slot.as_ref().is_some_and(Entry::is_expired) {
            self.record_expired();
            slot = None;
        }

        let result = f(&mut slot);

        if let Some(entry) = slot {
            if !entry.value.is_empty_collection() {
                data.insert(key.clone(), entry);
            }
        }

        result
    }

    /// Returns the value of a string key.
    ///
    /// `None` if the key is absent, expired, or holds another kind. Type
    /// errors are the command layer's business; use [`get_entry`] to tell
    /// the cases apart.
    ///
    /// [`get_entry`]: StorageEngine::get_entry
    pub fn get_string(&self, key: &[u8]) -> Option<Bytes> {
        self.read(key, |entry| entry.as_string().cloned()).flatten()
    }

    /// Returns a copy of the full entry, whatever its kind.
    pub fn get_entry(&self, key: &[u8]) -> Option<Entry> {
        self.read(key, Entry::clone)
    }

    /// Installs a string, replacing any previous entry and its expiry.
    pub fn set_string(&self, key: Bytes, value: Bytes) {
        self.set_entry(key, Entry::string(value));
    }

    /// Installs `entry` at `key`, replacing whatever was there.
    ///
    /// An empty collection is never stored; the key is removed instead.
    pub fn set_entry(&self, key: Bytes, entry: Entry) {
        self.set_count.fetch_add(1, Ordering::Relaxed);

        let shard = self.get_shard(&key);
        let mut data = shard.write();

        if entry.value.is_empty_collection() {
            data.remove(&key);
        } else {
            data.insert(key, entry);
        }
    }

    /// Deletes a key.
    ///
    /// Returns `true` if a live key was removed. An expired entry is removed
    /// too, but reported as absent.
    pub fn delete(&self, key: &[u8]) -> bool {
        self.del_count.fetch_add(1, Ordering::Relaxed);

        let shard = self.get_shard(key);
        let mut data = shard.write();

        match data.remove(key) {
            Some(entry) if entry.is_expired() => {
                self.record_expired();
                false
            }
            Some(_) => true,
            None => false,
        }
    }

    /// Checks if a key exists (and is not expired).
    pub fn exists(&self, key: &[u8]) -> bool {
        self.read(key, |_| ()).is_some()
    }

    /// Returns the kind stored at a key, or `"none"`.
    pub fn key_type(&self, key: &[u8]) -> &'static str {
        self.read(key, |entry| entry.kind())
            .map(|kind| kind.as_str())
            .unwrap_or("none")
    }

    /// Sets an expiry on an existing key.
    ///
    /// Returns `false` if the key doesn't exist, or if `ttl` reaches past
    /// what the clock can represent.
    pub fn expire(&self, key: &Bytes, ttl: Duration) -> bool {
        match Instant::now().checked_add(ttl) {
            Some(at) => self.expire_at(key, at),
            None => false,
        }
    }

    /// Sets an absolute expiry instant on an existing key.
    pub fn expire_at(&self, key: &Bytes, at: Instant) -> bool {
        self.update(key, |slot| match slot {
            Some(entry) => {
                entry.expires_at = Some(at);
                true
            }
            None => false,
        })
    }

    /// Removes the expiry from a key.
    ///
    /// Returns `true` only if the key existed and had an expiry.
    pub fn persist(&self, key: &Bytes) -> bool {
        self.update(key, |slot| match slot {
            Some(entry) => entry.expires_at.take().is_some(),
            None => false,
        })
    }

    /// Remaining TTL in milliseconds.
    ///
    /// - `Some(ms)` if the key exists and has an expiry
    /// - `Some(-1)` if the key exists but has no expiry
    /// - `None` if the key doesn't exist
    pub fn pttl(&self, key: &[u8]) -> Option<i64> {
        self.read(key, |entry| entry.ttl_ms().map(|ms| ms as i64).unwrap_or(-1))
    }

    /// Remaining TTL in seconds, rounded to the nearest second.
    pub fn ttl(&self, key: &[u8]) -> Option<i64> {
        self.pttl(key)
            .map(|ms| if ms < 0 { ms } else { (ms + 500) / 1000 })
    }

    /// Clears all data from the database.
    pub fn flush(&self) {
        for shard in &self.shards {
            shard.write().clear();
        }
    }

    /// Number of stored entries.
    ///
    /// Counts expired entries that no accessor has observed yet.
    pub fn len(&self) -> usize {
        self.shards.iter().map(|shard| shard.read().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns operation counters.
    pub fn stats(&self) -> StorageStats {
        StorageStats {
            keys: self.len(),
            get_ops: self.get_count.load(Ordering::Relaxed),
            set_ops: self.set_count.load(Ordering::Relaxed),
            del_ops: self.del_count.load(Ordering::Relaxed),
            expired: self.expired_count.load(Ordering::Relaxed),
        }
    }
}

/// Database statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageStats {
    /// Number of entries currently stored
    pub keys: usize,
    pub get_ops: u64,
    pub set_ops: u64,
    pub del_ops: u64,
    /// Entries removed by lazy expiry
    pub expired: u64,
}
