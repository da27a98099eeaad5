//! Stored Values
//!
//! An [`Entry`] is what the storage engine keeps under one key: a typed
//! [`Value`] plus an optional expiry instant.
//!
//! The kind of an entry is fixed when it is created. Commands that need a
//! different kind at the same key replace the whole entry instead of
//! converting it in place.

use bytes::Bytes;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::time::{Duration, Instant};

/// The payload of an entry. Exactly one kind per entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(Bytes),
    /// Deque for O(1) push/pop on both ends
    List(VecDeque<Bytes>),
    Set(HashSet<Bytes>),
    Hash(HashMap<Bytes, Bytes>),
    /// Member to score. No command creates one yet.
    SortedSet(HashMap<Bytes, f64>),
}

/// The kind tag of a [`Value`], as reported by `TYPE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    String,
    List,
    Set,
    Hash,
    SortedSet,
}

impl ValueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::String => "string",
            ValueKind::List => "list",
            ValueKind::Set => "set",
            ValueKind::Hash => "hash",
            ValueKind::SortedSet => "zset",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::String(_) => ValueKind::String,
            Value::List(_) => ValueKind::List,
            Value::Set(_) => ValueKind::Set,
            Value::Hash(_) => ValueKind::Hash,
            Value::SortedSet(_) => ValueKind::SortedSet,
        }
    }

    /// True for a collection with no elements.
    ///
    /// Strings are never empty in this sense; `SET k ""` is a live key.
    pub fn is_empty_collection(&self) -> bool {
        match self {
            Value::String(_) => false,
            Value::List(list) => list.is_empty(),
            Value::Set(set) => set.is_empty(),
            Value::Hash(hash) => hash.is_empty(),
            Value::SortedSet(zset) => zset.is_empty(),
        }
    }
}

/// Represents a stored value with optional expiry time.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    /// The actual value stored
    pub value: Value,
    /// When this entry expires (None = never expires)
    pub expires_at: Option<Instant>,
}

impl Entry {
    /// Creates a new entry without expiry.
    pub fn new(value: Value) -> Self {
        Self {
            value,
            expires_at: None,
        }
    }

    pub fn string(data: impl Into<Bytes>) -> Self {
        Self::new(Value::String(data.into()))
    }

    pub fn list() -> Self {
        Self::new(Value::List(VecDeque::new()))
    }

    pub fn set() -> Self {
        Self::new(Value::Set(HashSet::new()))
    }

    pub fn hash() -> Self {
        Self::new(Value::Hash(HashMap::new()))
    }

    /// Returns the entry with its expiry set `ttl` from now.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.expires_at = Some(Instant::now() + ttl);
        self
    }

    pub fn with_expiry_at(mut self, at: Instant) -> Self {
        self.expires_at = Some(at);
        self
    }

    pub fn kind(&self) -> ValueKind {
        self.value.kind()
    }

    /// Checks if this entry has expired.
    #[inline]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    #[inline]
    pub fn is_expired_at(&self, now: Instant) -> bool {
        self.expires_at.map(|exp| now >= exp).unwrap_or(false)
    }

    /// Returns the remaining TTL in milliseconds, or None if no expiry.
    pub fn ttl_ms(&self) -> Option<u64> {
        self.expires_at.map(|exp| {
            let now = Instant::now();
            if now >= exp {
                0
            } else {
                (exp - now).as_millis() as u64
            }
        })
    }

    pub fn as_string(&self) -> Option<&Bytes> {
        match &self.value {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&VecDeque<Bytes>> {
        match &self.value {
            Value::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_list_mut(&mut self) -> Option<&mut VecDeque<Bytes>> {
        match &mut self.value {
            Value::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_set(&self) -> Option<&HashSet<Bytes>> {
        match &self.value {
            Value::Set(set) => Some(set),
            _ => None,
        }
    }

    pub fn as_set_mut(&mut self) -> Option<&mut HashSet<Bytes>> {
        match &mut self.value {
            Value::Set(set) => Some(set),
            _ => None,
        }
    }

    pub fn as_hash(&self) -> Option<&HashMap<Bytes, Bytes>> {
        match &self.value {
            Value::Hash(hash) => Some(hash),
            _ => None,
        }
    }

    pub fn as_hash_mut(&mut self) -> Option<&mut HashMap<Bytes, Bytes>> {
        match &mut self.value {
            Value::Hash(hash) => Some(hash),
            _ => None,
        }
    }
}
