//! Set operations on the storage engine.

use crate::storage::engine::{StorageEngine, StorageResult, WrongType};
use crate::storage::entry::Entry;
use bytes::Bytes;

impl StorageEngine {
    /// Adds members to a set, creating it if needed.
    ///
    /// # Returns
    /// How many members were not already present.
    pub fn sadd(&self, key: Bytes, members: Vec<Bytes>) -> StorageResult<usize> {
        self.update(&key, |slot| {
            let set = slot
                .get_or_insert_with(Entry::set)
                .as_set_mut()
                .ok_or(WrongType)?;
            Ok(members.into_iter().filter(|m| set.insert(m.clone())).count())
        })
    }

    /// Removes members from a set. A set left empty is deleted.
    pub fn srem(&self, key: &Bytes, members: &[Bytes]) -> StorageResult<usize> {
        self.update(key, |slot| match slot {
            Some(entry) => {
                let set = entry.as_set_mut().ok_or(WrongType)?;
                Ok(members.iter().filter(|m| set.remove(*m)).count())
            }
            None => Ok(0),
        })
    }

    pub fn sismember(&self, key: &[u8], member: &[u8]) -> StorageResult<bool> {
        self.read(key, |entry| {
            entry
                .as_set()
                .map(|set| set.contains(member))
                .ok_or(WrongType)
        })
        .unwrap_or(Ok(false))
    }

    /// Returns all members, sorted bytewise.
    pub fn smembers(&self, key: &[u8]) -> StorageResult<Vec<Bytes>> {
        self.read(key, |entry| {
            let set = entry.as_set().ok_or(WrongType)?;
            let mut members: Vec<Bytes> = set.iter().cloned().collect();
            members.sort();
            Ok(members)
        })
        .unwrap_or(Ok(Vec::new()))
    }

    pub fn scard(&self, key: &[u8]) -> StorageResult<usize> {
        self.read(key, |entry| entry.as_set().map(|set| set.len()).ok_or(WrongType))
            .unwrap_or(Ok(0))
    }
}
