//! Hash operations on the storage engine.

use crate::storage::engine::{StorageEngine, StorageResult, WrongType};
use crate::storage::entry::Entry;
use bytes::Bytes;

impl StorageEngine {
    /// Sets fields on a hash, creating it if needed.
    ///
    /// # Returns
    /// How many fields were newly created (updates don't count).
    pub fn hset(&self, key: Bytes, pairs: Vec<(Bytes, Bytes)>) -> StorageResult<usize> {
        self.update(&key, |slot| {
            let hash = slot
                .get_or_insert_with(Entry::hash)
                .as_hash_mut()
                .ok_or(WrongType)?;
            Ok(pairs
                .into_iter()
                .filter(|(field, value)| hash.insert(field.clone(), value.clone()).is_none())
                .count())
        })
    }

    pub fn hget(&self, key: &[u8], field: &[u8]) -> StorageResult<Option<Bytes>> {
        self.read(key, |entry| {
            entry
                .as_hash()
                .map(|hash| hash.get(field).cloned())
                .ok_or(WrongType)
        })
        .unwrap_or(Ok(None))
    }

    /// Removes fields from a hash. A hash left empty is deleted.
    pub fn hdel(&self, key: &Bytes, fields: &[Bytes]) -> StorageResult<usize> {
        self.update(key, |slot| match slot {
            Some(entry) => {
                let hash = entry.as_hash_mut().ok_or(WrongType)?;
                Ok(fields.iter().filter(|f| hash.remove(*f).is_some()).count())
            }
            None => Ok(0),
        })
    }

    /// Returns every field/value pair, sorted by field.
    pub fn hgetall(&self, key: &[u8]) -> StorageResult<Vec<(Bytes, Bytes)>> {
        self.read(key, |entry| {
            let hash = entry.as_hash().ok_or(WrongType)?;
            let mut pairs: Vec<(Bytes, Bytes)> = hash
                .iter()
                .map(|(f, v)| (f.clone(), v.clone()))
                .collect();
            pairs.sort_by(|a, b| a.0.cmp(&b.0));
            Ok(pairs)
        })
        .unwrap_or(Ok(Vec::new()))
    }

    pub fn hlen(&self, key: &[u8]) -> StorageResult<usize> {
        self.read(key, |entry| entry.as_hash().map(|hash| hash.len()).ok_or(WrongType))
            .unwrap_or(Ok(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(field: &'static str, value: &'static str) -> (Bytes, Bytes) {
        (Bytes::from(field), Bytes::from(value))
    }

    #[test]
    fn test_hset_hget() {
        let engine = StorageEngine::new();
        let key = Bytes::from("user:1");

        let created = engine.hset(key.clone(), vec![pair("name", "widget"), pair("age", "30")]);
        assert_eq!(created, Ok(2));

        // Overwrite one, add one.
        let created = engine.hset(key.clone(), vec![pair("age", "31"), pair("color", "red")]);
        assert_eq!(created, Ok(1));

        assert_eq!(engine.hget(&key, b"age"), Ok(Some(Bytes::from("31"))));
        assert_eq!(engine.hget(&key, b"missing"), Ok(None));
        assert_eq!(engine.hget(b"nokey", b"age"), Ok(None));
        assert_eq!(engine.hlen(&key), Ok(3));
        assert_eq!(engine.key_type(&key), "hash");
    }

    #[test]
    fn test_hgetall_sorted() {
        let engine = StorageEngine::new();
        let key = Bytes::from("h");
        engine
            .hset(key.clone(), vec![pair("b", "2"), pair("a", "1")])
            .unwrap();

        assert_eq!(engine.hgetall(&key), Ok(vec![pair("a", "1"), pair("b", "2")]));
        assert_eq!(engine.hgetall(b"none"), Ok(vec![]));
    }

    #[test]
    fn test_hdel_deletes_empty_hash() {
        let engine = StorageEngine::new();
        let key = Bytes::from("h");
        engine.hset(key.clone(), vec![pair("f", "v")]).unwrap();

        assert_eq!(engine.hdel(&key, &[Bytes::from("x")]), Ok(0));
        assert_eq!(engine.hdel(&key, &[Bytes::from("f")]), Ok(1));
        assert!(!engine.exists(&key));
    }

    #[test]
    fn test_hash_ops_on_string() {
        let engine = StorageEngine::new();
        let key = Bytes::from("s");
        engine.set_string(key.clone(), Bytes::from("v"));

        assert_eq!(engine.hset(key.clone(), vec![pair("f", "v")]), Err(WrongType));
        assert_eq!(engine.hget(&key, b"f"), Err(WrongType));
        assert_eq!(engine.hdel(&key, &[Bytes::from("f")]), Err(WrongType));
        assert_eq!(engine.hgetall(&key), Err(WrongType));
        assert_eq!(engine.hlen(&key), Err(WrongType));
    }
}
