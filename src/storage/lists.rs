//! List operations on the storage engine.
//!
//! A list key is created by the first push and removed by the pop that
//! empties it, so an empty list is never observable.

use crate::storage::engine::{StorageEngine, StorageResult, WrongType};
use crate::storage::entry::Entry;
use bytes::Bytes;

impl StorageEngine {
    /// Pushes values to the head of a list, one at a time in argument order.
    ///
    /// `LPUSH k a b` therefore leaves `[b, a]`.
    ///
    /// # Returns
    /// The length of the list after the push.
    pub fn lpush(&self, key: Bytes, values: Vec<Bytes>) -> StorageResult<usize> {
        self.update(&key, |slot| {
            let list = slot
                .get_or_insert_with(Entry::list)
                .as_list_mut()
                .ok_or(WrongType)?;
            for value in values {
                list.push_front(value);
            }
            Ok(list.len())
        })
    }

    /// Pushes values to the tail of a list.
    pub fn rpush(&self, key: Bytes, values: Vec<Bytes>) -> StorageResult<usize> {
        self.update(&key, |slot| {
            let list = slot
                .get_or_insert_with(Entry::list)
                .as_list_mut()
                .ok_or(WrongType)?;
            list.extend(values);
            Ok(list.len())
        })
    }

    /// Removes and returns the head of a list.
    pub fn lpop(&self, key: &Bytes) -> StorageResult<Option<Bytes>> {
        self.update(key, |slot| match slot {
            Some(entry) => Ok(entry.as_list_mut().ok_or(WrongType)?.pop_front()),
            None => Ok(None),
        })
    }

    /// Removes and returns the tail of a list.
    pub fn rpop(&self, key: &Bytes) -> StorageResult<Option<Bytes>> {
        self.update(key, |slot| match slot {
            Some(entry) => Ok(entry.as_list_mut().ok_or(WrongType)?.pop_back()),
            None => Ok(None),
        })
    }

    /// Returns the length of a list, 0 if the key is absent.
    pub fn llen(&self, key: &[u8]) -> StorageResult<usize> {
        self.read(key, |entry| entry.as_list().map(|list| list.len()).ok_or(WrongType))
            .unwrap_or(Ok(0))
    }

    /// Returns a range of elements from a list.
    ///
    /// Both start and stop are inclusive. Negative indices count from the
    /// end, and out-of-range indices are clamped.
    pub fn lrange(&self, key: &[u8], start: i64, stop: i64) -> StorageResult<Vec<Bytes>> {
        self.read(key, |entry| {
            let list = entry.as_list().ok_or(WrongType)?;
            let len = list.len() as i64;

            let start = if start < 0 { (len + start).max(0) } else { start };
            let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };

            if start > stop || start >= len {
                return Ok(Vec::new());
            }

            Ok(list
                .iter()
                .skip(start as usize)
                .take((stop - start + 1) as usize)
                .cloned()
                .collect())
        })
        .unwrap_or(Ok(Vec::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(values: &[&'static str]) -> Vec<Bytes> {
        values.iter().map(|v| Bytes::from(*v)).collect()
    }

    #[test]
    fn test_lpush_rpush() {
        let engine = StorageEngine::new();
        let key = Bytes::from("mylist");

        assert_eq!(engine.lpush(key.clone(), items(&["a"])), Ok(1));
        assert_eq!(engine.lpush(key.clone(), items(&["b"])), Ok(2));
        assert_eq!(engine.lrange(&key, 0, -1), Ok(items(&["b", "a"])));

        assert_eq!(engine.rpush(key.clone(), items(&["c"])), Ok(3));
        assert_eq!(engine.lrange(&key, 0, -1), Ok(items(&["b", "a", "c"])));

        // Each value goes to the head in turn.
        assert_eq!(engine.lpush(key.clone(), items(&["x", "y"])), Ok(5));
        assert_eq!(
            engine.lrange(&key, 0, -1),
            Ok(items(&["y", "x", "b", "a", "c"]))
        );
    }

    #[test]
    fn test_rpush_order() {
        let engine = StorageEngine::new();
        let key = Bytes::from("k");

        engine.rpush(key.clone(), items(&["a"])).unwrap();
        engine.rpush(key.clone(), items(&["b"])).unwrap();
        assert_eq!(engine.lrange(&key, 0, -1), Ok(items(&["a", "b"])));
    }

    #[test]
    fn test_lpop_rpop() {
        let engine = StorageEngine::new();
        let key = Bytes::from("mylist");
        engine.rpush(key.clone(), items(&["a", "b", "c"])).unwrap();

        assert_eq!(engine.lpop(&key), Ok(Some(Bytes::from("a"))));
        assert_eq!(engine.rpop(&key), Ok(Some(Bytes::from("c"))));
        assert_eq!(engine.llen(&key), Ok(1));

        assert_eq!(engine.rpop(&key), Ok(Some(Bytes::from("b"))));
        assert_eq!(engine.lpop(&key), Ok(None));
    }

    #[test]
    fn test_pop_that_empties_removes_key() {
        let engine = StorageEngine::new();
        let key = Bytes::from("k");
        engine.rpush(key.clone(), items(&["a"])).unwrap();

        assert_eq!(engine.lpop(&key), Ok(Some(Bytes::from("a"))));
        assert_eq!(engine.key_type(&key), "none");
        assert!(engine.is_empty());
    }

    #[test]
    fn test_list_ops_on_string() {
        let engine = StorageEngine::new();
        let key = Bytes::from("str");
        engine.set_string(key.clone(), Bytes::from("v"));

        assert_eq!(engine.lpush(key.clone(), items(&["x"])), Err(WrongType));
        assert_eq!(engine.rpush(key.clone(), items(&["x"])), Err(WrongType));
        assert_eq!(engine.lpop(&key), Err(WrongType));
        assert_eq!(engine.rpop(&key), Err(WrongType));
        assert_eq!(engine.llen(&key), Err(WrongType));
        assert_eq!(engine.lrange(&key, 0, -1), Err(WrongType));

        // Untouched by the failed pushes.
        assert_eq!(engine.get_string(&key), Some(Bytes::from("v")));
    }

    #[test]
    fn test_llen_absent() {
        let engine = StorageEngine::new();
        assert_eq!(engine.llen(b"nothing"), Ok(0));
    }

    #[test]
    fn test_lrange() {
        let engine = StorageEngine::new();
        let key = Bytes::from("mylist");
        engine
            .rpush(key.clone(), items(&["a", "b", "c", "d", "e"]))
            .unwrap();

        assert_eq!(engine.lrange(&key, 0, 2), Ok(items(&["a", "b", "c"])));
        assert_eq!(engine.lrange(&key, -2, -1), Ok(items(&["d", "e"])));
        assert_eq!(engine.lrange(&key, -100, 1), Ok(items(&["a", "b"])));
        assert_eq!(engine.lrange(&key, 3, 100), Ok(items(&["d", "e"])));
        assert_eq!(engine.lrange(&key, 4, 2), Ok(vec![]));
        assert_eq!(engine.lrange(&key, 10, 20), Ok(vec![]));
        assert_eq!(engine.lrange(b"missing", 0, -1), Ok(vec![]));
    }
}
