//! Key-value storage abstraction
//!
//! Payloads are stored as text under fixed key names. `SqliteKv` is the
//! on-disk backend; `MemoryKv` keeps everything in a map and is used by
//! tests and throwaway sessions.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use crate::storage::error::{StorageError, StorageResult};

/// Default per-value size limit, in bytes
pub const DEFAULT_QUOTA: usize = 5 * 1024 * 1024;

/// A store of text values keyed by name
pub trait KeyValueStore {
    /// Read the value under `key`, if any
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Replace the value under `key`
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Delete `key`; missing keys are not an error
    fn remove(&self, key: &str) -> StorageResult<()>;
}

impl<K: KeyValueStore + ?Sized> KeyValueStore for Rc<K> {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        (**self).remove(key)
    }
}

/// Reject values over `quota` bytes
pub(crate) fn check_quota(key: &str, value: &str, quota: usize) -> StorageResult<()> {
    if value.len() > quota {
        return Err(StorageError::QuotaExceeded {
            key: key.to_string(),
            size: value.len(),
            quota,
        });
    }
    Ok(())
}

/// In-memory key-value store
#[derive(Debug)]
pub struct MemoryKv {
    values: RefCell<HashMap<String, String>>,
    quota: usize,
    failing: bool,
    reads: Cell<usize>,
    writes: Cell<usize>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::with_quota(DEFAULT_QUOTA)
    }

    pub fn with_quota(quota: usize) -> Self {
        Self {
            values: RefCell::new(HashMap::new()),
            quota,
            failing: false,
            reads: Cell::new(0),
            writes: Cell::new(0),
        }
    }

    /// A store whose every operation fails
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::new()
        }
    }

    /// Number of successful `get` calls so far
    pub fn read_count(&self) -> usize {
        self.reads.get()
    }

    /// Number of successful `set` calls so far
    pub fn write_count(&self) -> usize {
        self.writes.get()
    }

    fn check_available(&self) -> StorageResult<()> {
        if self.failing {
            return Err(StorageError::Unavailable("memory store is failing".to_string()));
        }
        Ok(())
    }
}

impl Default for MemoryKv {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for MemoryKv {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        self.check_available()?;
        self.reads.set(self.reads.get() + 1);
        Ok(self.values.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.check_available()?;
        check_quota(key, value, self.quota)?;
        self.values
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.check_available()?;
        self.values.borrow_mut().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get() {
        let kv = MemoryKv::new();
        assert!(kv.get("missing").unwrap().is_none());

        kv.set("a", "1").unwrap();
        kv.set("a", "2").unwrap();
        assert_eq!(kv.get("a").unwrap().as_deref(), Some("2"));
        assert_eq!(kv.write_count(), 2);

        kv.remove("a").unwrap();
        kv.remove("a").unwrap();
        assert!(kv.get("a").unwrap().is_none());
    }

    #[test]
    fn test_quota_keeps_previous_value() {
        let kv = MemoryKv::with_quota(4);
        kv.set("k", "1234").unwrap();

        let err = kv.set("k", "12345").unwrap_err();
        assert!(matches!(err, StorageError::QuotaExceeded { size: 5, .. }));
        assert_eq!(kv.get("k").unwrap().as_deref(), Some("1234"));
    }

    #[test]
    fn test_failing_store() {
        let kv = MemoryKv::failing();
        assert!(kv.get("k").is_err());
        assert!(kv.set("k", "v").is_err());
        assert!(kv.remove("k").is_err());
    }

    #[test]
    fn test_shared_through_rc() {
        let kv = Rc::new(MemoryKv::new());
        let other = Rc::clone(&kv);

        kv.set("shared", "yes").unwrap();
        assert_eq!(other.get("shared").unwrap().as_deref(), Some("yes"));
    }
}
