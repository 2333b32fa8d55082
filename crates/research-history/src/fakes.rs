//! In-memory persistence layer
//!
//! `MemoryKeyValueStore` behaves like browser local storage: a flat map of
//! strings with an optional byte quota shared by all keys. Tests can also
//! force the next N writes to be rejected to drive the recovery path.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::StorageError;
use crate::storage_traits::{KeyValueStore, StorageResult};

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, String>,
    capacity: Option<usize>,
    reject_next: usize,
    writes: usize,
}

impl Inner {
    /// Bytes in use once `key` holds a value of `value_len` bytes.
    fn usage_with(&self, key: &str, value_len: usize) -> usize {
        let others: usize = self
            .entries
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| k.len() + v.len())
            .sum();
        others + key.len() + value_len
    }
}

/// In-memory key-value store with an optional quota.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    inner: Mutex<Inner>,
}

impl MemoryKeyValueStore {
    /// Unlimited store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store rejecting writes that would exceed `capacity` bytes
    /// (key plus value lengths, summed over all keys).
    pub fn with_capacity(capacity: usize) -> Self {
        let store = Self::default();
        store.set_capacity(Some(capacity));
        store
    }

    /// Change the quota; `None` removes it. Existing values are kept.
    pub fn set_capacity(&self, capacity: Option<usize>) {
        self.inner.lock().unwrap().capacity = capacity;
    }

    /// Reject the next `count` calls to `set` with `QuotaExceeded`.
    pub fn reject_next_writes(&self, count: usize) {
        self.inner.lock().unwrap().reject_next = count;
    }

    /// Number of successful writes so far.
    pub fn write_count(&self) -> usize {
        self.inner.lock().unwrap().writes
    }

    /// Bytes currently in use.
    pub fn used_bytes(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.entries.iter().map(|(k, v)| k.len() + v.len()).sum()
    }

    /// Whether `key` holds a value.
    pub fn contains(&self, key: &str) -> bool {
        self.inner.lock().unwrap().entries.contains_key(key)
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let required = inner.usage_with(key, value.len());

        if inner.reject_next > 0 {
            inner.reject_next -= 1;
            return Err(StorageError::QuotaExceeded {
                key: key.to_string(),
                required,
                capacity: inner.capacity.unwrap_or(0),
            });
        }

        if let Some(capacity) = inner.capacity {
            if required > capacity {
                return Err(StorageError::QuotaExceeded {
                    key: key.to_string(),
                    required,
                    capacity,
                });
            }
        }

        inner.entries.insert(key.to_string(), value.to_string());
        inner.writes += 1;
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get() {
        let store = MemoryKeyValueStore::new();
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
        assert_eq!(store.write_count(), 1);
    }

    #[test]
    fn capacity_counts_key_and_value() {
        let store = MemoryKeyValueStore::with_capacity(4);
        store.set("k", "abc").unwrap();
        let err = store.set("k", "abcd").unwrap_err();
        assert!(err.is_quota_exceeded());
        assert_eq!(store.get("k").unwrap().as_deref(), Some("abc"));
    }

    #[test]
    fn replacing_value_frees_old_bytes() {
        let store = MemoryKeyValueStore::with_capacity(10);
        store.set("k", "123456789").unwrap();
        store.set("k", "987654321").unwrap();
        assert_eq!(store.used_bytes(), 10);
    }

    #[test]
    fn forced_rejections_run_out() {
        let store = MemoryKeyValueStore::new();
        store.reject_next_writes(2);
        assert!(store.set("k", "a").is_err());
        assert!(store.set("k", "a").is_err());
        store.set("k", "a").unwrap();
    }

    #[test]
    fn remove_missing_is_noop() {
        let store = MemoryKeyValueStore::new();
        store.remove("missing").unwrap();
        assert!(!store.contains("missing"));
    }
}
