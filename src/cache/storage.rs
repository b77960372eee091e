//! Cache storage trait and in-memory implementation.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::key::QueryKey;

/// A single cached query result.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedEntry {
  /// Raw JSON body as returned by the server
  pub data: Value,
  /// When the entry was written
  pub cached_at: DateTime<Utc>,
  /// Set by invalidation; the next read refetches regardless of age
  pub invalidated: bool,
}

/// Trait for cache storage backends.
pub trait CacheStorage: Send + Sync {
  /// Get the entry stored under exactly `key`.
  fn get(&self, key: &QueryKey) -> Option<CachedEntry>;

  /// Store (or replace) the entry under `key`.
  fn store(&self, key: &QueryKey, entry: CachedEntry);

  /// Mark every entry whose key starts with `prefix` as invalidated.
  /// Returns the number of entries touched.
  fn invalidate(&self, prefix: &QueryKey) -> usize;

  /// Drop every entry whose key starts with `prefix`.
  fn remove(&self, prefix: &QueryKey) -> usize;

  /// Number of entries held.
  fn len(&self) -> usize;

  fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

/// Storage implementation that doesn't cache anything.
/// Used when caching is disabled - all operations are no-ops.
pub struct NoopStorage;

impl CacheStorage for NoopStorage {
  fn get(&self, _key: &QueryKey) -> Option<CachedEntry> {
    None // Always miss
  }

  fn store(&self, _key: &QueryKey, _entry: CachedEntry) {}

  fn invalidate(&self, _prefix: &QueryKey) -> usize {
    0
  }

  fn remove(&self, _prefix: &QueryKey) -> usize {
    0
  }

  fn len(&self) -> usize {
    0
  }
}

/// Process-wide in-memory store, keyed by query key.
#[derive(Default)]
pub struct MemoryStorage {
  entries: Mutex<HashMap<QueryKey, CachedEntry>>,
}

impl MemoryStorage {
  pub fn new() -> Self {
    Self::default()
  }

  fn entries(&self) -> MutexGuard<'_, HashMap<QueryKey, CachedEntry>> {
    // Entries are plain data; a panic mid-write can't leave one half-built.
    self.entries.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

impl CacheStorage for MemoryStorage {
  fn get(&self, key: &QueryKey) -> Option<CachedEntry> {
    self.entries().get(key).cloned()
  }

  fn store(&self, key: &QueryKey, entry: CachedEntry) {
    self.entries().insert(key.clone(), entry);
  }

  fn invalidate(&self, prefix: &QueryKey) -> usize {
    let mut entries = self.entries();
    let mut count = 0;
    for (key, entry) in entries.iter_mut() {
      if key.starts_with(prefix) {
        entry.invalidated = true;
        count += 1;
      }
    }
    count
  }

  fn remove(&self, prefix: &QueryKey) -> usize {
    let mut entries = self.entries();
    let before = entries.len();
    entries.retain(|key, _| !key.starts_with(prefix));
    before - entries.len()
  }

  fn len(&self) -> usize {
    self.entries().len()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn entry(data: Value) -> CachedEntry {
    CachedEntry {
      data,
      cached_at: Utc::now(),
      invalidated: false,
    }
  }

  fn detail(id: &str) -> QueryKey {
    QueryKey::new("notifications").push("detail").push(id)
  }

  #[test]
  fn test_store_and_get() {
    let storage = MemoryStorage::new();
    let key = detail("1");
    assert!(storage.get(&key).is_none());

    storage.store(&key, entry(json!({"id": "1"})));
    let cached = storage.get(&key).expect("entry stored");
    assert_eq!(cached.data, json!({"id": "1"}));
    assert!(!cached.invalidated);
  }

  #[test]
  fn test_invalidate_prefix_marks_related_entries() {
    let storage = MemoryStorage::new();
    storage.store(&detail("1"), entry(json!(1)));
    storage.store(&detail("2"), entry(json!(2)));
    storage.store(&QueryKey::new("users"), entry(json!([])));

    let touched = storage.invalidate(&QueryKey::new("notifications"));
    assert_eq!(touched, 2);
    assert!(storage.get(&detail("1")).map(|e| e.invalidated).unwrap_or(false));
    assert!(storage.get(&detail("2")).map(|e| e.invalidated).unwrap_or(false));
    assert!(!storage
      .get(&QueryKey::new("users"))
      .map(|e| e.invalidated)
      .unwrap_or(true));
  }

  #[test]
  fn test_remove_prefix() {
    let storage = MemoryStorage::new();
    storage.store(&detail("1"), entry(json!(1)));
    storage.store(&QueryKey::new("users"), entry(json!([])));

    assert_eq!(storage.remove(&detail("1")), 1);
    assert_eq!(storage.len(), 1);
  }

  #[test]
  fn test_noop_storage_always_misses() {
    let storage = NoopStorage;
    storage.store(&detail("1"), entry(json!(1)));
    assert!(storage.get(&detail("1")).is_none());
    assert!(storage.is_empty());
  }
}
