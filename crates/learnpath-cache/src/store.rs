//! Key/value stores with a hard byte capacity.
//!
//! A store is a flat, synchronous string map shared by everything that holds
//! a handle to it. It enforces its capacity on every write and knows nothing
//! about entries, versions or tags; that is the cache's job.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::StoreError;

/// Default store capacity: 5 MiB, the usual per-origin browser quota.
pub const DEFAULT_CAPACITY_BYTES: usize = 5 * 1024 * 1024;

/// A synchronous string store with a fixed capacity.
pub trait KeyValueStore: Send + Sync {
    /// Read the raw value stored under `key`.
    fn get_item(&self, key: &str) -> Option<String>;

    /// Write `value` under `key`, replacing any previous value.
    ///
    /// Fails with [`StoreError::QuotaExceeded`] when the write would push
    /// usage past [`capacity_bytes`](Self::capacity_bytes).
    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove `key`. Removing an absent key is a no-op.
    fn remove_item(&self, key: &str);

    /// Every key currently in the store, including keys other callers own.
    fn keys(&self) -> Vec<String>;

    /// Bytes currently in use across all keys.
    fn used_bytes(&self) -> usize;

    /// Hard capacity in bytes.
    fn capacity_bytes(&self) -> usize;
}

/// Bytes a key/value pair occupies in a store.
pub fn item_size(key: &str, value: &str) -> usize {
    key.len() + value.len()
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn used(items: &BTreeMap<String, String>) -> usize {
    items.iter().map(|(k, v)| item_size(k, v)).sum()
}

/// Check that replacing `key` with `value` fits in `capacity`.
fn check_quota(
    items: &BTreeMap<String, String>,
    capacity: usize,
    key: &str,
    value: &str,
) -> Result<(), StoreError> {
    let existing = items.get(key).map(|v| item_size(key, v)).unwrap_or(0);
    let base = used(items).saturating_sub(existing);
    let needed = item_size(key, value);
    if base + needed > capacity {
        return Err(StoreError::QuotaExceeded {
            needed,
            available: capacity.saturating_sub(base),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// Process-local store. Share it between callers with `Arc`.
#[derive(Debug)]
pub struct MemoryStore {
    items: Mutex<BTreeMap<String, String>>,
    capacity: usize,
}

impl MemoryStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: Mutex::new(BTreeMap::new()),
            capacity,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY_BYTES)
    }
}

impl KeyValueStore for MemoryStore {
    fn get_item(&self, key: &str) -> Option<String> {
        lock(&self.items).get(key).cloned()
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut items = lock(&self.items);
        check_quota(&items, self.capacity, key, value)?;
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) {
        lock(&self.items).remove(key);
    }

    fn keys(&self) -> Vec<String> {
        lock(&self.items).keys().cloned().collect()
    }

    fn used_bytes(&self) -> usize {
        used(&lock(&self.items))
    }

    fn capacity_bytes(&self) -> usize {
        self.capacity
    }
}

// ---------------------------------------------------------------------------
// File-backed store
// ---------------------------------------------------------------------------

/// Store persisted as a single JSON object on disk.
///
/// Every mutation rewrites the file, so values survive across processes.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    items: Mutex<BTreeMap<String, String>>,
    capacity: usize,
}

impl FileStore {
    /// Open the store at `path`, creating an empty one if the file is absent.
    pub fn open(path: impl AsRef<Path>, capacity: usize) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let items = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&content)
                    .map_err(|e| StoreError::Corrupt(format!("{}: {e}", path.display())))?
            }
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path,
            items: Mutex::new(items),
            capacity,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, items: &BTreeMap<String, String>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string(items)
            .map_err(|e| StoreError::Corrupt(format!("failed to serialize store: {e}")))?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get_item(&self, key: &str) -> Option<String> {
        lock(&self.items).get(key).cloned()
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut items = lock(&self.items);
        check_quota(&items, self.capacity, key, value)?;
        let previous = items.insert(key.to_string(), value.to_string());
        if let Err(e) = self.persist(&items) {
            match previous {
                Some(v) => items.insert(key.to_string(), v),
                None => items.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    fn remove_item(&self, key: &str) {
        let mut items = lock(&self.items);
        if items.remove(key).is_some() {
            if let Err(e) = self.persist(&items) {
                tracing::warn!("failed to persist removal of {key}: {e}");
            }
        }
    }

    fn keys(&self) -> Vec<String> {
        lock(&self.items).keys().cloned().collect()
    }

    fn used_bytes(&self) -> usize {
        used(&lock(&self.items))
    }

    fn capacity_bytes(&self) -> usize {
        self.capacity
    }
}
