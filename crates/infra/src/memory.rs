//! In-process durable store
//!
//! [`MemoryStore`] keeps bytes in a concurrent map. It is not durable across
//! restarts; it exists for tests, demos and as a shared backing layer
//! between several hierarchies in one process.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use stratum_core::{Deadline, DurableStore, StoreError, StoreResult};

use crate::ensure_deadline;

#[derive(Debug, Default)]
struct Inner {
    entries: DashMap<Vec<u8>, Vec<u8>>,
    used_bytes: AtomicU64,
    max_bytes: Option<u64>,
}

/// `DashMap`-backed store with an optional byte budget
///
/// Clones share the same contents.
///
/// # Example
/// ```
/// use stratum_infra::MemoryStore;
///
/// let store = MemoryStore::with_max_bytes(1024);
/// assert_eq!(store.used_bytes(), 0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    /// Unbounded store
    pub fn new() -> Self {
        Self::default()
    }

    /// Store rejecting writes that would exceed `max_bytes` of keys plus
    /// values
    pub fn with_max_bytes(max_bytes: u64) -> Self {
        Self { inner: Arc::new(Inner { max_bytes: Some(max_bytes), ..Inner::default() }) }
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    /// Returns `true` when nothing is stored
    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    /// Bytes currently accounted against the budget
    pub fn used_bytes(&self) -> u64 {
        self.inner.used_bytes.load(Ordering::Acquire)
    }

    /// Swap `released` accounted bytes for `requested` ones, failing when the
    /// result would exceed the budget
    fn reserve(&self, released: u64, requested: u64) -> StoreResult<()> {
        let max = self.inner.max_bytes;
        self.inner
            .used_bytes
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| {
                let next = used.saturating_sub(released) + requested;
                match max {
                    Some(max) if next > max => None,
                    _ => Some(next),
                }
            })
            .map(|_| ())
            .map_err(|used| StoreError::Capacity {
                requested,
                available: max.unwrap_or(u64::MAX).saturating_sub(used.saturating_sub(released)),
            })
    }

    fn release(&self, bytes: u64) {
        let _ = self.inner.used_bytes.fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| {
            Some(used.saturating_sub(bytes))
        });
    }
}

fn footprint(key: &[u8], value: &[u8]) -> u64 {
    (key.len() + value.len()) as u64
}

#[async_trait]
impl DurableStore for MemoryStore {
    async fn get(&self, key: &[u8], deadline: Deadline) -> StoreResult<Option<Vec<u8>>> {
        ensure_deadline(deadline)?;
        Ok(self.inner.entries.get(key).map(|entry| entry.value().clone()))
    }

    async fn put(&self, key: &[u8], value: Vec<u8>, deadline: Deadline) -> StoreResult<()> {
        ensure_deadline(deadline)?;
        let requested = footprint(key, &value);

        match self.inner.entries.entry(key.to_vec()) {
            Entry::Occupied(mut occupied) => {
                self.reserve(footprint(key, occupied.get()), requested)?;
                occupied.insert(value);
            }
            Entry::Vacant(vacant) => {
                self.reserve(0, requested)?;
                vacant.insert(value);
            }
        }
        Ok(())
    }

    async fn remove(&self, key: &[u8], deadline: Deadline) -> StoreResult<bool> {
        ensure_deadline(deadline)?;
        match self.inner.entries.remove(key) {
            Some((key, value)) => {
                self.release(footprint(&key, &value));
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for memory.
    use std::time::Duration;

    use super::*;

    /// Validates basic get/put/remove semantics.
    ///
    /// Assertions:
    /// - Confirms a missing key reads as `None`, not an error.
    /// - Confirms remove reports whether the key existed.
    #[tokio::test]
    async fn test_roundtrip() {
        let store = MemoryStore::new();
        assert_eq!(store.get(b"k", None).await.unwrap(), None);

        store.put(b"k", b"v1".to_vec(), None).await.unwrap();
        store.put(b"k", b"v2".to_vec(), None).await.unwrap();
        assert_eq!(store.get(b"k", None).await.unwrap(), Some(b"v2".to_vec()));
        assert_eq!(store.len(), 1);

        assert!(store.remove(b"k", None).await.unwrap());
        assert!(!store.remove(b"k", None).await.unwrap());
        assert!(store.is_empty());
    }

    /// Validates byte budget accounting.
    ///
    /// Assertions:
    /// - Confirms an oversize write fails with `StoreError::Capacity`.
    /// - Confirms overwrites are charged only the size difference.
    /// - Confirms removal releases the bytes.
    #[tokio::test]
    async fn test_byte_budget() {
        let store = MemoryStore::with_max_bytes(10);
        store.put(b"a", vec![0; 5], None).await.unwrap();
        assert_eq!(store.used_bytes(), 6);

        let err = store.put(b"b", vec![0; 5], None).await.unwrap_err();
        assert!(matches!(err, StoreError::Capacity { requested: 6, available: 4 }));

        store.put(b"a", vec![0; 9], None).await.unwrap();
        assert_eq!(store.used_bytes(), 10);

        store.remove(b"a", None).await.unwrap();
        assert_eq!(store.used_bytes(), 0);
        store.put(b"b", vec![0; 5], None).await.unwrap();
    }

    /// Validates an expired deadline fails without touching the map.
    #[tokio::test]
    async fn test_expired_deadline() {
        let store = MemoryStore::new();
        let past = tokio::time::Instant::now() - Duration::from_millis(1);

        let err = store.put(b"k", b"v".to_vec(), Some(past)).await.unwrap_err();
        assert!(matches!(err, StoreError::Timeout));
        assert!(store.is_empty());
    }

    /// Validates clones share contents.
    #[tokio::test]
    async fn test_clones_share_state() {
        let store = MemoryStore::new();
        let other = store.clone();
        store.put(b"k", b"v".to_vec(), None).await.unwrap();
        assert_eq!(other.get(b"k", None).await.unwrap(), Some(b"v".to_vec()));
    }
}
