//! Test doubles for the durable store port
//!
//! Available to this crate's tests and, with the `test-utils` feature, to
//! downstream crates.

// Allow missing error/panic docs for test mocks - failures are injected
// deliberately and surfaced through the return types
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::store::{Deadline, DurableStore, StoreError, StoreResult};

/// Failure a [`MockStore`] reports instead of performing a call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreFault {
    /// `StoreError::Io` with `ErrorKind::Other`
    Io,
    /// `StoreError::Timeout`
    Timeout,
    /// `StoreError::Capacity` with zero bytes available
    Capacity,
}

impl StoreFault {
    fn to_error(self, requested: usize) -> StoreError {
        match self {
            Self::Io => StoreError::Io(io::Error::other("injected store failure")),
            Self::Timeout => StoreError::Timeout,
            Self::Capacity => StoreError::Capacity { requested: requested as u64, available: 0 },
        }
    }
}

#[derive(Debug, Default)]
struct Faults {
    get: Option<StoreFault>,
    put: Option<StoreFault>,
    remove: Option<StoreFault>,
}

#[derive(Debug, Default)]
struct Inner {
    data: Mutex<HashMap<Vec<u8>, Vec<u8>>>,
    faults: Mutex<Faults>,
    latency: Mutex<Option<Duration>>,
    get_calls: AtomicU64,
    put_calls: AtomicU64,
    remove_calls: AtomicU64,
}

/// In-memory durable store with fault injection and artificial latency
///
/// Clones share the same contents, so a test can hand one clone to a
/// hierarchy and inspect the other.
///
/// # Examples
///
/// ```
/// use stratum_core::testing::{MockStore, StoreFault};
///
/// let store = MockStore::new();
/// store.insert_raw(b"k", b"v");
/// store.fail_puts(StoreFault::Capacity);
/// assert_eq!(store.raw(b"k"), Some(b"v".to_vec()));
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockStore {
    inner: Arc<Inner>,
}

impl MockStore {
    /// Create an empty, healthy store
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `get` fail with `fault` until [`heal`](Self::heal)
    pub fn fail_gets(&self, fault: StoreFault) {
        self.inner.faults.lock().get = Some(fault);
    }

    /// Make every `put` fail with `fault` until [`heal`](Self::heal)
    pub fn fail_puts(&self, fault: StoreFault) {
        self.inner.faults.lock().put = Some(fault);
    }

    /// Make every `remove` fail with `fault` until [`heal`](Self::heal)
    pub fn fail_removes(&self, fault: StoreFault) {
        self.inner.faults.lock().remove = Some(fault);
    }

    /// Clear every injected fault
    pub fn heal(&self) {
        *self.inner.faults.lock() = Faults::default();
    }

    /// Delay every call by `latency` before it runs
    pub fn set_latency(&self, latency: Duration) {
        *self.inner.latency.lock() = Some(latency);
    }

    /// Write bytes directly, bypassing faults and counters
    pub fn insert_raw(&self, key: &[u8], value: &[u8]) {
        self.inner.data.lock().insert(key.to_vec(), value.to_vec());
    }

    /// Read bytes directly, bypassing faults and counters
    pub fn raw(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.inner.data.lock().get(key).cloned()
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.inner.data.lock().len()
    }

    /// Returns `true` when nothing is stored
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `get` calls received, including failed ones
    pub fn get_calls(&self) -> u64 {
        self.inner.get_calls.load(Ordering::SeqCst)
    }

    /// `put` calls received, including failed ones
    pub fn put_calls(&self) -> u64 {
        self.inner.put_calls.load(Ordering::SeqCst)
    }

    /// `remove` calls received, including failed ones
    pub fn remove_calls(&self) -> u64 {
        self.inner.remove_calls.load(Ordering::SeqCst)
    }

    async fn delay(&self) {
        let latency = *self.inner.latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl DurableStore for MockStore {
    async fn get(&self, key: &[u8], _deadline: Deadline) -> StoreResult<Option<Vec<u8>>> {
        self.inner.get_calls.fetch_add(1, Ordering::SeqCst);
        self.delay().await;
        let fault = self.inner.faults.lock().get;
        if let Some(fault) = fault {
            return Err(fault.to_error(0));
        }
        Ok(self.raw(key))
    }

    async fn put(&self, key: &[u8], value: Vec<u8>, _deadline: Deadline) -> StoreResult<()> {
        self.inner.put_calls.fetch_add(1, Ordering::SeqCst);
        self.delay().await;
        let fault = self.inner.faults.lock().put;
        if let Some(fault) = fault {
            return Err(fault.to_error(value.len()));
        }
        self.inner.data.lock().insert(key.to_vec(), value);
        Ok(())
    }

    async fn remove(&self, key: &[u8], _deadline: Deadline) -> StoreResult<bool> {
        self.inner.remove_calls.fetch_add(1, Ordering::SeqCst);
        self.delay().await;
        let fault = self.inner.faults.lock().remove;
        if let Some(fault) = fault {
            return Err(fault.to_error(0));
        }
        Ok(self.inner.data.lock().remove(key).is_some())
    }
}
