//! Durable store port and the byte codec boundary.
//!
//! The hierarchy never implements persistence. It talks to an external
//! [`DurableStore`] through three byte-oriented calls and leaves encoding
//! to the caller via [`DurableKey`] and [`DurableValue`].
//!
//! # Example
//!
//! ```no_run
//! use stratum_core::{Deadline, DurableStore, StoreResult};
//!
//! async fn warm(store: &dyn DurableStore, deadline: Deadline) -> StoreResult<()> {
//!     if store.get(b"config", deadline).await?.is_none() {
//!         store.put(b"config", b"{}".to_vec(), deadline).await?;
//!     }
//!     Ok(())
//! }
//! ```

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

/// Optional absolute deadline handed to every store call.
///
/// `None` means the call may take as long as it needs. The hierarchy also
/// enforces the deadline itself, so stores may treat it as a hint.
pub type Deadline = Option<tokio::time::Instant>;

/// Result type for durable store calls
pub type StoreResult<T> = Result<T, StoreError>;

/// Failures a durable store may report
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying medium failed
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The deadline passed before the call completed
    #[error("store deadline exceeded")]
    Timeout,

    /// The medium is full and rejected the write
    #[error("store full: requested {requested} bytes, {available} available")]
    Capacity { requested: u64, available: u64 },
}

/// Store call being performed, used to tag errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    /// `DurableStore::get`
    Get,
    /// `DurableStore::put`
    Put,
    /// `DurableStore::remove`
    Remove,
}

impl fmt::Display for StoreOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => write!(f, "get"),
            Self::Put => write!(f, "put"),
            Self::Remove => write!(f, "remove"),
        }
    }
}

/// Port for byte-oriented persistence behind the in-memory tiers.
///
/// Implementations must be safe to call concurrently. The hierarchy never
/// calls a store while holding a tier lock.
#[async_trait]
pub trait DurableStore: Send + Sync {
    /// Fetch the bytes stored under `key`, `Ok(None)` when absent.
    async fn get(&self, key: &[u8], deadline: Deadline) -> StoreResult<Option<Vec<u8>>>;

    /// Store `value` under `key`, replacing any previous value.
    async fn put(&self, key: &[u8], value: Vec<u8>, deadline: Deadline) -> StoreResult<()>;

    /// Delete `key`. Returns whether a value was present.
    async fn remove(&self, key: &[u8], deadline: Deadline) -> StoreResult<bool>;
}

/// Error produced when stored bytes cannot be turned back into a value
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct CodecError(pub String);

/// Keys that can cross the durable store boundary
pub trait DurableKey {
    /// Stable byte representation of the key
    fn to_key_bytes(&self) -> Vec<u8>;
}

/// Values that can cross the durable store boundary
pub trait DurableValue: Sized {
    /// Encode the value for storage
    fn encode(&self) -> Vec<u8>;

    /// Decode a value previously produced by [`DurableValue::encode`]
    fn decode(bytes: &[u8]) -> Result<Self, CodecError>;
}

impl DurableKey for String {
    fn to_key_bytes(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }
}

impl DurableKey for Vec<u8> {
    fn to_key_bytes(&self) -> Vec<u8> {
        self.clone()
    }
}

impl DurableKey for u64 {
    fn to_key_bytes(&self) -> Vec<u8> {
        self.to_be_bytes().to_vec()
    }
}

impl DurableValue for String {
    fn encode(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }

    fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        String::from_utf8(bytes.to_vec()).map_err(|e| CodecError(e.to_string()))
    }
}

impl DurableValue for Vec<u8> {
    fn encode(&self) -> Vec<u8> {
        self.clone()
    }

    fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        Ok(bytes.to_vec())
    }
}

impl DurableValue for u64 {
    fn encode(&self) -> Vec<u8> {
        self.to_be_bytes().to_vec()
    }

    fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        let raw: [u8; 8] = bytes
            .try_into()
            .map_err(|_| CodecError(format!("expected 8 bytes, found {}", bytes.len())))?;
        Ok(u64::from_be_bytes(raw))
    }
}
