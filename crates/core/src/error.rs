//! Error types for the cache hierarchy
//!
//! Tier-local operations never fail: a tier cannot exceed its capacity or
//! corrupt its index at runtime. The only runtime failures come from the
//! durable store and from decoding the bytes it hands back, plus
//! configuration errors raised at construction time.
//!
//! A missing key is never an error. Every lookup surface returns
//! `Ok(None)` for "definitely absent" so callers can tell it apart from
//! "unknown because the durable store failed".
//!
//! # Classification
//!
//! The hierarchy performs no retries of its own. [`ErrorClassification`]
//! gives callers enough information to build their own retry policy:
//!
//! | Variant | Retryable | Severity |
//! |---------|-----------|----------|
//! | `DurableIo` | yes | Error |
//! | `DurableTimeout` | yes | Warning |
//! | `DurableCapacity` | no | Critical |
//! | `Configuration` | no | Error |
//! | `Codec` | no | Critical |

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::store::{StoreError, StoreOperation};

/// Standard result type for hierarchy operations
pub type CacheResult<T> = Result<T, CacheError>;

/// Errors surfaced by [`CacheHierarchy`](crate::CacheHierarchy) operations
#[derive(Debug, Error)]
pub enum CacheError {
    /// The durable store failed with an I/O error
    #[error("durable store {operation} failed: {source}")]
    DurableIo {
        operation: StoreOperation,
        #[source]
        source: std::io::Error,
    },

    /// The durable store did not answer before the configured deadline
    #[error("durable store {operation} exceeded deadline of {timeout:?}")]
    DurableTimeout { operation: StoreOperation, timeout: Duration },

    /// The durable store rejected a write because its medium is full
    #[error("durable store rejected {operation}: {message}")]
    DurableCapacity { operation: StoreOperation, message: String },

    /// Invalid configuration supplied at construction time
    #[error("invalid cache configuration: {0}")]
    Configuration(String),

    /// Bytes returned by the durable store could not be decoded
    #[error("failed to decode value for durable {operation}: {message}")]
    Codec { operation: StoreOperation, message: String },
}

impl CacheError {
    /// Shorthand for a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Map a store error into the hierarchy taxonomy.
    ///
    /// `timeout` is the deadline that was configured for the call; it is
    /// reported when the store itself noticed the expiry.
    pub(crate) fn from_store(
        operation: StoreOperation,
        error: StoreError,
        timeout: Option<Duration>,
    ) -> Self {
        match error {
            StoreError::Io(source) => Self::DurableIo { operation, source },
            StoreError::Timeout => {
                Self::DurableTimeout { operation, timeout: timeout.unwrap_or_default() }
            }
            StoreError::Capacity { requested, available } => Self::DurableCapacity {
                operation,
                message: format!("requested {requested} bytes, {available} available"),
            },
        }
    }

    /// Returns `true` when the error originated in the durable store
    pub fn is_durable(&self) -> bool {
        matches!(
            self,
            Self::DurableIo { .. } | Self::DurableTimeout { .. } | Self::DurableCapacity { .. }
        )
    }

    /// The store operation that failed, if any
    pub fn operation(&self) -> Option<StoreOperation> {
        match self {
            Self::DurableIo { operation, .. }
            | Self::DurableTimeout { operation, .. }
            | Self::DurableCapacity { operation, .. }
            | Self::Codec { operation, .. } => Some(*operation),
            Self::Configuration(_) => None,
        }
    }
}

/// Severity levels used for monitoring and alerting
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Informational, expected conditions
    Info,
    /// Degraded but operational
    Warning,
    /// Failure requiring attention
    Error,
    /// Data integrity at risk
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// Standard interface for classifying errors by their characteristics
pub trait ErrorClassification {
    /// Can the failed operation be retried as-is?
    fn is_retryable(&self) -> bool;

    /// How serious is this error?
    fn severity(&self) -> ErrorSeverity;

    /// Does this error require immediate attention?
    fn is_critical(&self) -> bool {
        self.severity() == ErrorSeverity::Critical
    }
}

impl ErrorClassification for CacheError {
    fn is_retryable(&self) -> bool {
        matches!(self, Self::DurableIo { .. } | Self::DurableTimeout { .. })
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::DurableIo { .. } => ErrorSeverity::Error,
            Self::DurableTimeout { .. } => ErrorSeverity::Warning,
            Self::DurableCapacity { .. } => ErrorSeverity::Critical,
            Self::Configuration(_) => ErrorSeverity::Error,
            Self::Codec { .. } => ErrorSeverity::Critical,
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for error.
    use std::io;

    use super::*;

    /// Validates the mapping of every store error variant.
    ///
    /// Assertions:
    /// - I/O maps to `DurableIo` and keeps the operation.
    /// - Store-reported timeout maps to `DurableTimeout` with the configured
    ///   deadline.
    /// - Capacity maps to `DurableCapacity` with both byte counts in the
    ///   message.
    #[test]
    fn test_from_store_mapping() {
        let io = CacheError::from_store(
            StoreOperation::Get,
            StoreError::Io(io::Error::other("disk gone")),
            None,
        );
        assert!(matches!(io, CacheError::DurableIo { operation: StoreOperation::Get, .. }));

        let timeout = CacheError::from_store(
            StoreOperation::Put,
            StoreError::Timeout,
            Some(Duration::from_millis(250)),
        );
        match timeout {
            CacheError::DurableTimeout { operation, timeout } => {
                assert_eq!(operation, StoreOperation::Put);
                assert_eq!(timeout, Duration::from_millis(250));
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let capacity = CacheError::from_store(
            StoreOperation::Put,
            StoreError::Capacity { requested: 10, available: 3 },
            None,
        );
        let message = capacity.to_string();
        assert!(message.contains("10"));
        assert!(message.contains('3'));
    }

    /// Validates the classification table.
    ///
    /// Assertions:
    /// - I/O and timeout errors are retryable, the rest are not.
    /// - Capacity and codec errors are critical.
    #[test]
    fn test_classification() {
        let io = CacheError::DurableIo {
            operation: StoreOperation::Get,
            source: io::Error::other("boom"),
        };
        let timeout = CacheError::DurableTimeout {
            operation: StoreOperation::Get,
            timeout: Duration::from_secs(1),
        };
        let capacity =
            CacheError::DurableCapacity { operation: StoreOperation::Put, message: "full".into() };
        let config = CacheError::config("zero capacity");
        let codec = CacheError::Codec { operation: StoreOperation::Get, message: "utf8".into() };

        assert!(io.is_retryable());
        assert!(timeout.is_retryable());
        assert!(!capacity.is_retryable());
        assert!(!config.is_retryable());
        assert!(!codec.is_retryable());

        assert!(capacity.is_critical());
        assert!(codec.is_critical());
        assert_eq!(timeout.severity(), ErrorSeverity::Warning);
        assert_eq!(io.severity(), ErrorSeverity::Error);
    }

    /// Validates the durable/operation helpers.
    #[test]
    fn test_operation_accessor() {
        let config = CacheError::config("no tiers");
        assert!(!config.is_durable());
        assert_eq!(config.operation(), None);

        let timeout = CacheError::DurableTimeout {
            operation: StoreOperation::Remove,
            timeout: Duration::from_secs(1),
        };
        assert!(timeout.is_durable());
        assert_eq!(timeout.operation(), Some(StoreOperation::Remove));
    }
}
