//! # Stratum Infrastructure
//!
//! Concrete implementations of the `stratum-core` durable store port.
//!
//! This crate contains:
//! - [`MemoryStore`]: in-process store backed by a concurrent map
//! - [`FsStore`]: one file per key under a root directory
//! - [`config`]: loading a `HierarchyConfig` from files or the environment
//!
//! ## Architecture
//! - Implements traits defined in `stratum-core`
//! - Contains all "impure" code (filesystem, environment)

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]

pub mod config;
pub mod fs;
pub mod memory;

pub use fs::FsStore;
pub use memory::MemoryStore;
use stratum_core::{Deadline, StoreError, StoreResult};

/// Fail with `StoreError::Timeout` when `deadline` has already passed
pub(crate) fn ensure_deadline(deadline: Deadline) -> StoreResult<()> {
    match deadline {
        Some(deadline) if tokio::time::Instant::now() >= deadline => Err(StoreError::Timeout),
        _ => Ok(()),
    }
}
