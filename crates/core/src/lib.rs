//! # Stratum Core
//!
//! Multi-tier, capacity-bounded cache with recency eviction, promotion and
//! an optional durable backing store.
//!
//! This crate contains:
//! - [`Tier`]: one bounded cache level with a pluggable eviction policy
//! - [`CacheHierarchy`]: an ordered set of tiers with promotion and
//!   write-through or write-back persistence
//! - [`DurableStore`]: the port a persistence adapter implements
//!
//! ## Architecture Principles
//! - No filesystem, network or database code; adapters live in
//!   `stratum-infra`
//! - Each tier is locked independently and no lock is held across a
//!   durable store call
//! - Store failures are errors, never misses

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod clock;
pub mod config;
pub mod entry;
pub mod error;
pub mod hierarchy;
pub mod policy;
pub mod stats;
pub mod store;
pub mod tier;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use clock::{Clock, MockClock, SystemClock};
pub use config::{HierarchyConfig, HierarchyConfigBuilder, PromotionPolicy, TierConfig, WritePolicy};
pub use entry::Entry;
pub use error::{CacheError, CacheResult, ErrorClassification, ErrorSeverity};
pub use hierarchy::CacheHierarchy;
pub use policy::{EvictionKind, EvictionPolicy};
pub use stats::{DurableStats, HierarchyStats, TierStats};
pub use store::{
    CodecError, Deadline, DurableKey, DurableStore, DurableValue, StoreError, StoreOperation,
    StoreResult,
};
pub use tier::Tier;
