//! Eviction strategies
//!
//! A [`Tier`](crate::Tier) delegates the choice of which entry to drop to an
//! [`EvictionPolicy`] object handed to it at construction. The tier keeps
//! the key → entry index; the policy keeps its own ordering over exactly
//! the same key set and is only ever called from inside the tier's
//! critical section.
//!
//! # Built-in policies
//!
//! - **LRU** ([`Lru`]): evicts the entry that was inserted or looked up
//!   least recently. Entries never accessed are evicted in insertion order.
//! - **FIFO** ([`Fifo`]): evicts the oldest entry by first insertion;
//!   lookups and overwrites do not reorder.
//! - **LFU** ([`Lfu`]): evicts the entry with the fewest uses; ties go to
//!   the least recently used.
//!
//! # Custom policies
//!
//! ```
//! use stratum_core::policy::EvictionPolicy;
//!
//! /// Never keeps anything but the newest key.
//! #[derive(Default)]
//! struct Newest(Option<u64>);
//!
//! impl EvictionPolicy<u64> for Newest {
//!     fn name(&self) -> &'static str {
//!         "newest"
//!     }
//!     fn on_insert(&mut self, key: &u64) {
//!         self.0 = Some(*key);
//!     }
//!     fn on_access(&mut self, _key: &u64) {}
//!     fn on_remove(&mut self, key: &u64) {
//!         if self.0 == Some(*key) {
//!             self.0 = None;
//!         }
//!     }
//!     fn select_victim(&mut self) -> Option<u64> {
//!         self.0.take()
//!     }
//!     fn ordered_keys(&self) -> Vec<u64> {
//!         self.0.into_iter().collect()
//!     }
//!     fn len(&self) -> usize {
//!         usize::from(self.0.is_some())
//!     }
//!     fn clear(&mut self) {
//!         self.0 = None;
//!     }
//! }
//! ```

mod fifo;
mod lfu;
mod lru;
mod recency_list;

use std::hash::Hash;

pub use fifo::Fifo;
pub use lfu::Lfu;
pub use lru::Lru;
use serde::{Deserialize, Serialize};

/// Strategy deciding which entry a full tier gives up
pub trait EvictionPolicy<K>: Send {
    /// Short label used in logs
    fn name(&self) -> &'static str;

    /// A key was written into the tier (new or overwritten)
    fn on_insert(&mut self, key: &K);

    /// A key was returned by a lookup
    fn on_access(&mut self, key: &K);

    /// A key left the tier for any reason other than `select_victim`
    fn on_remove(&mut self, key: &K);

    /// Choose the next entry to evict and forget it
    fn select_victim(&mut self) -> Option<K>;

    /// Tracked keys, most protected first, next victim last
    fn ordered_keys(&self) -> Vec<K>;

    /// Number of tracked keys
    fn len(&self) -> usize;

    /// Returns `true` when no keys are tracked
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget every key
    fn clear(&mut self);
}

/// Built-in policy selector used by configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvictionKind {
    /// Least Recently Used
    #[default]
    Lru,
    /// Least Frequently Used
    Lfu,
    /// First In First Out
    Fifo,
}

impl EvictionKind {
    /// Instantiate the policy for a tier of `capacity` entries
    pub fn build<K>(self, capacity: usize) -> Box<dyn EvictionPolicy<K>>
    where
        K: Eq + Hash + Clone + Send + 'static,
    {
        match self {
            Self::Lru => Box::new(Lru::with_capacity(capacity)),
            Self::Lfu => Box::new(Lfu::with_capacity(capacity)),
            Self::Fifo => Box::new(Fifo::with_capacity(capacity)),
        }
    }
}

impl std::str::FromStr for EvictionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lru" => Ok(Self::Lru),
            "lfu" => Ok(Self::Lfu),
            "fifo" => Ok(Self::Fifo),
            other => Err(format!("unknown eviction policy '{other}'")),
        }
    }
}
