//! A single bounded cache level
//!
//! A [`Tier`] owns a key → [`Entry`] index, an [`EvictionPolicy`] tracking
//! the same key set, and its own hit/miss counters. Every operation runs
//! inside one short exclusive critical section, so two operations on the
//! same tier never interleave while operations on different tiers proceed
//! independently.
//!
//! Note that [`Tier::lookup`] is a *mutating* operation: a hit refreshes
//! the entry's recency. Use [`Tier::peek`] or [`Tier::contains`] to inspect
//! without side effects.
//!
//! # Example
//! ```
//! use stratum_core::Tier;
//!
//! let tier: Tier<String, i32> = Tier::new(2).unwrap();
//! tier.insert("a".to_string(), 1);
//! tier.insert("b".to_string(), 2);
//! assert_eq!(tier.lookup(&"a".to_string()), Some(1));
//!
//! // "b" is now least recently used
//! assert_eq!(tier.insert("c".to_string(), 3), Some("b".to_string()));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{trace, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::TierConfig;
use crate::entry::Entry;
use crate::error::{CacheError, CacheResult};
use crate::policy::{EvictionPolicy, Lru};
use crate::stats::{TierMetrics, TierStats};

/// State guarded by the tier lock
struct TierState<K, V> {
    entries: HashMap<K, Entry<K, V>>,
    policy: Box<dyn EvictionPolicy<K>>,
    /// Source of recency markers, bumped on every insert and hit
    tick: u64,
}

impl<K, V> TierState<K, V>
where
    K: Eq + Hash + Clone,
{
    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    fn drop_entry(&mut self, key: &K) -> bool {
        if self.entries.remove(key).is_some() {
            self.policy.on_remove(key);
            true
        } else {
            false
        }
    }

    /// Pick and remove the entry the policy gives up
    fn evict_one(&mut self) -> Option<K> {
        let victim = match self.policy.select_victim() {
            Some(key) => key,
            None => {
                // Policy lost track of its keys; fall back to any entry so the
                // capacity bound still holds.
                let key = self.entries.keys().next().cloned()?;
                warn!(policy = self.policy.name(), "eviction policy returned no victim");
                self.policy.on_remove(&key);
                key
            }
        };
        self.entries.remove(&victim);
        Some(victim)
    }
}

/// Bounded, independently evicting cache level
///
/// # Type Parameters
/// - `K`: Key type (must be `Eq + Hash + Clone`)
/// - `V`: Value type (must be `Clone`)
/// - `C`: Clock used for TTL expiry (defaults to `SystemClock`)
pub struct Tier<K, V, C = SystemClock>
where
    C: Clock,
{
    index: usize,
    capacity: usize,
    ttl: Option<Duration>,
    state: Mutex<TierState<K, V>>,
    metrics: TierMetrics,
    clock: C,
}

impl<K, V> Tier<K, V, SystemClock>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Clone,
{
    /// Create an LRU tier holding at most `capacity` entries
    ///
    /// # Errors
    /// Returns `CacheError::Configuration` when `capacity` is zero.
    pub fn new(capacity: usize) -> CacheResult<Self> {
        Self::with_policy(capacity, None, Box::new(Lru::with_capacity(capacity)), SystemClock)
    }
}

impl<K, V, C> Tier<K, V, C>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Clone,
    C: Clock,
{
    /// Create a tier with an explicit eviction strategy, TTL and clock
    ///
    /// # Errors
    /// Returns `CacheError::Configuration` when `capacity` is zero or `ttl`
    /// is zero.
    pub fn with_policy(
        capacity: usize,
        ttl: Option<Duration>,
        policy: Box<dyn EvictionPolicy<K>>,
        clock: C,
    ) -> CacheResult<Self> {
        if capacity == 0 {
            return Err(CacheError::config("tier capacity must be greater than zero"));
        }
        if ttl == Some(Duration::ZERO) {
            return Err(CacheError::config("tier ttl must be greater than zero"));
        }

        Ok(Self {
            index: 0,
            capacity,
            ttl,
            state: Mutex::new(TierState {
                entries: HashMap::with_capacity(capacity),
                policy,
                tick: 0,
            }),
            metrics: TierMetrics::default(),
            clock,
        })
    }

    /// Create a tier from its configuration
    ///
    /// # Errors
    /// Returns `CacheError::Configuration` for an invalid configuration.
    pub fn from_config(index: usize, config: &TierConfig, clock: C) -> CacheResult<Self> {
        let policy = config.eviction.build(config.capacity);
        Ok(Self::with_policy(config.capacity, config.ttl, policy, clock)?.with_index(index))
    }

    /// Place the tier at position `index` in a hierarchy
    pub(crate) fn with_index(mut self, index: usize) -> Self {
        self.index = index;
        self.state.get_mut().entries.values_mut().for_each(|entry| entry.tier = index);
        self
    }

    /// Look up `key`, marking it most recently used on a hit.
    ///
    /// Records a hit or a miss. An entry whose TTL has elapsed is removed
    /// and reported as a miss.
    pub fn lookup(&self, key: &K) -> Option<V> {
        let now = self.clock.now();
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let expired = match state.entries.get(key) {
            Some(entry) => self.is_expired(entry, now),
            None => {
                drop(guard);
                self.metrics.record_miss();
                return None;
            }
        };

        if expired {
            state.drop_entry(key);
            drop(guard);
            trace!(tier = self.index, "entry expired on lookup");
            self.metrics.record_expiration();
            self.metrics.record_miss();
            return None;
        }

        let tick = state.next_tick();
        let value = state.entries.get_mut(key).map(|entry| {
            entry.touch(tick);
            entry.value.clone()
        });
        state.policy.on_access(key);
        drop(guard);

        self.metrics.record_hit();
        value
    }

    /// Insert or overwrite `key`, marking it most recently used.
    ///
    /// When a new key would push the tier past its capacity, exactly one
    /// entry is evicted first and its key is returned. Overwrites never
    /// evict.
    pub fn insert(&self, key: K, value: V) -> Option<K> {
        let now = self.clock.now();
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let tick = state.next_tick();
        let mut evicted = None;

        if let Some(entry) = state.entries.get_mut(&key) {
            entry.value = value;
            entry.recency = tick;
            entry.inserted_at = now;
            state.policy.on_insert(&key);
        } else {
            if state.entries.len() >= self.capacity {
                evicted = state.evict_one();
            }
            state.policy.on_insert(&key);
            state.entries.insert(key.clone(), Entry::new(key, value, self.index, tick, now));
        }

        debug_assert!(state.entries.len() <= self.capacity);
        let policy = state.policy.name();
        drop(guard);

        self.metrics.record_insert();
        if evicted.is_some() {
            self.metrics.record_eviction();
            trace!(tier = self.index, policy, "evicted entry to stay within capacity");
        }
        evicted
    }

    /// Remove `key`. Does not affect the order of other entries.
    pub fn remove(&self, key: &K) -> bool {
        self.state.lock().drop_entry(key)
    }

    /// Snapshot of the live entry for `key` without touching recency or stats
    pub fn peek(&self, key: &K) -> Option<Entry<K, V>> {
        let now = self.clock.now();
        let state = self.state.lock();
        state.entries.get(key).filter(|entry| !self.is_expired(entry, now)).cloned()
    }

    /// Returns `true` when a live entry for `key` is resident
    pub fn contains(&self, key: &K) -> bool {
        let now = self.clock.now();
        let state = self.state.lock();
        state.entries.get(key).is_some_and(|entry| !self.is_expired(entry, now))
    }

    /// Number of resident entries (expired entries count until purged)
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// Returns `true` when the tier holds no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of entries, fixed at construction
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Position of the tier in its hierarchy (0 = fastest)
    pub fn index(&self) -> usize {
        self.index
    }

    /// Expire-after-write duration, if any
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// Label of the eviction strategy in use
    pub fn policy_name(&self) -> &'static str {
        self.state.lock().policy.name()
    }

    /// Resident keys, most protected first, next eviction candidate last
    pub fn keys_by_priority(&self) -> Vec<K> {
        self.state.lock().policy.ordered_keys()
    }

    /// Drop every entry. Counters are kept.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.entries.clear();
        state.policy.clear();
    }

    /// Remove every entry whose TTL has elapsed, returning how many were
    /// removed
    pub fn purge_expired(&self) -> usize {
        if self.ttl.is_none() {
            return 0;
        }

        let now = self.clock.now();
        let mut state = self.state.lock();
        let expired: Vec<K> = state
            .entries
            .iter()
            .filter(|(_, entry)| self.is_expired(entry, now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            state.drop_entry(key);
        }
        drop(state);

        for _ in &expired {
            self.metrics.record_expiration();
        }
        expired.len()
    }

    /// Current counters for this tier
    pub fn stats(&self) -> TierStats {
        self.metrics.snapshot(self.index, self.capacity, self.len())
    }

    fn is_expired(&self, entry: &Entry<K, V>, now: Instant) -> bool {
        self.ttl.is_some_and(|ttl| now.saturating_duration_since(entry.inserted_at) >= ttl)
    }
}

impl<K, V, C> fmt::Debug for Tier<K, V, C>
where
    C: Clock,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tier")
            .field("index", &self.index)
            .field("capacity", &self.capacity)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}
