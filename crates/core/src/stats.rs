//! Hit/miss accounting for tiers and the durable store
//!
//! Counters are plain atomics updated with relaxed ordering. A snapshot
//! never blocks writers and never observes a torn counter, but the
//! snapshot as a whole is not a single point-in-time view across all
//! counters. Use it for observability, not for correctness decisions.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Statistics for one tier
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TierStats {
    /// Tier index (0 = fastest)
    pub tier: usize,

    /// Configured maximum number of entries
    pub capacity: usize,

    /// Current number of entries
    pub size: usize,

    /// Lookups that found a live entry
    pub hits: u64,

    /// Lookups that found nothing (or only an expired entry)
    pub misses: u64,

    /// Insert operations, including overwrites and promotions
    pub inserts: u64,

    /// Entries dropped to stay within capacity
    pub evictions: u64,

    /// Entries dropped because their TTL elapsed
    pub expirations: u64,
}

impl TierStats {
    /// Calculate hit rate (hits / total lookups)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Calculate miss rate (misses / total lookups)
    pub fn miss_rate(&self) -> f64 {
        1.0 - self.hit_rate()
    }

    /// Fraction of the capacity currently in use
    pub fn fill_ratio(&self) -> f64 {
        if self.capacity == 0 {
            0.0
        } else {
            self.size as f64 / self.capacity as f64
        }
    }

    /// Total number of lookups (hits + misses)
    pub fn total_lookups(&self) -> u64 {
        self.hits + self.misses
    }
}

/// Statistics for the durable store path
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DurableStats {
    /// Reads answered with a value (including pending write-back entries)
    pub hits: u64,

    /// Reads answered with "absent"
    pub misses: u64,

    /// Calls that failed (I/O, timeout, capacity, decode)
    pub errors: u64,

    /// Read calls issued to the store
    pub reads: u64,

    /// Put and remove calls issued to the store
    pub writes: u64,
}

/// Snapshot of every counter in a hierarchy
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HierarchyStats {
    /// One entry per in-memory tier, fastest first
    pub tiers: Vec<TierStats>,

    /// Durable store counters
    pub durable: DurableStats,

    /// `get` calls that missed every tier with no durable store configured
    pub misses: u64,

    /// Values copied upward into faster tiers after a hit
    pub promotions: u64,

    /// Write-back entries waiting for `flush`
    pub pending_writes: usize,
}

impl HierarchyStats {
    /// Hits across every in-memory tier
    pub fn memory_hits(&self) -> u64 {
        self.tiers.iter().map(|t| t.hits).sum()
    }

    /// Fraction of `get` calls answered by an in-memory tier.
    ///
    /// Every `get` ends in exactly one of: a tier hit, a durable hit, a
    /// durable miss, a durable error, or an overall miss.
    pub fn memory_hit_rate(&self) -> f64 {
        let total = self.memory_hits()
            + self.durable.hits
            + self.durable.misses
            + self.durable.errors
            + self.misses;
        if total == 0 {
            0.0
        } else {
            self.memory_hits() as f64 / total as f64
        }
    }

    /// Statistics for tier `index`
    pub fn tier(&self, index: usize) -> Option<&TierStats> {
        self.tiers.get(index)
    }
}

/// Thread-safe counters for one tier
#[derive(Debug, Default)]
pub(crate) struct TierMetrics {
    hits: AtomicU64,
    misses: AtomicU64,
    inserts: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
}

impl TierMetrics {
    pub(crate) fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_insert(&self) {
        self.inserts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_expiration(&self) {
        self.expirations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, tier: usize, capacity: usize, size: usize) -> TierStats {
        TierStats {
            tier,
            capacity,
            size,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            inserts: self.inserts.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
        }
    }
}

/// Thread-safe counters for the hierarchy itself
#[derive(Debug, Default)]
pub(crate) struct HierarchyMetrics {
    misses: AtomicU64,
    promotions: AtomicU64,
    durable_hits: AtomicU64,
    durable_misses: AtomicU64,
    durable_errors: AtomicU64,
    durable_reads: AtomicU64,
    durable_writes: AtomicU64,
}

impl HierarchyMetrics {
    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_promotions(&self, count: u64) {
        self.promotions.fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn record_durable_hit(&self) {
        self.durable_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_durable_miss(&self) {
        self.durable_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_durable_error(&self) {
        self.durable_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_durable_read(&self) {
        self.durable_reads.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_durable_write(&self) {
        self.durable_writes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, tiers: Vec<TierStats>, pending_writes: usize) -> HierarchyStats {
        HierarchyStats {
            tiers,
            durable: DurableStats {
                hits: self.durable_hits.load(Ordering::Relaxed),
                misses: self.durable_misses.load(Ordering::Relaxed),
                errors: self.durable_errors.load(Ordering::Relaxed),
                reads: self.durable_reads.load(Ordering::Relaxed),
                writes: self.durable_writes.load(Ordering::Relaxed),
            },
            misses: self.misses.load(Ordering::Relaxed),
            promotions: self.promotions.load(Ordering::Relaxed),
            pending_writes,
        }
    }
}
