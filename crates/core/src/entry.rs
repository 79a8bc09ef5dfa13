//! Cached value plus the bookkeeping a tier keeps for it.

use std::time::Instant;

/// Entry stored in a tier
///
/// `recency` is a per-tier logical tick that strictly increases on every
/// insert and lookup of the entry. Entries handed out by
/// [`Tier::peek`](crate::Tier::peek) are snapshots; mutating them has no
/// effect on the tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry<K, V> {
    /// Key, unique within its tier
    pub key: K,
    /// Opaque payload
    pub value: V,
    /// Logical timestamp of the last insert or lookup
    pub recency: u64,
    /// Index of the tier holding the entry (0 = fastest)
    pub tier: usize,
    /// When the value was last written into the tier
    pub inserted_at: Instant,
    /// Number of lookups that returned this entry since it was written
    pub access_count: u64,
}

impl<K, V> Entry<K, V> {
    pub(crate) fn new(key: K, value: V, tier: usize, recency: u64, now: Instant) -> Self {
        Self { key, value, recency, tier, inserted_at: now, access_count: 0 }
    }

    /// Mark the entry as used at logical time `recency`
    pub(crate) fn touch(&mut self, recency: u64) {
        self.recency = recency;
        self.access_count += 1;
    }
}
