//! Ordered set of tiers backed by an optional durable store
//!
//! A [`CacheHierarchy`] answers `get` from the fastest tier holding the key,
//! copies hits found further down into faster tiers, and falls back to the
//! [`DurableStore`] when every tier misses. Writes go to every tier and,
//! depending on the [`WritePolicy`], reach the store either immediately or
//! on the next [`flush`](CacheHierarchy::flush).
//!
//! Each tier is guarded independently and no lock is held across a durable
//! store call. Two concurrent writers of the same key may therefore leave
//! different tiers briefly disagreeing; the next write or the value's
//! eviction resolves it.
//!
//! # Example
//! ```
//! use stratum_core::{CacheHierarchy, HierarchyConfig};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let cache: CacheHierarchy<String, String> =
//!     CacheHierarchy::new(HierarchyConfig::with_capacities(&[2, 4])).unwrap();
//!
//! cache.put("a".to_string(), "alpha".to_string()).await.unwrap();
//! assert_eq!(cache.get(&"a".to_string()).await.unwrap(), Some("alpha".to_string()));
//! # }
//! ```

mod write_back;

use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::ops::Range;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, instrument, trace, warn};

use self::write_back::{PendingWrite, WriteBackBuffer};
use crate::clock::{Clock, SystemClock};
use crate::config::{HierarchyConfig, PromotionPolicy, WritePolicy};
use crate::error::{CacheError, CacheResult};
use crate::stats::{HierarchyMetrics, HierarchyStats};
use crate::store::{Deadline, DurableKey, DurableStore, DurableValue, StoreOperation, StoreResult};
use crate::tier::Tier;

/// Multi-tier cache with promotion and optional durable backing
///
/// # Type Parameters
/// - `K`: Key type, encoded with [`DurableKey`] for the store
/// - `V`: Value type, encoded with [`DurableValue`] for the store
/// - `C`: Clock used by every tier for TTL expiry (defaults to `SystemClock`)
pub struct CacheHierarchy<K, V, C = SystemClock>
where
    C: Clock,
{
    tiers: Vec<Tier<K, V, C>>,
    store: Option<Arc<dyn DurableStore>>,
    write_policy: WritePolicy,
    promotion: PromotionPolicy,
    durable_timeout: Option<Duration>,
    write_back_max_pending: Option<usize>,
    pending: WriteBackBuffer,
    /// Serializes flushes so staged batches reach the store in order
    flush_lock: tokio::sync::Mutex<()>,
    metrics: HierarchyMetrics,
}

impl<K, V> CacheHierarchy<K, V, SystemClock>
where
    K: Eq + Hash + Clone + Send + Sync + DurableKey + 'static,
    V: Clone + Send + Sync + DurableValue + 'static,
{
    /// Memory-only hierarchy
    ///
    /// # Errors
    /// Returns `CacheError::Configuration` when `config` fails validation.
    pub fn new(config: HierarchyConfig) -> CacheResult<Self> {
        Self::with_clock(config, None, SystemClock)
    }

    /// Hierarchy backed by `store`
    ///
    /// # Errors
    /// Returns `CacheError::Configuration` when `config` fails validation.
    pub fn with_store(config: HierarchyConfig, store: Arc<dyn DurableStore>) -> CacheResult<Self> {
        Self::with_clock(config, Some(store), SystemClock)
    }
}

impl<K, V, C> CacheHierarchy<K, V, C>
where
    K: Eq + Hash + Clone + Send + Sync + DurableKey + 'static,
    V: Clone + Send + Sync + DurableValue + 'static,
    C: Clock + Clone,
{
    /// Hierarchy whose tiers share `clock` for TTL expiry
    ///
    /// # Errors
    /// Returns `CacheError::Configuration` when `config` fails validation.
    pub fn with_clock(
        config: HierarchyConfig,
        store: Option<Arc<dyn DurableStore>>,
        clock: C,
    ) -> CacheResult<Self> {
        config.validate()?;
        let tiers = config
            .tiers
            .iter()
            .enumerate()
            .map(|(index, tier)| Tier::from_config(index, tier, clock.clone()))
            .collect::<CacheResult<Vec<_>>>()?;
        Ok(Self::assemble(tiers, store, &config))
    }
}

impl<K, V, C> CacheHierarchy<K, V, C>
where
    K: Eq + Hash + Clone + Send + Sync + DurableKey + 'static,
    V: Clone + Send + Sync + DurableValue + 'static,
    C: Clock,
{
    /// Hierarchy over pre-built tiers, fastest first.
    ///
    /// `config.tiers` is ignored; the remaining options apply. Tiers are
    /// re-indexed by position.
    ///
    /// # Errors
    /// Returns `CacheError::Configuration` when `tiers` is empty or an
    /// option in `config` is invalid.
    pub fn from_tiers(
        tiers: Vec<Tier<K, V, C>>,
        config: &HierarchyConfig,
        store: Option<Arc<dyn DurableStore>>,
    ) -> CacheResult<Self> {
        if tiers.is_empty() {
            return Err(CacheError::config("at least one tier is required"));
        }
        config.validate_options()?;

        let tiers = tiers.into_iter().enumerate().map(|(i, tier)| tier.with_index(i)).collect();
        Ok(Self::assemble(tiers, store, config))
    }

    fn assemble(
        tiers: Vec<Tier<K, V, C>>,
        store: Option<Arc<dyn DurableStore>>,
        config: &HierarchyConfig,
    ) -> Self {
        debug!(
            tiers = tiers.len(),
            durable = store.is_some(),
            write_policy = ?config.write_policy,
            promotion = ?config.promotion,
            "cache hierarchy created"
        );
        Self {
            tiers,
            store,
            write_policy: config.write_policy,
            promotion: config.promotion,
            durable_timeout: config.durable_timeout,
            write_back_max_pending: config.write_back_max_pending,
            pending: WriteBackBuffer::default(),
            flush_lock: tokio::sync::Mutex::new(()),
            metrics: HierarchyMetrics::default(),
        }
    }

    /// Look up `key`, consulting tiers fastest first and then the store.
    ///
    /// A hit in a slower tier is promoted into faster tiers according to the
    /// [`PromotionPolicy`]. A durable hit fills the tiers the same way.
    /// `Ok(None)` means the key is absent everywhere.
    ///
    /// # Errors
    /// Returns a durable error when the store fails, times out, or returns
    /// bytes that do not decode. Store failures are never reported as a
    /// miss.
    pub async fn get(&self, key: &K) -> CacheResult<Option<V>> {
        for (index, tier) in self.tiers.iter().enumerate() {
            if let Some(value) = tier.lookup(key) {
                if index > 0 {
                    self.promote(key, &value, self.promotion_targets(index));
                }
                return Ok(Some(value));
            }
        }

        let Some(store) = self.store.as_ref() else {
            self.metrics.record_miss();
            return Ok(None);
        };

        let key_bytes = key.to_key_bytes();
        if let Some(pending) = self.pending.lookup(&key_bytes) {
            return match pending {
                PendingWrite::Put(bytes) => {
                    let value = self.decode(&bytes)?;
                    self.metrics.record_durable_hit();
                    self.promote(key, &value, self.durable_fill_targets());
                    Ok(Some(value))
                }
                PendingWrite::Remove => {
                    self.metrics.record_durable_miss();
                    Ok(None)
                }
            };
        }

        self.metrics.record_durable_read();
        let fetched =
            self.durable_call(StoreOperation::Get, |deadline| store.get(&key_bytes, deadline)).await?;

        match fetched {
            Some(bytes) => {
                let value = self.decode(&bytes)?;
                self.metrics.record_durable_hit();
                self.promote(key, &value, self.durable_fill_targets());
                Ok(Some(value))
            }
            None => {
                self.metrics.record_durable_miss();
                Ok(None)
            }
        }
    }

    /// Store `value` under `key` in every tier, then in the durable store.
    ///
    /// Under write-through the store call completes before this returns.
    /// Under write-back the write is staged and reaches the store on the
    /// next flush (or immediately once `write_back_max_pending` is hit).
    ///
    /// # Errors
    /// Returns a durable error when the store write fails. The in-memory
    /// tiers already hold the new value in that case.
    pub async fn put(&self, key: K, value: V) -> CacheResult<()> {
        for tier in &self.tiers {
            tier.insert(key.clone(), value.clone());
        }

        let Some(store) = self.store.as_ref() else {
            return Ok(());
        };

        let key_bytes = key.to_key_bytes();
        let bytes = value.encode();
        match self.write_policy {
            WritePolicy::WriteThrough => {
                self.metrics.record_durable_write();
                self.durable_call(StoreOperation::Put, |deadline| {
                    store.put(&key_bytes, bytes, deadline)
                })
                .await
            }
            WritePolicy::WriteBack => {
                let pending = self.pending.stage(key_bytes, PendingWrite::Put(bytes));
                self.flush_if_full(pending).await
            }
        }
    }

    /// Remove `key` from every tier and from the durable store.
    ///
    /// Returns `true` when the key was present anywhere. Removing an absent
    /// key is not an error.
    ///
    /// # Errors
    /// Returns a durable error when the store removal fails.
    pub async fn remove(&self, key: &K) -> CacheResult<bool> {
        let mut removed = false;
        for tier in &self.tiers {
            removed |= tier.remove(key);
        }

        let Some(store) = self.store.as_ref() else {
            return Ok(removed);
        };

        let key_bytes = key.to_key_bytes();
        match self.write_policy {
            WritePolicy::WriteThrough => {
                self.metrics.record_durable_write();
                let existed = self
                    .durable_call(StoreOperation::Remove, |deadline| {
                        store.remove(&key_bytes, deadline)
                    })
                    .await?;
                Ok(removed || existed)
            }
            WritePolicy::WriteBack => {
                let staged_put =
                    matches!(self.pending.lookup(&key_bytes), Some(PendingWrite::Put(_)));
                let pending = self.pending.stage(key_bytes, PendingWrite::Remove);
                self.flush_if_full(pending).await?;
                Ok(removed || staged_put)
            }
        }
    }

    /// Write every pending write-back entry to the durable store, oldest
    /// first. A no-op under write-through or without a store.
    ///
    /// # Errors
    /// Returns the first durable error. The failed entry and every entry
    /// after it stay pending for the next flush.
    ///
    /// Each entry stays visible to `get` until its store call succeeds, so
    /// reads racing a flush never fall through to an older stored value.
    #[instrument(level = "debug", skip(self))]
    pub async fn flush(&self) -> CacheResult<()> {
        let Some(store) = self.store.as_ref() else {
            return Ok(());
        };
        if self.write_policy == WritePolicy::WriteThrough {
            return Ok(());
        }

        let _flushing = self.flush_lock.lock().await;
        let batch = self.pending.snapshot();
        if batch.is_empty() {
            return Ok(());
        }

        let total = batch.len();
        let mut superseded = 0;
        for (written, staged) in batch.iter().enumerate() {
            self.metrics.record_durable_write();
            let result = match &staged.write {
                PendingWrite::Put(bytes) => {
                    self.durable_call(StoreOperation::Put, |deadline| {
                        store.put(&staged.key, bytes.clone(), deadline)
                    })
                    .await
                }
                PendingWrite::Remove => self
                    .durable_call(StoreOperation::Remove, |deadline| {
                        store.remove(&staged.key, deadline)
                    })
                    .await
                    .map(|_| ()),
            };

            if let Err(error) = result {
                warn!(
                    unwritten = total - written,
                    total,
                    "write-back flush stopped early, entries stay pending"
                );
                return Err(error);
            }
            if !self.pending.complete(&staged.key, staged.seq) {
                superseded += 1;
            }
        }

        debug!(written = total, superseded, "write-back flush complete");
        Ok(())
    }

    /// Return the cached or stored value for `key`, otherwise compute it
    /// with `loader` and `put` the result.
    ///
    /// # Errors
    /// Returns a durable error from the lookup or from storing the loaded
    /// value.
    pub async fn get_or_load<F, Fut>(&self, key: K, loader: F) -> CacheResult<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V>,
    {
        if let Some(value) = self.get(&key).await? {
            return Ok(value);
        }

        let value = loader().await;
        self.put(key, value.clone()).await?;
        Ok(value)
    }

    /// Returns `true` when some tier holds a live entry for `key`.
    ///
    /// Does not consult the store and does not touch recency or counters.
    pub fn contains(&self, key: &K) -> bool {
        self.tiers.iter().any(|tier| tier.contains(key))
    }

    /// Drop every in-memory entry. The store and pending writes are kept.
    pub fn clear(&self) {
        for tier in &self.tiers {
            tier.clear();
        }
    }

    /// Remove expired entries from every tier, returning the total removed
    pub fn purge_expired(&self) -> usize {
        self.tiers.iter().map(Tier::purge_expired).sum()
    }

    /// Counters for every tier and the durable path
    pub fn stats_snapshot(&self) -> HierarchyStats {
        let tiers = self.tiers.iter().map(Tier::stats).collect();
        self.metrics.snapshot(tiers, self.pending.len())
    }

    /// Number of in-memory tiers
    pub fn tier_count(&self) -> usize {
        self.tiers.len()
    }

    /// Tier at `index` (0 = fastest)
    pub fn tier(&self, index: usize) -> Option<&Tier<K, V, C>> {
        self.tiers.get(index)
    }

    /// Write-back entries waiting for a flush
    pub fn pending_writes(&self) -> usize {
        self.pending.len()
    }

    /// Durable write policy in effect
    pub fn write_policy(&self) -> WritePolicy {
        self.write_policy
    }

    /// Returns `true` when a durable store is attached
    pub fn has_store(&self) -> bool {
        self.store.is_some()
    }

    async fn flush_if_full(&self, pending: usize) -> CacheResult<()> {
        match self.write_back_max_pending {
            Some(max) if pending >= max => self.flush().await,
            _ => Ok(()),
        }
    }

    /// Tiers that receive a value found in tier `hit`
    fn promotion_targets(&self, hit: usize) -> Range<usize> {
        match self.promotion {
            PromotionPolicy::AllTiers => 0..hit,
            PromotionPolicy::Adjacent => hit - 1..hit,
        }
    }

    /// Tiers that receive a value read from the store
    fn durable_fill_targets(&self) -> Range<usize> {
        let count = self.tiers.len();
        match self.promotion {
            PromotionPolicy::AllTiers => 0..count,
            PromotionPolicy::Adjacent => count - 1..count,
        }
    }

    fn promote(&self, key: &K, value: &V, targets: Range<usize>) {
        let count = targets.len() as u64;
        for tier in &self.tiers[targets] {
            tier.insert(key.clone(), value.clone());
        }
        self.metrics.record_promotions(count);
        trace!(promotions = count, "promoted value into faster tiers");
    }

    fn decode(&self, bytes: &[u8]) -> CacheResult<V> {
        V::decode(bytes).map_err(|error| {
            self.metrics.record_durable_error();
            warn!(error = %error.0, "durable value failed to decode");
            CacheError::Codec { operation: StoreOperation::Get, message: error.0 }
        })
    }

    /// Run one store call under the configured deadline, mapping and
    /// counting failures
    async fn durable_call<T, F, Fut>(&self, operation: StoreOperation, call: F) -> CacheResult<T>
    where
        F: FnOnce(Deadline) -> Fut,
        Fut: Future<Output = StoreResult<T>>,
    {
        let result = match self.durable_timeout {
            Some(timeout) => {
                let deadline = tokio::time::Instant::now() + timeout;
                match tokio::time::timeout_at(deadline, call(Some(deadline))).await {
                    Ok(result) => {
                        result.map_err(|e| CacheError::from_store(operation, e, Some(timeout)))
                    }
                    Err(_) => Err(CacheError::DurableTimeout { operation, timeout }),
                }
            }
            None => call(None).await.map_err(|e| CacheError::from_store(operation, e, None)),
        };

        if let Err(error) = &result {
            self.metrics.record_durable_error();
            warn!(%operation, %error, "durable store call failed");
        }
        result
    }
}

impl<K, V, C> fmt::Debug for CacheHierarchy<K, V, C>
where
    C: Clock,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheHierarchy")
            .field("tiers", &self.tiers)
            .field("durable", &self.store.is_some())
            .field("write_policy", &self.write_policy)
            .field("promotion", &self.promotion)
            .field("durable_timeout", &self.durable_timeout)
            .field("pending_writes", &self.pending.len())
            .finish_non_exhaustive()
    }
}

impl<K, V, C> Drop for CacheHierarchy<K, V, C>
where
    C: Clock,
{
    fn drop(&mut self) {
        let pending = self.pending.len();
        if pending > 0 {
            warn!(pending, "cache hierarchy dropped with unflushed write-back entries");
        }
    }
}
