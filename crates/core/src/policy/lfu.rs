use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

use super::EvictionPolicy;

/// Least Frequently Used eviction
///
/// Every insert or lookup counts as one use. The victim is the key with the
/// fewest uses; among equals, the one used least recently.
#[derive(Debug)]
pub struct Lfu<K>
where
    K: Eq + Hash + Clone,
{
    /// key -> (uses, tick of last use)
    ranks: HashMap<K, (u64, u64)>,
    /// (uses, tick) -> key, smallest first
    order: BTreeMap<(u64, u64), K>,
    tick: u64,
}

impl<K> Lfu<K>
where
    K: Eq + Hash + Clone,
{
    /// Create a policy sized for `capacity` keys
    pub fn with_capacity(capacity: usize) -> Self {
        Self { ranks: HashMap::with_capacity(capacity), order: BTreeMap::new(), tick: 0 }
    }

    fn bump(&mut self, key: &K, insert_if_missing: bool) {
        self.tick += 1;
        let tick = self.tick;
        match self.ranks.get_mut(key) {
            Some(rank) => {
                self.order.remove(&*rank);
                rank.0 += 1;
                rank.1 = tick;
                self.order.insert(*rank, key.clone());
            }
            None if insert_if_missing => {
                self.ranks.insert(key.clone(), (1, tick));
                self.order.insert((1, tick), key.clone());
            }
            None => {}
        }
    }

    /// Number of recorded uses for `key`
    pub fn uses(&self, key: &K) -> Option<u64> {
        self.ranks.get(key).map(|(uses, _)| *uses)
    }
}

impl<K> Default for Lfu<K>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::with_capacity(0)
    }
}

impl<K> EvictionPolicy<K> for Lfu<K>
where
    K: Eq + Hash + Clone + Send,
{
    fn name(&self) -> &'static str {
        "lfu"
    }

    fn on_insert(&mut self, key: &K) {
        self.bump(key, true);
    }

    fn on_access(&mut self, key: &K) {
        self.bump(key, false);
    }

    fn on_remove(&mut self, key: &K) {
        if let Some(rank) = self.ranks.remove(key) {
            self.order.remove(&rank);
        }
    }

    fn select_victim(&mut self) -> Option<K> {
        let (_, key) = self.order.pop_first()?;
        self.ranks.remove(&key);
        Some(key)
    }

    fn ordered_keys(&self) -> Vec<K> {
        self.order.values().rev().cloned().collect()
    }

    fn len(&self) -> usize {
        self.ranks.len()
    }

    fn clear(&mut self) {
        self.ranks.clear();
        self.order.clear();
    }
}
