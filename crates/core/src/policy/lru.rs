use std::hash::Hash;

use super::recency_list::RecencyList;
use super::EvictionPolicy;

/// Least Recently Used eviction
///
/// Inserts and lookups move a key to the most recent position; the victim is
/// always the key at the least recent end. Keys that were never looked up
/// therefore leave in insertion order.
#[derive(Debug)]
pub struct Lru<K>
where
    K: Eq + Hash + Clone,
{
    order: RecencyList<K>,
}

impl<K> Lru<K>
where
    K: Eq + Hash + Clone,
{
    /// Create a policy sized for `capacity` keys
    pub fn with_capacity(capacity: usize) -> Self {
        Self { order: RecencyList::with_capacity(capacity) }
    }
}

impl<K> Default for Lru<K>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::with_capacity(0)
    }
}

impl<K> EvictionPolicy<K> for Lru<K>
where
    K: Eq + Hash + Clone + Send,
{
    fn name(&self) -> &'static str {
        "lru"
    }

    fn on_insert(&mut self, key: &K) {
        if !self.order.move_to_front(key) {
            self.order.push_front(key.clone());
        }
    }

    fn on_access(&mut self, key: &K) {
        self.order.move_to_front(key);
    }

    fn on_remove(&mut self, key: &K) {
        self.order.remove(key);
    }

    fn select_victim(&mut self) -> Option<K> {
        self.order.pop_back()
    }

    fn ordered_keys(&self) -> Vec<K> {
        self.order.iter().cloned().collect()
    }

    fn len(&self) -> usize {
        self.order.len()
    }

    fn clear(&mut self) {
        self.order.clear();
    }
}
