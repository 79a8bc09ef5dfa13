use std::hash::Hash;

use super::recency_list::RecencyList;
use super::EvictionPolicy;

/// First In First Out eviction
///
/// Keys are ordered by first insertion only. Overwriting a resident key or
/// looking it up does not extend its stay.
#[derive(Debug)]
pub struct Fifo<K>
where
    K: Eq + Hash + Clone,
{
    order: RecencyList<K>,
}

impl<K> Fifo<K>
where
    K: Eq + Hash + Clone,
{
    /// Create a policy sized for `capacity` keys
    pub fn with_capacity(capacity: usize) -> Self {
        Self { order: RecencyList::with_capacity(capacity) }
    }
}

impl<K> Default for Fifo<K>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::with_capacity(0)
    }
}

impl<K> EvictionPolicy<K> for Fifo<K>
where
    K: Eq + Hash + Clone + Send,
{
    fn name(&self) -> &'static str {
        "fifo"
    }

    fn on_insert(&mut self, key: &K) {
        if !self.order.contains(key) {
            self.order.push_front(key.clone());
        }
    }

    fn on_access(&mut self, _key: &K) {}

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
