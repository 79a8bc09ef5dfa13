//! Key ordering backed by an indexable doubly linked list stored in a `Vec`.
//!
//! # Complexity
//! - `push_front`, `move_to_front`, `remove`, `pop_back`, `contains`: `O(1)`
//!   amortized.
//! - `iter`: `O(n)`, front (most recent) to back (least recent).

use std::collections::HashMap;
use std::hash::Hash;

type NodeSlot<K> = Option<Node<K>>;

#[derive(Debug)]
struct Node<K> {
    key: K,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Ordered key set with `O(1)` reordering
#[derive(Debug)]
pub(crate) struct RecencyList<K>
where
    K: Eq + Hash + Clone,
{
    map: HashMap<K, usize>,
    nodes: Vec<NodeSlot<K>>,
    free_list: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
}

impl<K> RecencyList<K>
where
    K: Eq + Hash + Clone,
{
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            map: HashMap::with_capacity(capacity),
            nodes: Vec::with_capacity(capacity),
            free_list: Vec::new(),
            head: None,
            tail: None,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.map.len()
    }

    pub(crate) fn contains(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    /// Insert `key` at the front. No-op returning `false` if already present.
    pub(crate) fn push_front(&mut self, key: K) -> bool {
        if self.map.contains_key(&key) {
            return false;
        }
        let index = self.allocate_slot(key.clone());
        self.attach_front(index);
        self.map.insert(key, index);
        true
    }

    /// Move `key` to the front. Returns `false` if the key is unknown.
    pub(crate) fn move_to_front(&mut self, key: &K) -> bool {
        let Some(&index) = self.map.get(key) else {
            return false;
        };
        if self.head != Some(index) {
            self.detach(index);
            self.attach_front(index);
        }
        true
    }

    pub(crate) fn remove(&mut self, key: &K) -> bool {
        let Some(index) = self.map.remove(key) else {
            return false;
        };
        self.detach(index);
        self.nodes[index] = None;
        self.free_list.push(index);
        true
    }

    /// Remove and return the key at the back (least recent)
    pub(crate) fn pop_back(&mut self) -> Option<K> {
        let index = self.tail?;
        self.detach(index);
        let node = self.nodes[index].take()?;
        self.map.remove(&node.key);
        self.free_list.push(index);
        Some(node.key)
    }

    pub(crate) fn clear(&mut self) {
        self.map.clear();
        self.nodes.clear();
        self.free_list.clear();
        self.head = None;
        self.tail = None;
    }

    /// Keys from front to back
    pub(crate) fn iter(&self) -> impl Iterator<Item = &K> + '_ {
        let mut current = self.head;
        std::iter::from_fn(move || {
            let node = self.nodes.get(current?)?.as_ref()?;
            current = node.next;
            Some(&node.key)
        })
    }

    fn allocate_slot(&mut self, key: K) -> usize {
        let node = Node { key, prev: None, next: None };
        if let Some(index) = self.free_list.pop() {
            self.nodes[index] = Some(node);
            index
        } else {
            self.nodes.push(Some(node));
            self.nodes.len() - 1
        }
    }

    fn node(&self, index: usize) -> Option<&Node<K>> {
        self.nodes.get(index)?.as_ref()
    }

    fn node_mut(&mut self, index: usize) -> Option<&mut Node<K>> {
        self.nodes.get_mut(index)?.as_mut()
    }

    /// Set the `next` link of `at`, or `head` when `at` is the list start
    fn set_next(&mut self, at: Option<usize>, next: Option<usize>) {
        match at.and_then(|i| self.node_mut(i)) {
            Some(node) => node.next = next,
            None => self.head = next,
        }
    }

    /// Set the `prev` link of `at`, or `tail` when `at` is the list end
    fn set_prev(&mut self, at: Option<usize>, prev: Option<usize>) {
        match at.and_then(|i| self.node_mut(i)) {
            Some(node) => node.prev = prev,
            None => self.tail = prev,
        }
    }

    /// Unlink `index`, joining its neighbours
    fn detach(&mut self, index: usize) {
        let Some(&Node { prev, next, .. }) = self.node(index) else {
            return;
        };
        self.set_next(prev, next);
        self.set_prev(next, prev);
        if let Some(node) = self.node_mut(index) {
            node.prev = None;
            node.next = None;
        }
    }

    /// Link a detached `index` in as the new head
    fn attach_front(&mut self, index: usize) {
        let old_head = self.head;
        if let Some(node) = self.node_mut(index) {
            node.next = old_head;
        }
        self.set_prev(old_head, Some(index));
        self.head = Some(index);
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for policy::recency_list.
    use super::RecencyList;

    fn order(list: &RecencyList<&'static str>) -> Vec<&'static str> {
        list.iter().copied().collect()
    }

    /// Validates front insertion and duplicate rejection.
    ///
    /// Assertions:
    /// - Confirms `order(&list)` equals `vec!["c", "b", "a"]`.
    /// - Ensures a duplicate push returns false and keeps the order.
    #[test]
    fn push_front_orders_newest_first() {
        let mut list = RecencyList::with_capacity(4);
        assert!(list.push_front("a"));
        assert!(list.push_front("b"));
        assert!(list.push_front("c"));
        assert_eq!(order(&list), vec!["c", "b", "a"]);

        assert!(!list.push_front("a"));
        assert_eq!(order(&list), vec!["c", "b", "a"]);
        assert_eq!(list.len(), 3);
    }

    /// Validates moving interior, tail and head nodes.
    #[test]
    fn move_to_front_reorders() {
        let mut list = RecencyList::with_capacity(3);
        list.push_front("a");
        list.push_front("b");
        list.push_front("c");

        assert!(list.move_to_front(&"b"));
        assert_eq!(order(&list), vec!["b", "c", "a"]);
        assert!(list.move_to_front(&"a"));
        assert_eq!(order(&list), vec!["a", "b", "c"]);
        assert!(list.move_to_front(&"a"));
        assert_eq!(order(&list), vec!["a", "b", "c"]);
        assert!(!list.move_to_front(&"z"));
    }

    /// Validates that popped and removed slots are reused.
    ///
    /// Assertions:
    /// - Confirms `pop_back` returns the oldest key.
    /// - Confirms removal from the middle keeps neighbours linked.
    /// - Ensures the list is empty after popping everything.
    #[test]
    fn pop_and_remove_reuse_slots() {
        let mut list = RecencyList::with_capacity(3);
        list.push_front("a");
        list.push_front("b");
        list.push_front("c");

        assert_eq!(list.pop_back(), Some("a"));
        assert!(list.remove(&"c"));
        assert!(!list.remove(&"c"));
        assert_eq!(order(&list), vec!["b"]);

        list.push_front("d");
        list.push_front("e");
        assert_eq!(order(&list), vec!["e", "d", "b"]);
        assert_eq!(list.nodes.len(), 3);

        assert_eq!(list.pop_back(), Some("b"));
        assert_eq!(list.pop_back(), Some("d"));
        assert_eq!(list.pop_back(), Some("e"));
        assert_eq!(list.pop_back(), None);
        assert_eq!(list.len(), 0);
    }

    /// Validates that clear resets the list.
    #[test]
    fn clear_resets() {
        let mut list = RecencyList::with_capacity(2);
        list.push_front("a");
        list.push_front("b");
        list.clear();
        assert_eq!(list.len(), 0);
        assert!(!list.contains(&"a"));
        assert_eq!(list.pop_back(), None);
    }
}
