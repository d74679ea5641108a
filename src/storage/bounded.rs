//! Insertion-ordered cache with a hard bound.
//!
//! When an insert pushes the size past `capacity`, the oldest entries are evicted until only
//! the `retain` most recently inserted remain. Lookups use `peek`/`contains`, which never
//! promote an entry, so LRU order stays insertion order.

use lru::LruCache;
use std::hash::Hash;

pub const DEFAULT_CAPACITY: usize = 1000;
pub const DEFAULT_RETAIN: usize = 500;

pub struct BoundedCache<K, V> {
    entries: LruCache<K, V>,
    capacity: usize,
    retain: usize,
}

impl<K: Eq + Hash, V> BoundedCache<K, V> {
    /// `retain` is clamped to `capacity`; a zero capacity is treated as one.
    pub fn new(capacity: usize, retain: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: LruCache::unbounded(),
            capacity,
            retain: retain.min(capacity),
        }
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains(key)
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.peek(key)
    }

    /// Inserts a new entry. Returns `false` and leaves the cache untouched if the key exists.
    pub fn insert(&mut self, key: K, value: V) -> bool {
        if self.entries.contains(&key) {
            return false;
        }
        self.entries.push(key, value);
        if self.entries.len() > self.capacity {
            while self.entries.len() > self.retain {
                self.entries.pop_lru();
            }
        }
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Values from newest to oldest.
    pub fn iter_newest_first(&self) -> impl Iterator<Item = &V> {
        self.entries.iter().map(|(_, v)| v)
    }
}

impl<K: Eq + Hash, V> Default for BoundedCache<K, V> {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_RETAIN)
    }
}
