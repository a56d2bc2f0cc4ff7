// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::hash::Hash;
use std::num::NonZeroUsize;

use lru::LruCache;

/// Bounded least-recently-used map, one instance per block category.
///
/// The cache is not synchronized on its own; the [Graph](crate::Graph)
/// only touches it while holding its lock.
#[derive(Debug)]
pub struct BlockCache<K: Hash + Eq, V: Clone> {
    inner: LruCache<K, V>,
}

impl<K: Hash + Eq, V: Clone> BlockCache<K, V> {
    /// Creates a cache holding at most `capacity` entries. Zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: LruCache::new(NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN)),
        }
    }

    /// Looks up an entry, marking it as the most recently used one.
    pub fn read(&mut self, key: &K) -> Option<V> {
        self.inner.get(key).cloned()
    }

    /// Inserts an entry, evicting the least recently used one if the cache is full.
    pub fn put(&mut self, key: K, value: V) {
        self.inner.put(key, value);
    }

    /// Checks for an entry without touching the recency order.
    pub fn contains(&self, key: &K) -> bool {
        self.inner.contains(key)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn capacity(&self) -> usize {
        self.inner.cap().get()
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }

    /// Returns the cached value for `key`, computing and inserting it with `load` on a miss.
    /// Failed loads are not cached.
    pub fn get_or_load<E, F>(&mut self, key: K, load: F) -> Result<V, E>
    where
        K: Clone,
        F: FnOnce() -> Result<V, E>,
    {
        if let Some(v) = self.inner.get(&key) {
            return Ok(v.clone());
        }
        let v = load()?;
        self.inner.put(key, v.clone());
        Ok(v)
    }
}
