//! LRU cache for decompressed chunks.

use lru::LruCache;
use std::num::NonZeroUsize;

/// Counters describing cache effectiveness
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub entries: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// LRU cache of decompressed chunks keyed by chunk id, bounded by entry count.
pub struct ChunkCache<T> {
    cache: LruCache<usize, Vec<T>>,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl<T: Clone> ChunkCache<T> {
    /// Create a cache holding at most `capacity` chunks.
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            cache: LruCache::new(capacity),
            hits: 0,
            misses: 0,
            evictions: 0,
        }
    }

    /// Copy of a cached chunk, updating LRU order.
    pub fn get(&mut self, id: usize) -> Option<Vec<T>> {
        match self.cache.get(&id) {
            Some(data) => {
                self.hits += 1;
                Some(data.clone())
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Insert or replace a chunk, evicting the least recently used one if full.
    pub fn insert(&mut self, id: usize, data: Vec<T>) {
        if let Some((evicted, _)) = self.cache.push(id, data) {
            if evicted != id {
                self.evictions += 1;
                tracing::debug!(chunk = evicted, "Evicted chunk from cache");
            }
        }
    }

    pub fn contains(&self, id: usize) -> bool {
        self.cache.contains(&id)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
            entries: self.cache.len(),
        }
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}
