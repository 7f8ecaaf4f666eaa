/// Bounded least-recently-used cache of decoded blocks.
use crate::block::BlockKey;
use lru::LruCache;
use serde::Serialize;
use std::num::NonZeroUsize;
use tracing::debug;

/// Snapshot of cache occupancy and counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub current_size: usize,
    pub max_size: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

/// Strict LRU map from block key to a shared block value.
///
/// A capacity of zero keeps nothing: every lookup is a miss and every
/// insert is evicted immediately.
pub struct BlockCache<V> {
    max_size: usize,
    entries: Option<LruCache<BlockKey, V>>,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl<V: Clone> BlockCache<V> {
    pub fn new(max_size: usize) -> Self {
        Self {
            max_size,
            entries: NonZeroUsize::new(max_size).map(LruCache::new),
            hits: 0,
            misses: 0,
            evictions: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.as_ref().map_or(0, |entries| entries.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Membership test without touching recency.
    pub fn contains(&self, key: &BlockKey) -> bool {
        self.entries
            .as_ref()
            .is_some_and(|entries| entries.contains(key))
    }

    /// Return the cached value and mark it most recently used.
    pub fn get(&mut self, key: &BlockKey) -> Option<V> {
        let value = self.entries.as_mut()?.get(key).cloned()?;
        self.hits += 1;
        Some(value)
    }

    /// Return the cached value, loading and inserting it on a miss.
    /// A failed load leaves the cache unchanged.
    pub fn get_or_load<E>(
        &mut self,
        key: BlockKey,
        load: impl FnOnce(BlockKey) -> Result<V, E>,
    ) -> Result<V, E> {
        if let Some(value) = self.get(&key) {
            return Ok(value);
        }

        self.misses += 1;
        let value = load(key)?;
        self.insert(key, value.clone());
        Ok(value)
    }

    /// Insert at the most recently used end, evicting at most one entry.
    /// Returns the evicted key.
    pub fn insert(&mut self, key: BlockKey, value: V) -> Option<BlockKey> {
        let evicted = match self.entries.as_mut() {
            // `push` hands back the old pair when the key was already present.
            Some(entries) => match entries.push(key, value) {
                Some((old, _)) if old != key => old,
                _ => return None,
            },
            None => key,
        };

        self.evictions += 1;
        debug!(block = %evicted, "evicted block from cache");
        Some(evicted)
    }

    /// Drop every entry. Counters are kept.
    pub fn clear(&mut self) {
        if let Some(entries) = self.entries.as_mut() {
            entries.clear();
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            current_size: self.len(),
            max_size: self.max_size,
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
        }
    }

    /// Cached keys from least to most recently used.
    pub fn keys_by_recency(&self) -> Vec<BlockKey> {
        match self.entries.as_ref() {
            Some(entries) => entries.iter().rev().map(|(key, _)| *key).collect(),
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(i: usize) -> BlockKey {
        BlockKey::new(i, 0, 0)
    }

    #[test]
    fn evicts_least_recently_used_after_capacity() {
        let mut cache = BlockCache::new(3);
        for i in 0..4 {
            cache.insert(key(i), i);
        }

        assert_eq!(cache.len(), 3);
        assert!(!cache.contains(&key(0)));
        assert_eq!(cache.keys_by_recency(), vec![key(1), key(2), key(3)]);
    }

    #[test]
    fn hit_moves_entry_to_most_recent() {
        let mut cache = BlockCache::new(3);
        for i in 0..3 {
            cache.insert(key(i), i);
        }

        assert_eq!(cache.get(&key(0)), Some(0));
        let evicted = cache.insert(key(3), 3);

        assert_eq!(evicted, Some(key(1)));
        assert_eq!(cache.keys_by_recency(), vec![key(2), key(0), key(3)]);
    }

    #[test]
    fn contains_does_not_promote() {
        let mut cache = BlockCache::new(2);
        cache.insert(key(0), 0);
        cache.insert(key(1), 1);

        assert!(cache.contains(&key(0)));
        assert_eq!(cache.insert(key(2), 2), Some(key(0)));
    }

    #[test]
    fn get_or_load_only_loads_on_miss() {
        let mut cache = BlockCache::new(2);
        let mut loads = 0;

        for _ in 0..3 {
            let value: Result<usize, ()> = cache.get_or_load(key(7), |k| {
                loads += 1;
                Ok(k.bx * 10)
            });
            assert_eq!(value, Ok(70));
        }

        assert_eq!(loads, 1);
        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses), (2, 1));
    }

    #[test]
    fn failed_load_inserts_nothing() {
        let mut cache: BlockCache<usize> = BlockCache::new(2);
        let result = cache.get_or_load(key(1), |_| Err("unreadable"));

        assert_eq!(result, Err("unreadable"));
        assert!(cache.is_empty());
    }

    #[test]
    fn every_insert_past_capacity_evicts_one() {
        let mut cache = BlockCache::new(2);
        for i in 0..10 {
            cache.insert(key(i), i);
        }

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.stats().evictions, 8);
        assert_eq!(cache.keys_by_recency(), vec![key(8), key(9)]);
    }

    #[test]
    fn reinserting_a_key_replaces_without_eviction() {
        let mut cache = BlockCache::new(2);
        cache.insert(key(0), 0);
        cache.insert(key(1), 1);

        assert_eq!(cache.insert(key(0), 5), None);
        assert_eq!(cache.stats().evictions, 0);
        assert_eq!(cache.keys_by_recency(), vec![key(1), key(0)]);
        assert_eq!(cache.get(&key(0)), Some(5));
    }

    #[test]
    fn zero_capacity_keeps_nothing() {
        let mut cache = BlockCache::new(0);
        let value: Result<usize, ()> = cache.get_or_load(key(0), |_| Ok(5));

        assert_eq!(value, Ok(5));
        assert!(cache.is_empty());
        assert!(cache.keys_by_recency().is_empty());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn clear_drops_entries() {
        let mut cache = BlockCache::new(4);
        cache.insert(key(0), 0);
        cache.insert(key(1), 1);
        cache.clear();

        assert!(cache.is_empty());
        assert!(cache.keys_by_recency().is_empty());
        cache.insert(key(2), 2);
        assert_eq!(cache.keys_by_recency(), vec![key(2)]);
    }
}
