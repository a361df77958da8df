//! Bounded in-memory cache of built indexes
//!
//! Entries are keyed by source identity. Capacity and eviction policy are
//! injected, so each service (and each test) owns its own cache.

use crate::index::types::{EvictionPolicy, SuffixIndex};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Cache of built indexes keyed by source identity
pub struct SuffixIndexCache {
    /// `None` when capacity is 0 (caching disabled)
    entries: Option<LruCache<String, Arc<SuffixIndex>>>,
    policy: EvictionPolicy,
    hits: u64,
    misses: u64,
}

impl SuffixIndexCache {
    pub fn new(capacity: usize, policy: EvictionPolicy) -> Self {
        Self {
            entries: NonZeroUsize::new(capacity).map(LruCache::new),
            policy,
            hits: 0,
            misses: 0,
        }
    }

    /// Look up an index
    ///
    /// Under FIFO the entry's position is left untouched; under LRU it
    /// becomes the most recently used.
    pub fn get(&mut self, key: &str) -> Option<Arc<SuffixIndex>> {
        let entries = self.entries.as_mut()?;
        let found = match self.policy {
            EvictionPolicy::Fifo => entries.peek(key),
            EvictionPolicy::Lru => entries.get(key),
        }
        .cloned();

        if found.is_some() {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
        found
    }

    /// Look up without touching recency or the hit/miss counters
    pub fn peek(&self, key: &str) -> Option<Arc<SuffixIndex>> {
        self.entries.as_ref()?.peek(key).cloned()
    }

    /// Insert an index, returning the key of the entry evicted to make room
    pub fn insert(&mut self, key: String, index: Arc<SuffixIndex>) -> Option<String> {
        let entries = self.entries.as_mut()?;
        if entries.contains(&key) {
            entries.put(key, index);
            return None;
        }
        entries.push(key, index).map(|(evicted, _)| evicted)
    }

    pub fn remove(&mut self, key: &str) -> Option<Arc<SuffixIndex>> {
        self.entries.as_mut()?.pop(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.as_ref().is_some_and(|e| e.contains(key))
    }

    pub fn clear(&mut self) {
        if let Some(entries) = self.entries.as_mut() {
            entries.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.as_ref().map_or(0, |e| e.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.entries.as_ref().map_or(0, |e| e.cap().get())
    }

    pub fn policy(&self) -> EvictionPolicy {
        self.policy
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    /// Keys from newest to oldest (by recency under LRU, insertion under FIFO)
    pub fn keys(&self) -> Vec<String> {
        self.entries
            .as_ref()
            .map(|e| e.iter().map(|(k, _)| k.clone()).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::types::IndexOrigin;

    fn index(n: u32) -> Arc<SuffixIndex> {
        let sa: Vec<u32> = (0..n).rev().collect();
        let lcp = vec![0; n as usize];
        Arc::new(SuffixIndex::new(sa, lcp, IndexOrigin::Built))
    }

    #[test]
    fn test_fifo_evicts_oldest_despite_reads() {
        let mut cache = SuffixIndexCache::new(2, EvictionPolicy::Fifo);
        cache.insert("a".into(), index(1));
        cache.insert("b".into(), index(2));

        // Reading "a" must not protect it under FIFO
        assert!(cache.get("a").is_some());

        let evicted = cache.insert("c".into(), index(3));
        assert_eq!(evicted.as_deref(), Some("a"));
        assert!(!cache.contains("a"));
        assert!(cache.contains("b"));
        assert!(cache.contains("c"));
    }

    #[test]
    fn test_lru_evicts_least_recent() {
        let mut cache = SuffixIndexCache::new(2, EvictionPolicy::Lru);
        cache.insert("a".into(), index(1));
        cache.insert("b".into(), index(2));
        assert!(cache.get("a").is_some());

        let evicted = cache.insert("c".into(), index(3));
        assert_eq!(evicted.as_deref(), Some("b"));
        assert!(cache.contains("a"));
    }

    #[test]
    fn test_default_capacity_five() {
        let mut cache = SuffixIndexCache::new(5, EvictionPolicy::Fifo);
        for i in 0..5 {
            assert!(cache.insert(format!("k{}", i), index(i + 1)).is_none());
        }
        assert_eq!(cache.len(), 5);

        assert_eq!(cache.insert("k5".into(), index(6)).as_deref(), Some("k0"));
        assert_eq!(cache.len(), 5);
        assert_eq!(cache.keys().first().map(String::as_str), Some("k5"));
    }

    #[test]
    fn test_reinsert_same_key() {
        let mut cache = SuffixIndexCache::new(2, EvictionPolicy::Fifo);
        cache.insert("a".into(), index(1));
        assert!(cache.insert("a".into(), index(4)).is_none());

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("a").unwrap().len(), 4);
    }

    #[test]
    fn test_hit_miss_counters() {
        let mut cache = SuffixIndexCache::new(1, EvictionPolicy::Fifo);
        assert!(cache.get("missing").is_none());
        cache.insert("a".into(), index(1));
        assert!(cache.get("a").is_some());

        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.misses(), 1);
    }

    #[test]
    fn test_zero_capacity_disables() {
        let mut cache = SuffixIndexCache::new(0, EvictionPolicy::Lru);
        assert!(cache.insert("a".into(), index(1)).is_none());
        assert!(cache.get("a").is_none());
        assert_eq!(cache.capacity(), 0);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_remove_and_clear() {
        let mut cache = SuffixIndexCache::new(3, EvictionPolicy::Fifo);
        cache.insert("a".into(), index(1));
        cache.insert("b".into(), index(2));

        assert!(cache.remove("a").is_some());
        assert!(cache.remove("a").is_none());
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.capacity(), 3);
    }
}
