use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};

/// Suffix array entry - byte offset into the source
pub type SuffixEntry = u32;

/// Default cap on sources indexed in memory (100 MB)
pub const DEFAULT_MAX_SOURCE_BYTES: u64 = 100 * 1024 * 1024;

/// Default number of indexes kept in the in-memory cache
pub const DEFAULT_CACHE_CAPACITY: usize = 5;

/// Hard ceiling on indexable length: offsets are persisted as `i32`
pub const MAX_INDEXABLE_LEN: u64 = i32::MAX as u64;

/// Cache eviction policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EvictionPolicy {
    /// Evict the oldest inserted entry; lookups do not refresh entries
    #[default]
    Fifo,
    /// Evict the least recently used entry
    Lru,
}

/// Configuration for the index service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Sources larger than this are rejected with `SourceTooLarge`
    pub max_source_bytes: u64,
    /// Number of built indexes kept in memory (0 disables the cache)
    pub cache_capacity: usize,
    pub eviction: EvictionPolicy,
    /// Appended to the source path to name the sidecar (`file.bin.idx`)
    pub sidecar_extension: String,
    /// Load and save sidecar files next to file-backed sources
    pub persist_sidecar: bool,
    /// Worker threads for construction; 0 uses the global rayon pool
    pub build_threads: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            max_source_bytes: DEFAULT_MAX_SOURCE_BYTES,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            eviction: EvictionPolicy::Fifo,
            sidecar_extension: "idx".to_string(),
            persist_sidecar: true,
            build_threads: 0,
        }
    }
}

impl IndexConfig {
    /// Size limit actually enforced, never above what the sidecar can store
    pub fn effective_max_source_bytes(&self) -> u64 {
        self.max_source_bytes.min(MAX_INDEXABLE_LEN)
    }
}

/// Where an index came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOrigin {
    /// Constructed from the source bytes
    Built,
    /// Loaded from a persisted sidecar
    Sidecar,
}

/// Timings for a fresh build
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BuildStats {
    pub sa_time: Duration,
    pub lcp_time: Duration,
    /// Doubling rounds executed before all suffixes were distinguished
    pub rounds: u32,
}

/// An immutable suffix array + LCP array pair for one source
#[derive(Debug, Clone)]
pub struct SuffixIndex {
    sa: Vec<SuffixEntry>,
    lcp: Vec<u32>,
    source_len: u64,
    built_at: SystemTime,
    origin: IndexOrigin,
    stats: Option<BuildStats>,
}

impl SuffixIndex {
    pub fn new(sa: Vec<SuffixEntry>, lcp: Vec<u32>, origin: IndexOrigin) -> Self {
        debug_assert_eq!(sa.len(), lcp.len());
        Self {
            source_len: sa.len() as u64,
            sa,
            lcp,
            built_at: SystemTime::now(),
            origin,
            stats: None,
        }
    }

    pub fn with_stats(mut self, stats: BuildStats) -> Self {
        self.stats = Some(stats);
        self
    }

    /// The sorted suffix array
    pub fn sa(&self) -> &[SuffixEntry] {
        &self.sa
    }

    /// `lcp[i]` = common prefix of suffixes `sa[i-1]` and `sa[i]`; `lcp[0] == 0`
    pub fn lcp(&self) -> &[u32] {
        &self.lcp
    }

    /// Number of suffixes
    pub fn len(&self) -> usize {
        self.sa.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sa.is_empty()
    }

    pub fn source_len(&self) -> u64 {
        self.source_len
    }

    pub fn built_at(&self) -> SystemTime {
        self.built_at
    }

    pub fn origin(&self) -> IndexOrigin {
        self.origin
    }

    pub fn build_stats(&self) -> Option<&BuildStats> {
        self.stats.as_ref()
    }

    /// Inverse permutation of the suffix array (`rank[sa[i]] == i`)
    pub fn rank(&self) -> Vec<u32> {
        let mut rank = vec![0u32; self.sa.len()];
        for (i, &pos) in self.sa.iter().enumerate() {
            rank[pos as usize] = i as u32;
        }
        rank
    }

    /// Approximate heap footprint in bytes
    pub fn memory_bytes(&self) -> usize {
        (self.sa.len() + self.lcp.len()) * std::mem::size_of::<u32>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = IndexConfig::default();
        assert_eq!(config.max_source_bytes, 100 * 1024 * 1024);
        assert_eq!(config.cache_capacity, 5);
        assert_eq!(config.eviction, EvictionPolicy::Fifo);
        assert_eq!(config.sidecar_extension, "idx");
        assert!(config.persist_sidecar);
    }

    #[test]
    fn test_config_partial_json() {
        let json = r#"{"cache_capacity": 2, "eviction": "lru"}"#;
        let config: IndexConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.cache_capacity, 2);
        assert_eq!(config.eviction, EvictionPolicy::Lru);
        assert_eq!(config.max_source_bytes, DEFAULT_MAX_SOURCE_BYTES);
    }

    #[test]
    fn test_effective_limit_clamped() {
        let config = IndexConfig {
            max_source_bytes: u64::MAX,
            ..Default::default()
        };
        assert_eq!(config.effective_max_source_bytes(), i32::MAX as u64);
    }

    #[test]
    fn test_rank_is_inverse() {
        let index = SuffixIndex::new(vec![5, 3, 1, 0, 4, 2], vec![0, 1, 3, 0, 0, 2], IndexOrigin::Built);
        let rank = index.rank();
        for (i, &pos) in index.sa().iter().enumerate() {
            assert_eq!(rank[pos as usize] as usize, i);
        }
        assert_eq!(index.source_len(), 6);
        assert_eq!(index.memory_bytes(), 48);
        assert!(index.build_stats().is_none());
    }
}
