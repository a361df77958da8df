//! Index service
//!
//! Single entry point for obtaining an index for a source: cache lookup,
//! sidecar load, build, persist. Concurrent requests for the same source
//! share one build.

use crate::error::{IndexError, Result};
use crate::index::cache::SuffixIndexCache;
use crate::index::progress::{CancelFlag, ProgressEvent, ProgressSink, Stage};
use crate::index::suffix_array::{
    BuildBackend, CpuBackend, SearchHits, SuffixArrayBuilder, SuffixArrayReader, SuffixArrayWriter,
    SuffixSearcher, sidecar_path,
};
use crate::index::types::{EvictionPolicy, IndexConfig, SuffixIndex};
use crate::source::ByteSource;
use ahash::AHashMap;
use std::borrow::Cow;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use tracing::{debug, info, warn};

/// Sources without a backing slice are copied in chunks of this size
const READ_CHUNK_SIZE: usize = 4 * 1024 * 1024;

type BuildSlot = Arc<OnceLock<Result<Arc<SuffixIndex>>>>;

/// Counters reported by [`ForensicIndexService::cache_stats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub capacity: usize,
    pub policy: EvictionPolicy,
    pub hits: u64,
    pub misses: u64,
    /// Indexes constructed from source bytes
    pub builds: u64,
    /// Indexes adopted from a persisted sidecar
    pub sidecar_loads: u64,
}

/// Builds, caches and persists suffix indexes
pub struct ForensicIndexService {
    config: IndexConfig,
    builder: SuffixArrayBuilder,
    cache: Mutex<SuffixIndexCache>,
    in_flight: Mutex<AHashMap<String, BuildSlot>>,
    builds: AtomicU64,
    sidecar_loads: AtomicU64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Removes a source's in-flight slot when its creator is done with it
struct InFlightGuard<'a> {
    registry: &'a Mutex<AHashMap<String, BuildSlot>>,
    key: &'a str,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        lock(self.registry).remove(self.key);
    }
}

impl ForensicIndexService {
    /// Create a service running the CPU backend
    pub fn new(config: IndexConfig) -> Result<Self> {
        let backend = CpuBackend::with_threads(config.build_threads)?;
        Ok(Self::with_backend(config, Arc::new(backend)))
    }

    /// Create a service with a custom construction backend
    pub fn with_backend(config: IndexConfig, backend: Arc<dyn BuildBackend>) -> Self {
        let cache = SuffixIndexCache::new(config.cache_capacity, config.eviction);
        Self {
            builder: SuffixArrayBuilder::new(backend),
            cache: Mutex::new(cache),
            in_flight: Mutex::new(AHashMap::new()),
            builds: AtomicU64::new(0),
            sidecar_loads: AtomicU64::new(0),
            config,
        }
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Return the index for `source`, building it if needed
    ///
    /// Order: in-memory cache, persisted sidecar, fresh build. A build result
    /// is persisted and cached. Concurrent callers for the same source wait on
    /// one build and receive the same index (or the same error).
    pub fn get_or_build(
        &self,
        source: &dyn ByteSource,
        progress: &dyn ProgressSink,
    ) -> Result<Arc<SuffixIndex>> {
        self.get_or_build_cancellable(source, progress, &CancelFlag::new())
    }

    /// Like [`get_or_build`](Self::get_or_build), with a caller-owned cancel flag
    ///
    /// The flag only affects a build this call starts. A caller that joins a
    /// build already in flight waits for it regardless of its own flag, and
    /// receives [`IndexError::Cancelled`] if the starting caller cancelled.
    /// Cancelled builds are not cached, so a later call builds again.
    pub fn get_or_build_cancellable(
        &self,
        source: &dyn ByteSource,
        progress: &dyn ProgressSink,
        cancel: &CancelFlag,
    ) -> Result<Arc<SuffixIndex>> {
        let key = source.identity();
        if let Some(index) = lock(&self.cache).get(&key) {
            debug!(source = %key, "index cache hit");
            progress.report(&ProgressEvent::complete(source.len()));
            return Ok(index);
        }

        let (slot, created) = {
            let mut in_flight = lock(&self.in_flight);
            match in_flight.get(&key) {
                Some(slot) => (Arc::clone(slot), false),
                None => {
                    let slot = BuildSlot::default();
                    in_flight.insert(key.clone(), Arc::clone(&slot));
                    (slot, true)
                }
            }
        };
        let _guard = created.then(|| InFlightGuard {
            registry: &self.in_flight,
            key: &key,
        });

        let mut ran = false;
        let result = slot
            .get_or_init(|| {
                ran = true;
                self.load_or_build(source, &key, progress, cancel)
            })
            .clone();

        if !ran && result.is_ok() {
            debug!(source = %key, "joined in-flight build");
            progress.report(&ProgressEvent::complete(source.len()));
        }
        result
    }

    /// Drop any cached or persisted index for `source` and build afresh
    pub fn rebuild(
        &self,
        source: &dyn ByteSource,
        progress: &dyn ProgressSink,
    ) -> Result<Arc<SuffixIndex>> {
        self.invalidate(source)?;
        self.get_or_build(source, progress)
    }

    /// Drop the cache entry and sidecar for `source`
    ///
    /// Returns whether anything was removed.
    pub fn invalidate(&self, source: &dyn ByteSource) -> Result<bool> {
        let key = source.identity();
        let cached = lock(&self.cache).remove(&key).is_some();

        let persisted = match self.sidecar_for(source) {
            Some(path) => SuffixArrayReader::remove(&path)?,
            None => false,
        };

        if cached || persisted {
            info!(source = %key, cached, persisted, "invalidated index");
        }
        Ok(cached || persisted)
    }

    /// All offsets of `pattern` in `source`, ascending
    pub fn search(&self, source: &dyn ByteSource, index: &SuffixIndex, pattern: &[u8]) -> Vec<u64> {
        SuffixSearcher::new(source, index.sa()).search(pattern)
    }

    /// Match count plus at most `limit` offsets
    pub fn search_limited(
        &self,
        source: &dyn ByteSource,
        index: &SuffixIndex,
        pattern: &[u8],
        limit: usize,
    ) -> SearchHits {
        SuffixSearcher::new(source, index.sa()).search_limited(pattern, limit)
    }

    pub fn cache_stats(&self) -> CacheStats {
        let cache = lock(&self.cache);
        CacheStats {
            entries: cache.len(),
            capacity: cache.capacity(),
            policy: cache.policy(),
            hits: cache.hits(),
            misses: cache.misses(),
            builds: self.builds.load(Ordering::Relaxed),
            sidecar_loads: self.sidecar_loads.load(Ordering::Relaxed),
        }
    }

    /// Sidecar location for `source`, if it has a path and persistence is on
    pub fn sidecar_for(&self, source: &dyn ByteSource) -> Option<PathBuf> {
        if !self.config.persist_sidecar {
            return None;
        }
        source
            .path()
            .map(|path| sidecar_path(path, &self.config.sidecar_extension))
    }

    fn load_or_build(
        &self,
        source: &dyn ByteSource,
        key: &str,
        progress: &dyn ProgressSink,
        cancel: &CancelFlag,
    ) -> Result<Arc<SuffixIndex>> {
        // A build that finished between our cache miss and taking the slot
        if let Some(index) = lock(&self.cache).peek(key) {
            progress.report(&ProgressEvent::complete(source.len()));
            return Ok(index);
        }

        let len = source.len();
        let sidecar = self.sidecar_for(source);

        if let Some(path) = &sidecar {
            match SuffixArrayReader::load(path, Some(len)) {
                Ok(Some(index)) => {
                    info!(path = %path.display(), len, "loaded persisted index");
                    self.sidecar_loads.fetch_add(1, Ordering::Relaxed);
                    progress.report(&ProgressEvent::complete(len));
                    return Ok(self.store(key, index));
                }
                Ok(None) => debug!(path = %path.display(), "no persisted index"),
                Err(e) => warn!(error = %e, "discarding persisted index"),
            }
        }

        let limit = self.config.effective_max_source_bytes();
        if len > limit {
            return Err(IndexError::SourceTooLarge { len, limit });
        }

        let data = read_source(source, progress)?;
        let index = self
            .builder
            .build_cancellable(&data, progress, cancel)?
            .into_index();
        drop(data);
        self.builds.fetch_add(1, Ordering::Relaxed);

        if let Some(path) = &sidecar {
            match SuffixArrayWriter::write(path, index.sa(), index.lcp()) {
                Ok(()) => debug!(path = %path.display(), "persisted index"),
                Err(e) => warn!(error = %e, "failed to persist index"),
            }
        }

        Ok(self.store(key, index))
    }

    fn store(&self, key: &str, index: SuffixIndex) -> Arc<SuffixIndex> {
        let index = Arc::new(index);
        if let Some(evicted) = lock(&self.cache).insert(key.to_string(), Arc::clone(&index)) {
            debug!(source = %evicted, "evicted index from cache");
        }
        index
    }
}

/// Whole contents of `source`, borrowed when already addressable
fn read_source<'a>(source: &'a dyn ByteSource, progress: &dyn ProgressSink) -> Result<Cow<'a, [u8]>> {
    let total = source.len();
    progress.report(&ProgressEvent::new(Stage::Loading, 0, total));

    if let Some(bytes) = source.as_bytes() {
        progress.report(&ProgressEvent::new(Stage::Loading, total, total));
        return Ok(Cow::Borrowed(bytes));
    }

    let len = total as usize;
    let mut data = Vec::new();
    data.try_reserve_exact(len)
        .map_err(|_| IndexError::AllocationFailure { bytes: len })?;
    data.resize(len, 0);

    let mut offset = 0;
    while offset < len {
        let end = (offset + READ_CHUNK_SIZE).min(len);
        let read = source.read_range(offset as u64, &mut data[offset..end]);
        if read == 0 {
            break;
        }
        offset += read;
        progress.report(&ProgressEvent::new(Stage::Loading, offset as u64, total));
    }
    data.truncate(offset);

    Ok(Cow::Owned(data))
}
