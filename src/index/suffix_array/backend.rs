//! Construction backends
//!
//! A backend owns the compute resources used to build an index. The CPU
//! backend runs the rayon prefix-doubling builder, either on the global pool
//! or on a dedicated pool. Hardware-accelerated backends plug in behind the
//! same trait.

use super::builder::{inverse_permutation, kasai, prefix_doubling};
use crate::error::{IndexError, Result};
use crate::index::progress::{CancelFlag, ProgressSink};
use crate::index::types::SuffixEntry;

/// Strategy used by [`SuffixArrayBuilder`](super::SuffixArrayBuilder)
pub trait BuildBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Build the suffix array, returning it with the number of rounds executed
    fn suffix_array(
        &self,
        data: &[u8],
        progress: &dyn ProgressSink,
        cancel: &CancelFlag,
    ) -> Result<(Vec<SuffixEntry>, u32)>;

    /// Build the LCP array for a finished suffix array
    fn lcp(
        &self,
        data: &[u8],
        sa: &[SuffixEntry],
        progress: &dyn ProgressSink,
        cancel: &CancelFlag,
    ) -> Result<Vec<u32>> {
        let rank = inverse_permutation(sa)?;
        kasai(data, sa, &rank, progress, cancel)
    }
}

/// Multi-threaded CPU backend
pub struct CpuBackend {
    pool: Option<rayon::ThreadPool>,
}

impl CpuBackend {
    /// Run on the global rayon pool
    pub fn global() -> Self {
        Self { pool: None }
    }

    /// Run on a dedicated pool with `threads` workers (0 means the global pool)
    pub fn with_threads(threads: usize) -> Result<Self> {
        if threads == 0 {
            return Ok(Self::global());
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("binsa-build-{}", i))
            .build()
            .map_err(|e| IndexError::Build(format!("failed to start build pool: {}", e)))?;

        Ok(Self { pool: Some(pool) })
    }

    /// Number of worker threads construction will use
    pub fn threads(&self) -> usize {
        match &self.pool {
            Some(pool) => pool.current_num_threads(),
            None => rayon::current_num_threads(),
        }
    }

    fn run<T, F>(&self, f: F) -> T
    where
        T: Send,
        F: FnOnce() -> T + Send,
    {
        match &self.pool {
            Some(pool) => pool.install(f),
            None => f(),
        }
    }
}

impl BuildBackend for CpuBackend {
    fn name(&self) -> &'static str {
        "cpu"
    }

    fn suffix_array(
        &self,
        data: &[u8],
        progress: &dyn ProgressSink,
        cancel: &CancelFlag,
    ) -> Result<(Vec<SuffixEntry>, u32)> {
        self.run(|| prefix_doubling(data, progress, cancel))
    }

    fn lcp(
        &self,
        data: &[u8],
        sa: &[SuffixEntry],
        progress: &dyn ProgressSink,
        cancel: &CancelFlag,
    ) -> Result<Vec<u32>> {
        self.run(|| {
            let rank = inverse_permutation(sa)?;
            kasai(data, sa, &rank, progress, cancel)
        })
    }
}
