//! Suffix array builder
//!
//! Builds a suffix array over the raw bytes of a source by parallel prefix
//! doubling:
//! 1. Rank every suffix by its first byte (256-bucket counting sort)
//! 2. Each round doubles the compared prefix length `k`, ordering suffixes by
//!    the pair `(rank[i], rank[i + k])` with two stable counting sorts, least
//!    significant key first
//! 3. Rounds stop as soon as every suffix has a distinct rank
//!
//! The LCP array is then derived with Kasai's algorithm. Total work is
//! O(n log n) with one synchronization barrier per round.

use super::backend::{BuildBackend, CpuBackend};
use crate::error::{IndexError, Result};
use crate::index::progress::{CancelFlag, ProgressEvent, ProgressSink, Stage};
use crate::index::types::{BuildStats, IndexOrigin, MAX_INDEXABLE_LEN, SuffixEntry, SuffixIndex};
use rayon::prelude::*;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Instant;

/// Inputs shorter than this are sorted on the calling thread
const PARALLEL_THRESHOLD: usize = 1 << 16;

/// Debug builds re-verify suffix order for inputs up to this size
const DEBUG_VERIFY_LIMIT: usize = 1 << 14;

/// Builder for suffix + LCP arrays over a byte buffer
pub struct SuffixArrayBuilder {
    backend: Arc<dyn BuildBackend>,
}

impl SuffixArrayBuilder {
    /// Create a builder that constructs with the given backend
    pub fn new(backend: Arc<dyn BuildBackend>) -> Self {
        Self { backend }
    }

    /// Create a builder on the global rayon pool
    pub fn with_defaults() -> Self {
        Self::new(Arc::new(CpuBackend::global()))
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Build the suffix array and LCP array for `data`
    ///
    /// Fails only on allocation failure.
    pub fn build(&self, data: &[u8], progress: &dyn ProgressSink) -> Result<BuiltSuffixArray> {
        self.build_cancellable(data, progress, &CancelFlag::new())
    }

    /// Like [`build`](Self::build), aborting with [`IndexError::Cancelled`]
    /// once `cancel` is set
    ///
    /// The flag is polled at every doubling round and every LCP checkpoint.
    pub fn build_cancellable(
        &self,
        data: &[u8],
        progress: &dyn ProgressSink,
        cancel: &CancelFlag,
    ) -> Result<BuiltSuffixArray> {
        let n = data.len();
        if n as u64 > MAX_INDEXABLE_LEN {
            return Err(IndexError::SourceTooLarge {
                len: n as u64,
                limit: MAX_INDEXABLE_LEN,
            });
        }

        let total_rounds = doubling_rounds(n) as u64;
        progress.report(&ProgressEvent::new(Stage::BuildingSuffixArray, 0, total_rounds));

        let start = Instant::now();
        let (sa, rounds) = self.backend.suffix_array(data, progress, cancel)?;
        let sa_time = start.elapsed();

        progress.report(&ProgressEvent::new(
            Stage::BuildingSuffixArray,
            total_rounds,
            total_rounds,
        ));
        debug_assert!(
            n > DEBUG_VERIFY_LIMIT || verify_suffix_array(data, &sa),
            "suffix array is not a sorted permutation"
        );

        if cancel.is_cancelled() {
            return Err(IndexError::Cancelled);
        }

        let start = Instant::now();
        let lcp = self.backend.lcp(data, &sa, progress, cancel)?;
        let lcp_time = start.elapsed();

        progress.report(&ProgressEvent::new(Stage::BuildingLcp, n as u64, n as u64));
        progress.report(&ProgressEvent::complete(n as u64));

        tracing::debug!(
            len = n,
            rounds,
            backend = self.backend.name(),
            sa_ms = sa_time.as_millis() as u64,
            lcp_ms = lcp_time.as_millis() as u64,
            "built suffix array"
        );

        Ok(BuiltSuffixArray {
            suffix_array: sa,
            lcp,
            stats: BuildStats {
                sa_time,
                lcp_time,
                rounds,
            },
        })
    }
}

/// Result of building a suffix array
#[derive(Debug, Clone)]
pub struct BuiltSuffixArray {
    /// Sorted suffix array (offsets into the source)
    pub suffix_array: Vec<SuffixEntry>,
    /// LCP of each suffix with its predecessor in `suffix_array`
    pub lcp: Vec<u32>,
    pub stats: BuildStats,
}

impl BuiltSuffixArray {
    pub fn into_index(self) -> SuffixIndex {
        SuffixIndex::new(self.suffix_array, self.lcp, IndexOrigin::Built).with_stats(self.stats)
    }
}

/// Number of doubling rounds needed in the worst case: ceil(log2 n)
pub fn doubling_rounds(n: usize) -> u32 {
    if n < 2 {
        0
    } else {
        usize::BITS - (n - 1).leading_zeros()
    }
}

/// Prefix-doubling suffix array construction
///
/// Returns the suffix array and the number of rounds executed.
pub(crate) fn prefix_doubling(
    data: &[u8],
    progress: &dyn ProgressSink,
    cancel: &CancelFlag,
) -> Result<(Vec<SuffixEntry>, u32)> {
    let n = data.len();
    match n {
        0 => return Ok((Vec::new(), 0)),
        1 => return Ok((vec![0], 0)),
        _ => {}
    }

    let total_rounds = doubling_rounds(n) as u64;
    let mut sa = try_alloc(n)?;
    let mut scratch = try_alloc(n)?;
    let mut rank = try_alloc(n)?;
    let mut next_rank = try_alloc(n)?;
    let mut second = try_alloc(n)?;

    rank.par_iter_mut()
        .zip(data.par_iter())
        .for_each(|(r, &byte)| *r = byte as u32);
    scratch
        .par_iter_mut()
        .enumerate()
        .for_each(|(i, s)| *s = i as u32);
    counting_sort(&scratch, &mut sa, 256, |pos| data[pos as usize] as usize);

    let mut classes = collapse_ranks(&sa, &mut next_rank, |a, b| data[a] == data[b]);
    std::mem::swap(&mut rank, &mut next_rank);

    let mut k = 1usize;
    let mut rounds = 0u32;
    while k < n && classes < n {
        if cancel.is_cancelled() {
            return Err(IndexError::Cancelled);
        }

        // 0 is the sentinel for suffixes that end before i + k; real ranks shift up by one
        {
            let rank = &rank;
            second.par_iter_mut().enumerate().for_each(|(i, s)| {
                *s = if i + k < n { rank[i + k] + 1 } else { 0 };
            });
        }

        counting_sort(&sa, &mut scratch, classes + 1, |pos| second[pos as usize] as usize);
        counting_sort(&scratch, &mut sa, classes, |pos| rank[pos as usize] as usize);

        classes = collapse_ranks(&sa, &mut next_rank, |a, b| {
            rank[a] == rank[b] && second[a] == second[b]
        });
        std::mem::swap(&mut rank, &mut next_rank);

        rounds += 1;
        k *= 2;
        progress.report(&ProgressEvent::new(
            Stage::BuildingSuffixArray,
            (rounds as u64).min(total_rounds),
            total_rounds,
        ));
    }

    Ok((sa, rounds))
}

/// Assign dense class ids along the sorted order
///
/// `same(prev, curr)` decides whether two adjacent text positions tie.
/// Returns the number of classes.
fn collapse_ranks<F>(sa: &[u32], out: &mut [u32], same: F) -> usize
where
    F: Fn(usize, usize) -> bool,
{
    let mut class = 0u32;
    out[sa[0] as usize] = 0;
    for pair in sa.windows(2) {
        let (prev, curr) = (pair[0] as usize, pair[1] as usize);
        if !same(prev, curr) {
            class += 1;
        }
        out[curr] = class;
    }
    class as usize + 1
}

/// Stable counting sort of `src` into `dst` by `key`, with keys `< buckets`
///
/// Large inputs are split into chunks whose histograms are built in
/// parallel. Offsets are assigned bucket-major, chunk-minor, so each chunk
/// scatters into its own disjoint set of slots and equal keys keep their
/// input order.
fn counting_sort<K>(src: &[u32], dst: &mut [u32], buckets: usize, key: K)
where
    K: Fn(u32) -> usize + Sync,
{
    debug_assert_eq!(src.len(), dst.len());
    let n = src.len();
    let chunks = histogram_chunks(n, buckets);

    if chunks <= 1 {
        let mut cursors = vec![0u32; buckets];
        for &v in src {
            cursors[key(v)] += 1;
        }
        let mut sum = 0u32;
        for c in cursors.iter_mut() {
            let count = *c;
            *c = sum;
            sum += count;
        }
        for &v in src {
            let slot = &mut cursors[key(v)];
            dst[*slot as usize] = v;
            *slot += 1;
        }
        return;
    }

    let chunk_len = n.div_ceil(chunks);
    let mut histograms: Vec<Vec<u32>> = src
        .par_chunks(chunk_len)
        .map(|chunk| {
            let mut counts = vec![0u32; buckets];
            for &v in chunk {
                counts[key(v)] += 1;
            }
            counts
        })
        .collect();

    let mut sum = 0u32;
    for bucket in 0..buckets {
        for counts in histograms.iter_mut() {
            let count = counts[bucket];
            counts[bucket] = sum;
            sum += count;
        }
    }

    let out = SharedSlice::new(dst);
    src.par_chunks(chunk_len)
        .zip(histograms.into_par_iter())
        .for_each(|(chunk, mut cursors)| {
            for &v in chunk {
                let slot = &mut cursors[key(v)];
                // SAFETY: the prefix sum gives every chunk a disjoint range of
                // slots within each bucket, and all slots are below n.
                unsafe { out.write(*slot as usize, v) };
                *slot += 1;
            }
        });
}

/// Chunks to split a counting sort into; histograms are capped at ~n cells
fn histogram_chunks(n: usize, buckets: usize) -> usize {
    if n < PARALLEL_THRESHOLD {
        return 1;
    }
    (n / buckets.max(1)).min(rayon::current_num_threads()).max(1)
}

/// Inverse permutation of a suffix array (`rank[sa[i]] == i`)
///
/// `sa` must be a permutation of `0..sa.len()`.
pub(crate) fn inverse_permutation(sa: &[SuffixEntry]) -> Result<Vec<u32>> {
    let mut rank = try_alloc(sa.len())?;

    if sa.len() < PARALLEL_THRESHOLD {
        for (i, &pos) in sa.iter().enumerate() {
            rank[pos as usize] = i as u32;
        }
        return Ok(rank);
    }

    {
        let out = SharedSlice::new(&mut rank);
        sa.par_iter().enumerate().for_each(|(i, &pos)| {
            // SAFETY: `sa` is a permutation, so each position is written once
            unsafe { out.write(pos as usize, i as u32) };
        });
    }
    Ok(rank)
}

/// Kasai's LCP construction
///
/// Walks text positions in order carrying the match length `h`, which drops
/// by at most one per step, so total comparisons are O(n).
pub(crate) fn kasai(
    data: &[u8],
    sa: &[SuffixEntry],
    rank: &[u32],
    progress: &dyn ProgressSink,
    cancel: &CancelFlag,
) -> Result<Vec<u32>> {
    let n = data.len();
    let mut lcp = try_alloc(n)?;
    let interval = (n / 100).max(1);
    let mut h = 0usize;

    for i in 0..n {
        if i % interval == 0 {
            if cancel.is_cancelled() {
                return Err(IndexError::Cancelled);
            }
            progress.report(&ProgressEvent::new(Stage::BuildingLcp, i as u64, n as u64));
        }

        let r = rank[i] as usize;
        if r == 0 {
            h = 0;
            continue;
        }

        let j = sa[r - 1] as usize;
        while i + h < n && j + h < n && data[i + h] == data[j + h] {
            h += 1;
        }
        lcp[r] = h as u32;
        h = h.saturating_sub(1);
    }

    Ok(lcp)
}

/// Check that `sa` is a permutation of `0..n` in strictly increasing suffix order
///
/// Quadratic in the worst case; meant for tests and debug assertions.
pub fn verify_suffix_array(data: &[u8], sa: &[SuffixEntry]) -> bool {
    if sa.len() != data.len() {
        return false;
    }

    let mut seen = vec![false; sa.len()];
    for &pos in sa {
        let pos = pos as usize;
        if pos >= seen.len() || seen[pos] {
            return false;
        }
        seen[pos] = true;
    }

    sa.windows(2)
        .all(|w| data[w[0] as usize..] < data[w[1] as usize..])
}

/// Check every LCP entry against a brute-force common prefix
pub fn verify_lcp(data: &[u8], sa: &[SuffixEntry], lcp: &[u32]) -> bool {
    if lcp.len() != sa.len() || lcp.first().is_some_and(|&l| l != 0) {
        return false;
    }
    (1..sa.len()).all(|i| {
        common_prefix_len(&data[sa[i - 1] as usize..], &data[sa[i] as usize..]) == lcp[i] as usize
    })
}

#[inline]
pub(crate) fn common_prefix_len(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

/// Allocate a zeroed `u32` buffer, reporting failure instead of aborting
fn try_alloc(len: usize) -> Result<Vec<u32>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| IndexError::AllocationFailure {
            bytes: len.saturating_mul(std::mem::size_of::<u32>()),
        })?;
    buf.resize(len, 0);
    Ok(buf)
}

/// A mutable slice written from several rayon workers at disjoint indices
struct SharedSlice<'a> {
    ptr: *mut u32,
    len: usize,
    _marker: PhantomData<&'a mut [u32]>,
}

unsafe impl Send for SharedSlice<'_> {}
unsafe impl Sync for SharedSlice<'_> {}

impl<'a> SharedSlice<'a> {
    fn new(slice: &'a mut [u32]) -> Self {
        Self {
            ptr: slice.as_mut_ptr(),
            len: slice.len(),
            _marker: PhantomData,
        }
    }

    /// # Safety
    ///
    /// `index` must be in bounds and no other thread may write it concurrently.
    #[inline]
    unsafe fn write(&self, index: usize, value: u32) {
        debug_assert!(index < self.len);
        unsafe { self.ptr.add(index).write(value) };
    }
}
