//! Suffix array search
//!
//! O(m log n) exact byte-pattern lookup: two binary searches find the
//! contiguous run of suffixes that start with the pattern.

use crate::index::types::SuffixEntry;
use crate::source::ByteSource;
use std::cmp::Ordering;

/// Searcher over a built suffix array and the source it indexes
///
/// Read-only; any number of searchers may share the same arrays.
pub struct SuffixSearcher<'a, S: ByteSource + ?Sized> {
    source: &'a S,
    sa: &'a [SuffixEntry],
}

/// Matches for a pattern, possibly truncated to a display limit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHits {
    /// Total number of occurrences
    pub total: u64,
    /// Smallest matching offsets, ascending
    pub offsets: Vec<u64>,
}

impl SearchHits {
    pub fn is_truncated(&self) -> bool {
        (self.offsets.len() as u64) < self.total
    }
}

impl<'a, S: ByteSource + ?Sized> SuffixSearcher<'a, S> {
    pub fn new(source: &'a S, sa: &'a [SuffixEntry]) -> Self {
        Self { source, sa }
    }

    /// Compare the suffix at `offset` against `pattern`
    ///
    /// Only the first `pattern.len()` bytes of the suffix take part. A suffix
    /// that runs out of bytes first is smaller.
    fn compare(&self, offset: SuffixEntry, pattern: &[u8], scratch: &mut Vec<u8>) -> Ordering {
        let offset = offset as u64;
        if let Some(bytes) = self.source.as_bytes() {
            let start = (offset as usize).min(bytes.len());
            let end = start.saturating_add(pattern.len()).min(bytes.len());
            return bytes[start..end].cmp(pattern);
        }

        scratch.resize(pattern.len(), 0);
        let read = self.source.read_range(offset, scratch);
        scratch[..read].cmp(pattern)
    }

    /// Inclusive range `[lower, upper]` of suffix array indices matching `pattern`
    pub fn range(&self, pattern: &[u8]) -> Option<(usize, usize)> {
        if pattern.is_empty() || self.sa.is_empty() {
            return None;
        }

        let mut scratch = Vec::with_capacity(pattern.len());

        let lower = self
            .sa
            .partition_point(|&pos| self.compare(pos, pattern, &mut scratch) == Ordering::Less);
        if lower == self.sa.len()
            || self.compare(self.sa[lower], pattern, &mut scratch) != Ordering::Equal
        {
            return None;
        }

        let run = self.sa[lower..]
            .partition_point(|&pos| self.compare(pos, pattern, &mut scratch) == Ordering::Equal);
        Some((lower, lower + run - 1))
    }

    /// All offsets where `pattern` occurs, ascending by position
    ///
    /// An empty pattern matches nothing.
    pub fn search(&self, pattern: &[u8]) -> Vec<u64> {
        let Some((lower, upper)) = self.range(pattern) else {
            return Vec::new();
        };

        let mut offsets: Vec<u64> = self.sa[lower..=upper].iter().map(|&p| p as u64).collect();
        offsets.sort_unstable();
        offsets
    }

    /// Total match count plus at most `limit` smallest offsets
    pub fn search_limited(&self, pattern: &[u8], limit: usize) -> SearchHits {
        let mut offsets = self.search(pattern);
        let total = offsets.len() as u64;
        offsets.truncate(limit);
        SearchHits { total, offsets }
    }

    /// Number of occurrences without collecting offsets
    pub fn count(&self, pattern: &[u8]) -> u64 {
        self.range(pattern)
            .map_or(0, |(lower, upper)| (upper - lower + 1) as u64)
    }

    /// Check if pattern occurs anywhere in the source
    pub fn contains(&self, pattern: &[u8]) -> bool {
        self.range(pattern).is_some()
    }
}

/// All offsets of `pattern` in `source`, ascending
pub fn search<S: ByteSource + ?Sized>(source: &S, sa: &[SuffixEntry], pattern: &[u8]) -> Vec<u64> {
    SuffixSearcher::new(source, sa).search(pattern)
}

/// Linear scan for `pattern`, used when no index is available
///
/// Reports every start offset, overlapping matches included, so the result
/// equals [`search`] for a correct index.
pub fn scan<S: ByteSource + ?Sized>(source: &S, pattern: &[u8]) -> Vec<u64> {
    if pattern.is_empty() {
        return Vec::new();
    }

    match source.as_bytes() {
        Some(bytes) => scan_bytes(bytes, pattern),
        None => {
            let mut bytes = vec![0u8; source.len() as usize];
            let read = source.read_range(0, &mut bytes);
            scan_bytes(&bytes[..read], pattern)
        }
    }
}

fn scan_bytes(haystack: &[u8], pattern: &[u8]) -> Vec<u64> {
    // memmem iterators skip past each hit, so restart one byte later
    let finder = memchr::memmem::Finder::new(pattern);
    let mut offsets = Vec::new();
    let mut pos = 0;
    while let Some(found) = haystack.get(pos..).and_then(|rest| finder.find(rest)) {
        offsets.push((pos + found) as u64);
        pos += found + 1;
    }
    offsets
}

/// Bytes surrounding a match, for display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchContext {
    /// Source offset of `bytes[0]`
    pub start: u64,
    pub bytes: Vec<u8>,
    /// Position of the match within `bytes`
    pub match_start: usize,
    pub match_len: usize,
}

/// Read up to `radius` bytes either side of a match at `offset`
pub fn match_context<S: ByteSource + ?Sized>(
    source: &S,
    offset: u64,
    match_len: usize,
    radius: usize,
) -> MatchContext {
    let start = offset.saturating_sub(radius as u64);
    let want = (offset - start) as usize + match_len + radius;
    let mut bytes = vec![0u8; want];
    let read = source.read_range(start, &mut bytes);
    bytes.truncate(read);

    let match_start = (offset - start) as usize;
    MatchContext {
        start,
        match_start: match_start.min(bytes.len()),
        match_len: match_len.min(bytes.len().saturating_sub(match_start)),
        bytes,
    }
}
