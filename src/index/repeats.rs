//! Repeat analysis over the LCP array
//!
//! Every run of adjacent suffixes sharing a common prefix of length `l` (an
//! LCP interval) is a substring repeated once per suffix in the run. A single
//! stack pass over the LCP array enumerates all of them in O(n).

use crate::index::types::SuffixIndex;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// Suffix array rows `lb..=rb` share a common prefix of length `lcp`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LcpInterval {
    pub lcp: u32,
    pub lb: usize,
    pub rb: usize,
}

impl LcpInterval {
    pub fn occurrences(&self) -> usize {
        self.rb - self.lb + 1
    }
}

/// A substring occurring at least twice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Repeat {
    /// Smallest offset at which the substring occurs
    pub offset: u64,
    pub len: u32,
    pub occurrences: usize,
}

/// Visit every LCP interval with a non-zero common prefix
///
/// Children are visited before their enclosing interval.
pub fn for_each_interval(lcp: &[u32], mut visit: impl FnMut(LcpInterval)) {
    let n = lcp.len();
    if n < 2 {
        return;
    }

    // (lcp, left bound); the bottom entry is the root interval with lcp 0
    let mut stack: Vec<(u32, usize)> = vec![(0, 0)];
    for i in 1..=n {
        let current = if i < n { lcp[i] } else { 0 };
        let mut lb = i - 1;

        while let Some(&(top, top_lb)) = stack.last() {
            if current >= top {
                break;
            }
            stack.pop();
            visit(LcpInterval {
                lcp: top,
                lb: top_lb,
                rb: i - 1,
            });
            lb = top_lb;
        }

        if stack.last().is_none_or(|&(top, _)| current > top) {
            stack.push((current, lb));
        }
    }
}

fn to_repeat(index: &SuffixIndex, interval: LcpInterval) -> Repeat {
    let offset = index.sa()[interval.lb..=interval.rb]
        .iter()
        .copied()
        .min()
        .unwrap_or_default();
    Repeat {
        offset: offset as u64,
        len: interval.lcp,
        occurrences: interval.occurrences(),
    }
}

/// The longest substring that occurs more than once
///
/// Ties go to the substring that sorts first.
pub fn longest_repeat(index: &SuffixIndex) -> Option<Repeat> {
    let mut best: Option<LcpInterval> = None;
    for_each_interval(index.lcp(), |interval| {
        if best.is_none_or(|b| (interval.lcp, Reverse(interval.lb)) > (b.lcp, Reverse(b.lb))) {
            best = Some(interval);
        }
    });
    best.map(|interval| to_repeat(index, interval))
}

/// Heap key: longer first, then more frequent, then earlier in suffix order
#[derive(PartialEq, Eq)]
struct Ranked(LcpInterval);

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.0.lcp, self.0.occurrences(), Reverse(self.0.lb)).cmp(&(
            other.0.lcp,
            other.0.occurrences(),
            Reverse(other.0.lb),
        ))
    }
}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Up to `k` repeated substrings of at least `min_len` bytes
///
/// Sorted longest first, then by occurrence count, then by offset.
pub fn top_repeats(index: &SuffixIndex, k: usize, min_len: u32) -> Vec<Repeat> {
    if k == 0 {
        return Vec::new();
    }

    // Min-heap of the best k seen so far
    let mut heap: BinaryHeap<Reverse<Ranked>> = BinaryHeap::with_capacity(k + 1);
    for_each_interval(index.lcp(), |interval| {
        if interval.lcp < min_len.max(1) {
            return;
        }
        heap.push(Reverse(Ranked(interval)));
        if heap.len() > k {
            heap.pop();
        }
    });

    let mut repeats: Vec<Repeat> = heap
        .into_iter()
        .map(|Reverse(Ranked(interval))| to_repeat(index, interval))
        .collect();
    repeats.sort_by(|a, b| {
        b.len
            .cmp(&a.len)
            .then(b.occurrences.cmp(&a.occurrences))
            .then(a.offset.cmp(&b.offset))
    });
    repeats
}

/// Number of distinct non-empty substrings of the source
pub fn distinct_substrings(index: &SuffixIndex) -> u64 {
    let n = index.len() as u64;
    let shared: u64 = index.lcp().iter().map(|&l| l as u64).sum();
    n * (n + 1) / 2 - shared
}
