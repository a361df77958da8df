//! Suffix array construction and search benchmarks.
//!
//! Run with: `cargo bench`
//! Save baseline: `cargo bench -- --save-baseline main`
//! Compare: `cargo bench -- --baseline main`
//!
//! Inputs are generated in-process so the numbers are reproducible:
//!   - random bytes over a small alphabet (few doubling rounds)
//!   - a periodic buffer (worst case: every round runs)

use binsa::index::NoProgress;
use binsa::index::suffix_array::{SuffixArrayBuilder, SuffixSearcher, scan};
use binsa::source::MemorySource;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use std::time::Duration;

fn random_bytes(len: usize, alphabet: u8) -> Vec<u8> {
    let mut state = 0x9e3779b97f4a7c15u64;
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state % alphabet as u64) as u8
        })
        .collect()
}

fn periodic_bytes(len: usize) -> Vec<u8> {
    b"MZ\x90\x00\x03\x00\x00\x00".iter().copied().cycle().take(len).collect()
}

fn bench_build(c: &mut Criterion) {
    let builder = SuffixArrayBuilder::with_defaults();

    let mut group = c.benchmark_group("build");
    group.sample_size(10);
    group.measurement_time(Duration::from_secs(20));

    for size in [64 * 1024, 1024 * 1024, 8 * 1024 * 1024] {
        let random = random_bytes(size, 16);
        let periodic = periodic_bytes(size);
        group.throughput(Throughput::Bytes(size as u64));

        group.bench_with_input(BenchmarkId::new("random", size), &random, |b, data| {
            b.iter(|| builder.build(black_box(data), &NoProgress).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("periodic", size), &periodic, |b, data| {
            b.iter(|| builder.build(black_box(data), &NoProgress).unwrap())
        });
    }

    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let data = random_bytes(4 * 1024 * 1024, 16);
    let built = SuffixArrayBuilder::with_defaults()
        .build(&data, &NoProgress)
        .unwrap();
    let source = MemorySource::new(data.clone());
    let searcher = SuffixSearcher::new(&source, &built.suffix_array);

    let mut group = c.benchmark_group("search");
    for len in [2usize, 4, 16, 64] {
        let pattern = data[1000..1000 + len].to_vec();

        group.bench_with_input(BenchmarkId::new("suffix_array", len), &pattern, |b, p| {
            b.iter(|| searcher.search(black_box(p)))
        });
        group.bench_with_input(BenchmarkId::new("linear_scan", len), &pattern, |b, p| {
            b.iter(|| scan(&source, black_box(p)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_build, bench_search);
criterion_main!(benches);
