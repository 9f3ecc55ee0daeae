//! Benchmarks for weighted tree operations.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::BTreeSet;
use sumtree::{RankMultiSet, RankMultiSetC};

fn sequential_keys(n: usize) -> Vec<u64> {
    (0..n as u64).collect()
}

fn shuffled_keys(n: usize) -> Vec<u64> {
    let mut keys = sequential_keys(n);
    let mut rng = rand::rngs::StdRng::seed_from_u64(0x5eed);
    keys.shuffle(&mut rng);
    keys
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert");

    for size in [1_000, 10_000, 100_000] {
        let keys = shuffled_keys(size);

        group.bench_with_input(BenchmarkId::new("compact", size), &keys, |b, keys| {
            b.iter(|| {
                let mut t: RankMultiSetC<u64, u64> = RankMultiSetC::new();
                for &k in keys {
                    t.insert(k).unwrap();
                }
                black_box(t)
            });
        });

        group.bench_with_input(BenchmarkId::new("boxed", size), &keys, |b, keys| {
            b.iter(|| {
                let mut t: RankMultiSet<u64, u64> = RankMultiSet::new();
                for &k in keys {
                    t.insert(k).unwrap();
                }
                black_box(t)
            });
        });

        group.bench_with_input(BenchmarkId::new("BTreeSet", size), &keys, |b, keys| {
            b.iter(|| {
                let mut s = BTreeSet::new();
                for &k in keys {
                    s.insert(k);
                }
                black_box(s)
            });
        });
    }

    group.finish();
}

fn bench_rank(c: &mut Criterion) {
    let mut group = c.benchmark_group("rank");

    for size in [1_000, 10_000, 100_000] {
        let keys = shuffled_keys(size);
        let mut tree: RankMultiSetC<u64, u64> = RankMultiSetC::new();
        let mut baseline = BTreeSet::new();
        for &k in &keys {
            tree.insert(k).unwrap();
            baseline.insert(k);
        }
        let probes: Vec<u64> = keys.iter().step_by(7).copied().collect();

        group.bench_with_input(BenchmarkId::new("sum_before", size), &probes, |b, probes| {
            b.iter(|| {
                let mut acc = 0u64;
                for k in probes {
                    acc = acc.wrapping_add(tree.sum_before(k).unwrap());
                }
                black_box(acc)
            });
        });

        // The fair std baseline is a range count, which is O(n).
        group.bench_with_input(
            BenchmarkId::new("BTreeSet_range_count", size),
            &probes,
            |b, probes| {
                b.iter(|| {
                    let mut acc = 0usize;
                    for k in probes {
                        acc = acc.wrapping_add(baseline.range(..k).count());
                    }
                    black_box(acc)
                });
            },
        );
    }

    group.finish();
}

fn bench_erase(c: &mut Criterion) {
    let mut group = c.benchmark_group("erase");
    group.sample_size(20);

    for size in [1_000, 10_000] {
        let keys = shuffled_keys(size);

        group.bench_with_input(BenchmarkId::new("compact", size), &keys, |b, keys| {
            b.iter(|| {
                let mut t: RankMultiSetC<u64, u64> = RankMultiSetC::new();
                for &k in keys {
                    t.insert(k).unwrap();
                }
                for &k in keys {
                    t.erase(&k).unwrap();
                }
                black_box(t.len())
            });
        });

        group.bench_with_input(BenchmarkId::new("boxed", size), &keys, |b, keys| {
            b.iter(|| {
                let mut t: RankMultiSet<u64, u64> = RankMultiSet::new();
                for &k in keys {
                    t.insert(k).unwrap();
                }
                for &k in keys {
                    t.erase(&k).unwrap();
                }
                black_box(t.len())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_insert, bench_rank, bench_erase);
criterion_main!(benches);
