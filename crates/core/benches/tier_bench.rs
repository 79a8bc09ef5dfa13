//! Tier and hierarchy benchmarks
//!
//! Covers single-tier insert/lookup, the cost of each eviction policy, and
//! hierarchy reads that hit tier 0 versus reads that promote from below.
//!
//! Run with: `cargo bench --bench tier_bench -p stratum-core`

use std::sync::Arc;
use std::thread;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use stratum_core::{CacheHierarchy, EvictionKind, HierarchyConfig, SystemClock, Tier, TierConfig};

// ============================================================================
// Single Tier Benchmarks
// ============================================================================

fn bench_tier_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("tier_insert");

    for size in [100, 1000, 10_000] {
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::new("lru", size), &size, |b, &size| {
            let tier: Tier<u64, String> = Tier::new(size).unwrap();
            let mut counter = 0u64;
            b.iter(|| {
                tier.insert(black_box(counter), black_box(format!("value_{counter}")));
                counter = counter.wrapping_add(1);
            });
        });
    }

    group.finish();
}

fn bench_tier_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("tier_lookup");

    for size in [100, 1000, 10_000] {
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::new("hit", size), &size, |b, &size| {
            let tier: Tier<u64, String> = Tier::new(size).unwrap();
            for i in 0..size as u64 {
                tier.insert(i, format!("value_{i}"));
            }
            let mut counter = 0u64;
            b.iter(|| {
                let key = counter % (size as u64);
                black_box(tier.lookup(&black_box(key)));
                counter = counter.wrapping_add(1);
            });
        });

        group.bench_with_input(BenchmarkId::new("miss", size), &size, |b, &size| {
            let tier: Tier<u64, String> = Tier::new(size).unwrap();
            for i in 0..size as u64 {
                tier.insert(i, format!("value_{i}"));
            }
            let mut counter = 0u64;
            b.iter(|| {
                let key = (size as u64) + counter;
                black_box(tier.lookup(&black_box(key)));
                counter = counter.wrapping_add(1);
            });
        });
    }

    group.finish();
}

// ============================================================================
// Eviction Policy Benchmarks
// ============================================================================

fn bench_eviction_policies(c: &mut Criterion) {
    let mut group = c.benchmark_group("eviction_policies");
    let size = 1000;

    for kind in [EvictionKind::Lru, EvictionKind::Lfu, EvictionKind::Fifo] {
        let name = format!("{kind:?}").to_lowercase();
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::new("insert_beyond_capacity", &name), &kind, |b, &kind| {
            let config = TierConfig::new(size).eviction(kind);
            let tier: Tier<u64, u64> = Tier::from_config(0, &config, SystemClock).unwrap();
            for i in 0..size as u64 {
                tier.insert(i, i);
            }

            let mut counter = size as u64;
            b.iter(|| {
                black_box(tier.insert(black_box(counter), counter));
                counter = counter.wrapping_add(1);
            });
        });
    }

    group.finish();
}

// ============================================================================
// Hierarchy Benchmarks
// ============================================================================

fn bench_hierarchy_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("hierarchy_get");
    let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();

    group.throughput(Throughput::Elements(1));
    group.bench_function("tier0_hit", |b| {
        let cache: CacheHierarchy<u64, u64> =
            CacheHierarchy::new(HierarchyConfig::with_capacities(&[1000, 10_000])).unwrap();
        rt.block_on(async {
            for i in 0..1000u64 {
                cache.put(i, i).await.unwrap();
            }
        });

        let cache = &cache;
        let mut counter = 0u64;
        b.to_async(&rt).iter(move || {
            let key = counter % 1000;
            counter = counter.wrapping_add(1);
            async move { black_box(cache.get(&key).await.unwrap()) }
        });
    });

    group.bench_function("promote_from_tier1", |b| {
        let cache: CacheHierarchy<u64, u64> =
            CacheHierarchy::new(HierarchyConfig::with_capacities(&[100, 10_000])).unwrap();
        rt.block_on(async {
            for i in 0..10_000u64 {
                cache.put(i, i).await.unwrap();
            }
        });

        // Striding through 10k keys keeps tier 0 cold, so most reads promote
        let cache = &cache;
        let mut counter = 0u64;
        b.to_async(&rt).iter(move || {
            let key = (counter * 101) % 10_000;
            counter = counter.wrapping_add(1);
            async move { black_box(cache.get(&key).await.unwrap()) }
        });
    });

    group.finish();
}

// ============================================================================
// Concurrency Benchmarks
// ============================================================================

fn bench_concurrent_tier_access(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent_tier_access");

    for threads in [2, 4, 8] {
        group.throughput(Throughput::Elements(threads as u64 * 1000));
        group.bench_with_input(BenchmarkId::new("mixed", threads), &threads, |b, &threads| {
            b.iter(|| {
                let tier = Arc::new(Tier::<u64, u64>::new(1000).unwrap());
                let handles: Vec<_> = (0..threads as u64)
                    .map(|t| {
                        let tier = Arc::clone(&tier);
                        thread::spawn(move || {
                            for i in 0..1000u64 {
                                let key = t * 10_000 + i;
                                tier.insert(key, i);
                                black_box(tier.lookup(&(key / 2)));
                            }
                        })
                    })
                    .collect();
                for handle in handles {
                    handle.join().unwrap();
                }
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_tier_insert,
    bench_tier_lookup,
    bench_eviction_policies,
    bench_hierarchy_get,
    bench_concurrent_tier_access
);
criterion_main!(benches);
