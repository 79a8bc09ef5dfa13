//! Integration tests for the in-memory hierarchy
//!
//! Exercises the public API end to end without a durable store: capacity
//! bounds under random workloads, LRU order against a reference model,
//! promotion, and concurrent access from many tasks.

use std::collections::VecDeque;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use stratum_core::{
    CacheHierarchy, EvictionKind, HierarchyConfig, PromotionPolicy, Tier, TierConfig,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("stratum_core=trace")
        .try_init();
}

/// Validates that no tier ever exceeds its capacity under random traffic.
///
/// Assertions:
/// - Ensures every tier's `len()` stays within capacity after each operation.
/// - Confirms per-tier inserts never undercount tier 0's resident entries.
#[tokio::test]
async fn capacity_holds_under_random_workload() {
    init_tracing();
    let config = HierarchyConfig::builder()
        .tier(TierConfig::new(3))
        .tier(TierConfig::new(7).eviction(EvictionKind::Lfu))
        .tier(TierConfig::new(15).eviction(EvictionKind::Fifo))
        .build();
    let cache: CacheHierarchy<u64, u64> = CacheHierarchy::new(config).unwrap();
    let mut rng = StdRng::seed_from_u64(7);

    for step in 0..2_000u64 {
        let key = rng.gen_range(0..40u64);
        match rng.gen_range(0..10) {
            0..=4 => cache.put(key, step).await.unwrap(),
            5..=8 => {
                cache.get(&key).await.unwrap();
            }
            _ => {
                cache.remove(&key).await.unwrap();
            }
        }

        for index in 0..cache.tier_count() {
            let tier = cache.tier(index).unwrap();
            assert!(tier.len() <= tier.capacity(), "tier {index} over capacity at step {step}");
        }
    }

    let stats = cache.stats_snapshot();
    assert!(stats.tiers[0].inserts >= stats.tiers[0].size as u64);
}

/// Validates single-tier LRU behaviour against a reference model.
///
/// Assertions:
/// - Confirms every lookup agrees with the model on presence.
/// - Confirms `keys_by_priority` matches the model's recency order.
#[test]
fn lru_matches_reference_model() {
    const CAPACITY: usize = 5;
    let tier: Tier<u32, u32> = Tier::new(CAPACITY).unwrap();
    let mut model: VecDeque<u32> = VecDeque::new();
    let mut rng = StdRng::seed_from_u64(42);

    for _ in 0..1_000 {
        let key = rng.gen_range(0..12u32);
        if rng.gen_bool(0.5) {
            tier.insert(key, key);
            model.retain(|k| *k != key);
            if model.len() == CAPACITY {
                model.pop_back();
            }
            model.push_front(key);
        } else {
            let hit = tier.lookup(&key).is_some();
            let expected = model.contains(&key);
            assert_eq!(hit, expected, "presence of {key}");
            if expected {
                model.retain(|k| *k != key);
                model.push_front(key);
            }
        }

        assert_eq!(tier.keys_by_priority(), model.iter().copied().collect::<Vec<_>>());
    }
}

/// Validates the two-tier walkthrough through the public API.
///
/// Assertions:
/// - Confirms tier 0 ends as {A, C}.
/// - Confirms tier 0 recorded one miss and tier 1 one hit.
#[tokio::test]
async fn promotion_moves_value_into_tier_zero() {
    let cache: CacheHierarchy<String, String> =
        CacheHierarchy::new(HierarchyConfig::with_capacities(&[2, 4])).unwrap();
    for k in ["A", "B", "C"] {
        cache.put(k.to_string(), k.to_lowercase()).await.unwrap();
    }

    assert_eq!(cache.get(&"A".to_string()).await.unwrap(), Some("a".to_string()));

    let mut tier0 = cache.tier(0).unwrap().keys_by_priority();
    tier0.sort();
    assert_eq!(tier0, vec!["A".to_string(), "C".to_string()]);

    let stats = cache.stats_snapshot();
    assert_eq!(stats.tiers[0].misses, 1);
    assert_eq!(stats.tiers[1].hits, 1);
    assert_eq!(stats.tiers[0].evictions, 2);
}

/// Validates adjacent promotion walks a value up one tier per hit.
#[tokio::test]
async fn adjacent_promotion_climbs_one_tier_per_hit() {
    let config = HierarchyConfig {
        promotion: PromotionPolicy::Adjacent,
        ..HierarchyConfig::with_capacities(&[1, 1, 8])
    };
    let cache: CacheHierarchy<u64, u64> = CacheHierarchy::new(config).unwrap();
    cache.put(1, 10).await.unwrap();
    cache.put(2, 20).await.unwrap();

    assert!(!cache.tier(1).unwrap().contains(&1));
    cache.get(&1).await.unwrap();
    assert!(cache.tier(1).unwrap().contains(&1));
    assert!(!cache.tier(0).unwrap().contains(&1));

    cache.get(&1).await.unwrap();
    assert!(cache.tier(0).unwrap().contains(&1));
    assert_eq!(cache.stats_snapshot().promotions, 2);
}

/// Validates concurrent readers and writers leave the hierarchy consistent.
///
/// Assertions:
/// - Ensures no tier exceeds capacity after all tasks finish.
/// - Confirms a key written last by every task is readable afterwards.
/// - Confirms lookups across tiers add up to the number of `get` calls.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_access_converges() {
    let cache: Arc<CacheHierarchy<u64, u64>> =
        Arc::new(CacheHierarchy::new(HierarchyConfig::with_capacities(&[8, 32])).unwrap());

    let tasks: Vec<_> = (0..8u64)
        .map(|task| {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move {
                for i in 0..250u64 {
                    let key = (task * 31 + i) % 64;
                    cache.put(key, task).await.unwrap();
                    cache.get(&((key + 1) % 64)).await.unwrap();
                }
                cache.put(1_000, task).await.unwrap();
            })
        })
        .collect();

    for task in tasks {
        task.await.unwrap();
    }

    for index in 0..cache.tier_count() {
        let tier = cache.tier(index).unwrap();
        assert!(tier.len() <= tier.capacity());
    }

    let value = cache.get(&1_000).await.unwrap();
    assert!(matches!(value, Some(task) if task < 8));

    let stats = cache.stats_snapshot();
    let tier0_lookups = stats.tiers[0].hits + stats.tiers[0].misses;
    assert_eq!(tier0_lookups, 8 * 250 + 1);
    assert_eq!(stats.memory_hits() + stats.misses, 8 * 250 + 1);
}

/// Validates that clear drops entries but keeps counters.
#[tokio::test]
async fn clear_keeps_statistics() {
    let cache: CacheHierarchy<u64, u64> =
        CacheHierarchy::new(HierarchyConfig::with_capacities(&[4])).unwrap();
    cache.put(1, 1).await.unwrap();
    cache.get(&1).await.unwrap();

    cache.clear();
    assert!(!cache.contains(&1));
    assert_eq!(cache.get(&1).await.unwrap(), None);

    let stats = cache.stats_snapshot();
    assert_eq!(stats.tiers[0].hits, 1);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.tiers[0].size, 0);
}
