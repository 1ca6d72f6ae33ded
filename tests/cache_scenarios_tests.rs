//! Acquire / release / trim / destroy scenarios on a single cache

use std::sync::Arc;

use pktcache::{
    CacheConfig, CacheHandle, CacheRegistry, HeapAllocator, ReleaseOutcome,
};

#[cfg(test)]
mod cache_scenarios_tests {
    use super::*;

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn manual_cache(low_water: usize) -> (Arc<HeapAllocator>, CacheRegistry, CacheHandle) {
        let allocator = Arc::new(HeapAllocator::new());
        let registry = CacheRegistry::with_allocator(allocator.clone());
        let handle = registry
            .create(
                CacheConfig::new("scenario", 2048)
                    .with_trim_interval(None)
                    .with_low_water_mark(low_water),
            )
            .expect("Failed to create cache");
        (allocator, registry, handle)
    }

    /// Empty cache: acquire is a miss
    #[test]
    fn scenario_acquire_from_empty_cache() {
        init_logger();
        let (allocator, _registry, cache) = manual_cache(10);

        let packet = cache.acquire().unwrap();
        assert_eq!(packet.capacity(), 2048);
        assert!(packet.is_empty());
        assert_eq!(packet.payload_refs(), 1);

        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 0);
        assert_eq!(cache.idle_count(), 0);
        assert_eq!(allocator.stats().allocations, 1);
    }

    /// One idle packet: acquire returns it as a hit
    #[test]
    fn scenario_acquire_with_one_idle_packet() {
        init_logger();
        let (allocator, _registry, cache) = manual_cache(10);
        let mut first = cache.acquire().unwrap();
        first.header_mut().protocol = 0x86dd;
        first.put(b"first owner").unwrap();
        drop(first);
        assert_eq!(cache.idle_count(), 1);

        let packet = cache.acquire().unwrap();
        assert_eq!(packet.header().protocol, 0);
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.idle_count(), 0);
        assert_eq!(allocator.stats().allocations, 1);
    }

    /// Shared payload at release time: freed, not recycled
    #[test]
    fn scenario_release_with_shared_payload() {
        init_logger();
        let (allocator, _registry, cache) = manual_cache(10);
        let idle_before = cache.idle_count();

        let packet = cache.acquire().unwrap();
        let alias = packet.share_payload();
        assert_eq!(packet.payload_refs(), 2);

        assert_eq!(packet.release(), ReleaseOutcome::Invalid);
        assert_eq!(cache.stats().invalid_returns, 1);
        assert_eq!(cache.idle_count(), idle_before);

        // the alias still owns the storage until it lets go
        assert_eq!(allocator.stats().deallocations, 0);
        drop(alias);
        assert_eq!(allocator.stats().deallocations, 1);
    }

    /// Count above the low-water mark: one tick evicts exactly one packet
    #[test]
    fn scenario_timer_tick_above_low_water_mark() {
        init_logger();
        let (allocator, _registry, cache) = manual_cache(10);
        cache.prewarm(15).unwrap();
        assert_eq!(cache.idle_count(), 15);

        assert!(cache.run_timer_tick());
        assert_eq!(cache.idle_count(), 14);
        assert_eq!(cache.stats().timer_evictions, 1);
        assert_eq!(allocator.stats().deallocations, 1);
    }

    /// Destroy with idle packets: all freed, cache gone from the registry
    #[test]
    fn scenario_destroy_with_idle_packets() {
        init_logger();
        let (allocator, registry, cache) = manual_cache(10);
        cache.prewarm(3).unwrap();
        let id = cache.id();

        assert_eq!(cache.destroy(), 3);
        assert_eq!(allocator.stats().deallocations, 3);
        assert_eq!(allocator.stats().outstanding(), 0);

        let snapshot = registry.snapshot();
        assert!(snapshot.find(id).is_none());
        assert!(snapshot.is_empty());
    }

    #[test]
    fn test_round_trip_restores_count() {
        init_logger();
        let (_allocator, _registry, cache) = manual_cache(10);
        cache.prewarm(4).unwrap();
        let before = cache.stats();

        let packet = cache.acquire().unwrap();
        assert_eq!(cache.idle_count(), 3);
        assert_eq!(packet.release(), ReleaseOutcome::Recycled);

        let after = cache.stats();
        assert_eq!(cache.idle_count(), 4);
        assert_eq!(after.hits, before.hits + 1);
        assert_eq!(after.misses, before.misses);
        assert_eq!(after.invalid_returns, before.invalid_returns);
    }

    #[test]
    fn test_exactly_one_of_hit_or_miss_per_acquire() {
        init_logger();
        let (_allocator, _registry, cache) = manual_cache(10);
        let mut held = Vec::new();
        for round in 0..5 {
            for _ in 0..round + 1 {
                held.push(cache.acquire().unwrap());
            }
            if round % 2 == 0 {
                held.clear();
            }
        }
        let stats = cache.stats();
        assert_eq!(stats.acquisitions(), (1..=5).sum::<u64>());
    }

    #[test]
    fn test_low_water_convergence() {
        init_logger();
        let (_allocator, _registry, cache) = manual_cache(10);
        cache.prewarm(25).unwrap();

        let mut previous = cache.idle_count();
        for _ in 0..40 {
            cache.run_timer_tick();
            let current = cache.idle_count();
            assert!(current <= previous);
            assert!(current >= 10);
            previous = current;
        }
        assert_eq!(cache.idle_count(), 10);
        assert_eq!(cache.stats().timer_evictions, 15);
        assert!(!cache.run_timer_tick());
    }

    #[test]
    fn test_lifo_reuse_order() {
        init_logger();
        let (_allocator, _registry, cache) = manual_cache(10);
        let mut a = cache.acquire().unwrap();
        let mut b = cache.acquire().unwrap();
        a.put(b"aaaa").unwrap();
        b.put(b"bbbb").unwrap();
        drop(a);
        drop(b);

        // most recently released first; payload bytes survive reuse
        let first = cache.acquire().unwrap();
        assert_eq!(&first.share_payload().as_slice()[..4], b"bbbb");
        let second = cache.acquire().unwrap();
        assert_eq!(&second.share_payload().as_slice()[..4], b"aaaa");
    }

    #[test]
    fn test_allocation_failure_reaches_caller() {
        init_logger();
        let allocator = Arc::new(HeapAllocator::with_limit(4096));
        let registry = CacheRegistry::with_allocator(allocator.clone());
        let cache = registry
            .create(CacheConfig::new("bounded", 2048).with_trim_interval(None))
            .unwrap();

        let a = cache.acquire().unwrap();
        let b = cache.acquire().unwrap();
        let err = cache.acquire().unwrap_err();
        assert!(err.is_allocation_failure());
        assert_eq!(cache.stats().misses, 3);

        drop((a, b));
        assert!(cache.acquire().is_ok());
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn test_audit_stays_consistent() {
        init_logger();
        let (_allocator, _registry, cache) = manual_cache(2);
        let mut held = Vec::new();
        let mut aliases = Vec::new();

        for i in 0..200 {
            let packet = cache.acquire().unwrap();
            if i % 7 == 0 {
                aliases.push(packet.share_payload());
            }
            held.push(packet);
            if i % 13 == 0 {
                held.clear();
                cache.run_timer_tick();
                assert!(cache.audit().is_consistent());
            }
        }
        held.clear();
        aliases.clear();

        let audit = cache.audit();
        assert!(audit.is_consistent());
        assert_eq!(audit.count, cache.idle_count());
    }
}
