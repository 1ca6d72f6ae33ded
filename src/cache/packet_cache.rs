//! Packet cache: fixed-size packet recycling for one size class

use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Weak,
    },
};

use crate::{
    allocators::Allocator,
    buffers::{Packet, PacketBody, PayloadBuffer},
    error::Result,
};

use super::{
    config::CacheConfig,
    free_list::FreeList,
    stats::{AtomicCacheStats, CacheStats},
};

/// Unique identifier of a cache within its registry
pub type CacheId = u64;

/// What became of a packet handed back to its cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// Pushed onto the free list for reuse
    Recycled,
    /// Payload still shared; the packet was deallocated instead
    Invalid,
    /// The cache was already destroyed; the packet was deallocated
    Orphaned,
    /// The packet had no return hook and was deallocated
    Freed,
}

/// Free-list consistency report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreeListAudit {
    /// Idle count as tracked by the cache
    pub count: usize,
    /// Nodes actually reachable from the list head
    pub reachable: usize,
    /// Idle nodes whose payload is aliased elsewhere
    pub shared: usize,
}

impl FreeListAudit {
    /// Whether the count matches the list and no idle payload is shared
    pub fn is_consistent(&self) -> bool {
        self.count == self.reachable && self.shared == 0
    }
}

/// Pool of idle packets of one size class
///
/// Only the free-list push/pop runs under the spinlock. Allocation and
/// deallocation always happen after the lock is released, so none of
/// [`acquire`](Self::acquire), release or [`run_timer_tick`](Self::run_timer_tick)
/// blocks while holding it.
pub struct PacketCache {
    id: CacheId,
    name: String,
    size_class: usize,
    alignment: usize,
    low_water_mark: usize,
    allocator: Arc<dyn Allocator>,
    free_list: spin::Mutex<FreeList>,
    stats: AtomicCacheStats,
    /// Set once, under the free-list lock, when the cache is destroyed
    closed: AtomicBool,
    /// Installed as the return hook of every packet this cache hands out
    self_ref: Weak<PacketCache>,
}

impl PacketCache {
    pub(crate) fn new(
        id: CacheId,
        config: &CacheConfig,
        allocator: Arc<dyn Allocator>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|self_ref| Self {
            id,
            name: config.name.clone(),
            size_class: config.aligned_size(),
            alignment: config.alignment,
            low_water_mark: config.low_water_mark,
            allocator,
            free_list: spin::Mutex::new(FreeList::new()),
            stats: AtomicCacheStats::new(),
            closed: AtomicBool::new(false),
            self_ref: self_ref.clone(),
        })
    }

    /// Get a packet of this cache's size class
    ///
    /// A free-list hit returns a packet whose header is reset and whose
    /// payload bytes are left as the previous owner wrote them; callers must
    /// bound reads by the length they wrote. A miss allocates fresh storage
    /// and fails only if the backing allocator does.
    pub fn acquire(&self) -> Result<Packet> {
        let recycled = self.free_list.lock().pop();

        match recycled {
            Some(mut body) => {
                self.stats.record_hit();
                body.header.reset();
                debug_assert!(body.payload_is_unique());
                body.return_hook = Some(self.self_ref.clone());
                Ok(Packet::from_body(body))
            }
            None => {
                self.stats.record_miss();
                let body = self.allocate_body()?;
                Ok(Packet::from_body(body))
            }
        }
    }

    /// Hand a packet back explicitly; equivalent to dropping it
    pub fn recycle(&self, packet: Packet) -> ReleaseOutcome {
        packet.release()
    }

    /// Return hook: recycle the body if its payload is exclusively owned
    pub(crate) fn release(&self, mut body: Box<PacketBody>) -> ReleaseOutcome {
        if !body.payload_is_unique() {
            let refs = Arc::strong_count(&body.payload);
            body.return_hook = None;
            self.stats.record_invalid_return();
            log::debug!(
                "cache '{}': payload shared by {} references, freeing packet",
                self.name,
                refs
            );
            return ReleaseOutcome::Invalid;
        }

        let mut list = self.free_list.lock();
        if self.closed.load(Ordering::Acquire) {
            drop(list);
            body.return_hook = None;
            return ReleaseOutcome::Orphaned;
        }
        list.push(body);
        ReleaseOutcome::Recycled
    }

    /// One trim timer tick: free a single idle packet above the low-water mark
    ///
    /// Returns whether a packet was evicted.
    pub fn run_timer_tick(&self) -> bool {
        let evicted = {
            let mut list = self.free_list.lock();
            if list.len() <= self.low_water_mark {
                None
            } else {
                let body = list.pop();
                if body.is_some() {
                    // counted with the pop so idle + evicted is never observed torn
                    self.stats.record_timer_eviction();
                }
                body
            }
        };

        match evicted {
            Some(mut body) => {
                body.return_hook = None;
                drop(body);
                log::trace!("cache '{}': timer evicted one idle packet", self.name);
                true
            }
            None => false,
        }
    }

    /// Allocate `count` packets straight onto the free list
    ///
    /// Counted neither as hits nor misses. Stops at the first allocation
    /// failure; packets allocated before it stay cached.
    pub fn prewarm(&self, count: usize) -> Result<usize> {
        let mut added = 0;
        for _ in 0..count {
            let body = self.allocate_body()?;
            if self.release(body) == ReleaseOutcome::Recycled {
                added += 1;
            }
        }
        Ok(added)
    }

    /// Free idle packets until at most `target` remain
    ///
    /// Not counted as timer evictions. Returns the number freed.
    pub fn trim_to(&self, target: usize) -> usize {
        let mut evicted = FreeList::new();
        {
            let mut list = self.free_list.lock();
            while list.len() > target {
                match list.pop() {
                    Some(body) => evicted.push(body),
                    None => break,
                }
            }
        }
        evicted.len()
    }

    /// Stop recycling and free every idle packet; returns how many were freed
    pub(crate) fn close(&self) -> usize {
        let drained = {
            let mut list = self.free_list.lock();
            self.closed.store(true, Ordering::Release);
            list.take()
        };
        drained.len()
    }

    /// Whether the cache has been destroyed
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Registry identifier
    pub fn id(&self) -> CacheId {
        self.id
    }

    /// Name shown in diagnostics
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Payload size of every packet in this cache
    pub fn size_class(&self) -> usize {
        self.size_class
    }

    pub fn low_water_mark(&self) -> usize {
        self.low_water_mark
    }

    /// Number of idle packets
    pub fn idle_count(&self) -> usize {
        self.free_list.lock().len()
    }

    /// Get current statistics
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }

    /// Walk the free list and compare it against the tracked count
    pub fn audit(&self) -> FreeListAudit {
        let list = self.free_list.lock();
        let (reachable, shared) = list.walk();
        FreeListAudit {
            count: list.len(),
            reachable,
            shared,
        }
    }

    /// Backing allocator
    pub fn allocator(&self) -> &Arc<dyn Allocator> {
        &self.allocator
    }

    fn allocate_body(&self) -> Result<Box<PacketBody>> {
        let payload =
            PayloadBuffer::new(Arc::clone(&self.allocator), self.size_class, self.alignment)
                .map_err(|e| {
                    log::warn!(
                        "cache '{}': allocation of {} bytes failed",
                        self.name,
                        self.size_class
                    );
                    e
                })?;
        Ok(PacketBody::new(payload, Some(self.self_ref.clone())))
    }
}

impl fmt::Debug for PacketCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PacketCache")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("size_class", &self.size_class)
            .field("low_water_mark", &self.low_water_mark)
            .field("idle", &self.idle_count())
            .field("stats", &self.stats())
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocators::HeapAllocator;

    fn cache_with(config: CacheConfig) -> (Arc<HeapAllocator>, Arc<PacketCache>) {
        let allocator = Arc::new(HeapAllocator::new());
        let cache = PacketCache::new(1, &config, allocator.clone());
        (allocator, cache)
    }

    fn cache(size: usize) -> (Arc<HeapAllocator>, Arc<PacketCache>) {
        cache_with(CacheConfig::new("test", size).with_trim_interval(None))
    }

    #[test]
    fn test_miss_then_hit() {
        let (allocator, cache) = cache(1500);
        assert_eq!(cache.size_class(), 1536);

        let packet = cache.acquire().unwrap();
        assert_eq!(packet.capacity(), 1536);
        assert!(packet.has_return_hook());
        assert_eq!(cache.stats().misses, 1);

        drop(packet);
        assert_eq!(cache.idle_count(), 1);

        let packet = cache.acquire().unwrap();
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.idle_count(), 0);
        assert_eq!(allocator.stats().allocations, 1);
        drop(packet);
    }

    #[test]
    fn test_hit_resets_header_but_not_payload() {
        let (_allocator, cache) = cache(64);
        let mut packet = cache.acquire().unwrap();
        packet.reserve(2).unwrap();
        packet.put(b"stale").unwrap();
        packet.header_mut().mark = 9;
        drop(packet);

        let packet = cache.acquire().unwrap();
        assert_eq!(packet.len(), 0);
        assert_eq!(packet.header().mark, 0);
        assert_eq!(packet.header().headroom(), 0);
        assert_eq!(packet.payload_refs(), 1);
        assert!(packet.has_return_hook());
        assert_eq!(&packet.share_payload().as_slice()[2..7], b"stale");
    }

    #[test]
    fn test_shared_release_is_invalid() {
        let (allocator, cache) = cache(64);
        let packet = cache.acquire().unwrap();
        let alias = packet.share_payload();

        assert_eq!(cache.recycle(packet), ReleaseOutcome::Invalid);
        assert_eq!(cache.stats().invalid_returns, 1);
        assert_eq!(cache.idle_count(), 0);
        assert_eq!(allocator.stats().outstanding(), 1);

        drop(alias);
        assert_eq!(allocator.stats().outstanding(), 0);
    }

    #[test]
    fn test_timer_tick_respects_low_water_mark() {
        let (_allocator, cache) = cache_with(
            CacheConfig::new("tick", 64)
                .with_trim_interval(None)
                .with_low_water_mark(2),
        );
        assert_eq!(cache.prewarm(4).unwrap(), 4);
        assert_eq!(cache.stats().acquisitions(), 0);

        assert!(cache.run_timer_tick());
        assert!(cache.run_timer_tick());
        assert!(!cache.run_timer_tick());
        assert_eq!(cache.idle_count(), 2);
        assert_eq!(cache.stats().timer_evictions, 2);
    }

    #[test]
    fn test_trim_to() {
        let (allocator, cache) = cache(64);
        cache.prewarm(6).unwrap();
        assert_eq!(cache.trim_to(2), 4);
        assert_eq!(cache.trim_to(5), 0);
        assert_eq!(cache.idle_count(), 2);
        assert_eq!(cache.stats().timer_evictions, 0);
        assert_eq!(allocator.stats().outstanding(), 2);
    }

    #[test]
    fn test_close_orphans_late_returns() {
        let (allocator, cache) = cache(64);
        cache.prewarm(3).unwrap();
        let packet = cache.acquire().unwrap();

        assert_eq!(cache.close(), 2);
        assert!(cache.is_closed());
        assert_eq!(cache.recycle(packet), ReleaseOutcome::Orphaned);
        assert_eq!(cache.idle_count(), 0);
        assert_eq!(allocator.stats().outstanding(), 0);
    }

    #[test]
    fn test_allocation_failure_propagates() {
        let allocator = Arc::new(HeapAllocator::with_limit(128));
        let cache = PacketCache::new(
            1,
            &CacheConfig::new("tight", 128).with_trim_interval(None),
            allocator.clone(),
        );

        let first = cache.acquire().unwrap();
        let err = cache.acquire().unwrap_err();
        assert!(err.is_allocation_failure());
        assert_eq!(cache.stats().misses, 2);

        drop(first);
        assert!(cache.acquire().is_ok());
    }

    #[test]
    fn test_audit() {
        let (_allocator, cache) = cache(64);
        cache.prewarm(5).unwrap();
        let audit = cache.audit();
        assert_eq!(audit.count, 5);
        assert!(audit.is_consistent());
    }
}
