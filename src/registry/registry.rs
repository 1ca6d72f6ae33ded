//! Catalogue of live packet caches

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use parking_lot::Mutex;

use crate::{
    allocators::{Allocator, HeapAllocator},
    cache::{CacheConfig, CacheId, PacketCache},
    error::Result,
    sync::TrimTimer,
};

use super::{
    handle::CacheHandle,
    snapshot::{CacheSnapshot, RegistrySnapshot},
};

lazy_static::lazy_static! {
    static ref GLOBAL_REGISTRY: CacheRegistry = CacheRegistry::new();
}

#[derive(Debug)]
struct RegistryInner {
    /// Live caches, newest first
    caches: Mutex<Vec<Arc<PacketCache>>>,
    next_id: AtomicU64,
    default_allocator: Arc<dyn Allocator>,
}

/// Registry of every cache created through it and not yet destroyed
///
/// Cloning is cheap and yields another handle to the same registry.
#[derive(Debug, Clone)]
pub struct CacheRegistry {
    inner: Arc<RegistryInner>,
}

impl CacheRegistry {
    /// Create a registry whose caches allocate from the global heap
    pub fn new() -> Self {
        Self::with_allocator(Arc::new(HeapAllocator::new()))
    }

    /// Create a registry with a default backing allocator for its caches
    pub fn with_allocator(allocator: Arc<dyn Allocator>) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                caches: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
                default_allocator: allocator,
            }),
        }
    }

    /// The process-wide registry
    pub fn global() -> &'static CacheRegistry {
        &GLOBAL_REGISTRY
    }

    /// Create a cache backed by the registry's default allocator
    pub fn create(&self, config: CacheConfig) -> Result<CacheHandle> {
        let allocator = Arc::clone(&self.inner.default_allocator);
        self.create_with_allocator(config, allocator)
    }

    /// Create a cache, start its trim timer and register it
    pub fn create_with_allocator(
        &self,
        config: CacheConfig,
        allocator: Arc<dyn Allocator>,
    ) -> Result<CacheHandle> {
        config.validate()?;

        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let cache = PacketCache::new(id, &config, allocator);

        if config.initial_count > 0 {
            cache.prewarm(config.initial_count)?;
        }

        let timer = match config.trim_interval {
            Some(interval) => {
                let weak = Arc::downgrade(&cache);
                Some(TrimTimer::start(
                    format!("pktcache-trim-{}", id),
                    interval,
                    move || match weak.upgrade() {
                        Some(cache) => {
                            cache.run_timer_tick();
                            true
                        }
                        None => false,
                    },
                )?)
            }
            None => None,
        };

        self.inner.caches.lock().insert(0, Arc::clone(&cache));

        log::debug!(
            "created packet cache '{}' (id {}, size class {}, low-water mark {})",
            cache.name(),
            id,
            cache.size_class(),
            cache.low_water_mark()
        );

        Ok(CacheHandle::new(cache, timer, self.clone()))
    }

    /// Remove a cache from the registry; false if it was not registered
    pub(crate) fn deregister(&self, id: CacheId) -> bool {
        let mut caches = self.inner.caches.lock();
        match caches.iter().position(|c| c.id() == id) {
            Some(index) => {
                caches.remove(index);
                true
            }
            None => false,
        }
    }

    /// Snapshot of every live cache
    ///
    /// Taken under the registry lock, so it reflects exactly the caches
    /// registered at one instant. Each cache's free-list lock is held only
    /// for a single count read.
    pub fn snapshot(&self) -> RegistrySnapshot {
        let caches = self.inner.caches.lock();
        RegistrySnapshot::new(caches.iter().map(|c| CacheSnapshot::of(c)).collect())
    }

    /// Number of live caches
    pub fn len(&self) -> usize {
        self.inner.caches.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.caches.lock().is_empty()
    }

    /// Whether a cache with this id is registered
    pub fn contains(&self, id: CacheId) -> bool {
        self.inner.caches.lock().iter().any(|c| c.id() == id)
    }

    /// Ids of the live caches, newest first
    pub fn ids(&self) -> Vec<CacheId> {
        self.inner.caches.lock().iter().map(|c| c.id()).collect()
    }

    /// Allocator used by [`create`](Self::create)
    pub fn default_allocator(&self) -> &Arc<dyn Allocator> {
        &self.inner.default_allocator
    }
}

impl Default for CacheRegistry {
    fn default() -> Self {
        Self::new()
    }
}
