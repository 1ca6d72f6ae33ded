//! Owning handle of a registered cache

use std::{ops::Deref, sync::Arc};

use crate::{cache::PacketCache, sync::TrimTimer};

use super::registry::CacheRegistry;

/// Owner of one registered cache
///
/// Dereferences to the [`PacketCache`]. Destroying the handle, explicitly
/// with [`destroy`](Self::destroy) or implicitly on drop, cancels the trim
/// timer and waits for it, removes the cache from its registry, and frees
/// every idle packet. Packets still in use are freed when their owners drop
/// them.
#[derive(Debug)]
pub struct CacheHandle {
    cache: Arc<PacketCache>,
    timer: Option<TrimTimer>,
    registry: CacheRegistry,
    destroyed: bool,
}

impl CacheHandle {
    pub(crate) fn new(
        cache: Arc<PacketCache>,
        timer: Option<TrimTimer>,
        registry: CacheRegistry,
    ) -> Self {
        Self {
            cache,
            timer,
            registry,
            destroyed: false,
        }
    }

    /// Shared reference to the cache
    pub fn cache(&self) -> &Arc<PacketCache> {
        &self.cache
    }

    /// Whether a trim timer thread drives this cache
    pub fn has_timer(&self) -> bool {
        self.timer.as_ref().is_some_and(TrimTimer::is_active)
    }

    /// Trim timer ticks run so far (0 without a timer)
    pub fn timer_ticks(&self) -> u64 {
        self.timer.as_ref().map_or(0, TrimTimer::ticks)
    }

    /// Destroy the cache; returns the number of idle packets freed
    pub fn destroy(mut self) -> usize {
        self.teardown()
    }

    fn teardown(&mut self) -> usize {
        if self.destroyed {
            return 0;
        }
        self.destroyed = true;

        if let Some(mut timer) = self.timer.take() {
            timer.cancel();
        }
        self.registry.deregister(self.cache.id());
        let drained = self.cache.close();

        log::debug!(
            "destroyed packet cache '{}' (id {}), freed {} idle packets",
            self.cache.name(),
            self.cache.id(),
            drained
        );
        drained
    }
}

impl Deref for CacheHandle {
    type Target = PacketCache;

    fn deref(&self) -> &PacketCache {
        &self.cache
    }
}

impl Drop for CacheHandle {
    fn drop(&mut self) {
        self.teardown();
    }
}
