//! Packet cache statistics tracking

use std::sync::atomic::{AtomicU64, Ordering};

/// Cumulative counters of one cache
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Acquisitions served from the free list
    pub hits: u64,
    /// Acquisitions that went to the backing allocator
    pub misses: u64,
    /// Idle packets freed by the trim timer
    pub timer_evictions: u64,
    /// Releases that found the payload still shared
    pub invalid_returns: u64,
}

impl CacheStats {
    /// Total acquisitions
    pub fn acquisitions(&self) -> u64 {
        self.hits + self.misses
    }

    /// Fraction of acquisitions served from the free list (0.0 to 1.0)
    pub fn hit_rate(&self) -> f64 {
        match self.acquisitions() {
            0 => 0.0,
            total => self.hits as f64 / total as f64,
        }
    }

    /// Get a summary string of the statistics
    pub fn summary(&self) -> String {
        format!(
            "CacheStats {{ hits: {}, misses: {}, timer_evictions: {}, \
             invalid_returns: {}, hit_rate: {:.2}% }}",
            self.hits,
            self.misses,
            self.timer_evictions,
            self.invalid_returns,
            self.hit_rate() * 100.0
        )
    }
}

/// Lock-free counters updated on the fast paths
///
/// Updates are relaxed; the values are advisory.
#[derive(Debug, Default)]
pub struct AtomicCacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    timer_evictions: AtomicU64,
    invalid_returns: AtomicU64,
}

impl AtomicCacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_timer_eviction(&self) {
        self.timer_evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_invalid_return(&self) {
        self.invalid_returns.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current statistics snapshot
    pub fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            timer_evictions: self.timer_evictions.load(Ordering::Relaxed),
            invalid_returns: self.invalid_returns.load(Ordering::Relaxed),
        }
    }
}
