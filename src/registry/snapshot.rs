//! Point-in-time view of every live cache

use std::fmt;

use crate::cache::{CacheId, CacheStats, PacketCache};

/// Headroom a bounded render keeps free before it stops adding cache lines
const LINE_HEADROOM: usize = 200;

/// One cache as seen by a registry snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct CacheSnapshot {
    pub id: CacheId,
    pub name: String,
    /// Payload size in bytes
    pub size_class: usize,
    /// Idle packets at the time of the snapshot
    pub count: usize,
    pub stats: CacheStats,
}

impl CacheSnapshot {
    pub(crate) fn of(cache: &PacketCache) -> Self {
        Self {
            id: cache.id(),
            name: cache.name().to_string(),
            size_class: cache.size_class(),
            count: cache.idle_count(),
            stats: cache.stats(),
        }
    }

    fn write_line(&self, index: usize, out: &mut impl fmt::Write) -> fmt::Result {
        writeln!(
            out,
            "{}. skb size: {}, count: {}, hits: {}, misses: {}, free by timer: {}, free invalid: {}",
            index,
            self.size_class,
            self.count,
            self.stats.hits,
            self.stats.misses,
            self.stats.timer_evictions,
            self.stats.invalid_returns
        )
    }
}

/// Snapshot of a registry, newest cache first
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegistrySnapshot {
    caches: Vec<CacheSnapshot>,
}

impl RegistrySnapshot {
    pub(crate) fn new(caches: Vec<CacheSnapshot>) -> Self {
        Self { caches }
    }

    pub fn caches(&self) -> &[CacheSnapshot] {
        &self.caches
    }

    pub fn len(&self) -> usize {
        self.caches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.caches.is_empty()
    }

    /// Look up a cache by id
    pub fn find(&self, id: CacheId) -> Option<&CacheSnapshot> {
        self.caches.iter().find(|c| c.id == id)
    }

    /// Idle packets across all caches
    pub fn total_idle(&self) -> usize {
        self.caches.iter().map(|c| c.count).sum()
    }

    /// Render for a console buffer of `max_len` bytes
    ///
    /// Cache lines are only added while more than 200 bytes of room remain;
    /// the closing total line is always written.
    pub fn render_bounded(&self, max_len: usize) -> String {
        let mut out = String::new();
        for (index, cache) in self.caches.iter().enumerate() {
            if out.len() + LINE_HEADROOM < max_len {
                // writing into a String cannot fail
                let _ = cache.write_line(index, &mut out);
            }
        }
        let _ = self.write_total(&mut out);
        out
    }

    fn write_total(&self, out: &mut impl fmt::Write) -> fmt::Result {
        writeln!(out, "total: {} skb cache lists", self.caches.len())
    }
}

impl fmt::Display for RegistrySnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, cache) in self.caches.iter().enumerate() {
            cache.write_line(index, f)?;
        }
        self.write_total(f)
    }
}
