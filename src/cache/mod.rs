//! Per-size-class packet caches
//!
//! Each cache keeps a LIFO free list of idle packets, serves acquisitions
//! from it before falling back to the backing allocator, and refuses to
//! recycle a packet whose payload is still aliased.

pub mod config;
mod free_list;
pub mod packet_cache;
pub mod stats;

// Re-export main types
pub use config::{
    CacheConfig, CacheConfigBuilder, DEFAULT_ALIGNMENT, DEFAULT_LOW_WATER_MARK,
    DEFAULT_TRIM_INTERVAL,
};
pub use packet_cache::{CacheId, FreeListAudit, PacketCache, ReleaseOutcome};
pub use stats::{AtomicCacheStats, CacheStats};
