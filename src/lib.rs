//! # pktcache - Packet Buffer Cache
//!
//! A fixed-size packet-buffer object cache for networking data paths. Each
//! cache serves one size class, recycles released packets through a LIFO
//! free list, and trims itself back to a low-water mark on a timer.
//!
//! ## Features
//!
//! - **Allocation fast path**: free-list hits reuse both header and payload storage
//! - **Share-aware recycling**: a packet whose payload is still aliased is freed, never reused
//! - **Background trimming**: one idle packet per tick above the low-water mark
//! - **Registry**: every live cache can be listed for diagnostics
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                 CacheRegistry                    │
//! │   newest ─► PacketCache ─► PacketCache ─► ...    │
//! └──────────────────────────────────────────────────┘
//!                      │
//!          ┌───────────┼──────────────┐
//!          ▼           ▼              ▼
//!   ┌────────────┐ ┌──────────┐ ┌───────────┐
//!   │ Free list  │ │ Counters │ │ TrimTimer │
//!   │ (spinlock) │ │ (atomic) │ │ (thread)  │
//!   └────────────┘ └──────────┘ └───────────┘
//!          │
//!          ▼  miss / real free
//!   ┌──────────────────┐
//!   │ Backing allocator │
//!   └──────────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use pktcache::{CacheConfig, CacheRegistry};
//!
//! # fn main() -> pktcache::Result<()> {
//! let registry = CacheRegistry::global();
//! let cache = registry.create(CacheConfig::new("rx", 1500))?;
//!
//! let mut packet = cache.acquire()?;
//! packet.put(b"payload")?;
//! drop(packet); // back onto the free list
//!
//! println!("{}", registry.snapshot());
//! cache.destroy();
//! # Ok(())
//! # }
//! ```

pub mod allocators;
pub mod buffers;
pub mod cache;
pub mod error;
pub mod registry;
pub mod sync;

// Main API re-exports
pub use allocators::{Allocator, AllocatorStats, HeapAllocator};
pub use buffers::{Packet, PacketHeader, PayloadBuffer, SharedPayload};
pub use cache::{
    CacheConfig, CacheConfigBuilder, CacheId, CacheStats, FreeListAudit, PacketCache,
    ReleaseOutcome,
};
pub use error::{CacheError, Result};
pub use registry::{CacheHandle, CacheRegistry, CacheSnapshot, RegistrySnapshot};
pub use sync::TrimTimer;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration constants
pub mod config {
    pub use crate::cache::{DEFAULT_ALIGNMENT, DEFAULT_LOW_WATER_MARK, DEFAULT_TRIM_INTERVAL};
}
