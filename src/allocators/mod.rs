//! Backing allocators for cache misses

pub mod heap;
pub mod traits;

pub use heap::HeapAllocator;
pub use traits::{Allocator, AllocatorStats};
