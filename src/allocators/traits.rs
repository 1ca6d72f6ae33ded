//! Allocator trait definition

use std::ptr::NonNull;

use crate::error::Result;

/// Backing allocator consulted on a cache miss and on real deallocation
///
/// The cache never allocates or frees payload storage itself: every miss
/// goes through [`Allocator::allocate`] and every payload that leaves the
/// cache for good goes back through [`Allocator::deallocate`].
pub trait Allocator: Send + Sync + std::fmt::Debug {
    /// Allocate memory of the given size and alignment
    fn allocate(&self, size: usize, align: usize) -> Result<NonNull<u8>>;

    /// Deallocate previously allocated memory
    ///
    /// # Safety
    /// `ptr` must have been returned by [`Allocator::allocate`] on this
    /// allocator with the same `size` and `align`, and must not be used again.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, size: usize, align: usize) -> Result<()>;

    /// Snapshot of the allocator's counters
    fn stats(&self) -> AllocatorStats;

    /// Get allocator type name for debugging
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Counters exposed by a backing allocator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AllocatorStats {
    /// Successful allocations
    pub allocations: u64,
    /// Deallocations
    pub deallocations: u64,
    /// Rejected allocations
    pub failures: u64,
    /// Bytes currently handed out
    pub bytes_in_use: usize,
    /// Highest value `bytes_in_use` has reached
    pub peak_bytes: usize,
}

impl AllocatorStats {
    /// Number of allocations not yet returned
    pub fn outstanding(&self) -> u64 {
        self.allocations.saturating_sub(self.deallocations)
    }
}
