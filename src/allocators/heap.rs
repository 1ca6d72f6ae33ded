//! Heap allocator - the default backing store for cache misses

use std::{
    alloc::{self, Layout},
    ptr::NonNull,
    sync::atomic::{AtomicU64, AtomicUsize, Ordering},
};

use super::traits::{Allocator, AllocatorStats};
use crate::error::{CacheError, Result};

const UNLIMITED: usize = usize::MAX;

/// Global-heap allocator with an optional byte budget
///
/// With a budget set, any request that would push `bytes_in_use` past the
/// limit fails with [`CacheError::AllocationFailed`]. Tests use this to
/// exercise the allocation-failure path of `acquire`.
#[derive(Debug)]
pub struct HeapAllocator {
    limit: AtomicUsize,
    bytes_in_use: AtomicUsize,
    peak_bytes: AtomicUsize,
    allocations: AtomicU64,
    deallocations: AtomicU64,
    failures: AtomicU64,
}

impl HeapAllocator {
    /// Create an allocator without a byte budget
    pub fn new() -> Self {
        Self::with_limit_bytes(UNLIMITED)
    }

    /// Create an allocator that refuses to hand out more than `limit` bytes
    pub fn with_limit(limit: usize) -> Self {
        Self::with_limit_bytes(limit)
    }

    fn with_limit_bytes(limit: usize) -> Self {
        Self {
            limit: AtomicUsize::new(limit),
            bytes_in_use: AtomicUsize::new(0),
            peak_bytes: AtomicUsize::new(0),
            allocations: AtomicU64::new(0),
            deallocations: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    /// Change the byte budget; `None` removes it
    pub fn set_limit(&self, limit: Option<usize>) {
        self.limit
            .store(limit.unwrap_or(UNLIMITED), Ordering::Relaxed);
    }

    /// Current byte budget, if any
    pub fn limit(&self) -> Option<usize> {
        match self.limit.load(Ordering::Relaxed) {
            UNLIMITED => None,
            limit => Some(limit),
        }
    }

    /// Snapshot of the allocator's counters
    pub fn stats(&self) -> AllocatorStats {
        AllocatorStats {
            allocations: self.allocations.load(Ordering::Relaxed),
            deallocations: self.deallocations.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            bytes_in_use: self.bytes_in_use.load(Ordering::Relaxed),
            peak_bytes: self.peak_bytes.load(Ordering::Relaxed),
        }
    }

    fn reserve(&self, size: usize) -> bool {
        let limit = self.limit.load(Ordering::Relaxed);
        let mut current = self.bytes_in_use.load(Ordering::Relaxed);
        loop {
            let next = match current.checked_add(size) {
                Some(next) if next <= limit => next,
                _ => return false,
            };
            match self.bytes_in_use.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => {
                    self.peak_bytes.fetch_max(next, Ordering::Relaxed);
                    return true;
                }
                Err(actual) => current = actual,
            }
        }
    }

    fn record_failure(&self, size: usize, message: &str) -> CacheError {
        self.failures.fetch_add(1, Ordering::Relaxed);
        log::warn!("heap allocation of {} bytes failed: {}", size, message);
        CacheError::allocation_failed(size, message)
    }
}

impl Default for HeapAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl Allocator for HeapAllocator {
    fn allocate(&self, size: usize, align: usize) -> Result<NonNull<u8>> {
        if size == 0 {
            return Err(CacheError::invalid_parameter(
                "size",
                "Allocation size cannot be zero",
            ));
        }

        let layout = Layout::from_size_align(size, align)
            .map_err(|e| CacheError::invalid_parameter("align", e.to_string()))?;

        if !self.reserve(size) {
            return Err(self.record_failure(size, "byte budget exhausted"));
        }

        // SAFETY: layout has a non-zero size.
        let raw = unsafe { alloc::alloc(layout) };
        match NonNull::new(raw) {
            Some(ptr) => {
                self.allocations.fetch_add(1, Ordering::Relaxed);
                Ok(ptr)
            }
            None => {
                self.bytes_in_use.fetch_sub(size, Ordering::AcqRel);
                Err(self.record_failure(size, "global allocator returned null"))
            }
        }
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, size: usize, align: usize) -> Result<()> {
        let layout = Layout::from_size_align(size, align)
            .map_err(|e| CacheError::invalid_parameter("align", e.to_string()))?;

        alloc::dealloc(ptr.as_ptr(), layout);
        self.bytes_in_use.fetch_sub(size, Ordering::AcqRel);
        self.deallocations.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn stats(&self) -> AllocatorStats {
        HeapAllocator::stats(self)
    }
}
