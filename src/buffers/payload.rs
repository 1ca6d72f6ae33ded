//! Fixed-size payload storage backed by an external allocator

use std::{fmt, ptr::NonNull, slice, sync::Arc};

use crate::{
    allocators::Allocator,
    error::{CacheError, Result},
};

/// Payload region of one size class
///
/// The storage is obtained from, and handed back to, the allocator it was
/// created with. Freshly allocated storage is zeroed once; recycled storage
/// keeps whatever the previous owner wrote.
pub struct PayloadBuffer {
    /// Pointer to the payload bytes
    data: NonNull<u8>,
    /// Size of the region in bytes
    capacity: usize,
    /// Alignment the region was allocated with
    align: usize,
    /// Allocator that owns the storage
    allocator: Arc<dyn Allocator>,
}

impl PayloadBuffer {
    /// Allocate a zeroed payload of `capacity` bytes
    pub fn new(allocator: Arc<dyn Allocator>, capacity: usize, align: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(CacheError::invalid_parameter(
                "capacity",
                "Payload size cannot be zero",
            ));
        }

        let data = allocator.allocate(capacity, align)?;
        // SAFETY: `data` is valid for `capacity` bytes.
        unsafe { std::ptr::write_bytes(data.as_ptr(), 0, capacity) };

        Ok(Self {
            data,
            capacity,
            align,
            allocator,
        })
    }

    /// Size of the payload region
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Alignment of the payload region
    pub fn alignment(&self) -> usize {
        self.align
    }

    /// The whole region as a byte slice
    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: the region is initialised at allocation and owned by self.
        unsafe { slice::from_raw_parts(self.data.as_ptr(), self.capacity) }
    }

    /// The whole region as a mutable byte slice
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: `&mut self` guarantees exclusive access.
        unsafe { slice::from_raw_parts_mut(self.data.as_ptr(), self.capacity) }
    }

    /// Copy `data` into the region at `offset`
    pub fn write(&mut self, offset: usize, data: &[u8]) -> Result<()> {
        let end = offset
            .checked_add(data.len())
            .filter(|&end| end <= self.capacity)
            .ok_or_else(|| {
                CacheError::insufficient_space(data.len(), self.capacity.saturating_sub(offset))
            })?;
        self.as_mut_slice()[offset..end].copy_from_slice(data);
        Ok(())
    }

    /// Zero the region
    pub fn zero(&mut self) {
        self.as_mut_slice().fill(0);
    }

    /// Get a reference to the allocator
    pub fn allocator(&self) -> &Arc<dyn Allocator> {
        &self.allocator
    }
}

// SAFETY: the region is uniquely owned; shared access is read-only.
unsafe impl Send for PayloadBuffer {}
unsafe impl Sync for PayloadBuffer {}

impl Drop for PayloadBuffer {
    fn drop(&mut self) {
        // SAFETY: allocated by this allocator with this size and alignment.
        let result = unsafe { self.allocator.deallocate(self.data, self.capacity, self.align) };
        if let Err(e) = result {
            log::warn!("failed to deallocate {}-byte payload: {}", self.capacity, e);
        }
    }
}

impl fmt::Debug for PayloadBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PayloadBuffer")
            .field("data", &self.data)
            .field("capacity", &self.capacity)
            .field("align", &self.align)
            .field("allocator", &self.allocator.type_name())
            .finish()
    }
}

impl AsRef<[u8]> for PayloadBuffer {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}
