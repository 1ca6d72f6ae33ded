//! Packet: single-owner header plus a possibly shared payload

use std::{
    fmt,
    mem::ManuallyDrop,
    sync::{Arc, Weak},
};

use crate::{
    cache::{PacketCache, ReleaseOutcome},
    error::{CacheError, Result},
};

use super::{header::PacketHeader, payload::PayloadBuffer};

/// Storage recycled by a cache: the boxed header doubles as a free-list node
pub(crate) struct PacketBody {
    pub(crate) header: PacketHeader,
    pub(crate) payload: Arc<PayloadBuffer>,
    /// Cache to return to when the owner is done with the packet
    pub(crate) return_hook: Option<Weak<PacketCache>>,
    /// Free-list link, only set while the body sits idle in a cache
    pub(crate) next: Option<Box<PacketBody>>,
}

impl PacketBody {
    pub(crate) fn new(payload: PayloadBuffer, return_hook: Option<Weak<PacketCache>>) -> Box<Self> {
        Box::new(Self {
            header: PacketHeader::default(),
            payload: Arc::new(payload),
            return_hook,
            next: None,
        })
    }

    pub(crate) fn payload_is_unique(&mut self) -> bool {
        Arc::get_mut(&mut self.payload).is_some()
    }
}

/// A packet buffer handed out by a [`PacketCache`]
///
/// Dropping a packet runs its return hook: the packet goes back to the free
/// list of the cache it came from if it still owns its payload exclusively,
/// and is deallocated for real otherwise.
pub struct Packet {
    body: ManuallyDrop<Box<PacketBody>>,
}

impl Packet {
    pub(crate) fn from_body(body: Box<PacketBody>) -> Self {
        Self {
            body: ManuallyDrop::new(body),
        }
    }

    /// Take the body out without running the return hook
    pub(crate) fn into_body(self) -> Box<PacketBody> {
        let mut this = ManuallyDrop::new(self);
        // SAFETY: `this` is never dropped, so the body is taken exactly once.
        unsafe { ManuallyDrop::take(&mut this.body) }
    }

    /// Header fields
    pub fn header(&self) -> &PacketHeader {
        &self.body.header
    }

    /// Mutable header fields; the data window is not reachable from here
    pub fn header_mut(&mut self) -> &mut PacketHeader {
        &mut self.body.header
    }

    /// Size class of the payload
    pub fn capacity(&self) -> usize {
        self.body.payload.capacity()
    }

    /// Number of valid data bytes
    pub fn len(&self) -> usize {
        self.body.header.len
    }

    pub fn is_empty(&self) -> bool {
        self.body.header.len == 0
    }

    /// Bytes still available after the data
    pub fn tailroom(&self) -> usize {
        self.capacity().saturating_sub(self.body.header.tail())
    }

    /// Reserve `n` bytes of headroom on an empty packet
    pub fn reserve(&mut self, n: usize) -> Result<()> {
        if !self.is_empty() {
            return Err(CacheError::invalid_parameter(
                "headroom",
                "Headroom can only be reserved on an empty packet",
            ));
        }
        if n > self.capacity() {
            return Err(CacheError::insufficient_space(n, self.capacity()));
        }
        self.body.header.headroom = n;
        Ok(())
    }

    /// Valid data bytes
    pub fn data(&self) -> &[u8] {
        let header = &self.body.header;
        &self.body.payload.as_slice()[header.headroom..header.tail()]
    }

    /// Valid data bytes, mutably; fails while the payload is shared
    pub fn data_mut(&mut self) -> Result<&mut [u8]> {
        let (start, end) = (self.body.header.headroom, self.body.header.tail());
        Ok(&mut self.payload_mut()?.as_mut_slice()[start..end])
    }

    /// Append `bytes` after the current data
    pub fn put(&mut self, bytes: &[u8]) -> Result<()> {
        let tail = self.body.header.tail();
        self.payload_mut()?.write(tail, bytes)?;
        self.body.header.len += bytes.len();
        Ok(())
    }

    /// Number of live references to the payload, this packet included
    pub fn payload_refs(&self) -> usize {
        Arc::strong_count(&self.body.payload)
    }

    /// Whether any other handle aliases the payload
    pub fn is_shared(&self) -> bool {
        self.payload_refs() > 1
    }

    /// Hand out a read-only alias of the payload
    pub fn share_payload(&self) -> SharedPayload {
        SharedPayload(Arc::clone(&self.body.payload))
    }

    /// Create a second packet with a fresh header aliasing the same payload
    ///
    /// The clone has no return hook and is never recycled.
    pub fn clone_shared(&self) -> Packet {
        Packet::from_body(Box::new(PacketBody {
            header: self.body.header.clone(),
            payload: Arc::clone(&self.body.payload),
            return_hook: None,
            next: None,
        }))
    }

    /// Whether dropping this packet will route it back to a cache
    pub fn has_return_hook(&self) -> bool {
        self.body.return_hook.is_some()
    }

    /// Clear the return hook so the packet is deallocated on drop
    pub fn detach(&mut self) {
        self.body.return_hook = None;
    }

    /// Run the return hook now and report what happened to the packet
    pub fn release(self) -> ReleaseOutcome {
        let body = self.into_body();
        match body.return_hook.as_ref().map(Weak::upgrade) {
            Some(Some(cache)) => cache.release(body),
            Some(None) => ReleaseOutcome::Orphaned,
            None => ReleaseOutcome::Freed,
        }
    }

    fn payload_mut(&mut self) -> Result<&mut PayloadBuffer> {
        let refs = Arc::strong_count(&self.body.payload);
        Arc::get_mut(&mut self.body.payload).ok_or(CacheError::shared_payload(refs))
    }
}

impl Drop for Packet {
    fn drop(&mut self) {
        // SAFETY: drop runs once and the body is not touched afterwards.
        let body = unsafe { ManuallyDrop::take(&mut self.body) };
        if let Some(cache) = body.return_hook.as_ref().and_then(Weak::upgrade) {
            cache.release(body);
        }
    }
}

impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Packet")
            .field("header", &self.body.header)
            .field("capacity", &self.capacity())
            .field("payload_refs", &self.payload_refs())
            .field("cached", &self.has_return_hook())
            .finish()
    }
}

/// Read-only alias of a packet's payload held by another subsystem
///
/// While any alias is alive the owning packet cannot be recycled.
#[derive(Debug, Clone)]
pub struct SharedPayload(Arc<PayloadBuffer>);

impl SharedPayload {
    /// The whole payload region
    pub fn as_slice(&self) -> &[u8] {
        self.0.as_slice()
    }

    /// Number of live references to the payload
    pub fn refs(&self) -> usize {
        Arc::strong_count(&self.0)
    }
}

impl AsRef<[u8]> for SharedPayload {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}
