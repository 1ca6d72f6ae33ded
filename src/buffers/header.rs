//! Per-packet header fields

/// Size of the scratch control block carried in every header
pub const CONTROL_BLOCK_SIZE: usize = 48;

/// Header fields of a packet
///
/// Everything here is reset to its zero state whenever a packet is handed
/// out from a cache's free list. The data window (`headroom`, `len`) only
/// moves through [`Packet::reserve`](super::Packet::reserve) and
/// [`Packet::put`](super::Packet::put), so it always lies inside the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketHeader {
    /// Offset of the first data byte within the payload
    pub(crate) headroom: usize,
    /// Number of valid data bytes following `headroom`
    pub(crate) len: usize,
    /// Link-layer protocol identifier
    pub protocol: u16,
    /// Queueing priority
    pub priority: u32,
    /// Firewall / routing mark
    pub mark: u32,
    /// Index of the interface the packet arrived on or leaves by
    pub ifindex: u32,
    /// Scratch space private to the current layer
    pub cb: [u8; CONTROL_BLOCK_SIZE],
}

impl PacketHeader {
    /// Restore every field to its initial state
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Offset of the first data byte within the payload
    pub fn headroom(&self) -> usize {
        self.headroom
    }

    /// Number of valid data bytes
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Offset one past the last valid data byte
    pub fn tail(&self) -> usize {
        self.headroom + self.len
    }
}

impl Default for PacketHeader {
    fn default() -> Self {
        Self {
            headroom: 0,
            len: 0,
            protocol: 0,
            priority: 0,
            mark: 0,
            ifindex: 0,
            cb: [0; CONTROL_BLOCK_SIZE],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_clears_everything() {
        let mut header = PacketHeader {
            headroom: 16,
            len: 100,
            protocol: 0x0800,
            priority: 3,
            mark: 7,
            ifindex: 2,
            cb: [0xff; CONTROL_BLOCK_SIZE],
        };
        assert_eq!(header.tail(), 116);
        assert_eq!(header.headroom(), 16);
        assert_eq!(header.len(), 100);

        header.reset();
        assert!(header.is_empty());
        assert_eq!(header, PacketHeader::default());
        assert_eq!(header.tail(), 0);
    }
}
