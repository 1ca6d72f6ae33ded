//! Packet buffers
//!
//! A packet is a single-owner header plus a payload that other subsystems
//! may alias. The payload's reference count decides whether a packet can be
//! recycled.

pub mod header;
pub mod packet;
pub mod payload;

pub(crate) use packet::PacketBody;

// Re-export main types
pub use header::{PacketHeader, CONTROL_BLOCK_SIZE};
pub use packet::{Packet, SharedPayload};
pub use payload::PayloadBuffer;
