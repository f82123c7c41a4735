//! Fragment ring slot.

use crate::hal::Segment;

/// One contiguous DMA-addressable buffer segment.
///
/// `address` and `capacity` describe the buffer and are written by the
/// client before the slot is handed to software. `valid_length` and
/// `offset` describe the data once the transfer is known complete and are
/// undefined before that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Fragment {
    /// Bus address of the buffer
    pub address: u64,
    /// Buffer size in bytes
    pub capacity: u32,
    /// Bytes of valid data
    pub valid_length: u32,
    /// Offset of the valid data inside the buffer
    pub offset: u32,
}

impl Fragment {
    /// Unused slot
    pub const EMPTY: Self = Self::buffer(0, 0);

    /// Empty receive buffer of `capacity` bytes at `address`
    #[must_use]
    pub const fn buffer(address: u64, capacity: u32) -> Self {
        Self {
            address,
            capacity,
            valid_length: 0,
            offset: 0,
        }
    }

    /// Transmit fragment carrying `length` bytes at `address`
    #[must_use]
    pub const fn data(address: u64, length: u32) -> Self {
        Self {
            address,
            capacity: length,
            valid_length: length,
            offset: 0,
        }
    }

    /// Segment the engine fills when receiving into this fragment
    #[must_use]
    pub const fn receive_segment(&self) -> Segment {
        Segment {
            host_address: self.address,
            device_address: 0,
            length: self.capacity,
        }
    }

    /// Segment the engine reads when transmitting this fragment
    #[must_use]
    pub const fn transmit_segment(&self) -> Segment {
        Segment {
            host_address: self.address + self.offset as u64,
            device_address: 0,
            length: self.valid_length,
        }
    }
}
