//! Packet ring slot.

use crate::driver::error::Error;

/// A client-visible unit made of one or more consecutive fragments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Packet {
    /// Fragment ring cursor of the first fragment
    pub fragment_index: usize,
    /// Number of consecutive fragments
    pub fragment_count: u16,
    /// Drop without delivery (set on cancellation)
    pub ignore: bool,
    /// Engine-reported failure of any fragment
    pub error: Option<Error>,
}

impl Packet {
    /// Unused slot
    pub const EMPTY: Self = Self::new(0, 0);

    /// Packet spanning `fragment_count` fragments from `fragment_index`
    #[must_use]
    pub const fn new(fragment_index: usize, fragment_count: u16) -> Self {
        Self {
            fragment_index,
            fragment_count,
            ignore: false,
            error: None,
        }
    }

    /// Packet was retired by the engine without error
    #[must_use]
    pub const fn is_delivered(&self) -> bool {
        !self.ignore && self.error.is_none()
    }
}
