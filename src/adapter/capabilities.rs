//! Adapter capability reporting.

use crate::internal::constants::{
    DEFAULT_LINK_SPEED_BPS, DEFAULT_MAC_ADDRESS, DEFAULT_MTU, ETH_HEADER_SIZE, MAX_RX_PACKET_SIZE,
};

/// Link duplex mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Duplex {
    /// Half duplex
    Half,
    /// Full duplex
    Full,
    /// Not known
    #[default]
    Unknown,
}

/// Media connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MediaState {
    /// Link up
    Connected,
    /// Link down
    Disconnected,
    /// Not known
    #[default]
    Unknown,
}

/// Link state reported to the network stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinkState {
    /// Link speed in bits per second, 0 when unknown
    pub speed_bps: u64,
    /// Duplex mode
    pub duplex: Duplex,
    /// Media state
    pub media: MediaState,
}

impl LinkState {
    /// Nothing known about the link
    pub const UNKNOWN: Self = Self {
        speed_bps: 0,
        duplex: Duplex::Unknown,
        media: MediaState::Unknown,
    };

    /// True when the media reports a connected link
    #[must_use]
    pub const fn is_up(&self) -> bool {
        matches!(self.media, MediaState::Connected)
    }
}

/// Source of the values an adapter reports to the network stack.
///
/// All getters are pure reads. The static values are captured once when
/// the adapter is prepared; the link getters are read on every refresh.
pub trait AdapterCapabilities {
    /// Largest frame the receive path accepts, header included
    fn max_rx_packet_size(&self) -> usize;

    /// Maximum receive speed in bits per second
    fn max_rx_speed(&self) -> u64;

    /// Maximum transmit speed in bits per second
    fn max_tx_speed(&self) -> u64;

    /// Largest payload, header excluded
    fn mtu(&self) -> usize;

    /// Permanent Ethernet address
    fn ethernet_address(&self) -> [u8; 6];

    /// Current link speed in bits per second
    fn link_speed(&self) -> u64;

    /// Current duplex mode
    fn duplex(&self) -> Duplex;

    /// Current media state
    fn media_state(&self) -> MediaState;

    /// Current link state
    fn link_state(&self) -> LinkState {
        LinkState {
            speed_bps: self.link_speed(),
            duplex: self.duplex(),
            media: self.media_state(),
        }
    }
}

/// Capabilities with constant values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedCapabilities {
    max_rx_packet_size: usize,
    speed_bps: u64,
    mtu: usize,
    ethernet_address: [u8; 6],
    duplex: Duplex,
    media: MediaState,
}

impl FixedCapabilities {
    /// 16 KiB frames, 10 Gb/s, full duplex, link up
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_rx_packet_size: MAX_RX_PACKET_SIZE,
            speed_bps: DEFAULT_LINK_SPEED_BPS,
            mtu: DEFAULT_MTU,
            ethernet_address: DEFAULT_MAC_ADDRESS,
            duplex: Duplex::Full,
            media: MediaState::Connected,
        }
    }

    /// Set the largest receive frame; the MTU follows it
    #[must_use]
    pub const fn with_max_rx_packet_size(mut self, size: usize) -> Self {
        self.max_rx_packet_size = size;
        self.mtu = size.saturating_sub(ETH_HEADER_SIZE);
        self
    }

    /// Override the MTU alone
    #[must_use]
    pub const fn with_mtu(mut self, mtu: usize) -> Self {
        self.mtu = mtu;
        self
    }

    /// Set the link and maximum speeds
    #[must_use]
    pub const fn with_speed(mut self, speed_bps: u64) -> Self {
        self.speed_bps = speed_bps;
        self
    }

    /// Set the Ethernet address
    #[must_use]
    pub const fn with_ethernet_address(mut self, address: [u8; 6]) -> Self {
        self.ethernet_address = address;
        self
    }

    /// Set the reported media state
    #[must_use]
    pub const fn with_media_state(mut self, media: MediaState) -> Self {
        self.media = media;
        self
    }
}

impl Default for FixedCapabilities {
    fn default() -> Self {
        Self::new()
    }
}

impl AdapterCapabilities for FixedCapabilities {
    fn max_rx_packet_size(&self) -> usize {
        self.max_rx_packet_size
    }

    fn max_rx_speed(&self) -> u64 {
        self.speed_bps
    }

    fn max_tx_speed(&self) -> u64 {
        self.speed_bps
    }

    fn mtu(&self) -> usize {
        self.mtu
    }

    fn ethernet_address(&self) -> [u8; 6] {
        self.ethernet_address
    }

    fn link_speed(&self) -> u64 {
        self.speed_bps
    }

    fn duplex(&self) -> Duplex {
        self.duplex
    }

    fn media_state(&self) -> MediaState {
        self.media
    }
}
