//! Network adapter front end.
//!
//! An [`Adapter`] pairs a descriptor engine with one receive and one
//! transmit queue and reports capabilities to the network stack. It hooks
//! into the device power sequence through [`PowerEvents`]:
//!
//! - prepare: capture and check the static capabilities
//! - D0 entry: start both queues and refresh the link state
//! - D0 exit: cancel and stop both queues, link state becomes unknown

pub mod capabilities;

pub use capabilities::{AdapterCapabilities, Duplex, FixedCapabilities, LinkState, MediaState};

#[cfg(feature = "log")]
use log::debug;

use crate::device::{Device, PowerEvents, PowerState};
use crate::driver::error::{ConfigError, ConfigResult, IoError, Result};
use crate::hal::DescriptorEngine;
use crate::internal::constants::ETH_HEADER_SIZE;
use crate::queue::{AdvanceReport, RxQueue, TxQueue};

/// Static capabilities captured at prepare time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CapabilitySnapshot {
    /// Largest receive frame
    pub max_rx_packet_size: usize,
    /// Maximum receive speed in bits per second
    pub max_rx_speed: u64,
    /// Maximum transmit speed in bits per second
    pub max_tx_speed: u64,
    /// Largest payload
    pub mtu: usize,
    /// Permanent Ethernet address
    pub ethernet_address: [u8; 6],
}

impl CapabilitySnapshot {
    /// Read and check `caps`
    ///
    /// The MTU plus the Ethernet header must fit in one receive frame.
    pub fn capture<C: AdapterCapabilities>(caps: &C) -> ConfigResult<Self> {
        let snapshot = Self {
            max_rx_packet_size: caps.max_rx_packet_size(),
            max_rx_speed: caps.max_rx_speed(),
            max_tx_speed: caps.max_tx_speed(),
            mtu: caps.mtu(),
            ethernet_address: caps.ethernet_address(),
        };

        if snapshot.mtu == 0 || snapshot.mtu + ETH_HEADER_SIZE > snapshot.max_rx_packet_size {
            return Err(ConfigError::InvalidCapabilities);
        }
        Ok(snapshot)
    }
}

/// Engine plus an Rx/Tx queue pair.
///
/// `RX` is the receive ring size, `TXF` and `TXP` the transmit Fragment
/// and Packet Ring sizes.
#[derive(Debug)]
pub struct Adapter<E, C, const RX: usize, const TXF: usize, const TXP: usize> {
    engine: E,
    caps: C,
    rx: RxQueue<RX>,
    tx: TxQueue<TXF, TXP>,
    snapshot: Option<CapabilitySnapshot>,
    link: LinkState,
}

impl<E, C, const RX: usize, const TXF: usize, const TXP: usize> Adapter<E, C, RX, TXF, TXP>
where
    E: DescriptorEngine,
    C: AdapterCapabilities,
{
    /// Unprepared adapter using queue 0 in both directions
    pub const fn new(engine: E, caps: C) -> Self {
        Self {
            engine,
            caps,
            rx: RxQueue::new(0),
            tx: TxQueue::new(0),
            snapshot: None,
            link: LinkState::UNKNOWN,
        }
    }

    /// Capture and check the static capabilities
    pub fn prepare(&mut self) -> Result<()> {
        let snapshot = CapabilitySnapshot::capture(&self.caps)?;
        self.snapshot = Some(snapshot);

        #[cfg(feature = "log")]
        debug!(
            "adapter prepared: mtu {} max frame {}",
            snapshot.mtu, snapshot.max_rx_packet_size
        );
        #[cfg(feature = "defmt")]
        defmt::debug!(
            "adapter prepared: mtu {} max frame {}",
            snapshot.mtu, snapshot.max_rx_packet_size
        );
        Ok(())
    }

    /// Capabilities captured by [`prepare`](Self::prepare)
    pub const fn snapshot(&self) -> Option<&CapabilitySnapshot> {
        self.snapshot.as_ref()
    }

    /// Last reported link state
    pub const fn link_state(&self) -> LinkState {
        self.link
    }

    /// Refresh the link state from the capabilities
    pub fn update_current_state(&mut self) {
        self.link = self.caps.link_state();
    }

    /// Report the link state as unknown
    pub fn update_unknown_state(&mut self) {
        self.link = LinkState::UNKNOWN;
    }

    // =========================================================================
    // Queues
    // =========================================================================

    /// Start both queues; the adapter must be prepared
    pub fn start(&mut self) -> Result<()> {
        if self.snapshot.is_none() {
            return Err(IoError::InvalidState.into());
        }
        self.rx.start(&mut self.engine);
        self.tx.start(&mut self.engine);
        Ok(())
    }

    /// Cancel outstanding work and stop both queues
    pub fn quiesce(&mut self) -> (AdvanceReport, AdvanceReport) {
        let rx = self.rx.cancel(&mut self.engine);
        let tx = self.tx.cancel(&mut self.engine);
        self.rx.stop(&mut self.engine);
        self.tx.stop(&mut self.engine);
        (rx, tx)
    }

    /// Advance the receive queue
    pub fn advance_rx(&mut self) -> Result<AdvanceReport> {
        self.rx.advance(&mut self.engine)
    }

    /// Advance the transmit queue
    pub fn advance_tx(&mut self) -> Result<AdvanceReport> {
        self.tx.advance(&mut self.engine)
    }

    /// Cancel the receive queue
    pub fn cancel_rx(&mut self) -> AdvanceReport {
        self.rx.cancel(&mut self.engine)
    }

    /// Cancel the transmit queue
    pub fn cancel_tx(&mut self) -> AdvanceReport {
        self.tx.cancel(&mut self.engine)
    }

    /// Receive queue
    pub const fn rx(&self) -> &RxQueue<RX> {
        &self.rx
    }

    /// Mutable receive queue
    pub fn rx_mut(&mut self) -> &mut RxQueue<RX> {
        &mut self.rx
    }

    /// Transmit queue
    pub const fn tx(&self) -> &TxQueue<TXF, TXP> {
        &self.tx
    }

    /// Mutable transmit queue
    pub fn tx_mut(&mut self) -> &mut TxQueue<TXF, TXP> {
        &mut self.tx
    }

    /// Engine
    pub const fn engine(&self) -> &E {
        &self.engine
    }

    /// Mutable engine
    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }
}

impl<E, C, const RX: usize, const TXF: usize, const TXP: usize> PowerEvents
    for Adapter<E, C, RX, TXF, TXP>
where
    E: DescriptorEngine,
    C: AdapterCapabilities,
{
    fn on_prepare(&mut self, _device: &Device) -> Result<()> {
        self.prepare()
    }

    fn on_d0_entry(&mut self, _previous: PowerState) -> Result<()> {
        self.start()?;
        self.update_current_state();
        Ok(())
    }

    fn on_d0_exit(&mut self, _target: PowerState) {
        let (_rx, _tx) = self.quiesce();
        self.update_unknown_state();

        #[cfg(feature = "log")]
        debug!(
            "adapter quiesced: {} rx and {} tx packets dropped",
            _rx.ignored, _tx.ignored
        );
        #[cfg(feature = "defmt")]
        defmt::debug!(
            "adapter quiesced: {} rx and {} tx packets dropped",
            _rx.ignored, _tx.ignored
        );
    }
}

// =============================================================================
// Tests
// =============================================================================
