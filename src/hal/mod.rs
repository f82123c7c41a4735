//! Hardware Abstraction Layer
//!
//! The ring and queue logic never touches engine registers. Everything it
//! needs from a DMA engine goes through [`DescriptorEngine`]: program one
//! descriptor, poll a descriptor for completion, and a few optional
//! controls (abort, interrupt gating, start/stop).
//!
//! # Modules
//!
//! - [`sim`]: Software engine used without hardware and in demos
//!
//! # Completion Detection
//!
//! Completion is polled. Queues and channels call [`DescriptorEngine::poll`]
//! from their retire phase, in ring order. Enabling notifications only
//! lets the engine raise an interrupt when a descriptor finishes, which an
//! interrupt handler turns into a wake-up of whoever is waiting. It never
//! changes which descriptors a poll reports as done.

pub mod sim;

pub use sim::SimulatedEngine;

use crate::driver::config::{Direction, EngineKind};
use crate::driver::error::{Error, IoError, IoResult};

// =============================================================================
// Descriptor Types
// =============================================================================

/// Names one descriptor slot of one engine channel or queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DescriptorHandle {
    /// Transfer direction
    pub direction: Direction,
    /// Channel or queue number
    pub channel: u16,
    /// Ring slot index
    pub slot: u32,
}

impl DescriptorHandle {
    /// Create a handle
    #[must_use]
    pub const fn new(direction: Direction, channel: u16, slot: u32) -> Self {
        Self {
            direction,
            channel,
            slot,
        }
    }
}

/// Memory the engine moves for one descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Segment {
    /// Host bus address
    pub host_address: u64,
    /// Device-side (card) address
    pub device_address: u64,
    /// Bytes to move
    pub length: u32,
}

impl Segment {
    /// Zero-length segment
    pub const EMPTY: Self = Self {
        host_address: 0,
        device_address: 0,
        length: 0,
    };
}

/// Completion state of a programmed descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DescriptorStatus {
    /// Engine still owns the descriptor
    InFlight,
    /// Transfer finished
    Done {
        /// Bytes actually moved
        length: u32,
    },
    /// Transfer finished with an error
    Failed(Error),
}

impl DescriptorStatus {
    /// True once the engine no longer owns the descriptor
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        !matches!(self, DescriptorStatus::InFlight)
    }
}

// =============================================================================
// Engine Trait
// =============================================================================

/// DMA programming collaborator.
///
/// Implementations own the vendor descriptor format. The core calls
/// [`program_descriptor`](Self::program_descriptor) for each software-owned
/// slot it hands to hardware, and [`poll`](Self::poll) for each hardware-owned
/// slot it tries to retire.
///
/// `poll` must not consume state: a descriptor may be polled several times
/// before it is retired. [`retire`](Self::retire) is called once the slot has
/// been handed back to the client.
pub trait DescriptorEngine {
    /// Engine implementation this collaborator drives
    fn kind(&self) -> EngineKind;

    /// Program one descriptor
    fn program_descriptor(&mut self, handle: DescriptorHandle, segment: &Segment);

    /// Current completion state of a descriptor
    fn poll(&mut self, handle: DescriptorHandle) -> DescriptorStatus;

    /// True once the engine is done with the descriptor
    fn is_complete(&mut self, handle: DescriptorHandle) -> bool {
        self.poll(handle).is_finished()
    }

    /// Forget a descriptor that has been retired
    fn retire(&mut self, _handle: DescriptorHandle) {}

    /// Abort in-flight work of a channel
    ///
    /// Aborted descriptors poll as failed with [`IoError::Aborted`].
    fn cancel(&mut self, _direction: Direction, _channel: u16) -> IoResult<()> {
        Err(IoError::Unsupported)
    }

    /// Gate completion interrupts of a channel
    fn set_notification_enabled(&mut self, _direction: Direction, _channel: u16, _enabled: bool) {
    }

    /// Enable a channel
    fn start(&mut self, _direction: Direction, _channel: u16) {}

    /// Disable a channel
    fn stop(&mut self, _direction: Direction, _channel: u16) {}
}

impl<E: DescriptorEngine + ?Sized> DescriptorEngine for &mut E {
    fn kind(&self) -> EngineKind {
        (**self).kind()
    }

    fn program_descriptor(&mut self, handle: DescriptorHandle, segment: &Segment) {
        (**self).program_descriptor(handle, segment);
    }

    fn poll(&mut self, handle: DescriptorHandle) -> DescriptorStatus {
        (**self).poll(handle)
    }

    fn retire(&mut self, handle: DescriptorHandle) {
        (**self).retire(handle);
    }

    fn cancel(&mut self, direction: Direction, channel: u16) -> IoResult<()> {
        (**self).cancel(direction, channel)
    }

    fn set_notification_enabled(&mut self, direction: Direction, channel: u16, enabled: bool) {
        (**self).set_notification_enabled(direction, channel, enabled);
    }

    fn start(&mut self, direction: Direction, channel: u16) {
        (**self).start(direction, channel);
    }

    fn stop(&mut self, direction: Direction, channel: u16) {
        (**self).stop(direction, channel);
    }
}
