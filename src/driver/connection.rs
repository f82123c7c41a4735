//! Client connection to a DMA device.
//!
//! A [`Connection`] owns one descriptor engine and up to `CHANNELS`
//! configured channels of `DEPTH` slots each. It is the transport surface:
//! configure a channel, submit transfers against it, wait for them, and
//! finally disconnect, which aborts anything still outstanding.
//!
//! # Example
//!
//! ```ignore
//! let device = Device::soft(DeviceId(0));
//! let mut conn: Connection<'_, _, 2, 16> = Connection::new(SimulatedEngine::<32>::new());
//! conn.connect(&device)?;
//! let h2c = conn.configure(ChannelConfig::simulated(Direction::ToDevice))?;
//! let mut status = TransferStatus::new(buffer);
//! let bytes = conn.transfer(h2c, &mut status, 0, 0x4000, 4096)?;
//! conn.disconnect()?;
//! ```

#[cfg(feature = "log")]
use log::{debug, warn};

use embedded_hal::delay::DelayNs;

use super::buffer::DmaBuffer;
use super::channel::Channel;
use super::config::{ChannelConfig, ChannelId};
use super::error::{ConfigError, IoError, Result};
use super::status::{Submitted, Ticket, TransferState, TransferStatus};
use super::version::{LIBRARY_VERSION, Version};
use crate::device::Device;
use crate::hal::DescriptorEngine;
use crate::internal::constants::WAIT_POLL_INTERVAL_US;

/// Anything transfers can be submitted to and awaited on.
pub trait TransferPort<B: DmaBuffer> {
    /// Start a transfer; see [`Connection::submit`]
    fn submit(
        &mut self,
        channel: ChannelId,
        status: &mut TransferStatus<B>,
        offset: usize,
        device_address: u64,
        length: usize,
    ) -> Result<Submitted>;

    /// Block until `status` is terminal; see [`Connection::wait`]
    fn wait(&mut self, status: &mut TransferStatus<B>) -> Result<usize>;
}

/// Connection to one device through one descriptor engine.
pub struct Connection<'d, E, const CHANNELS: usize, const DEPTH: usize> {
    engine: E,
    device: Option<&'d Device>,
    session: u32,
    next_epoch: u32,
    channels: [Option<Channel<DEPTH>>; CHANNELS],
}

impl<'d, E, const CHANNELS: usize, const DEPTH: usize> Connection<'d, E, CHANNELS, DEPTH>
where
    E: DescriptorEngine,
{
    /// Unconnected connection driving `engine`
    pub const fn new(engine: E) -> Self {
        Self {
            engine,
            device: None,
            session: 0,
            next_epoch: 1,
            channels: [const { None }; CHANNELS],
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Attach to `device` and open a session on it
    ///
    /// A driver version that differs in major or minor from this library
    /// is logged and otherwise accepted.
    pub fn connect(&mut self, device: &'d Device) -> Result<()> {
        if self.device.is_some() {
            return Err(ConfigError::AlreadyConnected.into());
        }

        if !LIBRARY_VERSION.is_compatible_with(&device.driver_version()) {
            #[cfg(feature = "log")]
            warn!(
                "version mismatch: library {} driver {}",
                LIBRARY_VERSION,
                device.driver_version()
            );
            #[cfg(feature = "defmt")]
            defmt::warn!(
                "version mismatch: library {}.{} driver {}.{}",
                LIBRARY_VERSION.major,
                LIBRARY_VERSION.minor,
                device.driver_version().major,
                device.driver_version().minor
            );
        }

        self.session = device.open_session();
        self.device = Some(device);

        #[cfg(feature = "log")]
        debug!("connected to device {} (session {})", device.id().0, self.session);
        #[cfg(feature = "defmt")]
        defmt::info!("connected to device {} (session {})", device.id().0, self.session);
        Ok(())
    }

    /// True between `connect` and `disconnect`
    pub const fn is_connected(&self) -> bool {
        self.device.is_some()
    }

    /// Session identity on the connected device
    pub fn session(&self) -> Option<u32> {
        self.device.map(|_| self.session)
    }

    /// Release every channel and close the session
    ///
    /// Pending transfers on released channels finish as aborted when
    /// their status is next polled or waited on.
    pub fn disconnect(&mut self) -> Result<()> {
        let Some(device) = self.device.take() else {
            return Err(IoError::NotConnected.into());
        };

        for slot in self.channels.iter_mut() {
            if let Some(mut channel) = slot.take() {
                channel.shutdown(&mut self.engine);
            }
        }
        device.close_session(self.session);
        self.session = 0;

        #[cfg(feature = "log")]
        debug!("disconnected from device {}", device.id().0);
        #[cfg(feature = "defmt")]
        defmt::info!("disconnected from device {}", device.id().0);
        Ok(())
    }

    // =========================================================================
    // Channels
    // =========================================================================

    /// Configure a channel and start it
    pub fn configure(&mut self, config: ChannelConfig) -> Result<ChannelId> {
        let profile = config.profile();
        if config.engine != self.engine.kind() {
            return Err(IoError::Unsupported.into());
        }

        let depth = config.descriptor_depth;
        if depth == 0
            || !depth.is_power_of_two()
            || depth > DEPTH
            || depth > profile.max_descriptors
        {
            return Err(ConfigError::InvalidDescriptorDepth.into());
        }

        let window = config.memory_window;
        if !profile.window_matches(window, config.direction) {
            return Err(ConfigError::InvalidMemoryWindow.into());
        }

        if (profile.requires_device || config.kernel_controlled) && self.device.is_none() {
            return Err(IoError::NotConnected.into());
        }

        if let Some(device) = self.device
            && profile.windowed
        {
            let fits = device
                .region(window.region as usize)
                .is_some_and(|region| region.size as u64 >= window.end());
            if !fits {
                return Err(ConfigError::InvalidMemoryWindow.into());
            }
        }

        let index = self
            .channels
            .iter()
            .position(Option::is_none)
            .ok_or(ConfigError::NoChannelSlot)?;

        // Channels configured before `connect` are not bound on the device,
        // so the local table is always checked too.
        let conflict = self.channels.iter().flatten().any(|ch| {
            ch.config().memory_window == window && (config.exclusive || ch.config().exclusive)
        });
        if conflict {
            #[cfg(feature = "log")]
            warn!("channel window {:#x} already bound", window.offset);
            #[cfg(feature = "defmt")]
            defmt::warn!("channel window {:#x} already bound", window.offset);
            return Err(ConfigError::ChannelBound.into());
        }
        if let Some(device) = self.device {
            device.bind(self.session, window, config.exclusive)?;
        }

        let id = ChannelId(index as u16);
        let epoch = self.next_epoch;
        self.next_epoch = self.next_epoch.wrapping_add(1).max(1);

        let mut channel = Channel::new(id, config, epoch, self.device.is_some());
        channel.start(&mut self.engine);
        self.channels[index] = Some(channel);

        #[cfg(feature = "log")]
        debug!(
            "channel {} configured ({}, depth {})",
            id.0,
            config.direction.as_str(),
            depth
        );
        #[cfg(feature = "defmt")]
        defmt::debug!(
            "channel {} configured ({}, depth {})",
            id.0,
            config.direction.as_str(),
            depth
        );
        Ok(id)
    }

    /// Stop `channel`, drop its binding and free its slot
    pub fn release(&mut self, id: ChannelId) -> Result<()> {
        let mut channel = self
            .channels
            .get_mut(id.index())
            .and_then(Option::take)
            .ok_or(ConfigError::UnknownChannel)?;

        channel.shutdown(&mut self.engine);
        if let Some(device) = self.device
            && channel.is_attached()
        {
            device.unbind(self.session, channel.config().memory_window);
        }

        #[cfg(feature = "log")]
        debug!("channel {} released", id.0);
        #[cfg(feature = "defmt")]
        defmt::debug!("channel {} released", id.0);
        Ok(())
    }

    /// Configured channel `id`
    pub fn channel(&self, id: ChannelId) -> Option<&Channel<DEPTH>> {
        self.channels.get(id.index()).and_then(Option::as_ref)
    }

    /// Request or suppress completion interrupts of `channel`
    pub fn set_notification_enabled(&mut self, id: ChannelId, enabled: bool) -> Result<()> {
        let channel = match self.channels.get_mut(id.index()).and_then(Option::as_mut) {
            Some(channel) => channel,
            None => return Err(ConfigError::UnknownChannel.into()),
        };
        channel.set_notification_enabled(&mut self.engine, enabled);
        Ok(())
    }

    // =========================================================================
    // Transfers
    // =========================================================================

    /// Start a transfer of `length` bytes at `offset` in the status buffer
    ///
    /// A rejected submit leaves the channel and the status untouched and
    /// can be retried. On success the status is pending, or already
    /// complete when the engine finished synchronously.
    pub fn submit<B: DmaBuffer>(
        &mut self,
        id: ChannelId,
        status: &mut TransferStatus<B>,
        offset: usize,
        device_address: u64,
        length: usize,
    ) -> Result<Submitted> {
        if status.is_pending() {
            return Err(IoError::InvalidState.into());
        }

        let channel = match self.channels.get_mut(id.index()).and_then(Option::as_mut) {
            Some(channel) => channel,
            None if self.device.is_some() => return Err(ConfigError::UnknownChannel.into()),
            None => return Err(IoError::NotConnected.into()),
        };

        let queued = channel
            .validate(status.dma_buffer(), offset, device_address, length)
            .and_then(|segment| channel.enqueue(&mut self.engine, segment));
        let (cursor, sequence) = match queued {
            Ok(slot) => slot,
            Err(e) => {
                #[cfg(feature = "log")]
                warn!("submit on channel {} rejected: {}", id.0, e);
                #[cfg(feature = "defmt")]
                defmt::warn!("submit on channel {} rejected: {}", id.0, e);
                return Err(e.into());
            }
        };

        let ticket = Ticket {
            channel: id,
            cursor,
            sequence,
            epoch: channel.epoch(),
        };
        status.mark_pending(ticket);

        channel.retire(&mut self.engine)?;
        match channel.collect(ticket) {
            Some(outcome) => status.finish(outcome).map(|_| Submitted::Complete),
            None => Ok(Submitted::Pending),
        }
    }

    /// Check a status without blocking
    ///
    /// Returns the terminal outcome once there is one. Waiting on a status
    /// that was never submitted is an error; a status whose channel was
    /// released or reconfigured finishes as aborted.
    pub fn poll_transfer<B: DmaBuffer>(
        &mut self,
        status: &mut TransferStatus<B>,
    ) -> Option<Result<usize>> {
        match status.state() {
            TransferState::Idle => return Some(Err(IoError::InvalidState.into())),
            TransferState::Complete | TransferState::Failed(_) => return status.outcome(),
            TransferState::Pending => {}
        }

        let Some(ticket) = status.ticket() else {
            return Some(status.abort());
        };
        let channel = match self
            .channels
            .get_mut(ticket.channel.index())
            .and_then(Option::as_mut)
        {
            Some(channel) if channel.epoch() == ticket.epoch => channel,
            _ => return Some(status.abort()),
        };

        if let Err(e) = channel.retire(&mut self.engine) {
            return Some(status.finish(Err(e.into())));
        }
        channel.collect(ticket).map(|outcome| status.finish(outcome))
    }

    /// Block until `status` leaves `Pending`
    ///
    /// Idempotent on a terminal status: the stored outcome is returned
    /// again. A failed wait has still retired the transfer slot.
    pub fn wait<B: DmaBuffer>(&mut self, status: &mut TransferStatus<B>) -> Result<usize> {
        loop {
            if let Some(outcome) = self.poll_transfer(status) {
                return outcome;
            }
            core::hint::spin_loop();
        }
    }

    /// Like [`wait`](Self::wait), giving up after `timeout_us`
    ///
    /// On timeout the transfer stays pending and can be waited on again.
    pub fn wait_timeout<B: DmaBuffer, D: DelayNs>(
        &mut self,
        status: &mut TransferStatus<B>,
        delay: &mut D,
        timeout_us: u32,
    ) -> Result<usize> {
        let mut elapsed_us = 0u32;
        loop {
            if let Some(outcome) = self.poll_transfer(status) {
                return outcome;
            }
            if elapsed_us >= timeout_us {
                return Err(IoError::Timeout.into());
            }
            delay.delay_us(WAIT_POLL_INTERVAL_US);
            elapsed_us = elapsed_us.saturating_add(WAIT_POLL_INTERVAL_US);
        }
    }

    /// Submit and wait
    pub fn transfer<B: DmaBuffer>(
        &mut self,
        id: ChannelId,
        status: &mut TransferStatus<B>,
        offset: usize,
        device_address: u64,
        length: usize,
    ) -> Result<usize> {
        match self.submit(id, status, offset, device_address, length)? {
            Submitted::Complete => Ok(status.bytes_transferred()),
            Submitted::Pending => self.wait(status),
        }
    }

    /// Retire finished transfers on every channel, returning how many
    ///
    /// Meant for the completion interrupt or a periodic poll.
    pub fn service(&mut self) -> Result<usize> {
        let mut retired = 0;
        for channel in self.channels.iter_mut().flatten() {
            retired += channel.retire(&mut self.engine)?;
        }
        Ok(retired)
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// Bus address of memory region `index`
    pub fn memory_address(&self, index: usize) -> Option<u64> {
        self.device?.region(index).map(|region| region.address)
    }

    /// Size of memory region `index`, 0 when absent
    ///
    /// Regions are enumerated by increasing `index` until this returns 0.
    pub fn memory_size(&self, index: usize) -> usize {
        self.device
            .and_then(|device| device.region(index))
            .map_or(0, |region| region.size)
    }

    /// Read the PCI configuration dword at byte `offset`
    pub fn pci_config_read(&self, offset: usize) -> Result<u32> {
        let device = self.device.ok_or(IoError::NotConnected)?;
        if device.personality().is_soft() {
            return Err(IoError::Unsupported.into());
        }
        Ok(device.config_read(offset)?)
    }

    /// Fill `out` with the library, driver and device versions
    ///
    /// Only the library version is known before `connect`. Returns the
    /// number of entries written.
    pub fn versions(&self, out: &mut [Version]) -> usize {
        let mut all = [LIBRARY_VERSION; 3];
        let count = match self.device {
            Some(device) => {
                all[1] = device.driver_version();
                all[2] = device.personality().version();
                3
            }
            None => 1,
        };

        let written = count.min(out.len());
        out[..written].copy_from_slice(&all[..written]);
        written
    }

    /// Engine
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Mutable engine
    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }
}

impl<'d, E, B, const CHANNELS: usize, const DEPTH: usize> TransferPort<B>
    for Connection<'d, E, CHANNELS, DEPTH>
where
    E: DescriptorEngine,
    B: DmaBuffer,
{
    fn submit(
        &mut self,
        channel: ChannelId,
        status: &mut TransferStatus<B>,
        offset: usize,
        device_address: u64,
        length: usize,
    ) -> Result<Submitted> {
        Connection::submit(self, channel, status, offset, device_address, length)
    }

    fn wait(&mut self, status: &mut TransferStatus<B>) -> Result<usize> {
        Connection::wait(self, status)
    }
}

impl<E, const CHANNELS: usize, const DEPTH: usize> core::fmt::Debug
    for Connection<'_, E, CHANNELS, DEPTH>
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Connection")
            .field("connected", &self.device.is_some())
            .field("session", &self.session)
            .field("channels", &self.channels.iter().flatten().count())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Tests
// =============================================================================
