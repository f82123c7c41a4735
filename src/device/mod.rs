//! Device side of the driver boundary.
//!
//! A [`Device`] describes one function the driver has been handed: its
//! identity and personality, its memory regions (BARs), a snapshot of its
//! PCI configuration space and the table of channel bindings held by open
//! sessions. Connections borrow a device; the borrow checker keeps a
//! device alive for as long as any connection refers to it.
//!
//! The binding table and power state sit behind a
//! [`CriticalSectionCell`], so several connections can share one device
//! through plain references.

pub mod personality;
pub mod registry;

pub use personality::{PciFunction, Personality, PowerHooks};
pub use registry::DeviceRegistry;

#[cfg(feature = "log")]
use log::{debug, warn};

use crate::driver::config::MemoryWindow;
use crate::driver::error::{ConfigError, ConfigResult, DmaError, DmaResult, IoError, Result};
use crate::driver::version::Version;
use crate::internal::constants::{MAX_BINDINGS, MAX_REGIONS, PCI_CONFIG_DWORDS};
use crate::sync::primitives::CriticalSectionCell;

// =============================================================================
// Types
// =============================================================================

/// Device identity inside a registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceId(pub u16);

/// One memory region (BAR) of a device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MemoryRegion {
    /// Bus address of the region
    pub address: u64,
    /// Size in bytes
    pub size: usize,
}

impl MemoryRegion {
    /// Region of `size` bytes at `address`
    #[must_use]
    pub const fn new(address: u64, size: usize) -> Self {
        Self { address, size }
    }
}

/// Device power state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PowerState {
    /// Working
    D0,
    /// Light sleep
    D1,
    /// Deeper sleep
    D2,
    /// Off
    #[default]
    D3,
}

/// Listener for device power transitions.
///
/// Adapters implement this to snapshot capabilities on prepare and to
/// quiesce their queues before the hardware leaves D0.
pub trait PowerEvents {
    /// Device resources were checked and claimed
    fn on_prepare(&mut self, device: &Device) -> Result<()>;

    /// Device entered D0 from `previous`
    fn on_d0_entry(&mut self, previous: PowerState) -> Result<()>;

    /// Device is about to leave D0 for `target`
    fn on_d0_exit(&mut self, target: PowerState);
}

#[derive(Debug, Clone, Copy)]
struct Binding {
    session: u32,
    window: MemoryWindow,
    exclusive: bool,
}

#[derive(Debug)]
struct DeviceState {
    bindings: [Option<Binding>; MAX_BINDINGS],
    next_session: u32,
    open_sessions: u32,
    power: PowerState,
    prepared: bool,
}

// =============================================================================
// Device
// =============================================================================

/// One device function and its shared state.
pub struct Device {
    id: DeviceId,
    personality: Personality,
    regions: [Option<MemoryRegion>; MAX_REGIONS],
    config_space: [u32; PCI_CONFIG_DWORDS],
    driver_version: Version,
    state: CriticalSectionCell<DeviceState>,
}

impl Device {
    /// Version of the driver side that exposes this device
    pub const DRIVER_VERSION: Version =
        Version::new(0, 1, 0, 0, "ph-dma-driver", "DMA channel driver");

    /// Device with `personality`, no regions and an empty config space
    #[must_use]
    pub const fn new(id: DeviceId, personality: Personality) -> Self {
        Self {
            id,
            personality,
            regions: [None; MAX_REGIONS],
            config_space: [0; PCI_CONFIG_DWORDS],
            driver_version: Self::DRIVER_VERSION,
            state: CriticalSectionCell::new(DeviceState {
                bindings: [None; MAX_BINDINGS],
                next_session: 1,
                open_sessions: 0,
                power: PowerState::D3,
                prepared: false,
            }),
        }
    }

    /// PCI device whose config space carries `function`'s identity
    #[must_use]
    pub const fn pci(id: DeviceId, function: PciFunction) -> Self {
        let mut device = Self::new(id, Personality::Device(function));
        device.config_space[0] = function.id_dword();
        device
    }

    /// Software-only device
    #[must_use]
    pub const fn soft(id: DeviceId) -> Self {
        Self::new(id, Personality::SoftFunction)
    }

    /// Set memory region `index`; indices past the region table are ignored
    #[must_use]
    pub fn with_region(mut self, index: usize, region: MemoryRegion) -> Self {
        if let Some(slot) = self.regions.get_mut(index) {
            *slot = Some(region);
        }
        self
    }

    /// Replace the configuration space snapshot
    #[must_use]
    pub const fn with_config_space(mut self, config_space: [u32; PCI_CONFIG_DWORDS]) -> Self {
        self.config_space = config_space;
        self
    }

    /// Override the reported driver version
    #[must_use]
    pub const fn with_driver_version(mut self, version: Version) -> Self {
        self.driver_version = version;
        self
    }

    // =========================================================================
    // Identity & Resources
    // =========================================================================

    /// Registry identity
    pub const fn id(&self) -> DeviceId {
        self.id
    }

    /// Personality
    pub const fn personality(&self) -> Personality {
        self.personality
    }

    /// Driver version
    pub const fn driver_version(&self) -> Version {
        self.driver_version
    }

    /// Memory region `index`
    pub fn region(&self, index: usize) -> Option<MemoryRegion> {
        self.regions.get(index).copied().flatten()
    }

    /// Number of populated memory regions
    pub fn region_count(&self) -> usize {
        self.regions.iter().flatten().count()
    }

    /// Raw configuration dword `index`
    pub fn config_dword(&self, index: usize) -> Option<u32> {
        self.config_space.get(index).copied()
    }

    /// Read the configuration dword at byte `offset`
    ///
    /// The offset must be dword aligned and inside the 256-byte space.
    pub fn config_read(&self, offset: usize) -> DmaResult<u32> {
        if offset % 4 != 0 {
            return Err(DmaError::Misaligned);
        }
        self.config_dword(offset / 4).ok_or(DmaError::OutOfRange)
    }

    // =========================================================================
    // Sessions & Bindings
    // =========================================================================

    /// Open a session and return its identity
    pub fn open_session(&self) -> u32 {
        self.state.with(|state| {
            let session = state.next_session;
            state.next_session = state.next_session.wrapping_add(1).max(1);
            state.open_sessions += 1;
            session
        })
    }

    /// Close `session`, dropping every binding it holds
    pub fn close_session(&self, session: u32) {
        self.state.with(|state| {
            for slot in state.bindings.iter_mut() {
                if slot.is_some_and(|b| b.session == session) {
                    *slot = None;
                }
            }
            state.open_sessions = state.open_sessions.saturating_sub(1);
        });
    }

    /// Number of open sessions
    pub fn open_sessions(&self) -> u32 {
        self.state.with(|state| state.open_sessions)
    }

    /// Record that `session` uses the channel at `window`
    ///
    /// An exclusive binding conflicts with any other binding of the same
    /// window, including a second binding by the same session.
    pub fn bind(&self, session: u32, window: MemoryWindow, exclusive: bool) -> ConfigResult<()> {
        self.state.with(|state| {
            let conflict = state
                .bindings
                .iter()
                .flatten()
                .any(|b| b.window == window && (exclusive || b.exclusive));
            if conflict {
                #[cfg(feature = "log")]
                warn!("window {}:{:#x} already bound", window.region, window.offset);
                #[cfg(feature = "defmt")]
                defmt::warn!("window {}:{:#x} already bound", window.region, window.offset);
                return Err(ConfigError::ChannelBound);
            }

            let slot = state
                .bindings
                .iter_mut()
                .find(|slot| slot.is_none())
                .ok_or(ConfigError::NoChannelSlot)?;
            *slot = Some(Binding {
                session,
                window,
                exclusive,
            });
            Ok(())
        })
    }

    /// Drop one binding of `session` at `window`
    pub fn unbind(&self, session: u32, window: MemoryWindow) {
        self.state.with(|state| {
            if let Some(slot) = state
                .bindings
                .iter_mut()
                .find(|slot| slot.is_some_and(|b| b.session == session && b.window == window))
            {
                *slot = None;
            }
        });
    }

    /// Number of active bindings
    pub fn binding_count(&self) -> usize {
        self.state.with(|state| state.bindings.iter().flatten().count())
    }

    // =========================================================================
    // Power
    // =========================================================================

    /// Current power state
    pub fn power_state(&self) -> PowerState {
        self.state.with(|state| state.power)
    }

    /// True once resources have been claimed
    pub fn is_prepared(&self) -> bool {
        self.state.with(|state| state.prepared)
    }

    /// Check and claim resources, then notify `listeners`
    pub fn prepare_hardware(&self, listeners: &mut [&mut dyn PowerEvents]) -> Result<()> {
        self.personality.prepare_hardware(self)?;
        for listener in listeners.iter_mut() {
            listener.on_prepare(self)?;
        }
        self.state.with(|state| state.prepared = true);

        #[cfg(feature = "log")]
        debug!("device {} prepared", self.id.0);
        #[cfg(feature = "defmt")]
        defmt::debug!("device {} prepared", self.id.0);
        Ok(())
    }

    /// Enter D0, then notify `listeners`
    pub fn d0_entry(&self, listeners: &mut [&mut dyn PowerEvents]) -> Result<()> {
        let (prepared, previous) = self.state.with(|state| (state.prepared, state.power));
        if !prepared {
            return Err(IoError::InvalidState.into());
        }

        self.personality.d0_entry(previous)?;
        self.state.with(|state| state.power = PowerState::D0);
        for listener in listeners.iter_mut() {
            listener.on_d0_entry(previous)?;
        }

        #[cfg(feature = "log")]
        debug!("device {} entered D0", self.id.0);
        #[cfg(feature = "defmt")]
        defmt::debug!("device {} entered D0", self.id.0);
        Ok(())
    }

    /// Notify `listeners`, then leave D0 for `target`
    ///
    /// Does nothing unless the device is in D0.
    pub fn d0_exit(&self, target: PowerState, listeners: &mut [&mut dyn PowerEvents]) {
        if self.power_state() != PowerState::D0 || target == PowerState::D0 {
            return;
        }

        for listener in listeners.iter_mut() {
            listener.on_d0_exit(target);
        }
        self.personality.d0_exit(target);
        self.state.with(|state| state.power = target);

        #[cfg(feature = "log")]
        debug!("device {} left D0", self.id.0);
        #[cfg(feature = "defmt")]
        defmt::debug!("device {} left D0", self.id.0);
    }
}

impl core::fmt::Debug for Device {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Device")
            .field("id", &self.id)
            .field("personality", &self.personality)
            .field("regions", &self.regions)
            .field("driver_version", &self.driver_version)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    extern crate std;
    use std::vec::Vec;

    use super::*;
    use crate::driver::config::Direction;

    const FUNCTION: PciFunction = PciFunction {
        vendor_id: 0x10EE,
        device_id: 0x9038,
        function: 0,
    };

    fn pci_device() -> Device {
        Device::pci(DeviceId(1), FUNCTION)
            .with_region(0, MemoryRegion::new(0xF000_0000, 0x1_0000))
            .with_region(2, MemoryRegion::new(0xE000_0000, 0x1000))
    }

    #[derive(Default)]
    struct Recorder {
        events: Vec<&'static str>,
    }

    impl PowerEvents for Recorder {
        fn on_prepare(&mut self, _device: &Device) -> Result<()> {
            self.events.push("prepare");
            Ok(())
        }

        fn on_d0_entry(&mut self, _previous: PowerState) -> Result<()> {
            self.events.push("d0_entry");
            Ok(())
        }

        fn on_d0_exit(&mut self, _target: PowerState) {
            self.events.push("d0_exit");
        }
    }

    // =========================================================================
    // Resources
    // =========================================================================

    #[test]
    fn regions_are_sparse() {
        let device = pci_device().with_region(MAX_REGIONS, MemoryRegion::new(1, 1));
        assert_eq!(device.region_count(), 2);
        assert_eq!(device.region(1), None);
        assert_eq!(device.region(2), Some(MemoryRegion::new(0xE000_0000, 0x1000)));
        assert_eq!(device.region(MAX_REGIONS), None);
    }

    #[test]
    fn config_read_is_dword_aligned_and_bounded() {
        let device = pci_device();
        assert_eq!(device.config_read(0), Ok(0x9038_10EE));
        assert_eq!(device.config_read(4), Ok(0));
        assert_eq!(device.config_read(2), Err(DmaError::Misaligned));
        assert_eq!(device.config_read(256), Err(DmaError::OutOfRange));
    }

    // =========================================================================
    // Sessions & Bindings
    // =========================================================================

    #[test]
    fn sessions_get_distinct_ids() {
        let device = Device::soft(DeviceId(3));
        let a = device.open_session();
        let b = device.open_session();
        assert_ne!(a, b);
        assert_eq!(device.open_sessions(), 2);
        device.close_session(a);
        assert_eq!(device.open_sessions(), 1);
    }

    #[test]
    fn exclusive_binding_conflicts_across_sessions() {
        let device = pci_device();
        let window = MemoryWindow::xdma(0, Direction::ToDevice, 0);
        let a = device.open_session();
        let b = device.open_session();

        device.bind(a, window, true).unwrap();
        assert_eq!(device.bind(b, window, false), Err(ConfigError::ChannelBound));
        assert_eq!(device.bind(a, window, true), Err(ConfigError::ChannelBound));

        device.close_session(a);
        assert_eq!(device.binding_count(), 0);
        assert_eq!(device.bind(b, window, false), Ok(()));
    }

    #[test]
    fn shared_bindings_coexist() {
        let device = pci_device();
        let window = MemoryWindow::xdma(0, Direction::FromDevice, 1);
        let a = device.open_session();
        let b = device.open_session();

        device.bind(a, window, false).unwrap();
        device.bind(b, window, false).unwrap();
        assert_eq!(device.bind(b, window, true), Err(ConfigError::ChannelBound));

        device.unbind(a, window);
        assert_eq!(device.binding_count(), 1);
    }

    #[test]
    fn binding_table_fills_up() {
        let device = Device::soft(DeviceId(4));
        let session = device.open_session();
        for i in 0..MAX_BINDINGS as u32 {
            device
                .bind(session, MemoryWindow::new(0, i * 0x100), false)
                .unwrap();
        }
        assert_eq!(
            device.bind(session, MemoryWindow::new(1, 0), false),
            Err(ConfigError::NoChannelSlot)
        );
    }

    // =========================================================================
    // Power
    // =========================================================================

    #[test]
    fn power_sequence_notifies_listeners() {
        let device = pci_device();
        let mut recorder = Recorder::default();

        assert_eq!(
            device.d0_entry(&mut [&mut recorder]),
            Err(IoError::InvalidState.into())
        );

        device.prepare_hardware(&mut [&mut recorder]).unwrap();
        device.d0_entry(&mut [&mut recorder]).unwrap();
        assert_eq!(device.power_state(), PowerState::D0);

        device.d0_exit(PowerState::D3, &mut [&mut recorder]);
        device.d0_exit(PowerState::D3, &mut [&mut recorder]);
        assert_eq!(device.power_state(), PowerState::D3);
        assert_eq!(recorder.events, ["prepare", "d0_entry", "d0_exit"]);
    }

    #[test]
    fn failed_prepare_skips_listeners() {
        let device = Device::pci(DeviceId(5), FUNCTION);
        let mut recorder = Recorder::default();
        assert_eq!(
            device.prepare_hardware(&mut [&mut recorder]),
            Err(ConfigError::MissingResources.into())
        );
        assert!(!device.is_prepared());
        assert!(recorder.events.is_empty());
    }
}
