//! Device personalities.
//!
//! A device is either a PCI function with real resources or a software
//! function that exists only to host simulated channels. Both expose the
//! same power hooks.

use super::{Device, PowerState};
use crate::driver::error::{ConfigError, ConfigResult};
use crate::driver::version::Version;

/// Identity of a PCI function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PciFunction {
    /// PCI vendor id
    pub vendor_id: u16,
    /// PCI device id
    pub device_id: u16,
    /// Function number
    pub function: u8,
}

impl PciFunction {
    /// Identity as it appears in configuration dword 0
    #[must_use]
    pub const fn id_dword(&self) -> u32 {
        (self.device_id as u32) << 16 | self.vendor_id as u32
    }
}

/// Hardware-specific power handling of a device.
pub trait PowerHooks {
    /// Check and claim hardware resources before first use
    fn prepare_hardware(&self, device: &Device) -> ConfigResult<()>;

    /// Bring the hardware into the working state
    fn d0_entry(&self, _previous: PowerState) -> ConfigResult<()> {
        Ok(())
    }

    /// Leave the working state
    fn d0_exit(&self, _target: PowerState) {}
}

/// What kind of function a device is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Personality {
    /// PCI function with memory regions and configuration space
    Device(PciFunction),
    /// Software-only function
    SoftFunction,
}

impl Personality {
    /// Version reported for this personality
    #[must_use]
    pub const fn version(&self) -> Version {
        match self {
            Personality::Device(_) => Version::new(0, 1, 0, 0, "ph-dma-pci", "PCI function"),
            Personality::SoftFunction => {
                Version::new(0, 1, 0, 0, "ph-dma-soft", "software function")
            }
        }
    }

    /// True for the software-only personality
    #[must_use]
    pub const fn is_soft(&self) -> bool {
        matches!(self, Personality::SoftFunction)
    }
}

impl PowerHooks for Personality {
    fn prepare_hardware(&self, device: &Device) -> ConfigResult<()> {
        match self {
            Personality::Device(function) => {
                if device.region_count() == 0 {
                    return Err(ConfigError::MissingResources);
                }
                if device.config_dword(0) != Some(function.id_dword()) {
                    return Err(ConfigError::IdentityMismatch);
                }
                Ok(())
            }
            Personality::SoftFunction => Ok(()),
        }
    }
}
