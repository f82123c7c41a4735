//! Fixed-capacity table of devices.
//!
//! The registry owns every device the driver has been handed. Connections
//! borrow devices out of it, so a device cannot be removed or drained
//! while any connection still refers to it.

#[cfg(feature = "log")]
use log::debug;

use super::{Device, DeviceId};
use crate::driver::error::{ConfigError, ConfigResult};

/// Registry of up to `N` devices.
#[derive(Debug)]
pub struct DeviceRegistry<const N: usize> {
    devices: [Option<Device>; N],
}

impl<const N: usize> DeviceRegistry<N> {
    /// Empty registry
    #[must_use]
    pub const fn new() -> Self {
        Self {
            devices: [const { None }; N],
        }
    }

    /// Add `device`, returning a reference to its registered copy
    pub fn insert(&mut self, device: Device) -> ConfigResult<&Device> {
        if self.get(device.id()).is_some() {
            return Err(ConfigError::DuplicateDevice);
        }
        let slot = self
            .devices
            .iter_mut()
            .find(|slot| slot.is_none())
            .ok_or(ConfigError::RegistryFull)?;

        #[cfg(feature = "log")]
        debug!("device {} registered", device.id().0);
        #[cfg(feature = "defmt")]
        defmt::debug!("device {} registered", device.id().0);
        Ok(slot.insert(device))
    }

    /// Device with `id`
    pub fn get(&self, id: DeviceId) -> Option<&Device> {
        self.iter().find(|device| device.id() == id)
    }

    /// Remove the device with `id`
    pub fn remove(&mut self, id: DeviceId) -> ConfigResult<Device> {
        self.devices
            .iter_mut()
            .find(|slot| slot.as_ref().is_some_and(|device| device.id() == id))
            .and_then(Option::take)
            .ok_or(ConfigError::UnknownDevice)
    }

    /// Remove every device, yielding them in slot order
    pub fn drain(&mut self) -> impl Iterator<Item = Device> + '_ {
        self.devices.iter_mut().filter_map(Option::take)
    }

    /// Registered devices
    pub fn iter(&self) -> impl Iterator<Item = &Device> {
        self.devices.iter().flatten()
    }

    /// Number of registered devices
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// True when no device is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<const N: usize> Default for DeviceRegistry<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    extern crate std;
    use std::vec::Vec;

    use super::*;

    #[test]
    fn insert_rejects_duplicates_and_overflow() {
        let mut registry: DeviceRegistry<2> = DeviceRegistry::new();
        registry.insert(Device::soft(DeviceId(1))).unwrap();
        assert_eq!(
            registry.insert(Device::soft(DeviceId(1))).unwrap_err(),
            ConfigError::DuplicateDevice
        );
        registry.insert(Device::soft(DeviceId(2))).unwrap();
        assert_eq!(
            registry.insert(Device::soft(DeviceId(3))).unwrap_err(),
            ConfigError::RegistryFull
        );
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn remove_frees_the_slot() {
        let mut registry: DeviceRegistry<1> = DeviceRegistry::new();
        registry.insert(Device::soft(DeviceId(7))).unwrap();
        assert_eq!(registry.remove(DeviceId(7)).unwrap().id(), DeviceId(7));
        assert_eq!(
            registry.remove(DeviceId(7)).unwrap_err(),
            ConfigError::UnknownDevice
        );
        assert!(registry.is_empty());
        assert!(registry.insert(Device::soft(DeviceId(8))).is_ok());
    }

    #[test]
    fn drain_empties_registry() {
        let mut registry: DeviceRegistry<4> = DeviceRegistry::new();
        for id in [3, 1, 2] {
            registry.insert(Device::soft(DeviceId(id))).unwrap();
        }
        let ids: Vec<u16> = registry.drain().map(|device| device.id().0).collect();
        assert_eq!(ids, [3, 1, 2]);
        assert!(registry.is_empty());
        assert!(registry.get(DeviceId(1)).is_none());
    }
}
