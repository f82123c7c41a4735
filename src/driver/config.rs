//! Configuration types for DMA channels

use crate::internal::constants::{
    CHANNEL_REGISTER_BLOCK, MAX_TRANSFER_SIZE, SIMULATED_ALIGNMENT, SIMULATED_MAX_DESCRIPTORS,
    XDMA_ALIGNMENT, XDMA_C2H_BASE, XDMA_CHANNELS_PER_DIRECTION, XDMA_H2C_BASE,
    XDMA_MAX_DESCRIPTORS,
};

/// Transfer direction of a channel or queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Host to device (H2C, transmit)
    #[default]
    ToDevice,
    /// Device to host (C2H, receive)
    FromDevice,
}

impl Direction {
    /// Short engine-side name of the direction
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Direction::ToDevice => "H2C",
            Direction::FromDevice => "C2H",
        }
    }
}

/// DMA engine implementation behind a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EngineKind {
    /// AMD (Xilinx) XDMA engine
    #[default]
    AmdXdma,
    /// Software engine, usable without a device
    Simulated,
}

impl EngineKind {
    /// Static limits of this engine
    #[must_use]
    pub const fn profile(self) -> EngineProfile {
        match self {
            EngineKind::AmdXdma => EngineProfile {
                alignment: XDMA_ALIGNMENT,
                max_transfer: MAX_TRANSFER_SIZE,
                max_descriptors: XDMA_MAX_DESCRIPTORS,
                windowed: true,
                requires_device: true,
                supports_cancel: true,
            },
            EngineKind::Simulated => EngineProfile {
                alignment: SIMULATED_ALIGNMENT,
                max_transfer: MAX_TRANSFER_SIZE,
                max_descriptors: SIMULATED_MAX_DESCRIPTORS,
                windowed: false,
                requires_device: false,
                supports_cancel: true,
            },
        }
    }
}

/// Limits an engine imposes on channels and transfers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EngineProfile {
    /// Required host buffer alignment in bytes
    pub alignment: usize,
    /// Largest single transfer in bytes
    pub max_transfer: usize,
    /// Largest descriptor depth of one channel
    pub max_descriptors: usize,
    /// Channels live at fixed register windows per direction
    pub windowed: bool,
    /// Kernel-controlled channels need a device connection
    pub requires_device: bool,
    /// Engine can abort in-flight work
    pub supports_cancel: bool,
}

impl EngineProfile {
    /// Check that `window` addresses a channel register block for `direction`
    ///
    /// Engines without fixed windows accept any window.
    #[must_use]
    pub const fn window_matches(&self, window: MemoryWindow, direction: Direction) -> bool {
        if !self.windowed {
            return true;
        }
        let base = match direction {
            Direction::ToDevice => XDMA_H2C_BASE,
            Direction::FromDevice => XDMA_C2H_BASE,
        };
        let span = CHANNEL_REGISTER_BLOCK * XDMA_CHANNELS_PER_DIRECTION;
        window.offset >= base
            && window.offset < base + span
            && window.offset % CHANNEL_REGISTER_BLOCK == 0
    }
}

/// Channel register window inside a device memory region (BAR)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MemoryWindow {
    /// Memory region (BAR) index
    pub region: u8,
    /// Byte offset of the channel register block
    pub offset: u32,
}

impl MemoryWindow {
    /// Create a window at `offset` inside region `region`
    #[must_use]
    pub const fn new(region: u8, offset: u32) -> Self {
        Self { region, offset }
    }

    /// Window of XDMA channel `index` for `direction` in region `region`
    #[must_use]
    pub const fn xdma(region: u8, direction: Direction, index: u32) -> Self {
        let base = match direction {
            Direction::ToDevice => XDMA_H2C_BASE,
            Direction::FromDevice => XDMA_C2H_BASE,
        };
        Self {
            region,
            offset: base + index * CHANNEL_REGISTER_BLOCK,
        }
    }

    /// Last byte offset (exclusive) of the register block
    #[must_use]
    pub const fn end(&self) -> u64 {
        self.offset as u64 + CHANNEL_REGISTER_BLOCK as u64
    }
}

/// Identity of a configured channel inside one connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelId(pub u16);

impl ChannelId {
    /// Slot index of the channel in its connection
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Channel configuration
///
/// Immutable once the channel is configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelConfig {
    /// Transfer direction
    pub direction: Direction,
    /// Number of descriptors the channel may keep outstanding
    pub descriptor_depth: usize,
    /// Refuse to share the memory window with any other channel
    pub exclusive: bool,
    /// The driver programs descriptors on the client's behalf
    pub kernel_controlled: bool,
    /// Channel register window
    pub memory_window: MemoryWindow,
    /// Engine implementation
    pub engine: EngineKind,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelConfig {
    /// Create a new configuration with defaults
    ///
    /// Defaults: host-to-device, depth 16, shared, kernel-controlled,
    /// XDMA H2C channel 0 in region 0.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            direction: Direction::ToDevice,
            descriptor_depth: 16,
            exclusive: false,
            kernel_controlled: true,
            memory_window: MemoryWindow::xdma(0, Direction::ToDevice, 0),
            engine: EngineKind::AmdXdma,
        }
    }

    /// Simulated channel that needs no device connection
    #[must_use]
    pub const fn simulated(direction: Direction) -> Self {
        Self::new()
            .with_direction(direction)
            .with_engine(EngineKind::Simulated)
            .with_kernel_controlled(false)
    }

    // =========================================================================
    // Builder Methods
    // =========================================================================

    /// Set the transfer direction
    #[must_use]
    pub const fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Set the descriptor depth (power of two)
    #[must_use]
    pub const fn with_descriptor_depth(mut self, depth: usize) -> Self {
        self.descriptor_depth = depth;
        self
    }

    /// Request exclusive use of the memory window
    #[must_use]
    pub const fn with_exclusive(mut self, exclusive: bool) -> Self {
        self.exclusive = exclusive;
        self
    }

    /// Let the driver program descriptors
    #[must_use]
    pub const fn with_kernel_controlled(mut self, kernel_controlled: bool) -> Self {
        self.kernel_controlled = kernel_controlled;
        self
    }

    /// Set the memory window
    #[must_use]
    pub const fn with_memory_window(mut self, window: MemoryWindow) -> Self {
        self.memory_window = window;
        self
    }

    /// Set the engine implementation
    #[must_use]
    pub const fn with_engine(mut self, engine: EngineKind) -> Self {
        self.engine = engine;
        self
    }

    /// Limits of the configured engine
    #[must_use]
    pub const fn profile(&self) -> EngineProfile {
        self.engine.profile()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_default_values() {
        let config = ChannelConfig::new();
        assert_eq!(config.direction, Direction::ToDevice);
        assert_eq!(config.descriptor_depth, 16);
        assert!(!config.exclusive);
        assert!(config.kernel_controlled);
        assert_eq!(config.memory_window, MemoryWindow::new(0, 0));
        assert_eq!(config.engine, EngineKind::AmdXdma);
    }

    #[test]
    fn config_default_trait_matches_new() {
        assert_eq!(ChannelConfig::default(), ChannelConfig::new());
    }

    #[test]
    fn config_builder_chaining() {
        let config = ChannelConfig::new()
            .with_direction(Direction::FromDevice)
            .with_descriptor_depth(64)
            .with_exclusive(true)
            .with_memory_window(MemoryWindow::xdma(1, Direction::FromDevice, 2));

        assert_eq!(config.direction, Direction::FromDevice);
        assert_eq!(config.descriptor_depth, 64);
        assert!(config.exclusive);
        assert_eq!(config.memory_window, MemoryWindow::new(1, 0x1200));
    }

    #[test]
    fn simulated_config_is_user_controlled() {
        let config = ChannelConfig::simulated(Direction::FromDevice);
        assert_eq!(config.engine, EngineKind::Simulated);
        assert!(!config.kernel_controlled);
        assert!(!config.profile().requires_device);
    }

    #[test]
    fn xdma_profile_limits() {
        let profile = EngineKind::AmdXdma.profile();
        assert_eq!(profile.alignment, 64);
        assert_eq!(profile.max_transfer, 32 * 1024 * 1024);
        assert_eq!(profile.max_descriptors, 65_536);
    }

    #[test]
    fn xdma_windows_follow_direction() {
        let profile = EngineKind::AmdXdma.profile();
        let h2c = MemoryWindow::xdma(0, Direction::ToDevice, 3);
        let c2h = MemoryWindow::xdma(0, Direction::FromDevice, 0);

        assert!(profile.window_matches(h2c, Direction::ToDevice));
        assert!(!profile.window_matches(h2c, Direction::FromDevice));
        assert!(profile.window_matches(c2h, Direction::FromDevice));
        assert!(!profile.window_matches(c2h, Direction::ToDevice));
    }

    #[test]
    fn xdma_window_rejects_unaligned_and_out_of_span() {
        let profile = EngineKind::AmdXdma.profile();
        assert!(!profile.window_matches(MemoryWindow::new(0, 0x0080), Direction::ToDevice));
        assert!(!profile.window_matches(MemoryWindow::new(0, 0x0400), Direction::ToDevice));
        assert!(!profile.window_matches(MemoryWindow::new(0, 0x1400), Direction::FromDevice));
    }

    #[test]
    fn simulated_profile_accepts_any_window() {
        let profile = EngineKind::Simulated.profile();
        assert!(profile.window_matches(MemoryWindow::new(5, 0x1234), Direction::ToDevice));
    }

    #[test]
    fn window_end_covers_register_block() {
        assert_eq!(MemoryWindow::new(0, 0x1000).end(), 0x1100);
    }

    #[test]
    fn direction_names() {
        assert_eq!(Direction::ToDevice.as_str(), "H2C");
        assert_eq!(Direction::FromDevice.as_str(), "C2H");
    }
}
