//! Centralized Constants
//!
//! This module provides a single source of truth for all magic numbers and
//! configuration constants used throughout the DMA engine.
//!
//! # Organization
//!
//! Constants are grouped by category:
//! - **Transfer limits**: Single-transfer ceiling, alignment, descriptor depth
//! - **Engine windows**: Per-direction register windows of the AMD XDMA engine
//! - **Pipeline**: Client-side multi-buffer depths
//! - **Adapter defaults**: Capability values reported by the fixed adapter
//! - **Device**: Region and binding table sizes, PCI configuration space
//! - **Timing**: Poll intervals for bounded waits

// =============================================================================
// Transfer Limits
// =============================================================================

/// Maximum size of a single DMA transfer (32 MiB)
pub const MAX_TRANSFER_SIZE: usize = 32 * 1024 * 1024;

/// Host buffer alignment required by the AMD XDMA engine (cache line)
pub const XDMA_ALIGNMENT: usize = 64;

/// Host buffer alignment required by the simulated engine
pub const SIMULATED_ALIGNMENT: usize = 1;

/// Maximum descriptor depth of one XDMA channel
pub const XDMA_MAX_DESCRIPTORS: usize = 65_536;

/// Maximum descriptor depth of one simulated channel
pub const SIMULATED_MAX_DESCRIPTORS: usize = 4_096;

// =============================================================================
// Engine Windows
// =============================================================================

/// Size of one channel register block inside a memory window
pub const CHANNEL_REGISTER_BLOCK: u32 = 0x100;

/// Number of channels per direction on the XDMA engine
pub const XDMA_CHANNELS_PER_DIRECTION: u32 = 4;

/// Offset of the first host-to-card (H2C) channel register block
pub const XDMA_H2C_BASE: u32 = 0x0000;

/// Offset of the first card-to-host (C2H) channel register block
pub const XDMA_C2H_BASE: u32 = 0x1000;

// =============================================================================
// Pipeline
// =============================================================================

/// Minimum number of buffers a pipeline keeps in flight
pub const MIN_PIPELINE_DEPTH: usize = 3;

/// Recommended pipeline depth
pub const DEFAULT_PIPELINE_DEPTH: usize = 4;

// =============================================================================
// Adapter Defaults
// =============================================================================

/// Ethernet header size (dst MAC + src MAC + EtherType)
pub const ETH_HEADER_SIZE: usize = 14;

/// Largest receive packet the adapter accepts
pub const MAX_RX_PACKET_SIZE: usize = 16_384;

/// Default MTU (largest packet minus Ethernet header)
pub const DEFAULT_MTU: usize = MAX_RX_PACKET_SIZE - ETH_HEADER_SIZE;

/// Default link speed in bits per second (10 Gb/s)
pub const DEFAULT_LINK_SPEED_BPS: u64 = 10_000_000_000;

/// Default permanent Ethernet address
pub const DEFAULT_MAC_ADDRESS: [u8; 6] = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06];

// =============================================================================
// Device
// =============================================================================

/// Maximum number of memory regions (BARs) a device exposes
pub const MAX_REGIONS: usize = 6;

/// Maximum number of channel bindings tracked per device
pub const MAX_BINDINGS: usize = 16;

/// PCI configuration space size in dwords (256 bytes)
pub const PCI_CONFIG_DWORDS: usize = 64;

// =============================================================================
// Timing Constants
// =============================================================================

/// Poll interval of bounded waits in microseconds
pub const WAIT_POLL_INTERVAL_US: u32 = 10;
