//! PH DMA Engine
//!
//! A `no_std`, `no_alloc` ring-based DMA transfer engine.
//!
//! The crate moves data between host memory and a device through
//! descriptor rings. Two front ends share the same ring machinery:
//!
//! - **Channels** ([`driver`]): a client connects to a [`device::Device`],
//!   configures channels, and submits single transfers that it later waits on
//! - **Queue pairs** ([`queue`], [`adapter`]): a network adapter keeps a
//!   receive and a transmit queue running, each driven by `advance`/`cancel`
//!
//! # Architecture
//!
//! 1. **Ring Layer** ([`ring`]): [`Ring`] with `begin`/`next`/`end` cursors
//!    splitting slots into client, software and hardware regions
//! 2. **Engine Layer** ([`hal`]): [`DescriptorEngine`], the only place that
//!    touches hardware, plus [`SimulatedEngine`] for host use
//! 3. **Transfer Layer** ([`driver`], [`queue`]): channels, connections,
//!    pipelines and the Rx/Tx queues built on the rings
//! 4. **Device Layer** ([`device`], [`adapter`]): device personalities,
//!    bindings, power sequencing and capability reporting
//!
//! # Features
//!
//! - `async` (default): Enable wakers, interrupt handlers and async waits
//! - `defmt`: Enable defmt formatting for public types
//! - `log`: Emit lifecycle and fault diagnostics through the `log` facade
//!
//! # Example
//!
//! ```ignore
//! use ph_dma_engine::{ChannelConfig, Connection, Direction, SimulatedEngine, TransferStatus};
//!
//! let mut conn: Connection<'_, _, 2, 16> = Connection::new(SimulatedEngine::<32>::new());
//! let h2c = conn.configure(ChannelConfig::simulated(Direction::ToDevice))?;
//!
//! let mut status = TransferStatus::new(buffer);
//! let written = conn.transfer(h2c, &mut status, 0, 0x0, 4096)?;
//! ```

#![no_std]
#![deny(missing_docs)]
#![allow(unsafe_code)]
#![deny(unsafe_op_in_unsafe_fn)]
// Clippy lint levels live here.
#![deny(clippy::correctness)]
#![warn(
    clippy::suspicious,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::cloned_instead_of_copied,
    clippy::explicit_iter_loop,
    clippy::implicit_clone,
    clippy::inconsistent_struct_constructor,
    clippy::manual_assert,
    clippy::manual_let_else,
    clippy::match_same_arms,
    clippy::needless_pass_by_value,
    clippy::semicolon_if_nothing_returned,
    clippy::uninlined_format_args,
    clippy::unnested_or_patterns,
    clippy::std_instead_of_core,
    clippy::std_instead_of_alloc,
    clippy::alloc_instead_of_core
)]
#![allow(
    clippy::mod_module_files,
    clippy::self_named_module_files,
    clippy::similar_names,
    clippy::too_many_arguments,
    clippy::struct_excessive_bools,
    clippy::fn_params_excessive_bools,
    clippy::type_complexity,
    clippy::must_use_candidate,
    clippy::assertions_on_constants,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss,
    clippy::cast_lossless,
    clippy::panic_in_result_fn,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::module_name_repetitions,
    clippy::wildcard_imports,
    clippy::items_after_statements,
    clippy::let_underscore_future
)]

// =============================================================================
// Modules
// =============================================================================

pub mod adapter;
pub mod device;
pub mod driver;
pub mod hal;
pub mod queue;
pub mod ring;
pub mod sync;

// Internal implementation details (pub(crate) only)
mod internal;

// Test utilities (only available during testing)
#[cfg(test)]
pub mod test_utils;

// =============================================================================
// Re-exports
// =============================================================================

pub use adapter::{Adapter, AdapterCapabilities, FixedCapabilities, LinkState};
pub use device::{Device, DeviceId, DeviceRegistry, MemoryRegion, Personality, PowerState};
pub use driver::config::{
    ChannelConfig, ChannelId, Direction, EngineKind, EngineProfile, MemoryWindow,
};
pub use driver::connection::{Connection, TransferPort};
pub use driver::error::{
    ConfigError, ConfigResult, DmaError, DmaResult, Error, ErrorKind, IoError, IoResult, Result,
};
pub use driver::pipeline::{Pipeline, PipelineStats};
pub use driver::status::{Submitted, TransferState, TransferStatus};
pub use driver::{Aligned, DmaBuffer, LIBRARY_VERSION, Version};
pub use hal::{DescriptorEngine, DescriptorHandle, DescriptorStatus, Segment, SimulatedEngine};
pub use queue::{AdvanceReport, QueueState, RxQueue, TxQueue};
pub use ring::{Fragment, Packet, Ring};
pub use sync::SharedConnection;

// Re-export async types when async feature is enabled
#[cfg(feature = "async")]
#[cfg_attr(docsrs, doc(cfg(feature = "async")))]
pub use sync::asynch::{AsyncConnectionExt, completion_interrupt_handler, queue_interrupt_handler};

/// Shared engine constants.
///
/// These are grouped into a dedicated module to keep the top-level facade
/// focused on engine types.
pub mod constants {
    pub use crate::internal::constants::{
        // Adapter defaults
        DEFAULT_LINK_SPEED_BPS,
        DEFAULT_MAC_ADDRESS,
        DEFAULT_MTU,
        // Pipelines
        DEFAULT_PIPELINE_DEPTH,
        ETH_HEADER_SIZE,
        MAX_RX_PACKET_SIZE,
        // Transfer limits
        MAX_TRANSFER_SIZE,
        MIN_PIPELINE_DEPTH,
        SIMULATED_ALIGNMENT,
        SIMULATED_MAX_DESCRIPTORS,
        // Timing
        WAIT_POLL_INTERVAL_US,
        XDMA_ALIGNMENT,
        XDMA_MAX_DESCRIPTORS,
    };
}
