//! Client side of the DMA transport.
//!
//! This module contains the pieces a client uses to move data through a
//! device's DMA channels:
//!
//! - [`config`] - Channel configuration and engine profiles
//! - [`error`] - Error types and result aliases
//! - [`connection`] - Configure, submit, wait, disconnect
//! - [`pipeline`] - Multi-buffer streaming on one channel
//!
//! # Example
//!
//! ```ignore
//! use ph_dma_engine::driver::{ChannelConfig, Connection, Direction, TransferStatus};
//!
//! let h2c = conn.configure(ChannelConfig::simulated(Direction::ToDevice))?;
//! let mut status = TransferStatus::new(buffer);
//! conn.transfer(h2c, &mut status, 0, 0x0, 4096)?;
//! ```

// Submodules
pub mod buffer;
pub mod channel;
pub mod config;
pub mod connection;
pub mod error;
pub mod pipeline;
pub mod status;
pub mod version;

// Re-exports for convenience
pub use buffer::{Aligned, DmaBuffer};
pub use channel::Channel;
pub use config::{ChannelConfig, ChannelId, Direction, EngineKind, EngineProfile, MemoryWindow};
pub use connection::{Connection, TransferPort};
pub use error::{
    ConfigError, ConfigResult, DmaError, DmaResult, Error, ErrorKind, IoError, IoResult, Result,
};
pub use pipeline::{Pipeline, PipelineStats};
pub use status::{Submitted, Ticket, TransferState, TransferStatus};
pub use version::{LIBRARY_VERSION, Version};
