//! Synchronization and Concurrency Support
//!
//! This module provides synchronization primitives and interrupt-safe
//! wrappers for connections. It includes:
//!
//! - **Primitives** (`primitives`): Low-level synchronization types
//!   - [`CriticalSectionCell`] - ISR-safe interior mutability
//!   - [`AtomicWaker`] - Async waker storage for interrupts
//!
//! - **Shared Wrapper** (`shared`): [`SharedConnection`], a critical-section
//!   protected connection that thread code and the completion interrupt
//!   can both use
//!
//! - **Async Support** (`asynch`): Async/await support for transfers
//!   - [`AsyncConnectionExt`] - Extension trait adding `wait_async`
//!   - [`WaitFuture`], [`QueueEventFuture`] - Futures for completion
//!   - Static wakers and interrupt handlers
//!
//! # Feature Flags
//!
//! - `async`: Enables `asynch` and [`AtomicWaker`]
//!
//! # Example
//!
//! ```ignore
//! use ph_dma_engine::sync::SharedConnection;
//!
//! static CONN: SharedConnection<'static, SimulatedEngine<16>, 2, 16> =
//!     SharedConnection::new(Connection::new(SimulatedEngine::new()));
//!
//! fn main() {
//!     let id = CONN
//!         .with(|conn| conn.configure(ChannelConfig::simulated(Direction::ToDevice)))
//!         .unwrap();
//!     CONN.submit(id, &mut status, 0, 0x1000, 4096).unwrap();
//!     CONN.wait(&mut status).unwrap();
//! }
//!
//! #[interrupt]
//! fn DMA_IRQ() {
//!     CONN.service_from_isr();
//! }
//! ```

pub(crate) mod primitives;

#[cfg(feature = "async")]
pub use primitives::AtomicWaker;
pub use primitives::CriticalSectionCell;

mod shared;

pub use shared::SharedConnection;

#[cfg(feature = "async")]
pub mod asynch;

#[cfg(feature = "async")]
pub use asynch::{
    AsyncConnectionExt, QueueEventFuture, RX_WAKER, TRANSFER_WAKER, TX_WAKER, WaitFuture,
    completion_interrupt_handler, queue_interrupt_handler, reset_async_state, wait_queue_event,
};
