//! ISR-safe connection wrapper using critical sections.
//!
//! Provides [`SharedConnection`], which lets thread code submit transfers
//! while the completion interrupt services the same connection.

#[cfg(feature = "log")]
use log::warn;

use super::primitives::CriticalSectionCell;
use crate::driver::buffer::DmaBuffer;
use crate::driver::config::ChannelId;
use crate::driver::connection::Connection;
use crate::driver::error::Result;
use crate::driver::status::{Submitted, TransferStatus};
use crate::hal::DescriptorEngine;

/// ISR-safe connection wrapper using critical sections.
///
/// All access goes through `critical_section::with()`, disabling interrupts
/// for the duration of the closure.
///
/// # Example
///
/// ```ignore
/// static CONN: SharedConnection<'static, SimulatedEngine<16>, 2, 16> =
///     SharedConnection::new(Connection::new(SimulatedEngine::new()));
///
/// CONN.with(|conn| conn.connect(&DEVICE)).unwrap();
///
/// #[interrupt]
/// fn DMA_IRQ() {
///     CONN.service_from_isr();
/// }
/// ```
pub struct SharedConnection<'d, E, const CHANNELS: usize, const DEPTH: usize> {
    inner: CriticalSectionCell<Connection<'d, E, CHANNELS, DEPTH>>,
}

impl<'d, E, const CHANNELS: usize, const DEPTH: usize> SharedConnection<'d, E, CHANNELS, DEPTH>
where
    E: DescriptorEngine,
{
    /// Wrap `connection` (const, suitable for static initialization).
    pub const fn new(connection: Connection<'d, E, CHANNELS, DEPTH>) -> Self {
        Self {
            inner: CriticalSectionCell::new(connection),
        }
    }

    /// Execute a closure with exclusive access to the connection.
    ///
    /// Interrupts are disabled for the duration of the closure.
    #[inline]
    pub fn with<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&mut Connection<'d, E, CHANNELS, DEPTH>) -> R,
    {
        self.inner.with(f)
    }

    /// Try to execute a closure, returning `None` if already borrowed.
    #[inline]
    pub fn try_with<R, F>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&mut Connection<'d, E, CHANNELS, DEPTH>) -> R,
    {
        self.inner.try_with(f)
    }

    /// Start a transfer
    pub fn submit<B: DmaBuffer>(
        &self,
        channel: ChannelId,
        status: &mut TransferStatus<B>,
        offset: usize,
        device_address: u64,
        length: usize,
    ) -> Result<Submitted> {
        self.with(|conn| conn.submit(channel, status, offset, device_address, length))
    }

    /// Check a status without blocking
    pub fn poll_transfer<B: DmaBuffer>(
        &self,
        status: &mut TransferStatus<B>,
    ) -> Option<Result<usize>> {
        self.with(|conn| conn.poll_transfer(status))
    }

    /// Block until `status` leaves `Pending`
    ///
    /// Interrupts are only disabled for each individual poll, so the
    /// completion interrupt keeps running while this spins.
    pub fn wait<B: DmaBuffer>(&self, status: &mut TransferStatus<B>) -> Result<usize> {
        loop {
            if let Some(outcome) = self.poll_transfer(status) {
                return outcome;
            }
            core::hint::spin_loop();
        }
    }

    /// Retire completions on every channel from interrupt context
    ///
    /// Returns `None` when the connection was busy and nothing was done.
    /// A retire failure is logged and returned. Async waiters are woken
    /// either way.
    pub fn service_from_isr(&self) -> Option<Result<usize>> {
        let retired = self.try_with(|conn| conn.service());

        if let Some(Err(_e)) = &retired {
            #[cfg(feature = "log")]
            warn!("completion service failed: {}", _e);
            #[cfg(feature = "defmt")]
            defmt::warn!("completion service failed: {}", _e);
        }

        #[cfg(feature = "async")]
        super::asynch::completion_interrupt_handler();

        retired
    }

    /// Wait for `status` to leave `Pending` without blocking the executor.
    ///
    /// Yields until the completion interrupt reports progress.
    #[cfg(feature = "async")]
    pub async fn wait_async<B: DmaBuffer>(&self, status: &mut TransferStatus<B>) -> Result<usize> {
        use super::asynch::TRANSFER_WAKER;
        use core::future::poll_fn;
        use core::task::Poll;

        poll_fn(|cx| {
            if let Some(outcome) = self.poll_transfer(status) {
                return Poll::Ready(outcome);
            }
            TRANSFER_WAKER.register(cx.waker());
            match self.poll_transfer(status) {
                Some(outcome) => Poll::Ready(outcome),
                None => Poll::Pending,
            }
        })
        .await
    }
}
