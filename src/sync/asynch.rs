//! Async/await support for DMA completion.
//!
//! Completion is always detected by polling descriptors; interrupts only
//! tell waiters when polling is worth trying again. The interrupt handlers
//! here wake the matching static waker and nothing else.

use core::{
    future::Future,
    pin::Pin,
    sync::atomic::{AtomicBool, Ordering},
    task::{Context, Poll},
};

use super::primitives::AtomicWaker;
use crate::driver::buffer::DmaBuffer;
use crate::driver::config::Direction;
use crate::driver::connection::Connection;
use crate::driver::error::Result;
use crate::driver::status::TransferStatus;
use crate::hal::DescriptorEngine;

/// Waker for channel transfer completions.
pub static TRANSFER_WAKER: AtomicWaker = AtomicWaker::new();

/// Waker for receive queue completions.
pub static RX_WAKER: AtomicWaker = AtomicWaker::new();

/// Waker for transmit queue completions.
pub static TX_WAKER: AtomicWaker = AtomicWaker::new();

static RX_EVENT: AtomicBool = AtomicBool::new(false);
static TX_EVENT: AtomicBool = AtomicBool::new(false);

/// Call from the channel completion interrupt.
///
/// # Example
///
/// ```ignore
/// #[interrupt]
/// fn DMA_DONE() {
///     ph_dma_engine::sync::asynch::completion_interrupt_handler();
/// }
/// ```
#[inline]
pub fn completion_interrupt_handler() {
    TRANSFER_WAKER.wake();
}

/// Call from the receive or transmit queue interrupt.
#[inline]
pub fn queue_interrupt_handler(direction: Direction) {
    match direction {
        Direction::FromDevice => {
            RX_EVENT.store(true, Ordering::Release);
            RX_WAKER.wake();
        }
        Direction::ToDevice => {
            TX_EVENT.store(true, Ordering::Release);
            TX_WAKER.wake();
        }
    }
}

/// Future resolving once a transfer status leaves `Pending`.
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct WaitFuture<'c, 'd, 's, E, B, const CHANNELS: usize, const DEPTH: usize> {
    connection: &'c mut Connection<'d, E, CHANNELS, DEPTH>,
    status: &'s mut TransferStatus<B>,
}

impl<'c, 'd, 's, E, B, const CHANNELS: usize, const DEPTH: usize>
    WaitFuture<'c, 'd, 's, E, B, CHANNELS, DEPTH>
{
    /// Create a new wait future.
    pub fn new(
        connection: &'c mut Connection<'d, E, CHANNELS, DEPTH>,
        status: &'s mut TransferStatus<B>,
    ) -> Self {
        Self { connection, status }
    }
}

impl<E, B, const CHANNELS: usize, const DEPTH: usize> Future
    for WaitFuture<'_, '_, '_, E, B, CHANNELS, DEPTH>
where
    E: DescriptorEngine,
    B: DmaBuffer,
{
    type Output = Result<usize>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        if let Some(outcome) = this.connection.poll_transfer(this.status) {
            return Poll::Ready(outcome);
        }
        TRANSFER_WAKER.register(cx.waker());
        match this.connection.poll_transfer(this.status) {
            Some(outcome) => Poll::Ready(outcome),
            None => Poll::Pending,
        }
    }
}

/// Future resolving on the next queue interrupt for one direction.
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct QueueEventFuture {
    direction: Direction,
}

impl QueueEventFuture {
    /// Create a new queue event future.
    pub fn new(direction: Direction) -> Self {
        Self { direction }
    }

    fn parts(&self) -> (&'static AtomicBool, &'static AtomicWaker) {
        match self.direction {
            Direction::FromDevice => (&RX_EVENT, &RX_WAKER),
            Direction::ToDevice => (&TX_EVENT, &TX_WAKER),
        }
    }
}

impl Future for QueueEventFuture {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let (event, waker) = self.parts();
        if event.swap(false, Ordering::Acquire) {
            return Poll::Ready(());
        }
        waker.register(cx.waker());
        if event.swap(false, Ordering::Acquire) {
            Poll::Ready(())
        } else {
            Poll::Pending
        }
    }
}

/// Extension trait providing async waits on a connection.
pub trait AsyncConnectionExt<B> {
    /// Wait for `status` to leave `Pending`.
    fn wait_async<'a>(
        &'a mut self,
        status: &'a mut TransferStatus<B>,
    ) -> impl Future<Output = Result<usize>> + 'a;
}

impl<'d, E, B, const CHANNELS: usize, const DEPTH: usize> AsyncConnectionExt<B>
    for Connection<'d, E, CHANNELS, DEPTH>
where
    E: DescriptorEngine,
    B: DmaBuffer,
{
    fn wait_async<'a>(
        &'a mut self,
        status: &'a mut TransferStatus<B>,
    ) -> impl Future<Output = Result<usize>> + 'a {
        WaitFuture::new(self, status)
    }
}

/// Wait for the next queue interrupt in `direction`.
pub fn wait_queue_event(direction: Direction) -> QueueEventFuture {
    QueueEventFuture::new(direction)
}

/// Reset all async state (call when tearing down connections or queues).
pub fn reset_async_state() {
    RX_EVENT.store(false, Ordering::Release);
    TX_EVENT.store(false, Ordering::Release);
    TRANSFER_WAKER.wake();
    RX_WAKER.wake();
    TX_WAKER.wake();
}
