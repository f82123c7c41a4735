//! DMA-safe buffer ownership.
//!
//! A buffer handed to a channel is read or written by the engine between
//! submit and completion, possibly after the submitting code has moved on.
//! [`DmaBuffer`] restricts submissions to memory that stays put for the
//! rest of the program, and [`TransferStatus`](crate::TransferStatus) keeps
//! the buffer out of reach while a transfer is pending.

use crate::internal::constants::XDMA_ALIGNMENT;

/// Memory an engine may access outside Rust's borrow tracking.
///
/// # Safety
///
/// Implementors must guarantee that the slices returned by
/// [`as_dma_slice`](Self::as_dma_slice) and
/// [`as_dma_slice_mut`](Self::as_dma_slice_mut) always cover the same
/// address range, and that this memory is neither freed nor moved for as
/// long as any value of the implementing type exists, including after it
/// is dropped.
pub unsafe trait DmaBuffer {
    /// Buffer contents
    fn as_dma_slice(&self) -> &[u8];

    /// Mutable buffer contents
    fn as_dma_slice_mut(&mut self) -> &mut [u8];

    /// Bus address of byte `offset`
    ///
    /// Host memory is identity-mapped.
    fn bus_address(&self, offset: usize) -> u64 {
        (self.as_dma_slice().as_ptr() as usize as u64) + offset as u64
    }

    /// Buffer length in bytes
    fn dma_len(&self) -> usize {
        self.as_dma_slice().len()
    }
}

// SAFETY: 'static memory is never freed, and a unique borrow cannot be moved out from under us.
unsafe impl DmaBuffer for &'static mut [u8] {
    fn as_dma_slice(&self) -> &[u8] {
        self
    }

    fn as_dma_slice_mut(&mut self) -> &mut [u8] {
        self
    }
}

// SAFETY: as for `&'static mut [u8]`.
unsafe impl<const N: usize> DmaBuffer for &'static mut [u8; N] {
    fn as_dma_slice(&self) -> &[u8] {
        &self[..]
    }

    fn as_dma_slice_mut(&mut self) -> &mut [u8] {
        &mut self[..]
    }
}

// SAFETY: as for `&'static mut [u8]`.
unsafe impl<const N: usize> DmaBuffer for &'static mut Aligned<N> {
    fn as_dma_slice(&self) -> &[u8] {
        &self.0
    }

    fn as_dma_slice_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }
}

/// Byte buffer aligned for the XDMA engine (64 bytes).
#[repr(C, align(64))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aligned<const N: usize>(pub [u8; N]);

const _: () = assert!(core::mem::align_of::<Aligned<1>>() == XDMA_ALIGNMENT);

impl<const N: usize> Aligned<N> {
    /// Zero-filled buffer (const, suitable for static initialization)
    #[must_use]
    pub const fn new() -> Self {
        Self([0; N])
    }

    /// Buffer contents
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Mutable buffer contents
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.0
    }
}

impl<const N: usize> Default for Aligned<N> {
    fn default() -> Self {
        Self::new()
    }
}
