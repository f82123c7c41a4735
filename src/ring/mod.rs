//! Three-cursor circular ring shared between software and a DMA engine.
//!
//! A [`Ring`] holds `N` slots (`N` a power of two) and three cursors:
//!
//! ```text
//!   begin         next          end           begin + N
//!     |  hardware   |  software   |   client      |
//!     +-------------+-------------+---------------+
//! ```
//!
//! - `[begin, next)`: programmed into the engine, not yet retired
//! - `[next, end)`: produced by the client, waiting to be programmed
//! - `[end, begin + N)`: owned by the client (retired or never submitted)
//!
//! Cursors run over `[0, 2N)` and slots are addressed by `cursor mod N`.
//! The extra wrap bit tells a full ring (`end - begin == N`) from an empty
//! one (`end == begin`) without reserving a slot.
//!
//! Every advance checks the region it takes slots from and fails with
//! [`DmaError::OutOfRange`] without touching any cursor when the request
//! does not fit.

pub mod fragment;
pub mod packet;

pub use fragment::Fragment;
pub use packet::Packet;

use crate::driver::error::{DmaError, DmaResult};

/// Circular ring with begin/next/end cursors.
pub struct Ring<T, const N: usize> {
    slots: [T; N],
    begin: usize,
    next: usize,
    end: usize,
}

impl<T, const N: usize> Ring<T, N> {
    const VALID_CAPACITY: () = assert!(
        N.is_power_of_two(),
        "ring capacity must be a non-zero power of two"
    );

    /// Cursor wrap modulus (`2N`)
    const WRAP: usize = 2 * N;

    /// Create a ring over an existing slot array, all cursors at zero
    #[must_use]
    pub const fn from_array(slots: [T; N]) -> Self {
        let () = Self::VALID_CAPACITY;
        Self {
            slots,
            begin: 0,
            next: 0,
            end: 0,
        }
    }

    /// Number of slots
    #[inline(always)]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Oldest hardware-owned cursor
    #[inline(always)]
    #[must_use]
    pub const fn begin(&self) -> usize {
        self.begin
    }

    /// First software-owned cursor
    #[inline(always)]
    #[must_use]
    pub const fn next(&self) -> usize {
        self.next
    }

    /// First client-owned cursor
    #[inline(always)]
    #[must_use]
    pub const fn end(&self) -> usize {
        self.end
    }

    // =========================================================================
    // Cursor Arithmetic
    // =========================================================================

    /// Number of slots from cursor `from` up to cursor `to`
    #[inline(always)]
    #[must_use]
    pub const fn distance(from: usize, to: usize) -> usize {
        to.wrapping_sub(from) & (Self::WRAP - 1)
    }

    /// Cursor `n` slots after `cursor`
    #[inline(always)]
    #[must_use]
    pub const fn offset(cursor: usize, n: usize) -> usize {
        cursor.wrapping_add(n) & (Self::WRAP - 1)
    }

    /// Cursor following `cursor`
    #[inline(always)]
    #[must_use]
    pub const fn increment(cursor: usize) -> usize {
        Self::offset(cursor, 1)
    }

    /// Slot index addressed by `cursor`
    #[inline(always)]
    #[must_use]
    pub const fn index(cursor: usize) -> usize {
        cursor & (N - 1)
    }

    /// Iterate over the cursors of `[from, to)`
    #[must_use]
    pub const fn cursors(from: usize, to: usize) -> Cursors<N> {
        Cursors {
            cursor: from,
            remaining: Self::distance(from, to),
        }
    }

    // =========================================================================
    // Regions
    // =========================================================================

    /// Slots programmed into the engine and not yet retired
    #[inline(always)]
    #[must_use]
    pub const fn hardware_owned(&self) -> usize {
        Self::distance(self.begin, self.next)
    }

    /// Slots produced by the client and not yet programmed
    #[inline(always)]
    #[must_use]
    pub const fn software_owned(&self) -> usize {
        Self::distance(self.next, self.end)
    }

    /// Slots held by the client
    #[inline(always)]
    #[must_use]
    pub const fn client_owned(&self) -> usize {
        N - self.in_use()
    }

    /// Slots between `begin` and `end`
    #[inline(always)]
    #[must_use]
    pub const fn in_use(&self) -> usize {
        Self::distance(self.begin, self.end)
    }

    /// True when no slot is hardware or software owned
    #[inline(always)]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.begin == self.end
    }

    /// True when the client owns no slot
    #[inline(always)]
    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.in_use() == N
    }

    // =========================================================================
    // Cursor Movement
    // =========================================================================

    /// Hand `n` client slots to software (buffers or packets produced)
    pub fn advance_end(&mut self, n: usize) -> DmaResult<()> {
        if n > self.client_owned() {
            return Err(DmaError::OutOfRange);
        }
        self.end = Self::offset(self.end, n);
        Ok(())
    }

    /// Hand `n` software slots to hardware (descriptors programmed)
    pub fn advance_next(&mut self, n: usize) -> DmaResult<()> {
        if n > self.software_owned() {
            return Err(DmaError::OutOfRange);
        }
        self.next = Self::offset(self.next, n);
        Ok(())
    }

    /// Retire `n` hardware slots back to the client
    pub fn advance_begin(&mut self, n: usize) -> DmaResult<()> {
        if n > self.hardware_owned() {
            return Err(DmaError::OutOfRange);
        }
        self.begin = Self::offset(self.begin, n);
        Ok(())
    }

    /// Force `next` and `begin` up to `end`, returning how many slots moved
    ///
    /// Used by cancellation once the dropped slots have been marked.
    pub fn drain(&mut self) -> usize {
        let drained = self.in_use();
        self.next = self.end;
        self.begin = self.end;
        drained
    }

    /// Put all cursors back at zero
    pub fn reset(&mut self) {
        self.begin = 0;
        self.next = 0;
        self.end = 0;
    }

    // =========================================================================
    // Slot Access
    // =========================================================================

    /// Slot addressed by `cursor`
    #[inline(always)]
    pub fn get(&self, cursor: usize) -> &T {
        &self.slots[Self::index(cursor)]
    }

    /// Mutable slot addressed by `cursor`
    #[inline(always)]
    pub fn get_mut(&mut self, cursor: usize) -> &mut T {
        &mut self.slots[Self::index(cursor)]
    }

    /// Iterate over all slots in index order
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.slots.iter()
    }
}

impl<T: Copy + Default, const N: usize> Ring<T, N> {
    /// Create a ring of default slots
    #[must_use]
    pub fn new() -> Self {
        Self::from_array([T::default(); N])
    }
}

impl<T: Copy + Default, const N: usize> Default for Ring<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize> core::fmt::Debug for Ring<T, N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Ring")
            .field("capacity", &N)
            .field("begin", &self.begin)
            .field("next", &self.next)
            .field("end", &self.end)
            .finish()
    }
}

/// Iterator over a run of ring cursors.
#[derive(Debug, Clone)]
pub struct Cursors<const N: usize> {
    cursor: usize,
    remaining: usize,
}

impl<const N: usize> Iterator for Cursors<N> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.remaining == 0 {
            return None;
        }
        let cursor = self.cursor;
        self.cursor = (self.cursor + 1) & (2 * N - 1);
        self.remaining -= 1;
        Some(cursor)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<const N: usize> ExactSizeIterator for Cursors<N> {}

// =============================================================================
// Tests
// =============================================================================
