//! Synchronization primitives for ISR-safe access.
//!
//! Low-level primitives shared by the device binding table, the shared
//! connection wrapper and the async completion support.

use core::cell::RefCell;
#[cfg(feature = "async")]
use core::task::Waker;
use critical_section::Mutex;

/// Cell providing interior mutability with critical section protection.
///
/// Combines `critical_section::Mutex` with `RefCell` for safe mutable access
/// from both normal code and interrupt handlers.
pub struct CriticalSectionCell<T> {
    inner: Mutex<RefCell<T>>,
}

impl<T> CriticalSectionCell<T> {
    /// Create a new cell (const, suitable for static initialization).
    pub const fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(value)),
        }
    }

    /// Execute a closure with exclusive mutable access.
    ///
    /// Interrupts are disabled for the duration of the closure.
    #[inline]
    pub fn with<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&mut T) -> R,
    {
        critical_section::with(|cs| {
            let mut value = self.inner.borrow_ref_mut(cs);
            f(&mut value)
        })
    }

    /// Try to execute a closure, returning `None` if already borrowed.
    ///
    /// Use from an interrupt handler that may preempt a `with` on the same
    /// cell in thread context.
    #[inline]
    pub fn try_with<R, F>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&mut T) -> R,
    {
        critical_section::with(|cs| {
            self.inner
                .borrow(cs)
                .try_borrow_mut()
                .ok()
                .map(|mut value| f(&mut value))
        })
    }

    /// Execute a closure with immutable access.
    #[inline]
    pub fn with_ref<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        critical_section::with(|cs| {
            let value = self.inner.borrow_ref(cs);
            f(&value)
        })
    }

    /// Consume the cell, returning the value
    pub fn into_inner(self) -> T {
        self.inner.into_inner().into_inner()
    }
}

/// Thread-safe, interrupt-safe waker storage for async completion.
///
/// Register a waker from async poll, wake from the completion interrupt.
#[cfg(feature = "async")]
pub struct AtomicWaker {
    waker: CriticalSectionCell<Option<Waker>>,
}

#[cfg(feature = "async")]
impl AtomicWaker {
    /// Create a new empty waker (const, suitable for static initialization).
    pub const fn new() -> Self {
        Self {
            waker: CriticalSectionCell::new(None),
        }
    }

    /// Register a waker to be woken later.
    pub fn register(&self, waker: &Waker) {
        self.waker.with(|slot| match slot {
            Some(existing) if existing.will_wake(waker) => {}
            _ => *slot = Some(waker.clone()),
        });
    }

    /// Wake the registered waker, if any (clears the stored waker).
    #[inline]
    pub fn wake(&self) {
        let waker = self.waker.with(|slot| slot.take());
        if let Some(w) = waker {
            w.wake();
        }
    }

    /// Check if a waker is currently registered.
    pub fn is_registered(&self) -> bool {
        self.waker.with_ref(|slot| slot.is_some())
    }
}

#[cfg(feature = "async")]
impl Default for AtomicWaker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // CriticalSectionCell
    // =========================================================================

    #[test]
    fn cell_with_mutates_and_returns() {
        let cell: CriticalSectionCell<u32> = CriticalSectionCell::new(1);
        let doubled = cell.with(|v| {
            *v += 10;
            *v * 2
        });
        assert_eq!(doubled, 22);
        assert_eq!(cell.with_ref(|v| *v), 11);
    }

    #[test]
    fn cell_try_with_fails_while_borrowed() {
        let cell: CriticalSectionCell<u32> = CriticalSectionCell::new(7);
        assert_eq!(cell.try_with(|v| *v), Some(7));
        let nested = cell.with(|_| cell.try_with(|v| *v));
        assert_eq!(nested, None);
    }

    #[test]
    fn cell_static_usage() {
        static CELL: CriticalSectionCell<[u8; 4]> = CriticalSectionCell::new([0; 4]);
        CELL.with(|v| v[2] = 0xAA);
        assert_eq!(CELL.with_ref(|v| v[2]), 0xAA);
    }

    #[test]
    fn cell_into_inner() {
        let cell = CriticalSectionCell::new(5u16);
        cell.with(|v| *v = 6);
        assert_eq!(cell.into_inner(), 6);
    }

    // =========================================================================
    // AtomicWaker
    // =========================================================================

    #[cfg(feature = "async")]
    mod waker {
        use super::*;
        use crate::test_utils::{WakeCounter, test_waker};

        #[test]
        fn new_is_empty() {
            assert!(!AtomicWaker::new().is_registered());
            assert!(!AtomicWaker::default().is_registered());
        }

        #[test]
        fn wake_calls_and_clears() {
            let atomic_waker = AtomicWaker::new();
            let counter = WakeCounter::new();
            atomic_waker.register(&test_waker(counter.clone()));
            assert!(atomic_waker.is_registered());

            atomic_waker.wake();
            atomic_waker.wake();
            assert_eq!(counter.count(), 1);
            assert!(!atomic_waker.is_registered());
        }

        #[test]
        fn register_overwrites_previous() {
            let atomic_waker = AtomicWaker::new();
            let first = WakeCounter::new();
            let second = WakeCounter::new();

            atomic_waker.register(&test_waker(first.clone()));
            atomic_waker.register(&test_waker(second.clone()));
            atomic_waker.wake();

            assert_eq!(first.count(), 0);
            assert_eq!(second.count(), 1);
        }
    }
}
