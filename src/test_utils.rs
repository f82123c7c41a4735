//! Testing utilities and mock implementations
//!
//! This module provides mock implementations for testing the rings, queues
//! and channels on the host without hardware access.
//!
//! Only available when running `cargo test`.

// Note: The #[cfg(test)] attribute is applied in lib.rs where this module is declared
#![allow(missing_docs)]
#![allow(clippy::std_instead_of_core, clippy::std_instead_of_alloc)]

extern crate std;

use core::cell::RefCell;
use core::task::{RawWaker, RawWakerVTable, Waker};
use std::boxed::Box;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::vec;
use std::vec::Vec;

use crate::driver::buffer::Aligned;
use crate::driver::config::{Direction, EngineKind};
use crate::driver::error::{Error, IoError, IoResult};
use crate::hal::{DescriptorEngine, DescriptorHandle, DescriptorStatus, Segment};

// =============================================================================
// Mock Descriptor Engine
// =============================================================================

/// Scriptable descriptor engine.
///
/// Every programmed descriptor stays in flight until the test completes
/// or fails it. Every call is recorded for later verification.
///
/// # Example
///
/// ```ignore
/// let mut engine = MockEngine::new();
/// queue.advance(&mut engine).unwrap();
/// engine.complete_all(1500);
/// let report = queue.advance(&mut engine).unwrap();
/// ```
#[derive(Debug)]
pub struct MockEngine {
    kind: EngineKind,
    /// Outstanding descriptors: handle -> (segment, status)
    descriptors: HashMap<DescriptorHandle, (Segment, DescriptorStatus)>,
    /// Record of programmed descriptors in order
    programmed: Vec<(DescriptorHandle, Segment)>,
    /// Record of retired descriptors in order
    retired: Vec<DescriptorHandle>,
    /// Record of abort requests
    cancels: Vec<(Direction, u16)>,
    /// Record of notification toggles
    notifications: Vec<(Direction, u16, bool)>,
    /// Record of start/stop calls (true = start)
    run_log: Vec<(Direction, u16, bool)>,
    cancel_supported: bool,
    auto_complete: bool,
}

impl MockEngine {
    /// Create a simulated-kind mock with abort support
    pub fn new() -> Self {
        Self::with_kind(EngineKind::Simulated)
    }

    /// Create a mock reporting `kind`
    pub fn with_kind(kind: EngineKind) -> Self {
        Self {
            kind,
            descriptors: HashMap::new(),
            programmed: Vec::new(),
            retired: Vec::new(),
            cancels: Vec::new(),
            notifications: Vec::new(),
            run_log: Vec::new(),
            cancel_supported: true,
            auto_complete: false,
        }
    }

    /// Enable or disable hardware abort support
    pub fn with_cancel_supported(mut self, supported: bool) -> Self {
        self.cancel_supported = supported;
        self
    }

    /// Complete every descriptor as soon as it is programmed
    pub fn with_auto_complete(mut self, enabled: bool) -> Self {
        self.auto_complete = enabled;
        self
    }

    /// Complete one descriptor with `length` bytes
    pub fn complete(&mut self, handle: DescriptorHandle, length: u32) {
        if let Some(entry) = self.descriptors.get_mut(&handle) {
            entry.1 = DescriptorStatus::Done { length };
        }
    }

    /// Complete every in-flight descriptor with `length` bytes (0 = segment length)
    pub fn complete_all(&mut self, length: u32) {
        for (segment, status) in self.descriptors.values_mut() {
            if *status == DescriptorStatus::InFlight {
                let length = if length == 0 { segment.length } else { length };
                *status = DescriptorStatus::Done { length };
            }
        }
    }

    /// Fail one descriptor
    pub fn fail(&mut self, handle: DescriptorHandle, error: Error) {
        if let Some(entry) = self.descriptors.get_mut(&handle) {
            entry.1 = DescriptorStatus::Failed(error);
        }
    }

    /// Descriptors still tracked
    pub fn outstanding(&self) -> usize {
        self.descriptors.len()
    }

    pub fn programmed(&self) -> Vec<(DescriptorHandle, Segment)> {
        self.programmed.clone()
    }

    pub fn retired(&self) -> Vec<DescriptorHandle> {
        self.retired.clone()
    }

    pub fn cancels(&self) -> Vec<(Direction, u16)> {
        self.cancels.clone()
    }

    pub fn notifications(&self) -> Vec<(Direction, u16, bool)> {
        self.notifications.clone()
    }

    pub fn run_log(&self) -> Vec<(Direction, u16, bool)> {
        self.run_log.clone()
    }
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl DescriptorEngine for MockEngine {
    fn kind(&self) -> EngineKind {
        self.kind
    }

    fn program_descriptor(&mut self, handle: DescriptorHandle, segment: &Segment) {
        let status = if self.auto_complete {
            DescriptorStatus::Done {
                length: segment.length,
            }
        } else {
            DescriptorStatus::InFlight
        };
        self.descriptors.insert(handle, (*segment, status));
        self.programmed.push((handle, *segment));
    }

    fn poll(&mut self, handle: DescriptorHandle) -> DescriptorStatus {
        self.descriptors
            .get(&handle)
            .map(|(_, status)| *status)
            .unwrap_or(DescriptorStatus::Failed(
                crate::driver::error::DmaError::FatalBusError.into(),
            ))
    }

    fn retire(&mut self, handle: DescriptorHandle) {
        self.descriptors.remove(&handle);
        self.retired.push(handle);
    }

    fn cancel(&mut self, direction: Direction, channel: u16) -> IoResult<()> {
        self.cancels.push((direction, channel));
        if !self.cancel_supported {
            return Err(IoError::Unsupported);
        }
        for (handle, (_, status)) in &mut self.descriptors {
            if handle.direction == direction
                && handle.channel == channel
                && *status == DescriptorStatus::InFlight
            {
                *status = DescriptorStatus::Failed(IoError::Aborted.into());
            }
        }
        Ok(())
    }

    fn set_notification_enabled(&mut self, direction: Direction, channel: u16, enabled: bool) {
        self.notifications.push((direction, channel, enabled));
    }

    fn start(&mut self, direction: Direction, channel: u16) {
        self.run_log.push((direction, channel, true));
    }

    fn stop(&mut self, direction: Direction, channel: u16) {
        self.run_log.push((direction, channel, false));
    }
}

// =============================================================================
// Mock Delay
// =============================================================================

/// Mock delay implementation for testing bounded waits
///
/// Records total delay time without actually delaying.
#[derive(Debug, Default)]
pub struct MockDelay {
    /// Total nanoseconds delayed
    total_ns: RefCell<u64>,
}

impl MockDelay {
    /// Create a new mock delay
    pub fn new() -> Self {
        Self::default()
    }

    /// Get total nanoseconds that were "delayed"
    pub fn total_ns(&self) -> u64 {
        *self.total_ns.borrow()
    }

    /// Get total microseconds that were "delayed"
    pub fn total_us(&self) -> u64 {
        self.total_ns() / 1_000
    }
}

impl embedded_hal::delay::DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        *self.total_ns.borrow_mut() += ns as u64;
    }
}

// =============================================================================
// Buffers
// =============================================================================

/// Leak a zeroed 64-byte aligned buffer for the rest of the test run
pub fn leak_aligned<const N: usize>() -> &'static mut Aligned<N> {
    Box::leak(Box::new(Aligned::new()))
}

/// Leak a zeroed byte buffer for the rest of the test run
pub fn leak_bytes(len: usize) -> &'static mut [u8] {
    vec![0u8; len].leak()
}

// =============================================================================
// Wakers
// =============================================================================

/// Counts wake-ups of a test waker
pub struct WakeCounter {
    count: AtomicUsize,
}

impl WakeCounter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            count: AtomicUsize::new(0),
        })
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

/// Waker that bumps `counter` on every wake
pub fn test_waker(counter: Arc<WakeCounter>) -> Waker {
    fn clone_fn(ptr: *const ()) -> RawWaker {
        // SAFETY: `ptr` originates from `Arc::into_raw` in this test helper.
        let arc = unsafe { Arc::from_raw(ptr as *const WakeCounter) };
        let cloned = arc.clone();
        core::mem::forget(arc);
        RawWaker::new(Arc::into_raw(cloned) as *const (), &VTABLE)
    }

    fn wake_fn(ptr: *const ()) {
        // SAFETY: `ptr` originates from `Arc::into_raw` in this test helper.
        let arc = unsafe { Arc::from_raw(ptr as *const WakeCounter) };
        arc.count.fetch_add(1, Ordering::SeqCst);
    }

    fn wake_by_ref_fn(ptr: *const ()) {
        // SAFETY: `ptr` originates from `Arc::into_raw` in this test helper.
        let arc = unsafe { Arc::from_raw(ptr as *const WakeCounter) };
        arc.count.fetch_add(1, Ordering::SeqCst);
        core::mem::forget(arc);
    }

    fn drop_fn(ptr: *const ()) {
        // SAFETY: `ptr` originates from `Arc::into_raw` in this test helper.
        unsafe {
            Arc::from_raw(ptr as *const WakeCounter);
        }
    }

    static VTABLE: RawWakerVTable = RawWakerVTable::new(clone_fn, wake_fn, wake_by_ref_fn, drop_fn);

    let raw = RawWaker::new(Arc::into_raw(counter) as *const (), &VTABLE);
    // SAFETY: `raw` is built from a valid `RawWakerVTable` and pointer.
    unsafe { Waker::from_raw(raw) }
}
