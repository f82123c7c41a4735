//! Simulated DMA engine.
//!
//! Tracks programmed descriptors in a fixed table and reports each one
//! complete after a configurable number of polls. No data is moved.

#[cfg(feature = "log")]
use log::warn;

use super::{DescriptorEngine, DescriptorHandle, DescriptorStatus, Segment};
use crate::driver::config::{Direction, EngineKind};
use crate::driver::error::{DmaError, IoError, IoResult};

#[derive(Debug, Clone, Copy)]
struct InFlight {
    handle: DescriptorHandle,
    length: u32,
    remaining: u32,
    aborted: bool,
}

/// Software engine with room for `N` outstanding descriptors.
#[derive(Debug)]
pub struct SimulatedEngine<const N: usize> {
    table: [Option<InFlight>; N],
    latency: u32,
    programmed: u64,
    completed: u64,
}

impl<const N: usize> SimulatedEngine<N> {
    /// Create an engine that completes descriptors on the first poll
    #[must_use]
    pub const fn new() -> Self {
        Self {
            table: [None; N],
            latency: 0,
            programmed: 0,
            completed: 0,
        }
    }

    /// Report each descriptor in flight for `polls` polls before completing
    #[must_use]
    pub const fn with_latency(mut self, polls: u32) -> Self {
        self.latency = polls;
        self
    }

    /// Descriptors programmed since creation
    pub const fn programmed(&self) -> u64 {
        self.programmed
    }

    /// Descriptors retired since creation
    pub const fn completed(&self) -> u64 {
        self.completed
    }

    /// Descriptors currently tracked
    pub fn outstanding(&self) -> usize {
        self.table.iter().filter(|e| e.is_some()).count()
    }

    /// Finish every outstanding descriptor on its next poll
    pub fn complete_all(&mut self) {
        for entry in self.table.iter_mut().flatten() {
            entry.remaining = 0;
        }
    }

    fn find(&mut self, handle: DescriptorHandle) -> Option<&mut InFlight> {
        self.table
            .iter_mut()
            .flatten()
            .find(|entry| entry.handle == handle)
    }
}

impl<const N: usize> Default for SimulatedEngine<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> DescriptorEngine for SimulatedEngine<N> {
    fn kind(&self) -> EngineKind {
        EngineKind::Simulated
    }

    fn program_descriptor(&mut self, handle: DescriptorHandle, segment: &Segment) {
        let entry = InFlight {
            handle,
            length: segment.length,
            remaining: self.latency,
            aborted: false,
        };

        let slot = match self
            .table
            .iter()
            .position(|e| e.is_some_and(|e| e.handle == handle))
        {
            Some(index) => Some(index),
            None => self.table.iter().position(Option::is_none),
        };

        match slot {
            Some(index) => {
                self.table[index] = Some(entry);
                self.programmed += 1;
            }
            None => {
                // Polls of this handle will report a bus error
                #[cfg(feature = "log")]
                warn!("simulated engine table full, dropping descriptor {:?}", handle);
                #[cfg(feature = "defmt")]
                defmt::warn!("simulated engine table full, dropping descriptor {:?}", handle);
            }
        }
    }

    fn poll(&mut self, handle: DescriptorHandle) -> DescriptorStatus {
        let Some(entry) = self.find(handle) else {
            return DescriptorStatus::Failed(DmaError::FatalBusError.into());
        };

        if entry.aborted {
            return DescriptorStatus::Failed(IoError::Aborted.into());
        }
        if entry.remaining > 0 {
            entry.remaining -= 1;
            return DescriptorStatus::InFlight;
        }
        DescriptorStatus::Done {
            length: entry.length,
        }
    }

    fn retire(&mut self, handle: DescriptorHandle) {
        for slot in &mut self.table {
            if slot.is_some_and(|e| e.handle == handle) {
                *slot = None;
                self.completed += 1;
            }
        }
    }

    fn cancel(&mut self, direction: Direction, channel: u16) -> IoResult<()> {
        for entry in self.table.iter_mut().flatten() {
            if entry.handle.direction == direction
                && entry.handle.channel == channel
                && entry.remaining > 0
            {
                entry.aborted = true;
            }
        }
        Ok(())
    }
}
