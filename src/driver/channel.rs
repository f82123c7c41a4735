//! Bulk transfer channel.
//!
//! A channel keeps one ring of transfer slots. Submission writes a slot at
//! `end`, programs it and moves it straight to hardware; retirement walks
//! `[begin, next)` in order and stores each outcome in its slot, where the
//! matching status collects it. An outcome still uncollected when the ring
//! wraps back to its slot is dropped; a late collect then reports the
//! transfer as aborted.

use core::sync::atomic::{Ordering, fence};

#[cfg(feature = "log")]
use log::{debug, warn};

use super::buffer::DmaBuffer;
use super::config::{ChannelConfig, ChannelId};
use super::error::{DmaError, DmaResult, IoError, Result};
use super::status::Ticket;
use crate::hal::{DescriptorEngine, DescriptorHandle, DescriptorStatus, Segment};
use crate::ring::Ring;

#[derive(Debug, Clone, Copy)]
struct TransferSlot {
    sequence: u32,
    segment: Segment,
    outcome: Option<Result<usize>>,
    collected: bool,
}

impl TransferSlot {
    const EMPTY: Self = Self {
        sequence: 0,
        segment: Segment::EMPTY,
        outcome: None,
        collected: true,
    };
}

/// A configured DMA channel with room for `DEPTH` outstanding transfers.
#[derive(Debug)]
pub struct Channel<const DEPTH: usize> {
    id: ChannelId,
    config: ChannelConfig,
    epoch: u32,
    attached: bool,
    notifications: bool,
    next_sequence: u32,
    ring: Ring<TransferSlot, DEPTH>,
}

impl<const DEPTH: usize> Channel<DEPTH> {
    pub(crate) const fn new(id: ChannelId, config: ChannelConfig, epoch: u32, attached: bool) -> Self {
        Self {
            id,
            config,
            epoch,
            attached,
            notifications: true,
            next_sequence: 0,
            ring: Ring::from_array([TransferSlot::EMPTY; DEPTH]),
        }
    }

    /// Channel id
    pub const fn id(&self) -> ChannelId {
        self.id
    }

    /// Configuration the channel was created with
    pub const fn config(&self) -> &ChannelConfig {
        &self.config
    }

    /// Configuration epoch
    pub const fn epoch(&self) -> u32 {
        self.epoch
    }

    /// True when the channel is bound to a device
    pub const fn is_attached(&self) -> bool {
        self.attached
    }

    /// Transfers programmed and not yet retired
    pub const fn in_flight(&self) -> usize {
        self.ring.hardware_owned()
    }

    /// Transfers retired but not yet collected by their status
    pub fn uncollected(&self) -> usize {
        let limit = Ring::<TransferSlot, DEPTH>::offset(self.ring.begin(), DEPTH);
        Ring::<TransferSlot, DEPTH>::cursors(self.ring.end(), limit)
            .filter(|&cursor| !self.ring.get(cursor).collected)
            .count()
    }

    /// True when completion interrupts are requested
    pub const fn notifications_enabled(&self) -> bool {
        self.notifications
    }

    fn handle(&self, cursor: usize) -> DescriptorHandle {
        DescriptorHandle::new(
            self.config.direction,
            self.id.0,
            Ring::<TransferSlot, DEPTH>::index(cursor) as u32,
        )
    }

    // =========================================================================
    // Submission
    // =========================================================================

    /// Check a transfer against the engine limits and build its segment
    ///
    /// The size ceiling is checked before the buffer bounds so an oversized
    /// request is always reported as too large.
    pub fn validate<B: DmaBuffer>(
        &self,
        buffer: &B,
        offset: usize,
        device_address: u64,
        length: usize,
    ) -> DmaResult<Segment> {
        let profile = self.config.profile();
        if length == 0 {
            return Err(DmaError::InvalidLength);
        }
        if length > profile.max_transfer {
            return Err(DmaError::TransferTooLarge);
        }
        match offset.checked_add(length) {
            Some(end) if end <= buffer.dma_len() => {}
            _ => return Err(DmaError::InvalidLength),
        }

        let host_address = buffer.bus_address(offset);
        if host_address % profile.alignment as u64 != 0 {
            return Err(DmaError::Misaligned);
        }

        Ok(Segment {
            host_address,
            device_address,
            length: length as u32,
        })
    }

    /// Program one transfer, returning its cursor and sequence number
    ///
    /// Fails without touching the ring when the descriptor depth is used up.
    /// A retired outcome nobody collected is overwritten.
    pub(crate) fn enqueue<E: DescriptorEngine>(
        &mut self,
        engine: &mut E,
        segment: Segment,
    ) -> DmaResult<(usize, u32)> {
        if self.ring.in_use() >= self.config.descriptor_depth || self.ring.client_owned() == 0 {
            return Err(DmaError::NoDescriptorsAvailable);
        }
        let cursor = self.ring.end();
        let stale = *self.ring.get(cursor);
        if !stale.collected {
            #[cfg(feature = "log")]
            warn!(
                "channel {} dropping uncollected transfer {}",
                self.id.0, stale.sequence
            );
            #[cfg(feature = "defmt")]
            defmt::warn!(
                "channel {} dropping uncollected transfer {}",
                self.id.0, stale.sequence
            );
        }

        let sequence = self.next_sequence;
        *self.ring.get_mut(cursor) = TransferSlot {
            sequence,
            segment,
            outcome: None,
            collected: false,
        };
        self.ring.advance_end(1)?;

        engine.program_descriptor(self.handle(cursor), &segment);
        fence(Ordering::Release);
        self.ring.advance_next(1)?;
        self.next_sequence = sequence.wrapping_add(1);

        Ok((cursor, sequence))
    }

    // =========================================================================
    // Completion
    // =========================================================================

    /// Retire finished transfers in ring order, returning how many
    pub fn retire<E: DescriptorEngine>(&mut self, engine: &mut E) -> DmaResult<usize> {
        let mut retired = 0;

        for cursor in Ring::<TransferSlot, DEPTH>::cursors(self.ring.begin(), self.ring.next()) {
            let handle = self.handle(cursor);
            let outcome = match engine.poll(handle) {
                DescriptorStatus::InFlight => break,
                DescriptorStatus::Done { length } => Ok(length as usize),
                DescriptorStatus::Failed(e) => Err(e),
            };
            fence(Ordering::Acquire);

            self.ring.get_mut(cursor).outcome = Some(outcome);
            engine.retire(handle);
            self.ring.advance_begin(1)?;
            retired += 1;
        }

        Ok(retired)
    }

    /// Take the outcome of the transfer `ticket` names, if it has retired
    pub(crate) fn collect(&mut self, ticket: Ticket) -> Option<Result<usize>> {
        let slot = self.ring.get_mut(ticket.cursor);
        if slot.sequence != ticket.sequence || slot.collected {
            return Some(Err(IoError::Aborted.into()));
        }
        let outcome = slot.outcome?;
        slot.collected = true;
        Some(outcome)
    }

    // =========================================================================
    // Control
    // =========================================================================

    pub(crate) fn start<E: DescriptorEngine>(&mut self, engine: &mut E) {
        engine.set_notification_enabled(self.config.direction, self.id.0, self.notifications);
        engine.start(self.config.direction, self.id.0);
    }

    /// Request or suppress completion interrupts
    pub(crate) fn set_notification_enabled<E: DescriptorEngine>(
        &mut self,
        engine: &mut E,
        enabled: bool,
    ) {
        self.notifications = enabled;
        engine.set_notification_enabled(self.config.direction, self.id.0, enabled);
    }

    /// Abort in-flight work and stop the engine channel
    pub(crate) fn shutdown<E: DescriptorEngine>(&mut self, engine: &mut E) {
        if let Err(_e) = engine.cancel(self.config.direction, self.id.0) {
            #[cfg(feature = "log")]
            debug!("channel {} abort: {}", self.id.0, _e);
            #[cfg(feature = "defmt")]
            defmt::debug!("channel {} abort: {}", self.id.0, _e);
        }
        for cursor in Ring::<TransferSlot, DEPTH>::cursors(self.ring.begin(), self.ring.next()) {
            engine.retire(self.handle(cursor));
        }
        engine.stop(self.config.direction, self.id.0);
        self.ring.drain();
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::config::{Direction, EngineKind};
    use crate::internal::constants::MAX_TRANSFER_SIZE;
    use crate::test_utils::{MockEngine, leak_aligned};

    fn channel<const DEPTH: usize>(depth: usize) -> Channel<DEPTH> {
        let config = ChannelConfig::simulated(Direction::ToDevice).with_descriptor_depth(depth);
        Channel::new(ChannelId(0), config, 1, false)
    }

    fn ticket(cursor: usize, sequence: u32) -> Ticket {
        Ticket {
            channel: ChannelId(0),
            cursor,
            sequence,
            epoch: 1,
        }
    }

    #[test]
    fn validate_rejects_oversized_before_bounds() {
        let ch: Channel<4> = channel(4);
        let buffer = leak_aligned::<128>();
        assert_eq!(
            ch.validate(&buffer, 0, 0, 2 * MAX_TRANSFER_SIZE),
            Err(DmaError::TransferTooLarge)
        );
        assert_eq!(ch.validate(&buffer, 0, 0, 0), Err(DmaError::InvalidLength));
        assert_eq!(ch.validate(&buffer, 64, 0, 65), Err(DmaError::InvalidLength));
        assert_eq!(
            ch.validate(&buffer, usize::MAX, 0, 1),
            Err(DmaError::InvalidLength)
        );
    }

    #[test]
    fn validate_checks_engine_alignment() {
        let config = ChannelConfig::new().with_engine(EngineKind::AmdXdma);
        let ch: Channel<4> = Channel::new(ChannelId(0), config, 1, true);
        let buffer = leak_aligned::<256>();

        assert_eq!(ch.validate(&buffer, 3, 0, 16), Err(DmaError::Misaligned));
        let segment = ch.validate(&buffer, 64, 0x8000, 16).unwrap();
        assert_eq!(segment.host_address, buffer.bus_address(64));
        assert_eq!(segment.device_address, 0x8000);
        assert_eq!(segment.length, 16);
    }

    #[test]
    fn enqueue_programs_and_hands_to_hardware() {
        let mut engine = MockEngine::new();
        let mut ch: Channel<4> = channel(4);
        let (cursor, sequence) = ch.enqueue(&mut engine, Segment::EMPTY).unwrap();

        assert_eq!((cursor, sequence), (0, 0));
        assert_eq!(ch.in_flight(), 1);
        assert_eq!(engine.programmed().len(), 1);
    }

    #[test]
    fn enqueue_respects_descriptor_depth() {
        let mut engine = MockEngine::new();
        let mut ch: Channel<8> = channel(2);
        ch.enqueue(&mut engine, Segment::EMPTY).unwrap();
        ch.enqueue(&mut engine, Segment::EMPTY).unwrap();
        assert_eq!(
            ch.enqueue(&mut engine, Segment::EMPTY),
            Err(DmaError::NoDescriptorsAvailable)
        );
        assert_eq!(ch.in_flight(), 2);
    }

    #[test]
    fn uncollected_slot_is_reclaimed_on_wrap() {
        let mut engine = MockEngine::new().with_auto_complete(true);
        let mut ch: Channel<2> = channel(2);
        ch.enqueue(&mut engine, Segment::EMPTY).unwrap();
        ch.enqueue(&mut engine, Segment::EMPTY).unwrap();
        assert_eq!(ch.retire(&mut engine), Ok(2));
        assert_eq!(ch.uncollected(), 2);

        assert_eq!(ch.enqueue(&mut engine, Segment::EMPTY), Ok((2, 2)));
        assert_eq!(ch.uncollected(), 1);
        assert_eq!(
            ch.collect(ticket(0, 0)),
            Some(Err(IoError::Aborted.into()))
        );
        assert_eq!(ch.collect(ticket(1, 1)), Some(Ok(0)));

        assert_eq!(ch.retire(&mut engine), Ok(1));
        assert_eq!(ch.collect(ticket(2, 2)), Some(Ok(0)));
    }

    #[test]
    fn retire_records_outcomes_in_order() {
        let mut engine = MockEngine::new();
        let mut ch: Channel<4> = channel(4);
        let segment = Segment {
            length: 512,
            ..Segment::EMPTY
        };
        ch.enqueue(&mut engine, segment).unwrap();
        ch.enqueue(&mut engine, segment).unwrap();

        assert_eq!(ch.collect(ticket(0, 0)), None);

        engine.complete(DescriptorHandle::new(Direction::ToDevice, 0, 1), 512);
        assert_eq!(ch.retire(&mut engine), Ok(0));

        engine.fail(
            DescriptorHandle::new(Direction::ToDevice, 0, 0),
            DmaError::FatalBusError.into(),
        );
        assert_eq!(ch.retire(&mut engine), Ok(2));
        assert_eq!(
            ch.collect(ticket(0, 0)),
            Some(Err(DmaError::FatalBusError.into()))
        );
        assert_eq!(ch.collect(ticket(1, 1)), Some(Ok(512)));
    }

    #[test]
    fn collect_twice_reports_aborted() {
        let mut engine = MockEngine::new().with_auto_complete(true);
        let mut ch: Channel<2> = channel(2);
        ch.enqueue(&mut engine, Segment::EMPTY).unwrap();
        ch.retire(&mut engine).unwrap();
        assert_eq!(ch.collect(ticket(0, 0)), Some(Ok(0)));
        assert_eq!(
            ch.collect(ticket(0, 0)),
            Some(Err(IoError::Aborted.into()))
        );
    }

    #[test]
    fn shutdown_aborts_and_stops() {
        let mut engine = MockEngine::new();
        let mut ch: Channel<4> = channel(4);
        ch.start(&mut engine);
        ch.enqueue(&mut engine, Segment::EMPTY).unwrap();
        ch.shutdown(&mut engine);

        assert_eq!(ch.in_flight(), 0);
        assert_eq!(engine.cancels(), [(Direction::ToDevice, 0)]);
        assert_eq!(engine.outstanding(), 0);
        assert_eq!(
            engine.run_log(),
            [(Direction::ToDevice, 0, true), (Direction::ToDevice, 0, false)]
        );
    }
}
