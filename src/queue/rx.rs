//! Receive queue.
//!
//! Every packet is a single fragment, so the Fragment Ring and the Packet
//! Ring move in lockstep and share cursor values.

use core::sync::atomic::{Ordering, fence};

#[cfg(feature = "log")]
use log::{debug, warn};

use super::{AdvanceReport, QueueState};
use crate::driver::config::Direction;
use crate::driver::error::{DmaError, DmaResult, IoError, Result};
use crate::hal::{DescriptorEngine, DescriptorHandle, DescriptorStatus};
use crate::ring::{Fragment, Packet, Ring};

/// Receive queue with `N` fragment and packet slots.
#[derive(Debug)]
pub struct RxQueue<const N: usize> {
    id: u16,
    state: QueueState,
    notifications: bool,
    fragments: Ring<Fragment, N>,
    packets: Ring<Packet, N>,
}

impl<const N: usize> RxQueue<N> {
    /// Create a stopped queue with empty rings
    #[must_use]
    pub const fn new(id: u16) -> Self {
        Self {
            id,
            state: QueueState::Stopped,
            notifications: true,
            fragments: Ring::from_array([Fragment::EMPTY; N]),
            packets: Ring::from_array([Packet::EMPTY; N]),
        }
    }

    /// Queue number used in descriptor handles
    pub const fn id(&self) -> u16 {
        self.id
    }

    /// Current lifecycle state
    pub const fn state(&self) -> QueueState {
        self.state
    }

    /// True when completion interrupts are requested
    pub const fn notifications_enabled(&self) -> bool {
        self.notifications
    }

    /// Fragment Ring
    pub const fn fragments(&self) -> &Ring<Fragment, N> {
        &self.fragments
    }

    /// Packet Ring
    pub const fn packets(&self) -> &Ring<Packet, N> {
        &self.packets
    }

    fn handle(&self, cursor: usize) -> DescriptorHandle {
        DescriptorHandle::new(
            Direction::FromDevice,
            self.id,
            Ring::<Fragment, N>::index(cursor) as u32,
        )
    }

    // =========================================================================
    // Client Side
    // =========================================================================

    /// Post one empty receive buffer at the end of the rings
    pub fn post_buffer(&mut self, address: u64, capacity: u32) -> DmaResult<()> {
        if self.fragments.client_owned() == 0 {
            return Err(DmaError::NoDescriptorsAvailable);
        }
        let cursor = self.fragments.end();
        *self.fragments.get_mut(cursor) = Fragment::buffer(address, capacity);
        self.advance_end(1)
    }

    /// Client slot at `cursor`, to be filled before [`advance_end`](Self::advance_end)
    pub fn fragment_mut(&mut self, cursor: usize) -> &mut Fragment {
        self.fragments.get_mut(cursor)
    }

    /// Hand `n` client-filled fragments to software
    pub fn advance_end(&mut self, n: usize) -> DmaResult<()> {
        if n > self.packets.client_owned() {
            return Err(DmaError::OutOfRange);
        }
        self.fragments.advance_end(n)?;
        let first = self.packets.end();
        for cursor in Ring::<Packet, N>::cursors(first, Ring::<Packet, N>::offset(first, n)) {
            *self.packets.get_mut(cursor) = Packet::new(cursor, 1);
        }
        self.packets.advance_end(n)
    }

    /// Packet at `cursor`
    pub fn packet(&self, cursor: usize) -> &Packet {
        self.packets.get(cursor)
    }

    /// Fragment at `cursor`
    pub fn fragment(&self, cursor: usize) -> &Fragment {
        self.fragments.get(cursor)
    }

    /// Packets retired by the call that produced `report`
    pub fn retired(&self, report: &AdvanceReport) -> impl Iterator<Item = (&Packet, &Fragment)> {
        let end = Ring::<Packet, N>::offset(report.first_retired, report.retired);
        Ring::<Packet, N>::cursors(report.first_retired, end).map(move |cursor| {
            let packet = self.packets.get(cursor);
            (packet, self.fragments.get(packet.fragment_index))
        })
    }

    // =========================================================================
    // Queue Operations
    // =========================================================================

    /// Enable the queue
    pub fn start<E: DescriptorEngine>(&mut self, engine: &mut E) {
        engine.set_notification_enabled(Direction::FromDevice, self.id, self.notifications);
        engine.start(Direction::FromDevice, self.id);
        self.state = QueueState::Started;
        #[cfg(feature = "log")]
        debug!("rx queue {} started", self.id);
        #[cfg(feature = "defmt")]
        defmt::debug!("rx queue {} started", self.id);
    }

    /// Disable the queue
    pub fn stop<E: DescriptorEngine>(&mut self, engine: &mut E) {
        engine.stop(Direction::FromDevice, self.id);
        self.state = QueueState::Stopped;
        #[cfg(feature = "log")]
        debug!("rx queue {} stopped", self.id);
        #[cfg(feature = "defmt")]
        defmt::debug!("rx queue {} stopped", self.id);
    }

    /// Request or suppress receive-completion interrupts
    pub fn set_notification_enabled<E: DescriptorEngine>(&mut self, engine: &mut E, enabled: bool) {
        self.notifications = enabled;
        engine.set_notification_enabled(Direction::FromDevice, self.id, enabled);
    }

    /// Retire completed receives, then program every posted buffer
    pub fn advance<E: DescriptorEngine>(&mut self, engine: &mut E) -> Result<AdvanceReport> {
        if self.state != QueueState::Started {
            return Err(IoError::InvalidState.into());
        }

        let mut report = AdvanceReport::starting_at(self.packets.begin());
        report.retired = self.retire(engine)?;

        for cursor in Ring::<Fragment, N>::cursors(self.fragments.next(), self.fragments.end()) {
            let segment = self.fragments.get(cursor).receive_segment();
            engine.program_descriptor(self.handle(cursor), &segment);
            fence(Ordering::Release);
            self.fragments.advance_next(1)?;
            self.packets.advance_next(1)?;
            report.programmed += 1;
        }

        Ok(report)
    }

    /// Retire what already completed, then drop everything still outstanding
    ///
    /// Dropped packets are marked `ignore` and both rings end up with
    /// `begin == next == end`. Never fails.
    pub fn cancel<E: DescriptorEngine>(&mut self, engine: &mut E) -> AdvanceReport {
        let mut report = AdvanceReport::starting_at(self.packets.begin());

        match self.retire(engine) {
            Ok(retired) => report.retired = retired,
            Err(_e) => {
                #[cfg(feature = "log")]
                warn!("rx queue {} retire during cancel failed: {}", self.id, _e);
                #[cfg(feature = "defmt")]
                defmt::warn!("rx queue {} retire during cancel failed: {}", self.id, _e);
            }
        }

        if let Err(_e) = engine.cancel(Direction::FromDevice, self.id) {
            #[cfg(feature = "log")]
            debug!("rx queue {} hardware abort: {}", self.id, _e);
            #[cfg(feature = "defmt")]
            defmt::debug!("rx queue {} hardware abort: {}", self.id, _e);
        }

        for cursor in Ring::<Fragment, N>::cursors(self.fragments.begin(), self.fragments.next()) {
            engine.retire(self.handle(cursor));
        }
        for cursor in Ring::<Packet, N>::cursors(self.packets.begin(), self.packets.end()) {
            *self.packets.get_mut(cursor) = Packet {
                ignore: true,
                ..Packet::new(cursor, 1)
            };
            self.fragments.get_mut(cursor).valid_length = 0;
        }

        let dropped = self.packets.drain();
        self.fragments.drain();
        report.retired += dropped;
        report.ignored += dropped;

        #[cfg(feature = "log")]
        debug!("rx queue {} cancelled, {} packets dropped", self.id, dropped);
        #[cfg(feature = "defmt")]
        defmt::debug!("rx queue {} cancelled, {} packets dropped", self.id, dropped);

        report
    }

    /// Walk `[begin, next)` in order and retire every finished fragment
    fn retire<E: DescriptorEngine>(&mut self, engine: &mut E) -> DmaResult<usize> {
        let mut retired = 0;

        for cursor in Ring::<Fragment, N>::cursors(self.fragments.begin(), self.fragments.next()) {
            let handle = self.handle(cursor);
            let fragment = self.fragments.get_mut(cursor);
            let error = match engine.poll(handle) {
                DescriptorStatus::InFlight => break,
                DescriptorStatus::Done { length } => {
                    fragment.valid_length = length.min(fragment.capacity);
                    None
                }
                DescriptorStatus::Failed(e) => {
                    #[cfg(feature = "log")]
                    warn!("rx queue {} slot {} failed: {}", self.id, handle.slot, e);
                    #[cfg(feature = "defmt")]
                    defmt::warn!("rx queue {} slot {} failed: {}", self.id, handle.slot, e);
                    fragment.valid_length = 0;
                    Some(e)
                }
            };
            fragment.offset = 0;
            fence(Ordering::Acquire);

            *self.packets.get_mut(cursor) = Packet {
                error,
                ..Packet::new(cursor, 1)
            };
            self.fragments.advance_begin(1)?;
            self.packets.advance_begin(1)?;
            engine.retire(handle);
            retired += 1;
        }

        Ok(retired)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::driver::error::Error;
    use crate::test_utils::MockEngine;
    use std::vec::Vec;

    fn started<const N: usize>(engine: &mut MockEngine) -> RxQueue<N> {
        let mut queue = RxQueue::new(0);
        queue.start(engine);
        queue
    }

    fn post<const N: usize>(queue: &mut RxQueue<N>, count: usize) {
        for i in 0..count {
            queue.post_buffer(0x1000 * (i as u64 + 1), 2048).unwrap();
        }
    }

    fn rings<const N: usize>(queue: &RxQueue<N>) -> [(usize, usize, usize); 2] {
        let f = queue.fragments();
        let p = queue.packets();
        [(f.begin(), f.next(), f.end()), (p.begin(), p.next(), p.end())]
    }

    #[test]
    fn advance_requires_started_queue() {
        let mut engine = MockEngine::new();
        let mut queue: RxQueue<4> = RxQueue::new(0);
        assert_eq!(queue.advance(&mut engine), Err(IoError::InvalidState.into()));

        queue.start(&mut engine);
        queue.stop(&mut engine);
        assert_eq!(queue.state(), QueueState::Stopped);
        assert_eq!(queue.advance(&mut engine), Err(IoError::InvalidState.into()));
    }

    #[test]
    fn empty_advance_is_idempotent() {
        let mut engine = MockEngine::new();
        let mut queue: RxQueue<4> = started(&mut engine);
        for _ in 0..3 {
            let report = queue.advance(&mut engine).unwrap();
            assert!(report.is_idle());
            assert_eq!(rings(&queue), [(0, 0, 0); 2]);
        }
        assert!(engine.programmed().is_empty());
    }

    #[test]
    fn advance_programs_posted_buffers() {
        let mut engine = MockEngine::new();
        let mut queue: RxQueue<4> = started(&mut engine);
        post(&mut queue, 3);

        let report = queue.advance(&mut engine).unwrap();
        assert_eq!(report.programmed, 3);
        assert_eq!(report.retired, 0);
        assert_eq!(rings(&queue), [(0, 3, 3); 2]);

        let programmed = engine.programmed();
        assert_eq!(programmed.len(), 3);
        assert_eq!(programmed[1].1.host_address, 0x2000);
        assert_eq!(programmed[1].1.length, 2048);
        assert_eq!(programmed[2].0.slot, 2);
    }

    #[test]
    fn scenario_single_fragment_receive() {
        let mut engine = MockEngine::new();
        let mut queue: RxQueue<4> = started(&mut engine);
        assert_eq!(rings(&queue), [(0, 0, 0); 2]);

        for cursor in 0..4 {
            *queue.fragment_mut(cursor) = Fragment::buffer(0x10_000 + cursor as u64 * 0x800, 0x800);
        }
        queue.advance_end(4).unwrap();
        queue.advance(&mut engine).unwrap();

        engine.complete_all(1500);
        let report = queue.advance(&mut engine).unwrap();

        assert_eq!(report.retired, 4);
        assert_eq!(report.ignored, 0);
        assert_eq!(rings(&queue), [(4, 4, 4); 2]);
        assert_eq!(Ring::<Packet, 4>::index(queue.packets().end()), 0);

        let delivered: Vec<_> = queue.retired(&report).collect();
        assert_eq!(delivered.len(), 4);
        for (i, (packet, fragment)) in delivered.iter().enumerate() {
            assert!(!packet.ignore);
            assert_eq!(packet.fragment_count, 1);
            assert_eq!(packet.fragment_index, i);
            assert_eq!(fragment.valid_length, 1500);
            assert_eq!(fragment.offset, 0);
        }
    }

    #[test]
    fn retire_stops_at_first_incomplete_slot() {
        let mut engine = MockEngine::new();
        let mut queue: RxQueue<8> = started(&mut engine);
        post(&mut queue, 4);
        queue.advance(&mut engine).unwrap();

        engine.complete(DescriptorHandle::new(Direction::FromDevice, 0, 0), 100);
        engine.complete(DescriptorHandle::new(Direction::FromDevice, 0, 2), 100);

        let report = queue.advance(&mut engine).unwrap();
        assert_eq!(report.retired, 1);
        assert_eq!(rings(&queue)[0], (1, 4, 4));
    }

    #[test]
    fn completion_length_is_clamped_to_capacity() {
        let mut engine = MockEngine::new();
        let mut queue: RxQueue<2> = started(&mut engine);
        queue.post_buffer(0x1000, 256).unwrap();
        queue.advance(&mut engine).unwrap();
        engine.complete_all(4096);

        let report = queue.advance(&mut engine).unwrap();
        let (_, fragment) = queue.retired(&report).next().unwrap();
        assert_eq!(fragment.valid_length, 256);
    }

    #[test]
    fn failed_descriptor_is_retired_with_error() {
        let mut engine = MockEngine::new();
        let mut queue: RxQueue<2> = started(&mut engine);
        post(&mut queue, 1);
        queue.advance(&mut engine).unwrap();
        engine.fail(
            DescriptorHandle::new(Direction::FromDevice, 0, 0),
            DmaError::FatalBusError.into(),
        );

        let report = queue.advance(&mut engine).unwrap();
        assert_eq!(report.retired, 1);
        assert_eq!(report.delivered(), 1);
        let (packet, _) = queue.retired(&report).next().unwrap();
        assert_eq!(packet.error, Some(Error::Dma(DmaError::FatalBusError)));
        assert!(!packet.is_delivered());
    }

    #[test]
    fn post_buffer_on_full_ring_fails() {
        let mut engine = MockEngine::new();
        let mut queue: RxQueue<2> = started(&mut engine);
        post(&mut queue, 2);
        assert_eq!(
            queue.post_buffer(0x9000, 64),
            Err(DmaError::NoDescriptorsAvailable)
        );
        assert_eq!(queue.advance_end(1), Err(DmaError::OutOfRange));
        assert_eq!(rings(&queue), [(0, 0, 2); 2]);
    }

    #[test]
    fn scenario_cancel_mid_flight() {
        let mut engine = MockEngine::new();
        let mut queue: RxQueue<8> = started(&mut engine);
        post(&mut queue, 5);
        queue.advance(&mut engine).unwrap();
        assert_eq!(rings(&queue), [(0, 5, 5); 2]);

        let report = queue.cancel(&mut engine);

        assert_eq!(report.retired, 5);
        assert_eq!(report.ignored, 5);
        assert_eq!(rings(&queue), [(5, 5, 5); 2]);
        assert!(queue.retired(&report).all(|(p, _)| p.ignore));

        // consistent and re-startable
        queue.stop(&mut engine);
        queue.start(&mut engine);
        post(&mut queue, 2);
        let report = queue.advance(&mut engine).unwrap();
        assert_eq!(report.programmed, 2);
        assert_eq!(rings(&queue), [(5, 7, 7); 2]);
    }

    #[test]
    fn cancel_reports_completed_packets_before_dropping() {
        let mut engine = MockEngine::new();
        let mut queue: RxQueue<8> = started(&mut engine);
        post(&mut queue, 3);
        queue.advance(&mut engine).unwrap();
        post(&mut queue, 1);
        engine.complete(DescriptorHandle::new(Direction::FromDevice, 0, 0), 60);

        let report = queue.cancel(&mut engine);
        assert_eq!(report.retired, 4);
        assert_eq!(report.ignored, 3);

        let flags: Vec<bool> = queue.retired(&report).map(|(p, _)| p.ignore).collect();
        assert_eq!(flags, [false, true, true, true]);
        assert_eq!(engine.cancels(), [(Direction::FromDevice, 0)]);
    }

    #[test]
    fn cancel_never_fails_without_hardware_abort() {
        let mut engine = MockEngine::new().with_cancel_supported(false);
        let mut queue: RxQueue<4> = started(&mut engine);
        post(&mut queue, 2);
        queue.advance(&mut engine).unwrap();

        let report = queue.cancel(&mut engine);
        assert_eq!(report.ignored, 2);
        assert!(queue.fragments().is_empty());
    }

    #[test]
    fn conservation_over_advance_and_cancel() {
        let mut engine = MockEngine::new();
        let mut queue: RxQueue<8> = started(&mut engine);
        let mut outstanding = 0usize;

        for round in 0..6 {
            let to_post = (round % 3) + 1;
            let room = queue.fragments().client_owned();
            post(&mut queue, to_post.min(room));
            outstanding += to_post.min(room);

            let report = queue.advance(&mut engine).unwrap();
            outstanding -= report.retired;
            assert_eq!(queue.packets().in_use(), outstanding);

            engine.complete_all(64);
            let report = if round == 3 {
                queue.cancel(&mut engine)
            } else {
                queue.advance(&mut engine).unwrap()
            };
            outstanding -= report.retired;
            assert_eq!(queue.packets().in_use(), outstanding);
            assert_eq!(queue.fragments().in_use(), outstanding);
        }
    }

    #[test]
    fn notification_toggle_reaches_engine_without_moving_cursors() {
        let mut engine = MockEngine::new();
        let mut queue: RxQueue<4> = started(&mut engine);
        post(&mut queue, 1);

        queue.set_notification_enabled(&mut engine, false);
        assert!(!queue.notifications_enabled());
        assert_eq!(rings(&queue), [(0, 0, 1); 2]);
        assert_eq!(
            engine.notifications().last(),
            Some(&(Direction::FromDevice, 0, false))
        );
    }
}
