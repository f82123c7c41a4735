//! Transmit queue.
//!
//! A packet may span several consecutive fragments (scatter-gather). The
//! Packet Ring counts packets, the Fragment Ring counts descriptors, and
//! every cursor move on the Fragment Ring is by the packet's
//! `fragment_count`.

use core::sync::atomic::{Ordering, fence};

#[cfg(feature = "log")]
use log::{debug, warn};

use super::{AdvanceReport, QueueState};
use crate::driver::config::Direction;
use crate::driver::error::{DmaError, DmaResult, Error, IoError, Result};
use crate::hal::{DescriptorEngine, DescriptorHandle, DescriptorStatus};
use crate::ring::{Fragment, Packet, Ring};

/// Transmit queue with `F` fragment slots and `P` packet slots.
#[derive(Debug)]
pub struct TxQueue<const F: usize, const P: usize> {
    id: u16,
    state: QueueState,
    notifications: bool,
    fragments: Ring<Fragment, F>,
    packets: Ring<Packet, P>,
}

impl<const F: usize, const P: usize> TxQueue<F, P> {
    /// Create a stopped queue with empty rings
    #[must_use]
    pub const fn new(id: u16) -> Self {
        Self {
            id,
            state: QueueState::Stopped,
            notifications: true,
            fragments: Ring::from_array([Fragment::EMPTY; F]),
            packets: Ring::from_array([Packet::EMPTY; P]),
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

    /// True when end-of-transmit interrupts are requested
    pub const fn notifications_enabled(&self) -> bool {
        self.notifications
    }

    /// Fragment Ring
    pub const fn fragments(&self) -> &Ring<Fragment, F> {
        &self.fragments
    }

    /// Packet Ring
    pub const fn packets(&self) -> &Ring<Packet, P> {
        &self.packets
    }

    fn handle(&self, fragment_cursor: usize) -> DescriptorHandle {
        DescriptorHandle::new(
            Direction::ToDevice,
            self.id,
            Ring::<Fragment, F>::index(fragment_cursor) as u32,
        )
    }

    fn fragment_cursors(packet: &Packet) -> crate::ring::Cursors<F> {
        let start = packet.fragment_index;
        Ring::<Fragment, F>::cursors(
            start,
            Ring::<Fragment, F>::offset(start, packet.fragment_count as usize),
        )
    }

    // =========================================================================
    // Client Side
    // =========================================================================

    /// Queue one packet made of `fragments`, returning its Packet Ring cursor
    ///
    /// Nothing is written unless both rings have room.
    pub fn queue_packet(&mut self, fragments: &[Fragment]) -> DmaResult<usize> {
        if fragments.is_empty() || fragments.len() > usize::from(u16::MAX) {
            return Err(DmaError::InvalidLength);
        }
        if fragments.len() > self.fragments.client_owned() || self.packets.client_owned() == 0 {
            return Err(DmaError::NoDescriptorsAvailable);
        }

        let first = self.fragments.end();
        for (i, fragment) in fragments.iter().enumerate() {
            *self.fragments.get_mut(Ring::<Fragment, F>::offset(first, i)) = *fragment;
        }
        self.fragments.advance_end(fragments.len())?;

        let cursor = self.packets.end();
        *self.packets.get_mut(cursor) = Packet::new(first, fragments.len() as u16);
        self.packets.advance_end(1)?;
        Ok(cursor)
    }

    /// Packet at `cursor`
    pub fn packet(&self, cursor: usize) -> &Packet {
        self.packets.get(cursor)
    }

    /// Packets retired by the call that produced `report`
    pub fn retired(&self, report: &AdvanceReport) -> impl Iterator<Item = &Packet> {
        let end = Ring::<Packet, P>::offset(report.first_retired, report.retired);
        Ring::<Packet, P>::cursors(report.first_retired, end).map(move |c| self.packets.get(c))
    }

    // =========================================================================
    // Queue Operations
    // =========================================================================

    /// Enable the queue
    pub fn start<E: DescriptorEngine>(&mut self, engine: &mut E) {
        engine.set_notification_enabled(Direction::ToDevice, self.id, self.notifications);
        engine.start(Direction::ToDevice, self.id);
        self.state = QueueState::Started;
        #[cfg(feature = "log")]
        debug!("tx queue {} started", self.id);
        #[cfg(feature = "defmt")]
        defmt::debug!("tx queue {} started", self.id);
    }

    /// Disable the queue
    pub fn stop<E: DescriptorEngine>(&mut self, engine: &mut E) {
        engine.stop(Direction::ToDevice, self.id);
        self.state = QueueState::Stopped;
        #[cfg(feature = "log")]
        debug!("tx queue {} stopped", self.id);
        #[cfg(feature = "defmt")]
        defmt::debug!("tx queue {} stopped", self.id);
    }

    /// Request or suppress end-of-transmit interrupts
    pub fn set_notification_enabled<E: DescriptorEngine>(&mut self, engine: &mut E, enabled: bool) {
        self.notifications = enabled;
        engine.set_notification_enabled(Direction::ToDevice, self.id, enabled);
    }

    /// Program every queued packet, then retire finished transmissions
    pub fn advance<E: DescriptorEngine>(&mut self, engine: &mut E) -> Result<AdvanceReport> {
        if self.state != QueueState::Started {
            return Err(IoError::InvalidState.into());
        }

        let mut report = AdvanceReport::starting_at(self.packets.begin());

        for cursor in Ring::<Packet, P>::cursors(self.packets.next(), self.packets.end()) {
            let packet = *self.packets.get(cursor);
            let count = usize::from(packet.fragment_count);
            if packet.fragment_index != self.fragments.next()
                || count > self.fragments.software_owned()
            {
                return Err(DmaError::OutOfRange.into());
            }

            for fragment_cursor in Self::fragment_cursors(&packet) {
                let segment = self.fragments.get(fragment_cursor).transmit_segment();
                engine.program_descriptor(self.handle(fragment_cursor), &segment);
            }
            fence(Ordering::Release);
            self.fragments.advance_next(count)?;
            self.packets.advance_next(1)?;
            report.programmed += 1;
        }

        report.retired = self.retire(engine)?;
        Ok(report)
    }

    /// Abort in-flight work if the engine can, then retire what finished
    ///
    /// When the abort is accepted every packet still outstanding is marked
    /// `ignore` and both rings end up with `begin == next == end`. Without
    /// abort support, in-flight packets stay owned by hardware and retire on
    /// a later advance. Never fails.
    pub fn cancel<E: DescriptorEngine>(&mut self, engine: &mut E) -> AdvanceReport {
        let aborted = match engine.cancel(Direction::ToDevice, self.id) {
            Ok(()) => true,
            Err(_e) => {
                #[cfg(feature = "log")]
                debug!("tx queue {} hardware abort: {}", self.id, _e);
                #[cfg(feature = "defmt")]
                defmt::debug!("tx queue {} hardware abort: {}", self.id, _e);
                false
            }
        };

        let mut report = AdvanceReport::starting_at(self.packets.begin());
        match self.retire(engine) {
            Ok(retired) => report.retired = retired,
            Err(_e) => {
                #[cfg(feature = "log")]
                warn!("tx queue {} retire during cancel failed: {}", self.id, _e);
                #[cfg(feature = "defmt")]
                defmt::warn!("tx queue {} retire during cancel failed: {}", self.id, _e);
            }
        }

        if aborted {
            for cursor in Ring::<Packet, P>::cursors(self.packets.begin(), self.packets.next()) {
                for fragment_cursor in Self::fragment_cursors(self.packets.get(cursor)) {
                    engine.retire(self.handle(fragment_cursor));
                }
            }
            for cursor in Ring::<Packet, P>::cursors(self.packets.begin(), self.packets.end()) {
                self.packets.get_mut(cursor).ignore = true;
            }
            let dropped = self.packets.drain();
            self.fragments.drain();
            report.retired += dropped;
            report.ignored += dropped;

            #[cfg(feature = "log")]
            debug!("tx queue {} cancelled, {} packets dropped", self.id, dropped);
            #[cfg(feature = "defmt")]
            defmt::debug!("tx queue {} cancelled, {} packets dropped", self.id, dropped);
        }

        report
    }

    /// Walk `[begin, next)` of the Packet Ring and retire every packet whose
    /// fragments have all finished
    fn retire<E: DescriptorEngine>(&mut self, engine: &mut E) -> DmaResult<usize> {
        let mut retired = 0;

        'packets: for cursor in Ring::<Packet, P>::cursors(self.packets.begin(), self.packets.next())
        {
            let packet = *self.packets.get(cursor);
            let mut error: Option<Error> = None;

            for fragment_cursor in Self::fragment_cursors(&packet) {
                match engine.poll(self.handle(fragment_cursor)) {
                    DescriptorStatus::InFlight => break 'packets,
                    DescriptorStatus::Done { .. } => {}
                    DescriptorStatus::Failed(e) => {
                        error.get_or_insert(e);
                    }
                }
            }
            fence(Ordering::Acquire);

            if let Some(_e) = error {
                #[cfg(feature = "log")]
                warn!("tx queue {} packet {} failed: {}", self.id, cursor, _e);
                #[cfg(feature = "defmt")]
                defmt::warn!("tx queue {} packet {} failed: {}", self.id, cursor, _e);
            }
            for fragment_cursor in Self::fragment_cursors(&packet) {
                engine.retire(self.handle(fragment_cursor));
            }
            self.packets.get_mut(cursor).error = error;
            self.fragments.advance_begin(usize::from(packet.fragment_count))?;
            self.packets.advance_begin(1)?;
            retired += 1;
        }

        Ok(retired)
    }
}

// =============================================================================
// Tests
// =============================================================================
