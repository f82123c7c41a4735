//! Multi-buffer transfer pipeline.
//!
//! Keeps `K` buffers in flight on one channel: prime with `K` submits,
//! then repeatedly wait on the oldest transfer and resubmit its buffer,
//! and finally drain. Since a channel retires in submission order, the
//! oldest transfer is always the next one to finish.

#[cfg(feature = "log")]
use log::warn;

use super::buffer::DmaBuffer;
use super::config::ChannelId;
use super::connection::TransferPort;
use super::error::Result;
use super::status::TransferStatus;
use crate::internal::constants::MIN_PIPELINE_DEPTH;

/// Totals of one pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PipelineStats {
    /// Transfers completed
    pub transfers: usize,
    /// Bytes moved
    pub bytes: u64,
}

/// `K` buffers cycling through one channel.
#[derive(Debug)]
pub struct Pipeline<B, const K: usize> {
    channel: ChannelId,
    device_address: u64,
    length: usize,
    statuses: [TransferStatus<B>; K],
}

impl<B: DmaBuffer, const K: usize> Pipeline<B, K> {
    const DEPTH_CHECK: () = assert!(
        K >= MIN_PIPELINE_DEPTH,
        "pipeline needs at least three buffers"
    );

    /// Pipeline moving `length` bytes per buffer to or from `device_address`
    pub fn new(channel: ChannelId, buffers: [B; K], device_address: u64, length: usize) -> Self {
        let () = Self::DEPTH_CHECK;
        Self {
            channel,
            device_address,
            length,
            statuses: buffers.map(TransferStatus::new),
        }
    }

    /// Per-buffer statuses
    pub fn statuses(&self) -> &[TransferStatus<B>; K] {
        &self.statuses
    }

    /// Give the statuses, and with them the buffers, back
    pub fn into_statuses(self) -> [TransferStatus<B>; K] {
        self.statuses
    }

    /// Run `total` transfers through `port`
    ///
    /// `on_complete` sees each finished transfer in order together with its
    /// status, whose buffer may be read or refilled before it is submitted
    /// again. On the first error every transfer still in flight is waited
    /// out, and the error is returned.
    pub fn run<P, F>(
        &mut self,
        port: &mut P,
        total: usize,
        mut on_complete: F,
    ) -> Result<PipelineStats>
    where
        P: TransferPort<B>,
        F: FnMut(usize, &mut TransferStatus<B>),
    {
        let mut stats = PipelineStats::default();
        let mut issued = 0;

        while issued < total.min(K) {
            if let Err(e) = self.submit(port, issued % K) {
                self.drain(port);
                return Err(e);
            }
            issued += 1;
        }

        while stats.transfers < total {
            let slot = stats.transfers % K;
            let bytes = match port.wait(&mut self.statuses[slot]) {
                Ok(bytes) => bytes,
                Err(e) => {
                    #[cfg(feature = "log")]
                    warn!("pipeline transfer {} failed: {}", stats.transfers, e);
                    #[cfg(feature = "defmt")]
                    defmt::warn!("pipeline transfer {} failed: {}", stats.transfers, e);
                    self.drain(port);
                    return Err(e);
                }
            };
            on_complete(stats.transfers, &mut self.statuses[slot]);
            stats.transfers += 1;
            stats.bytes += bytes as u64;

            if issued < total {
                if let Err(e) = self.submit(port, slot) {
                    self.drain(port);
                    return Err(e);
                }
                issued += 1;
            }
        }

        Ok(stats)
    }

    fn submit<P: TransferPort<B>>(&mut self, port: &mut P, slot: usize) -> Result<()> {
        port.submit(
            self.channel,
            &mut self.statuses[slot],
            0,
            self.device_address,
            self.length,
        )
        .map(|_| ())
    }

    fn drain<P: TransferPort<B>>(&mut self, port: &mut P) {
        for status in self.statuses.iter_mut().filter(|status| status.is_pending()) {
            let _ = port.wait(status);
        }
    }
}
