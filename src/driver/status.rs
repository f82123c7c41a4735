//! Per-transfer status objects.

use super::buffer::DmaBuffer;
use super::config::ChannelId;
use super::error::{Error, IoError, Result};

/// Lifecycle of one transfer status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransferState {
    /// Never submitted
    #[default]
    Idle,
    /// Submitted and not yet retired
    Pending,
    /// Retired without error
    Complete,
    /// Retired with an error, or aborted
    Failed(Error),
}

/// Immediate outcome of a submit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Submitted {
    /// Engine still owns the transfer; call `wait`
    Pending,
    /// Engine finished synchronously
    Complete,
}

/// Locates a submitted transfer inside its channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Ticket {
    /// Channel the transfer was submitted on
    pub channel: ChannelId,
    /// Ring cursor of the transfer slot
    pub cursor: usize,
    /// Channel-local submission number
    pub sequence: u32,
    /// Configuration epoch of the channel at submit time
    pub epoch: u32,
}

/// Caller-owned status of one transfer, together with its buffer.
///
/// The status owns the buffer for good. While the transfer is pending
/// the buffer cannot be reached; once it is complete or failed the buffer
/// can be read, refilled and submitted again.
#[derive(Debug)]
pub struct TransferStatus<B> {
    buffer: B,
    state: TransferState,
    bytes_transferred: usize,
    ticket: Option<Ticket>,
}

impl<B: DmaBuffer> TransferStatus<B> {
    /// Wrap `buffer` in an idle status
    pub const fn new(buffer: B) -> Self {
        Self {
            buffer,
            state: TransferState::Idle,
            bytes_transferred: 0,
            ticket: None,
        }
    }

    /// Current state
    pub const fn state(&self) -> TransferState {
        self.state
    }

    /// True while the engine may access the buffer
    pub const fn is_pending(&self) -> bool {
        matches!(self.state, TransferState::Pending)
    }

    /// Bytes moved by the last completed transfer
    pub const fn bytes_transferred(&self) -> usize {
        self.bytes_transferred
    }

    /// Error of the last failed transfer
    pub const fn error(&self) -> Option<Error> {
        match self.state {
            TransferState::Failed(e) => Some(e),
            _ => None,
        }
    }

    /// Ticket of the outstanding transfer
    pub const fn ticket(&self) -> Option<Ticket> {
        self.ticket
    }

    /// Terminal outcome, `None` while idle or pending
    pub const fn outcome(&self) -> Option<Result<usize>> {
        match self.state {
            TransferState::Complete => Some(Ok(self.bytes_transferred)),
            TransferState::Failed(e) => Some(Err(e)),
            TransferState::Idle | TransferState::Pending => None,
        }
    }

    /// Buffer, unless a transfer is pending
    pub fn buffer(&self) -> Option<&B> {
        (!self.is_pending()).then_some(&self.buffer)
    }

    /// Mutable buffer, unless a transfer is pending
    pub fn buffer_mut(&mut self) -> Option<&mut B> {
        if self.is_pending() {
            None
        } else {
            Some(&mut self.buffer)
        }
    }

    /// Take the buffer back, or get the status back while pending
    pub fn into_buffer(self) -> core::result::Result<B, Self> {
        if self.is_pending() {
            Err(self)
        } else {
            Ok(self.buffer)
        }
    }

    // =========================================================================
    // Driver Side
    // =========================================================================

    /// Buffer for submission; the caller marks the status pending next
    pub(crate) fn dma_buffer(&self) -> &B {
        &self.buffer
    }

    pub(crate) fn mark_pending(&mut self, ticket: Ticket) {
        self.state = TransferState::Pending;
        self.bytes_transferred = 0;
        self.ticket = Some(ticket);
    }

    /// Store a terminal outcome and forget the ticket
    pub(crate) fn finish(&mut self, outcome: Result<usize>) -> Result<usize> {
        match outcome {
            Ok(bytes) => {
                self.state = TransferState::Complete;
                self.bytes_transferred = bytes;
            }
            Err(e) => {
                self.state = TransferState::Failed(e);
                self.bytes_transferred = 0;
            }
        }
        self.ticket = None;
        outcome
    }

    /// Mark a pending transfer aborted
    pub(crate) fn abort(&mut self) -> Result<usize> {
        self.finish(Err(IoError::Aborted.into()))
    }
}
