//! Packet queues over a Fragment Ring + Packet Ring pair.
//!
//! - [`RxQueue`]: device-to-host, one fragment per packet, retire then program
//! - [`TxQueue`]: host-to-device, scatter-gather packets, program then retire
//!
//! Both queues take the [`DescriptorEngine`](crate::hal::DescriptorEngine)
//! by reference on every call. A queue is driven from one execution context
//! at a time; the engine only reads programmed slots and reports completion.

pub mod rx;
pub mod tx;

pub use rx::RxQueue;
pub use tx::TxQueue;

/// Queue lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum QueueState {
    /// Not accepting advances
    #[default]
    Stopped,
    /// Advances program and retire descriptors
    Started,
}

/// What one `advance` or `cancel` call did.
///
/// Retired packets occupy the Packet Ring cursors
/// `[first_retired, first_retired + retired)` and stay readable until the
/// client posts new work over them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AdvanceReport {
    /// Packet Ring cursor of the first retired packet
    pub first_retired: usize,
    /// Packets handed back to the client, ignored ones included
    pub retired: usize,
    /// Retired packets marked `ignore`
    pub ignored: usize,
    /// Packets programmed into the engine
    pub programmed: usize,
}

impl AdvanceReport {
    pub(crate) const fn starting_at(first_retired: usize) -> Self {
        Self {
            first_retired,
            retired: 0,
            ignored: 0,
            programmed: 0,
        }
    }

    /// Retired packets that were not ignored
    #[must_use]
    pub const fn delivered(&self) -> usize {
        self.retired - self.ignored
    }

    /// True when the call moved no cursor
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        self.retired == 0 && self.programmed == 0
    }
}
