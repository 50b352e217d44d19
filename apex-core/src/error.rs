//! Errors of the replay core.
use thiserror::Error;

/// Errors raised by the replay buffer and the priority tree.
#[derive(Debug, Error, PartialEq)]
pub enum ApexError {
    /// A slot index outside `[0, capacity)` was given.
    ///
    /// This indicates an index bookkeeping bug in the caller and is not
    /// expected to occur during normal operation.
    #[error("slot {slot} is out of range for capacity {capacity}")]
    InvalidSlot {
        /// The offending slot index.
        slot: usize,

        /// Capacity of the buffer or tree.
        capacity: usize,
    },

    /// The buffer does not yet hold enough transitions to learn from.
    ///
    /// Recoverable: the caller retries after more data arrives.
    #[error("buffer holds {len} transitions, fewer than the required minimum of {min}")]
    InsufficientData {
        /// Current number of stored transitions.
        len: usize,

        /// Minimum number of transitions required for sampling.
        min: usize,
    },

    /// An episode exceeded the configured horizon of a local buffer.
    #[error("local buffer is full: episode exceeded the horizon of {horizon} steps")]
    HorizonExceeded {
        /// Maximum number of steps per episode.
        horizon: usize,
    },
}
