//! Machine construction errors.

use thiserror::Error;

/// Why an Apple II could not be built from its configuration.
///
/// These only come out of construction. Once a machine exists, stepping
/// it cannot fail.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Apple2Error {
    #[error("system ROM is {actual} bytes, this model needs {expected}")]
    RomSize { expected: usize, actual: usize },

    #[error("slot {slot} ROM is {actual} bytes, expected {expected}")]
    SlotRomSize {
        slot: u8,
        expected: usize,
        actual: usize,
    },

    #[error("slot {0} does not exist (cards go in slots 1-7)")]
    InvalidSlot(u8),

    #[error("slot {0} already has a card")]
    SlotOccupied(u8),
}
