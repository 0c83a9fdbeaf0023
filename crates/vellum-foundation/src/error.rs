use crate::lazy::{ItemKey, SlotId};

/// Errors surfaced by explicit engine calls.
///
/// Conditions that arise on their own while the list runs (zero
/// measurements, stale reports, invalid settings) are recovered silently and
/// never show up here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridError {
    IndexOutOfBounds { index: usize, len: usize },
    UnknownSlot { slot: SlotId },
    SlotAlreadyBound { slot: SlotId },
    KeyAlreadyBound { key: ItemKey, slot: SlotId },
}

impl std::fmt::Display for GridError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GridError::IndexOutOfBounds { index, len } => {
                write!(f, "item index {index} out of bounds for {len} items")
            }
            GridError::UnknownSlot { slot } => write!(f, "container {slot} is not in the pool"),
            GridError::SlotAlreadyBound { slot } => {
                write!(f, "container {slot} is already bound to an item")
            }
            GridError::KeyAlreadyBound { key, slot } => {
                write!(f, "item key {key} is already bound to container {slot}")
            }
        }
    }
}

impl std::error::Error for GridError {}
