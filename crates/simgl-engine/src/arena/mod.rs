//! Slot-indexed storage with stable indices.

mod fixed_list;

pub use fixed_list::{ArenaError, FixedList, SlotIndex};
