//! Tracks which inputs and outputs of an in-flight exit take part in the exit.
//!
//! An in-flight exit exits nothing by itself. The owner of each input or output has to
//! *piggyback* it to claim its value. The [`ExitMap`] records per slot whether it was piggybacked
//! and whether it was already finalized; it outlives the clearing of the exit as the audit record
//! of what the exit paid out.

use std::fmt;

use plasma_primitives::{
    constants::NUM_TXOS,
    types::{Address, Amount},
};
use serde::{Deserialize, Serialize};

use crate::errors::{ExitGameError, ExitGameResult};

/// An input or output slot of an in-flight transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    /// The input with this index.
    Input(usize),

    /// The output with this index.
    Output(usize),
}

impl Slot {
    /// Creates an input slot, checking the index.
    pub fn input(index: usize) -> ExitGameResult<Self> {
        Self::Input(index).validated()
    }

    /// Creates an output slot, checking the index.
    pub fn output(index: usize) -> ExitGameResult<Self> {
        Self::Output(index).validated()
    }

    fn validated(self) -> ExitGameResult<Self> {
        if self.index() < NUM_TXOS {
            Ok(self)
        } else {
            Err(ExitGameError::InvalidSlot(self))
        }
    }

    /// Every slot: the inputs followed by the outputs.
    pub fn all() -> impl Iterator<Item = Slot> {
        (0..NUM_TXOS)
            .map(Slot::Input)
            .chain((0..NUM_TXOS).map(Slot::Output))
    }

    /// The index within the inputs or outputs.
    pub const fn index(&self) -> usize {
        match self {
            Slot::Input(index) | Slot::Output(index) => *index,
        }
    }

    /// The index of this slot in the exit map and in per-slot arrays.
    ///
    /// Inputs take `0..4`, outputs `4..8`.
    pub const fn position(&self) -> usize {
        match self {
            Slot::Input(index) => *index,
            Slot::Output(index) => NUM_TXOS + *index,
        }
    }

    /// Out-of-range slots map to no bit.
    const fn bit(&self) -> u8 {
        match 1u8.checked_shl(self.position() as u32) {
            Some(bit) if self.index() < NUM_TXOS => bit,
            _ => 0,
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Input(index) => write!(f, "input {index}"),
            Slot::Output(index) => write!(f, "output {index}"),
        }
    }
}

/// Who piggybacked a slot and the bond they posted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PiggybackClaim {
    /// The owner of the slot, who receives its value and the bond back.
    pub claimant: Address,

    /// The posted bond.
    pub bond: Amount,
}

/// Participation of the eight slots of an in-flight exit.
///
/// Each slot is in one of three states:
///
/// | piggybacked | finalized | state |
/// |---|---|---|
/// | 0 | 0 | not participating |
/// | 1 | 0 | piggybacked, pending |
/// | 1 | 1 | finalized (paid or blocked) |
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitMap {
    piggybacked: u8,
    finalized: u8,
}

impl ExitMap {
    /// Whether the slot was ever piggybacked.
    pub const fn is_piggybacked(&self, slot: Slot) -> bool {
        self.piggybacked & slot.bit() != 0
    }

    /// Whether the slot was finalized.
    pub const fn is_finalized(&self, slot: Slot) -> bool {
        self.finalized & slot.bit() != 0
    }

    /// Whether the slot was piggybacked and still waits for finalization.
    pub const fn is_pending(&self, slot: Slot) -> bool {
        self.is_piggybacked(slot) && !self.is_finalized(slot)
    }

    /// Marks the slot as piggybacked.
    pub fn set_piggybacked(&mut self, slot: Slot) {
        self.piggybacked |= slot.bit();
    }

    /// Marks a piggybacked slot as finalized.
    pub fn set_finalized(&mut self, slot: Slot) {
        debug_assert!(self.is_piggybacked(slot), "only piggybacked slots finalize");
        self.finalized |= slot.bit();
    }

    /// Whether every piggybacked slot was finalized. Vacuously true without piggybacks.
    pub const fn all_finalized(&self) -> bool {
        self.piggybacked & !self.finalized == 0
    }

    /// Whether no slot was ever piggybacked.
    pub const fn is_empty(&self) -> bool {
        self.piggybacked == 0
    }

    /// The slots waiting for finalization.
    pub fn pending_slots(&self) -> impl Iterator<Item = Slot> + '_ {
        Slot::all().filter(|slot| self.is_pending(*slot))
    }

    /// Whether input `index` is piggybacked and not yet finalized.
    pub const fn input_piggybacked(&self, index: usize) -> bool {
        self.is_pending(Slot::Input(index))
    }

    /// Whether output `index` is piggybacked and not yet finalized.
    pub const fn output_piggybacked(&self, index: usize) -> bool {
        self.is_pending(Slot::Output(index))
    }

    /// Whether input `index` was finalized and can no longer exit.
    pub const fn input_blocked(&self, index: usize) -> bool {
        self.is_finalized(Slot::Input(index))
    }

    /// Whether output `index` was finalized and can no longer exit.
    pub const fn output_blocked(&self, index: usize) -> bool {
        self.is_finalized(Slot::Output(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_bounds() {
        assert_eq!(Slot::input(3), Ok(Slot::Input(3)));
        assert_eq!(
            Slot::output(NUM_TXOS),
            Err(ExitGameError::InvalidSlot(Slot::Output(NUM_TXOS)))
        );
        assert_eq!(Slot::Output(1).position(), NUM_TXOS + 1);
        assert_eq!(Slot::all().count(), 2 * NUM_TXOS);
    }

    #[test]
    fn test_slot_lifecycle() {
        let mut map = ExitMap::default();
        let slot = Slot::Output(2);

        assert!(map.is_empty());
        assert!(map.all_finalized());
        assert!(!map.output_piggybacked(2));

        map.set_piggybacked(slot);
        assert!(map.output_piggybacked(2));
        assert!(!map.output_blocked(2));
        assert!(!map.input_piggybacked(2), "inputs and outputs are separate");
        assert!(!map.all_finalized());
        assert_eq!(map.pending_slots().collect::<Vec<_>>(), vec![slot]);

        map.set_finalized(slot);
        assert!(!map.output_piggybacked(2));
        assert!(map.output_blocked(2));
        assert!(map.is_piggybacked(slot), "history is kept");
        assert!(map.all_finalized());
        assert!(!map.is_empty());
    }

    #[test]
    fn test_partial_finalization() {
        let mut map = ExitMap::default();
        map.set_piggybacked(Slot::Input(0));
        map.set_piggybacked(Slot::Output(1));

        map.set_finalized(Slot::Output(1));

        assert!(!map.all_finalized());
        assert!(map.input_piggybacked(0));
        assert!(map.output_blocked(1));
        assert_eq!(map.pending_slots().collect::<Vec<_>>(), vec![Slot::Input(0)]);
    }
}
