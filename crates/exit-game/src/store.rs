//! The record store: one [`StandardExit`] per exited output and one [`InFlightExit`] per
//! in-flight-exited transaction.
//!
//! Records are never removed. Finalizing or challenging an exit zeroes its value-bearing fields and
//! moves it to a terminal [`ExitStatus`], so that the same output can never be exited again and
//! stale queue entries can be recognized.

use std::collections::{BTreeMap, BTreeSet};

use plasma_primitives::{
    constants::NUM_TXOS,
    tx::TxOutput,
    types::{Address, Amount, Timestamp, TxHash},
    utxo::{TxPos, UtxoPos},
};
use serde::{Deserialize, Serialize};

use crate::{
    errors::{ExitGameError, ExitGameResult},
    piggyback::{ExitMap, PiggybackClaim, Slot},
    queue::ExitId,
};

/// The lifecycle stage of an exit record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitStatus {
    /// The exit waits in a queue.
    #[default]
    Active,

    /// The exit paid out.
    Finalized,

    /// The exit was proven invalid.
    Challenged,
}

/// The exit of a single output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandardExit {
    /// The owner of the exited output.
    pub owner: Address,

    /// The token of the exited output.
    pub token: Address,

    /// The value of the exited output.
    pub amount: Amount,

    /// The time at which the exit matures.
    pub exitable_at: Timestamp,

    /// The exited output, which is also the priority of the exit.
    pub position: UtxoPos,

    /// Who gets the bond back.
    pub bond_owner: Address,

    /// The posted bond, in the native token.
    pub bond: Amount,

    /// The lifecycle stage.
    pub status: ExitStatus,
}

impl StandardExit {
    /// Whether the exit still waits to be finalized.
    pub fn is_active(&self) -> bool {
        self.status == ExitStatus::Active
    }

    /// Zeroes every value-bearing field and moves the exit to `status`.
    fn clear(&mut self, status: ExitStatus) {
        self.owner = Address::NULL;
        self.token = Address::NULL;
        self.amount = 0;
        self.bond_owner = Address::NULL;
        self.bond = 0;
        self.status = status;
    }
}

/// The oldest known transaction competing with an in-flight transaction for one of its inputs.
///
/// Competitors included in the child chain order by their inclusion position and are older than
/// any competitor that was never included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Competitor {
    /// A competitor included at this position.
    Included(TxPos),

    /// A competitor that is itself in flight.
    InFlight,
}

/// The exit of a transaction that may or may not have been included in the child chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InFlightExit {
    /// Who gets the in-flight exit bond once the exit clears.
    pub bond_owner: Address,

    /// The posted bond, in the native token.
    pub bond: Amount,

    /// When the exit was started.
    pub exit_start_timestamp: Timestamp,

    /// The time at which the exit matures.
    pub exitable_at: Timestamp,

    /// The youngest input of the transaction, which is the priority of the exit.
    pub position: UtxoPos,

    /// The oldest competing transaction, if the transaction was challenged.
    pub oldest_competitor: Option<Competitor>,

    /// Where the transaction itself is included, once proven in a challenge response.
    pub tx_position: Option<TxPos>,

    /// The outputs spent by every input slot.
    pub input_positions: [UtxoPos; NUM_TXOS],

    /// The outputs spent by the transaction, as they were when it was exited.
    pub inputs: [TxOutput; NUM_TXOS],

    /// The outputs of the transaction.
    pub outputs: [TxOutput; NUM_TXOS],

    /// Which slots take part in the exit. Survives clearing.
    pub exit_map: ExitMap,

    /// The claim on every piggybacked slot, indexed by [`Slot::position`].
    pub piggybacks: [Option<PiggybackClaim>; 2 * NUM_TXOS],

    /// The tokens whose queue holds an entry for this exit.
    pub enqueued_tokens: BTreeSet<Address>,

    /// The lifecycle stage.
    pub status: ExitStatus,
}

impl InFlightExit {
    /// Whether the exit still waits to be finalized.
    pub fn is_active(&self) -> bool {
        self.status == ExitStatus::Active
    }

    /// Whether the transaction is canonical, i.e. it won every known double-spend race.
    ///
    /// The outputs of a canonical transaction exit; the inputs of a non-canonical one do.
    pub fn is_canonical(&self) -> bool {
        match (self.oldest_competitor, self.tx_position) {
            (None, _) => true,
            (Some(oldest), Some(position)) => Competitor::Included(position) < oldest,
            (Some(_), None) => false,
        }
    }

    /// Whether a piggyback on `slot` is paid its value rather than only its bond.
    pub fn slot_wins(&self, slot: Slot) -> bool {
        match slot {
            Slot::Input(_) => !self.is_canonical(),
            Slot::Output(_) => self.is_canonical(),
        }
    }

    /// The input or output in `slot`.
    pub fn slot(&self, slot: Slot) -> &TxOutput {
        match slot {
            Slot::Input(index) => &self.inputs[index],
            Slot::Output(index) => &self.outputs[index],
        }
    }

    fn slot_mut(&mut self, slot: Slot) -> &mut TxOutput {
        match slot {
            Slot::Input(index) => &mut self.inputs[index],
            Slot::Output(index) => &mut self.outputs[index],
        }
    }

    /// The claim on `slot`, if it was piggybacked.
    pub fn claim(&self, slot: Slot) -> Option<&PiggybackClaim> {
        self.piggybacks[slot.position()].as_ref()
    }

    /// Records a piggyback on `slot`.
    pub(crate) fn piggyback(&mut self, slot: Slot, claim: PiggybackClaim) {
        self.exit_map.set_piggybacked(slot);
        self.piggybacks[slot.position()] = Some(claim);
    }

    /// Marks `slot` as finalized and zeroes its data.
    pub(crate) fn finalize_slot(&mut self, slot: Slot) {
        self.exit_map.set_finalized(slot);
        *self.slot_mut(slot) = TxOutput::NULL;
    }

    /// Clears the exit once every piggybacked slot is finalized. The exit map is kept.
    pub(crate) fn clear(&mut self) {
        self.bond_owner = Address::NULL;
        self.bond = 0;
        self.exit_start_timestamp = 0;
        self.exitable_at = 0;
        self.position = UtxoPos::NULL;
        self.oldest_competitor = None;
        self.tx_position = None;
        self.inputs = [TxOutput::NULL; NUM_TXOS];
        self.outputs = [TxOutput::NULL; NUM_TXOS];
        self.status = ExitStatus::Finalized;
    }
}

/// Exclusive owner of every exit record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitStore {
    standard: BTreeMap<UtxoPos, StandardExit>,
    in_flight: BTreeMap<TxHash, InFlightExit>,
}

impl ExitStore {
    /// The standard exit of the output at `pos`, in any status.
    pub fn standard_exit(&self, pos: &UtxoPos) -> Option<&StandardExit> {
        self.standard.get(pos)
    }

    /// Stores a new standard exit.
    ///
    /// Fails if the output was ever exited before, whatever happened to that exit.
    pub fn insert_standard_exit(&mut self, exit: StandardExit) -> ExitGameResult<()> {
        if self.standard.contains_key(&exit.position) {
            return Err(ExitGameError::ExitAlreadyStarted(ExitId::Standard(
                exit.position,
            )));
        }

        self.standard.insert(exit.position, exit);

        Ok(())
    }

    /// Clears an active standard exit as finalized and returns it as it was before.
    pub fn finalize_standard_exit(&mut self, pos: &UtxoPos) -> ExitGameResult<StandardExit> {
        let exit = self
            .standard
            .get_mut(pos)
            .filter(|exit| exit.is_active())
            .ok_or(ExitGameError::AlreadyFinalized(*pos))?;

        let before = *exit;
        exit.clear(ExitStatus::Finalized);

        Ok(before)
    }

    /// Clears an active standard exit as challenged and returns it as it was before.
    pub fn challenge_standard_exit(&mut self, pos: &UtxoPos) -> ExitGameResult<StandardExit> {
        let exit = self
            .standard
            .get_mut(pos)
            .filter(|exit| exit.is_active())
            .ok_or_else(|| ExitGameError::NotChallengeable(format!("no active exit for {pos}")))?;

        let before = *exit;
        exit.clear(ExitStatus::Challenged);

        Ok(before)
    }

    /// The in-flight exit of the transaction, in any status.
    pub fn in_flight_exit(&self, tx_hash: &TxHash) -> Option<&InFlightExit> {
        self.in_flight.get(tx_hash)
    }

    /// The in-flight exit of the transaction, failing unless it exists and is active.
    pub fn active_in_flight_exit(&self, tx_hash: &TxHash) -> ExitGameResult<&InFlightExit> {
        let exit = self
            .in_flight
            .get(tx_hash)
            .ok_or(ExitGameError::InFlightExitNotFound(*tx_hash))?;

        if !exit.is_active() {
            return Err(ExitGameError::InFlightExitNotActive(*tx_hash));
        }

        Ok(exit)
    }

    pub(crate) fn in_flight_exit_mut(
        &mut self,
        tx_hash: &TxHash,
    ) -> ExitGameResult<&mut InFlightExit> {
        self.in_flight
            .get_mut(tx_hash)
            .ok_or(ExitGameError::InFlightExitNotFound(*tx_hash))
    }

    /// Stores a new in-flight exit.
    pub fn insert_in_flight_exit(
        &mut self,
        tx_hash: TxHash,
        exit: InFlightExit,
    ) -> ExitGameResult<()> {
        if self.in_flight.contains_key(&tx_hash) {
            return Err(ExitGameError::ExitAlreadyStarted(ExitId::InFlight(tx_hash)));
        }

        self.in_flight.insert(tx_hash, exit);

        Ok(())
    }

    /// Iterates over every standard exit.
    pub fn standard_exits(&self) -> impl Iterator<Item = &StandardExit> {
        self.standard.values()
    }

    /// Iterates over every in-flight exit with its transaction hash.
    pub fn in_flight_exits(&self) -> impl Iterator<Item = (&TxHash, &InFlightExit)> {
        self.in_flight.iter()
    }
}
