//! Events emitted by the exit game.

use std::fmt;

use plasma_primitives::{
    types::{Address, Amount, Timestamp, TxHash},
    utxo::{TxPos, UtxoPos},
};
use serde::{Deserialize, Serialize};

use crate::{piggyback::Slot, store::Competitor};

/// An observable change in the exit game.
///
/// Events are appended in the order their operations completed and can be drained with
/// [`ExitGame::drain_events`](crate::game::ExitGame::drain_events).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ExitEvent {
    /// A standard exit was started.
    ExitStarted {
        /// The exited output.
        utxo_pos: UtxoPos,
        /// The owner of the output.
        owner: Address,
        /// The token of the output.
        token: Address,
        /// The value of the output.
        amount: Amount,
        /// When the exit matures.
        exitable_at: Timestamp,
    },

    /// A standard exit paid out.
    ExitFinalized {
        /// The exited output.
        utxo_pos: UtxoPos,
        /// The recipient.
        owner: Address,
        /// The paid token.
        token: Address,
        /// The paid amount.
        amount: Amount,
    },

    /// A standard exit was proven invalid.
    ExitChallenged {
        /// The exited output.
        utxo_pos: UtxoPos,
        /// Who proved the spend.
        challenger: Address,
    },

    /// An in-flight exit was started.
    InFlightExitStarted {
        /// The in-flight transaction.
        tx_hash: TxHash,
        /// Who started the exit.
        initiator: Address,
        /// When the exit matures.
        exitable_at: Timestamp,
    },

    /// A slot of an in-flight exit was piggybacked.
    InFlightExitPiggybacked {
        /// The in-flight transaction.
        tx_hash: TxHash,
        /// The piggybacked slot.
        slot: Slot,
        /// The owner of the slot.
        owner: Address,
    },

    /// A piggybacked slot was finalized.
    InFlightExitSlotFinalized {
        /// The in-flight transaction.
        tx_hash: TxHash,
        /// The finalized slot.
        slot: Slot,
        /// The owner of the slot.
        owner: Address,
        /// The token of the slot.
        token: Address,
        /// The paid amount, zero if the slot lost.
        amount: Amount,
    },

    /// An in-flight exit was challenged as non-canonical.
    InFlightExitChallenged {
        /// The in-flight transaction.
        tx_hash: TxHash,
        /// Who presented the competitor.
        challenger: Address,
        /// The competitor.
        competitor: Competitor,
    },

    /// A non-canonical challenge was answered with the inclusion of the transaction.
    InFlightExitChallengeResponded {
        /// The in-flight transaction.
        tx_hash: TxHash,
        /// Who proved the inclusion.
        responder: Address,
        /// Where the transaction is included.
        tx_pos: TxPos,
    },

    /// Every piggybacked slot of an in-flight exit was finalized.
    InFlightExitCleared {
        /// The in-flight transaction.
        tx_hash: TxHash,
    },
}

impl fmt::Display for ExitEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitEvent::ExitStarted {
                utxo_pos, amount, ..
            } => write!(f, "ExitStarted({utxo_pos}, amount={amount})"),
            ExitEvent::ExitFinalized {
                utxo_pos, amount, ..
            } => write!(f, "ExitFinalized({utxo_pos}, amount={amount})"),
            ExitEvent::ExitChallenged { utxo_pos, .. } => write!(f, "ExitChallenged({utxo_pos})"),
            ExitEvent::InFlightExitStarted { tx_hash, .. } => {
                write!(f, "InFlightExitStarted({tx_hash})")
            }
            ExitEvent::InFlightExitPiggybacked { tx_hash, slot, .. } => {
                write!(f, "InFlightExitPiggybacked({tx_hash}, {slot})")
            }
            ExitEvent::InFlightExitSlotFinalized {
                tx_hash,
                slot,
                amount,
                ..
            } => write!(
                f,
                "InFlightExitSlotFinalized({tx_hash}, {slot}, amount={amount})"
            ),
            ExitEvent::InFlightExitChallenged {
                tx_hash,
                competitor,
                ..
            } => write!(f, "InFlightExitChallenged({tx_hash}, {competitor:?})"),
            ExitEvent::InFlightExitChallengeResponded {
                tx_hash, tx_pos, ..
            } => write!(f, "InFlightExitChallengeResponded({tx_hash}, {tx_pos})"),
            ExitEvent::InFlightExitCleared { tx_hash } => {
                write!(f, "InFlightExitCleared({tx_hash})")
            }
        }
    }
}
