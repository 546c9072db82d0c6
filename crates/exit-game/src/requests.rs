//! Requests accepted by the exit game.
//!
//! Transactions travel in their encoded form; the exit game decodes them and recovers their
//! signers itself.

use plasma_primitives::utxo::{TxPos, UtxoPos};
use serde::{Deserialize, Serialize};

/// An encoded transaction together with a proof of its inclusion in the child chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvenTx {
    /// The encoded transaction.
    pub tx: Vec<u8>,

    /// The opaque inclusion proof checked by the child chain.
    pub proof: Vec<u8>,
}

/// Proof that a transaction is included at a given position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inclusion {
    /// Where the transaction is included.
    pub position: TxPos,

    /// The opaque inclusion proof checked by the child chain.
    pub proof: Vec<u8>,
}

/// Starts the exit of a single output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartStandardExit {
    /// The exited output.
    pub utxo_pos: UtxoPos,

    /// The transaction that created the output, included at `utxo_pos.tx_pos()`.
    pub output_tx: ProvenTx,
}

/// Starts the exit of a transaction that may not have been included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartInFlightExit {
    /// The encoded in-flight transaction.
    pub in_flight_tx: Vec<u8>,

    /// The transaction that created each spent input, in input order.
    pub input_txs: Vec<ProvenTx>,
}

/// Proves that the output of a standard exit was spent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeStandardExit {
    /// The exited output.
    pub utxo_pos: UtxoPos,

    /// The encoded transaction spending the output.
    pub spending_tx: Vec<u8>,

    /// The input slot of `spending_tx` that spends the output.
    pub input_index: usize,
}

/// Presents a transaction that double-spends an input of an in-flight transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeInFlightNotCanonical {
    /// The encoded in-flight transaction.
    pub in_flight_tx: Vec<u8>,

    /// The input slot of the in-flight transaction that is double-spent.
    pub in_flight_input_index: usize,

    /// The encoded competing transaction.
    pub competing_tx: Vec<u8>,

    /// The input slot of the competing transaction spending the same output.
    pub competing_input_index: usize,

    /// Where the competitor is included, if it is.
    pub competitor_inclusion: Option<Inclusion>,
}

/// Answers a non-canonical challenge by proving the in-flight transaction is included earlier
/// than its oldest competitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RespondToNonCanonicalChallenge {
    /// The encoded in-flight transaction.
    pub in_flight_tx: Vec<u8>,

    /// Where the in-flight transaction is included.
    pub inclusion: Inclusion,
}
