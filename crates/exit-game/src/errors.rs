//! Errors raised by the exit game.
//!
//! Every operation validates its inputs before it touches any state, so an error always means that
//! the operation had no effect. The exception is [`ExitGame::process_exits`], where exits finalized
//! by earlier iterations of the same call stay finalized.
//!
//! [`ExitGame::process_exits`]: crate::game::ExitGame::process_exits

use plasma_primitives::{
    errors::TransactionError,
    types::{Address, Amount, BlockNumber, Timestamp, TxHash},
    utxo::{TxPos, UtxoPos},
};
use thiserror::Error;

use crate::{external::TransferError, piggyback::Slot, queue::ExitId};

/// Errors that can occur in the exit game.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExitGameError {
    /// A transaction could not be decoded or its signatures could not be recovered.
    ///
    /// This is always fatal to the operation and must not be retried.
    #[error("malformed transaction: {0}")]
    Encoding(#[from] TransactionError),

    /// The token has no exit queue.
    #[error("token {0} is not registered")]
    UnregisteredToken(Address),

    /// The token already has an exit queue.
    #[error("token {0} is already registered")]
    TokenAlreadyRegistered(Address),

    /// The exit queue of the token has no entries.
    #[error("exit queue of token {0} is empty")]
    EmptyQueue(Address),

    /// The caller expected a different exit at the head of the queue.
    ///
    /// The queue changed since the caller last read it; re-read the head and retry.
    #[error("expected {expected} at the head of the queue, found {actual:?}")]
    StaleQueueHead {
        /// The exit the caller expected.
        expected: ExitId,
        /// The exit actually at the head, if any.
        actual: Option<ExitId>,
    },

    /// The challenge does not apply to the exit.
    #[error("not challengeable: {0}")]
    NotChallengeable(String),

    /// The exit was already finalized or challenged.
    #[error("exit of {0} is already finalized")]
    AlreadyFinalized(UtxoPos),

    /// The posted bond does not match the required bond.
    #[error("invalid bond: expected {expected}, got {got}")]
    InvalidBond {
        /// The bond required by the parameters.
        expected: Amount,
        /// The bond that was posted.
        got: Amount,
    },

    /// The sender is not the owner of the output or input it acts on.
    #[error("{got} is not the owner, expected {expected}")]
    NotOwner {
        /// The owner of the output.
        expected: Address,
        /// The sender of the request.
        got: Address,
    },

    /// An exit was already started for this identifier.
    #[error("{0} was already exited")]
    ExitAlreadyStarted(ExitId),

    /// The inclusion proof does not prove the transaction at the claimed position.
    #[error("invalid inclusion proof for position {0}")]
    InvalidInclusionProof(TxPos),

    /// The child chain has no block with this number.
    #[error("unknown block {0}")]
    UnknownBlock(BlockNumber),

    /// The exited output does not exist or is empty.
    #[error("output {0} is empty")]
    InvalidOutput(UtxoPos),

    /// The in-flight transaction is not eligible for an in-flight exit.
    #[error("invalid in-flight transaction: {0}")]
    InvalidInFlightTransaction(String),

    /// No in-flight exit exists for this transaction.
    #[error("no in-flight exit for {0}")]
    InFlightExitNotFound(TxHash),

    /// The in-flight exit was already cleared.
    #[error("in-flight exit for {0} is no longer active")]
    InFlightExitNotActive(TxHash),

    /// The slot index is out of range or the slot is empty.
    #[error("invalid slot {0}")]
    InvalidSlot(Slot),

    /// The slot was already piggybacked.
    #[error("{slot} of {tx_hash} is already piggybacked")]
    AlreadyPiggybacked {
        /// The in-flight transaction.
        tx_hash: TxHash,
        /// The piggybacked slot.
        slot: Slot,
    },

    /// The window for this action has closed.
    #[error("period ended at {deadline}, now is {now}")]
    PeriodOver {
        /// The end of the window.
        deadline: Timestamp,
        /// The current time.
        now: Timestamp,
    },

    /// The response does not answer the challenge.
    #[error("invalid challenge response: {0}")]
    InvalidChallengeResponse(String),

    /// The vault refused to move funds.
    #[error("transfer failed: {0}")]
    Transfer(#[from] TransferError),
}

/// Result type alias for the exit game.
pub type ExitGameResult<T> = Result<T, ExitGameError>;
