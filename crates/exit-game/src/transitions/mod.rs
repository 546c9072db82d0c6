//! The transitions of the exit game.
//!
//! Each submodule adds the operations for one part of the game to [`ExitGame`]. Every operation
//! follows the same shape: validate against the current state, move funds, then mutate.

mod challenge;
mod in_flight;
mod process;
mod standard;

use plasma_primitives::{
    tx::Transaction,
    types::{Amount, BlockNumber, Timestamp, TxHash},
    utxo::TxPos,
};

use crate::{
    errors::{ExitGameError, ExitGameResult},
    external::{ChildChain, Clock, Vault},
    game::ExitGame,
};

impl<C, V, L> ExitGame<C, V, L>
where
    C: Clock,
    V: Vault,
    L: ChildChain,
{
    /// Decodes a transaction and recovers its signers.
    pub(crate) fn decode_tx(bytes: &[u8]) -> ExitGameResult<Transaction> {
        Ok(Transaction::decode(bytes)?)
    }

    pub(crate) fn check_bond(expected: Amount, got: Amount) -> ExitGameResult<()> {
        if expected != got {
            return Err(ExitGameError::InvalidBond { expected, got });
        }

        Ok(())
    }

    pub(crate) fn check_inclusion(
        &self,
        tx_hash: &TxHash,
        position: TxPos,
        proof: &[u8],
    ) -> ExitGameResult<()> {
        if !self.child_chain.verify_inclusion(tx_hash, position, proof) {
            return Err(ExitGameError::InvalidInclusionProof(position));
        }

        Ok(())
    }

    pub(crate) fn block_timestamp(&self, blknum: BlockNumber) -> ExitGameResult<Timestamp> {
        self.child_chain
            .block_timestamp(blknum)
            .ok_or(ExitGameError::UnknownBlock(blknum))
    }
}
