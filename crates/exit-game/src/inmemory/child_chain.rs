//! An in-memory child chain: an append-only list of blocks of transactions.

use std::{collections::BTreeMap, sync::Arc};

use parking_lot::RwLock;
use plasma_primitives::{
    tx::Transaction,
    types::{BlockNumber, Timestamp, TxHash},
    utxo::TxPos,
};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::external::ChildChain;

#[derive(Debug, Clone)]
struct Block {
    timestamp: Timestamp,
    txs: Vec<Transaction>,
    root: TxHash,
}

/// An in-memory [`ChildChain`].
///
/// Blocks are numbered from 1. The inclusion proof of a transaction is the root of its block, the
/// hash of the concatenated hashes of every transaction in the block.
#[derive(Debug, Clone, Default)]
pub struct InMemoryChildChain {
    blocks: Arc<RwLock<BTreeMap<BlockNumber, Block>>>,
}

impl InMemoryChildChain {
    /// Creates a chain without blocks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a block and returns its number.
    pub fn submit_block(&self, timestamp: Timestamp, txs: Vec<Transaction>) -> BlockNumber {
        let mut blocks = self.blocks.write();
        let blknum = blocks.last_key_value().map_or(1, |(blknum, _)| blknum + 1);

        let root = block_root(&txs);
        debug!(%blknum, %timestamp, txs = txs.len(), %root, "submitted block");

        blocks.insert(
            blknum,
            Block {
                timestamp,
                txs,
                root,
            },
        );

        blknum
    }

    /// The number of the latest block, if any.
    pub fn tip(&self) -> Option<BlockNumber> {
        self.blocks.read().last_key_value().map(|(blknum, _)| *blknum)
    }

    /// The transaction included at `position`.
    pub fn transaction(&self, position: TxPos) -> Option<Transaction> {
        self.blocks
            .read()
            .get(&position.blknum())
            .and_then(|block| block.txs.get(position.txindex() as usize))
            .cloned()
    }

    /// The proof that the transaction at `position` is included.
    pub fn inclusion_proof(&self, position: TxPos) -> Option<Vec<u8>> {
        let blocks = self.blocks.read();
        let block = blocks.get(&position.blknum())?;

        if position.txindex() as usize >= block.txs.len() {
            return None;
        }

        Some(block.root.as_bytes().to_vec())
    }
}

fn block_root(txs: &[Transaction]) -> TxHash {
    let mut hasher = Sha256::new();
    for tx in txs {
        hasher.update(tx.hash().as_bytes());
    }

    TxHash::from(<[u8; 32]>::from(hasher.finalize()))
}

impl ChildChain for InMemoryChildChain {
    fn block_timestamp(&self, blknum: BlockNumber) -> Option<Timestamp> {
        self.blocks.read().get(&blknum).map(|block| block.timestamp)
    }

    fn verify_inclusion(&self, tx_hash: &TxHash, position: TxPos, proof: &[u8]) -> bool {
        let blocks = self.blocks.read();
        let Some(block) = blocks.get(&position.blknum()) else {
            return false;
        };

        block
            .txs
            .get(position.txindex() as usize)
            .is_some_and(|tx| tx.hash() == *tx_hash && proof == block.root.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use plasma_primitives::types::Address;
    use plasma_test_utils::prelude::*;

    use super::*;

    #[test]
    fn test_blocks_are_numbered_from_one() {
        let chain = InMemoryChildChain::new();
        assert_eq!(chain.tip(), None);

        let owner = TestAccount::from_seed("alice").address;
        let first = chain.submit_block(10, vec![deposit_tx(owner, Address::NATIVE_TOKEN, 1)]);
        let second = chain.submit_block(20, vec![]);

        assert_eq!((first, second), (1, 2));
        assert_eq!(chain.tip(), Some(2));
        assert_eq!(chain.block_timestamp(1), Some(10));
        assert_eq!(chain.block_timestamp(2), Some(20));
        assert_eq!(chain.block_timestamp(3), None);
    }

    #[test]
    fn test_inclusion_proofs() {
        let chain = InMemoryChildChain::new();
        let owner = TestAccount::from_seed("alice").address;
        let tx = deposit_tx(owner, Address::NATIVE_TOKEN, 5);
        let other = deposit_tx(owner, Address::NATIVE_TOKEN, 6);

        let blknum = chain.submit_block(10, vec![tx.clone(), other.clone()]);
        let position = TxPos::new(blknum, 0).unwrap();
        let proof = chain.inclusion_proof(position).unwrap();

        assert_eq!(chain.transaction(position), Some(tx.clone()));
        assert!(chain.verify_inclusion(&tx.hash(), position, &proof));
        assert!(!chain.verify_inclusion(&other.hash(), position, &proof));
        assert!(!chain.verify_inclusion(&tx.hash(), position, &[0; 32]));
        assert!(!chain.verify_inclusion(&tx.hash(), TxPos::new(blknum + 1, 0).unwrap(), &proof));
        assert!(chain.inclusion_proof(TxPos::new(blknum, 2).unwrap()).is_none());
    }
}
