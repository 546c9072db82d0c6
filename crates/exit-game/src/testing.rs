//! A harness wiring an [`ExitGame`] to in-memory collaborators, with helpers for the common steps
//! of an exit scenario.
//!
//! Every helper that posts a bond or deposits funds first mints exactly what is spent, so an
//! account's balance always equals what the exit game paid out to it.

use plasma_params::prelude::ExitGameParams;
use plasma_primitives::{
    tx::{Transaction, TxOutput},
    types::{Address, Amount, BlockNumber, Timestamp, TxHash},
    utxo::{TxPos, UtxoPos},
};
use plasma_test_utils::prelude::*;

use crate::{
    errors::ExitGameResult,
    external::Clock,
    game::ExitGame,
    inmemory::{InMemoryChildChain, InMemoryVault, ManualClock},
    requests::{ProvenTx, StartInFlightExit, StartStandardExit},
};

pub(crate) type TestGame = ExitGame<ManualClock, InMemoryVault, InMemoryChildChain>;

/// The time at which every harness starts.
pub(crate) const GENESIS: Timestamp = 1_700_000_000;

/// A token other than the native one.
pub(crate) const TOKEN: Address = Address::new([0xee; 20]);

pub(crate) struct Harness {
    pub(crate) game: TestGame,
    pub(crate) clock: ManualClock,
    pub(crate) vault: InMemoryVault,
    pub(crate) chain: InMemoryChildChain,
    pub(crate) params: ExitGameParams,
}

impl Harness {
    pub(crate) fn new() -> Self {
        Self::with_params(ExitGameParams::default())
    }

    pub(crate) fn with_params(params: ExitGameParams) -> Self {
        let clock = ManualClock::new(GENESIS);
        let vault = InMemoryVault::new();
        let chain = InMemoryChildChain::new();
        let game = ExitGame::new(params, clock.clone(), vault.clone(), chain.clone());

        Self {
            game,
            clock,
            vault,
            chain,
            params,
        }
    }

    /// The exit period.
    pub(crate) fn period(&self) -> Timestamp {
        self.params.min_exit_period
    }

    pub(crate) fn advance(&self, secs: Timestamp) {
        self.clock.advance(secs);
    }

    /// Includes `txs` in a new block stamped with the current time.
    pub(crate) fn include(&self, txs: Vec<Transaction>) -> BlockNumber {
        self.chain.submit_block(self.clock.now(), txs)
    }

    /// Deposits `amount` of `token` for `owner` in its own block and returns the new output.
    pub(crate) fn deposit(&self, owner: &TestAccount, token: Address, amount: Amount) -> UtxoPos {
        self.vault.mint(token, owner.address, amount);
        self.vault
            .deposit(token, owner.address, amount)
            .expect("minted funds must be deposited");

        let blknum = self.include(vec![deposit_tx(owner.address, token, amount)]);

        UtxoPos::new(blknum, 0, 0).expect("deposit position must be valid")
    }

    /// Spends `inputs`, signing input `i` with `signers[i]`, without including the transaction.
    pub(crate) fn spend(
        &self,
        inputs: &[UtxoPos],
        signers: &[&TestAccount],
        outputs: &[TxOutput],
    ) -> Transaction {
        let keys: Vec<_> = signers.iter().map(|account| account.key).collect();

        spend_tx(inputs, &keys, outputs)
    }

    /// Includes `tx` alone in a new block and returns its position.
    pub(crate) fn include_one(&self, tx: &Transaction) -> TxPos {
        let blknum = self.include(vec![tx.clone()]);

        TxPos::new(blknum, 0).expect("position must be valid")
    }

    pub(crate) fn proven(&self, position: TxPos) -> ProvenTx {
        let tx = self
            .chain
            .transaction(position)
            .expect("transaction must be included");

        ProvenTx {
            tx: tx.encode(),
            proof: self
                .chain
                .inclusion_proof(position)
                .expect("transaction must be included"),
        }
    }

    pub(crate) fn start_standard_exit(
        &mut self,
        owner: &TestAccount,
        utxo_pos: UtxoPos,
    ) -> ExitGameResult<()> {
        let bond = self.params.standard_exit_bond;
        self.vault.mint(Address::NATIVE_TOKEN, owner.address, bond);

        let request = StartStandardExit {
            utxo_pos,
            output_tx: self.proven(utxo_pos.tx_pos()),
        };

        self.game.start_standard_exit(owner.address, request, bond)
    }

    pub(crate) fn start_in_flight_exit(
        &mut self,
        sender: &TestAccount,
        tx: &Transaction,
    ) -> ExitGameResult<TxHash> {
        let bond = self.params.in_flight_exit_bond;
        self.vault.mint(Address::NATIVE_TOKEN, sender.address, bond);

        let input_txs = tx
            .spent_inputs()
            .map(|(_, pos)| self.proven(pos.tx_pos()))
            .collect();
        let request = StartInFlightExit {
            in_flight_tx: tx.encode(),
            input_txs,
        };

        self.game.start_in_flight_exit(sender.address, request, bond)
    }

    pub(crate) fn piggyback_input(
        &mut self,
        owner: &TestAccount,
        tx_hash: TxHash,
        index: usize,
    ) -> ExitGameResult<()> {
        let bond = self.params.piggyback_bond;
        self.vault.mint(Address::NATIVE_TOKEN, owner.address, bond);

        self.game.piggyback_input(owner.address, tx_hash, index, bond)
    }

    pub(crate) fn piggyback_output(
        &mut self,
        owner: &TestAccount,
        tx_hash: TxHash,
        index: usize,
    ) -> ExitGameResult<()> {
        let bond = self.params.piggyback_bond;
        self.vault.mint(Address::NATIVE_TOKEN, owner.address, bond);

        self.game.piggyback_output(owner.address, tx_hash, index, bond)
    }

    pub(crate) fn process(&mut self, token: Address, max_count: u32) -> ExitGameResult<u32> {
        self.game.process_exits(token, None, max_count)
    }

    pub(crate) fn balance(&self, token: Address, account: &TestAccount) -> Amount {
        self.vault.balance(token, account.address)
    }
}

pub(crate) fn output(owner: &TestAccount, token: Address, amount: Amount) -> TxOutput {
    TxOutput::new(owner.address, token, amount)
}
