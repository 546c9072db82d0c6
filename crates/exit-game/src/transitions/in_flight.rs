//! In-flight exits: starting them, piggybacking their slots and the canonicity game.

use std::collections::{BTreeMap, BTreeSet};

use plasma_primitives::{
    constants::NUM_TXOS,
    tx::TxOutput,
    types::{Address, Amount, TxHash},
    utxo::UtxoPos,
};
use tracing::{debug, info};

use crate::{
    errors::{ExitGameError, ExitGameResult},
    events::ExitEvent,
    external::{ChildChain, Clock, Vault},
    game::ExitGame,
    piggyback::{ExitMap, PiggybackClaim, Slot},
    queue::{ExitId, QueueEntry},
    requests::{ChallengeInFlightNotCanonical, RespondToNonCanonicalChallenge, StartInFlightExit},
    store::{Competitor, ExitStatus, InFlightExit},
};

impl<C, V, L> ExitGame<C, V, L>
where
    C: Clock,
    V: Vault,
    L: ChildChain,
{
    /// Starts the exit of a transaction that spends included outputs but may not be included
    /// itself, posting `bond`.
    ///
    /// The exit is queued for the native token right away, so it clears and returns its bond even
    /// if nobody piggybacks. Every other token is queued by the first piggyback of a slot holding
    /// it.
    pub fn start_in_flight_exit(
        &mut self,
        sender: Address,
        request: StartInFlightExit,
        bond: Amount,
    ) -> ExitGameResult<TxHash> {
        Self::check_bond(self.params.in_flight_exit_bond, bond)?;

        let tx = Self::decode_tx(&request.in_flight_tx)?;
        let tx_hash = tx.hash();

        if self.state.exits.in_flight_exit(&tx_hash).is_some() {
            return Err(ExitGameError::ExitAlreadyStarted(ExitId::InFlight(tx_hash)));
        }

        if tx.is_deposit() {
            return Err(ExitGameError::InvalidInFlightTransaction(
                "deposits cannot be exited in flight".to_string(),
            ));
        }

        let spent: Vec<(usize, UtxoPos)> = tx.spent_inputs().collect();
        if spent.len() != request.input_txs.len() {
            return Err(ExitGameError::InvalidInFlightTransaction(format!(
                "{} inputs but {} input transactions",
                spent.len(),
                request.input_txs.len()
            )));
        }

        let distinct: BTreeSet<UtxoPos> = spent.iter().map(|(_, pos)| *pos).collect();
        if distinct.len() != spent.len() {
            return Err(ExitGameError::InvalidInFlightTransaction(
                "an input is spent twice".to_string(),
            ));
        }

        let mut input_positions = [UtxoPos::NULL; NUM_TXOS];
        let mut inputs = [TxOutput::NULL; NUM_TXOS];
        for ((slot, pos), proven) in spent.iter().copied().zip(&request.input_txs) {
            let input_tx = Self::decode_tx(&proven.tx)?;
            self.check_inclusion(&input_tx.hash(), pos.tx_pos(), &proven.proof)?;

            let output = input_tx.outputs()[pos.oindex()];
            if output.is_empty() {
                return Err(ExitGameError::InvalidOutput(pos));
            }

            let signer = tx.signers()[slot];
            if signer != output.owner {
                return Err(ExitGameError::NotOwner {
                    expected: output.owner,
                    got: signer,
                });
            }

            input_positions[slot] = pos;
            inputs[slot] = output;
        }

        check_value_conserved(&inputs, tx.outputs())?;

        // the exit is only as old as its youngest input
        let position = distinct
            .last()
            .copied()
            .ok_or_else(|| ExitGameError::InvalidInFlightTransaction("no inputs".to_string()))?;
        let created_at = self.block_timestamp(position.blknum())?;

        let now = self.clock.now();
        let exitable_at = self.params.exitable_at(created_at, now);

        self.vault.collect(Address::NATIVE_TOKEN, sender, bond)?;

        self.state.exits.insert_in_flight_exit(
            tx_hash,
            InFlightExit {
                bond_owner: sender,
                bond,
                exit_start_timestamp: now,
                exitable_at,
                position,
                oldest_competitor: None,
                tx_position: None,
                input_positions,
                inputs,
                outputs: *tx.outputs(),
                exit_map: ExitMap::default(),
                piggybacks: [None; 2 * NUM_TXOS],
                enqueued_tokens: BTreeSet::from([Address::NATIVE_TOKEN]),
                status: ExitStatus::Active,
            },
        )?;
        self.state.queues.insert(
            Address::NATIVE_TOKEN,
            QueueEntry {
                exitable_at,
                priority: position,
                exit_id: ExitId::InFlight(tx_hash),
            },
        )?;

        info!(%tx_hash, initiator = %sender, %position, %exitable_at, "in-flight exit started");

        self.emit(ExitEvent::InFlightExitStarted {
            tx_hash,
            initiator: sender,
            exitable_at,
        });

        Ok(tx_hash)
    }

    /// Claims input `index` of an in-flight exit for its owner, posting `bond`.
    pub fn piggyback_input(
        &mut self,
        sender: Address,
        tx_hash: TxHash,
        index: usize,
        bond: Amount,
    ) -> ExitGameResult<()> {
        self.piggyback(sender, tx_hash, Slot::input(index)?, bond)
    }

    /// Claims output `index` of an in-flight exit for its owner, posting `bond`.
    pub fn piggyback_output(
        &mut self,
        sender: Address,
        tx_hash: TxHash,
        index: usize,
        bond: Amount,
    ) -> ExitGameResult<()> {
        self.piggyback(sender, tx_hash, Slot::output(index)?, bond)
    }

    fn piggyback(
        &mut self,
        sender: Address,
        tx_hash: TxHash,
        slot: Slot,
        bond: Amount,
    ) -> ExitGameResult<()> {
        let exit = self.state.exits.active_in_flight_exit(&tx_hash)?;

        let now = self.clock.now();
        let deadline = self.params.piggyback_deadline(exit.exit_start_timestamp);
        if now >= deadline {
            return Err(ExitGameError::PeriodOver { deadline, now });
        }

        let data = *exit.slot(slot);
        if data.is_empty() {
            return Err(ExitGameError::InvalidSlot(slot));
        }

        if exit.exit_map.is_piggybacked(slot) {
            return Err(ExitGameError::AlreadyPiggybacked { tx_hash, slot });
        }

        if data.owner != sender {
            return Err(ExitGameError::NotOwner {
                expected: data.owner,
                got: sender,
            });
        }

        Self::check_bond(self.params.piggyback_bond, bond)?;
        self.ensure_registered(&data.token)?;

        let entry = QueueEntry {
            exitable_at: exit.exitable_at,
            priority: exit.position,
            exit_id: ExitId::InFlight(tx_hash),
        };
        let first_for_token = !exit.enqueued_tokens.contains(&data.token);

        self.vault.collect(Address::NATIVE_TOKEN, sender, bond)?;

        if first_for_token {
            self.state.queues.insert(data.token, entry)?;
            debug!(%tx_hash, token = %data.token, "enqueued in-flight exit");
        }

        let exit = self.state.exits.in_flight_exit_mut(&tx_hash)?;
        exit.enqueued_tokens.insert(data.token);
        exit.piggyback(
            slot,
            PiggybackClaim {
                claimant: sender,
                bond,
            },
        );

        info!(%tx_hash, %slot, owner = %sender, "piggybacked in-flight exit");

        self.emit(ExitEvent::InFlightExitPiggybacked {
            tx_hash,
            slot,
            owner: sender,
        });

        Ok(())
    }

    /// Shows that an input of an in-flight transaction was also spent by a competing
    /// transaction, making the in-flight transaction non-canonical unless it proves that it was
    /// included first.
    ///
    /// The challenger takes over the in-flight exit bond.
    pub fn challenge_in_flight_exit_not_canonical(
        &mut self,
        challenger: Address,
        request: ChallengeInFlightNotCanonical,
    ) -> ExitGameResult<()> {
        let tx_hash = Self::decode_tx(&request.in_flight_tx)?.hash();
        let exit = self.state.exits.active_in_flight_exit(&tx_hash)?;

        let now = self.clock.now();
        let deadline = self.params.piggyback_deadline(exit.exit_start_timestamp);
        if now >= deadline {
            return Err(ExitGameError::PeriodOver { deadline, now });
        }

        let in_flight_slot = Slot::input(request.in_flight_input_index)?;
        let competing_slot = Slot::input(request.competing_input_index)?;

        let competing_tx = Self::decode_tx(&request.competing_tx)?;
        let competing_hash = competing_tx.hash();
        if competing_hash == tx_hash {
            return Err(ExitGameError::NotChallengeable(
                "the competitor is the in-flight transaction".to_string(),
            ));
        }

        let spent = exit.input_positions[in_flight_slot.index()];
        if spent.is_null() || competing_tx.inputs()[competing_slot.index()] != spent {
            return Err(ExitGameError::NotChallengeable(format!(
                "the competitor does not spend {spent}"
            )));
        }

        let input_owner = exit.slot(in_flight_slot).owner;
        if input_owner.is_null() || competing_tx.signers()[competing_slot.index()] != input_owner {
            return Err(ExitGameError::NotChallengeable(
                "the competitor is not signed by the input owner".to_string(),
            ));
        }

        let competitor = match &request.competitor_inclusion {
            Some(inclusion) => {
                self.check_inclusion(&competing_hash, inclusion.position, &inclusion.proof)?;
                Competitor::Included(inclusion.position)
            }
            None => Competitor::InFlight,
        };

        if exit
            .oldest_competitor
            .is_some_and(|oldest| competitor >= oldest)
        {
            return Err(ExitGameError::NotChallengeable(
                "the competitor is not older than the known competitor".to_string(),
            ));
        }

        let exit = self.state.exits.in_flight_exit_mut(&tx_hash)?;
        exit.oldest_competitor = Some(competitor);
        exit.bond_owner = challenger;

        info!(%tx_hash, %challenger, ?competitor, "in-flight exit challenged as non-canonical");

        self.emit(ExitEvent::InFlightExitChallenged {
            tx_hash,
            challenger,
            competitor,
        });

        Ok(())
    }

    /// Proves that a challenged in-flight transaction was included before its oldest competitor.
    ///
    /// The responder takes over the in-flight exit bond.
    pub fn respond_to_non_canonical_challenge(
        &mut self,
        responder: Address,
        request: RespondToNonCanonicalChallenge,
    ) -> ExitGameResult<()> {
        let tx_hash = Self::decode_tx(&request.in_flight_tx)?.hash();
        let exit = self.state.exits.active_in_flight_exit(&tx_hash)?;

        let oldest = exit.oldest_competitor.ok_or_else(|| {
            ExitGameError::InvalidChallengeResponse("the exit was not challenged".to_string())
        })?;

        let position = request.inclusion.position;
        if Competitor::Included(position) >= oldest {
            return Err(ExitGameError::InvalidChallengeResponse(format!(
                "inclusion at {position} is not older than the competitor"
            )));
        }

        self.check_inclusion(&tx_hash, position, &request.inclusion.proof)?;

        let exit = self.state.exits.in_flight_exit_mut(&tx_hash)?;
        exit.tx_position = Some(position);
        exit.bond_owner = responder;

        info!(%tx_hash, %responder, %position, "non-canonical challenge answered");

        self.emit(ExitEvent::InFlightExitChallengeResponded {
            tx_hash,
            responder,
            tx_pos: position,
        });

        Ok(())
    }
}

/// Fails if the outputs of any token are worth more than the inputs of that token.
fn check_value_conserved(
    inputs: &[TxOutput; NUM_TXOS],
    outputs: &[TxOutput; NUM_TXOS],
) -> ExitGameResult<()> {
    let mut balances: BTreeMap<Address, i128> = BTreeMap::new();

    for input in inputs.iter().filter(|input| !input.is_empty()) {
        *balances.entry(input.token).or_default() += input.amount as i128;
    }

    for output in outputs.iter().filter(|output| !output.is_empty()) {
        *balances.entry(output.token).or_default() -= output.amount as i128;
    }

    match balances.into_iter().find(|(_, balance)| *balance < 0) {
        Some((token, _)) => Err(ExitGameError::InvalidInFlightTransaction(format!(
            "outputs exceed inputs for token {token}"
        ))),
        None => Ok(()),
    }
}
