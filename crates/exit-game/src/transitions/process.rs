//! Draining exit queues.

use plasma_primitives::{
    types::{Address, TxHash},
    utxo::UtxoPos,
};
use tracing::{debug, info, warn};

use crate::{
    errors::{ExitGameError, ExitGameResult},
    events::ExitEvent,
    external::{ChildChain, Clock, Payout, Vault},
    game::ExitGame,
    piggyback::Slot,
    queue::ExitId,
};

impl<C, V, L> ExitGame<C, V, L>
where
    C: Clock,
    V: Vault,
    L: ChildChain,
{
    /// Finalizes up to `max_count` mature exits of `token` in queue order and returns how many
    /// queue entries were consumed.
    ///
    /// If `top_exit_hint` is set, it must name the exit currently at the head of the queue.
    /// Processing stops early at the first exit that is not yet mature, or when the queue runs
    /// empty. Entries whose exit was challenged or already cleared are consumed without effect
    /// and count as processed.
    ///
    /// Each finalized entry is settled on its own: if settling an entry fails, the entries before
    /// it stay finalized and the failing entry stays queued.
    pub fn process_exits(
        &mut self,
        token: Address,
        top_exit_hint: Option<ExitId>,
        max_count: u32,
    ) -> ExitGameResult<u32> {
        let head = self.state.queues.peek_min(&token)?.map(|entry| entry.exit_id);

        if let Some(expected) = top_exit_hint {
            if head != Some(expected) {
                return Err(ExitGameError::StaleQueueHead {
                    expected,
                    actual: head,
                });
            }
        }

        let now = self.clock.now();
        let mut processed = 0;

        while processed < max_count {
            let Some(entry) = self.state.queues.peek_min(&token)?.copied() else {
                debug!(%token, "exit queue drained");
                break;
            };

            if now < entry.exitable_at {
                debug!(%token, exit_id = %entry.exit_id, exitable_at = entry.exitable_at, %now, "next exit is not mature yet");
                break;
            }

            let settled = match entry.exit_id {
                ExitId::Standard(pos) => self.finalize_standard_exit_entry(pos),
                ExitId::InFlight(tx_hash) => self.finalize_in_flight_exit_entry(tx_hash, token),
            };

            if let Err(err) = settled {
                warn!(%token, exit_id = %entry.exit_id, %err, "could not finalize exit");
                return Err(err);
            }

            self.state.queues.pop_min(&token)?;
            processed += 1;
        }

        Ok(processed)
    }

    fn finalize_standard_exit_entry(&mut self, pos: UtxoPos) -> ExitGameResult<()> {
        let exit = match self.state.exits.standard_exit(&pos) {
            Some(exit) if exit.is_active() => *exit,
            _ => {
                debug!(utxo_pos = %pos, "skipping stale standard exit");
                return Ok(());
            }
        };

        self.vault.settle(&[
            Payout::new(exit.token, exit.owner, exit.amount),
            Payout::native(exit.bond_owner, exit.bond),
        ])?;

        self.state.exits.finalize_standard_exit(&pos)?;

        info!(utxo_pos = %pos, owner = %exit.owner, token = %exit.token, amount = exit.amount, "standard exit finalized");

        self.emit(ExitEvent::ExitFinalized {
            utxo_pos: pos,
            owner: exit.owner,
            token: exit.token,
            amount: exit.amount,
        });

        Ok(())
    }

    fn finalize_in_flight_exit_entry(&mut self, tx_hash: TxHash, token: Address) -> ExitGameResult<()> {
        let exit = match self.state.exits.in_flight_exit(&tx_hash) {
            Some(exit) if exit.is_active() => exit,
            _ => {
                debug!(%tx_hash, "skipping stale in-flight exit");
                return Ok(());
            }
        };

        let slots: Vec<Slot> = exit
            .exit_map
            .pending_slots()
            .filter(|slot| exit.slot(*slot).token == token)
            .collect();

        let mut payouts = Vec::with_capacity(2 * slots.len() + 1);
        let mut finalized = Vec::with_capacity(slots.len());
        for slot in &slots {
            let data = *exit.slot(*slot);
            let paid = if exit.slot_wins(*slot) { data.amount } else { 0 };

            payouts.push(Payout::new(token, data.owner, paid));
            if let Some(claim) = exit.claim(*slot) {
                payouts.push(Payout::native(claim.claimant, claim.bond));
            }

            finalized.push(ExitEvent::InFlightExitSlotFinalized {
                tx_hash,
                slot: *slot,
                owner: data.owner,
                token,
                amount: paid,
            });
        }

        let clears = exit
            .exit_map
            .pending_slots()
            .all(|slot| slots.contains(&slot));
        if clears {
            payouts.push(Payout::native(exit.bond_owner, exit.bond));
        }

        self.vault.settle(&payouts)?;

        let exit = self.state.exits.in_flight_exit_mut(&tx_hash)?;
        for slot in &slots {
            exit.finalize_slot(*slot);
        }

        if clears {
            exit.clear();
        }

        info!(%tx_hash, %token, slots = slots.len(), cleared = clears, "in-flight exit finalized for token");

        self.events.extend(finalized);
        if clears {
            self.emit(ExitEvent::InFlightExitCleared { tx_hash });
        }

        Ok(())
    }
}
