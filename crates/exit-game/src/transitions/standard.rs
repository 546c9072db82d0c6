//! Starting standard exits.

use plasma_primitives::types::{Address, Amount};
use tracing::info;

use crate::{
    errors::{ExitGameError, ExitGameResult},
    events::ExitEvent,
    external::{ChildChain, Clock, Vault},
    game::ExitGame,
    queue::{ExitId, QueueEntry},
    requests::StartStandardExit,
    store::{ExitStatus, StandardExit},
};

impl<C, V, L> ExitGame<C, V, L>
where
    C: Clock,
    V: Vault,
    L: ChildChain,
{
    /// Starts the exit of an output owned by `sender`, posting `bond`.
    ///
    /// The exit matures two exit periods after the output was created, or one exit period from
    /// now, whichever is later.
    pub fn start_standard_exit(
        &mut self,
        sender: Address,
        request: StartStandardExit,
        bond: Amount,
    ) -> ExitGameResult<()> {
        let StartStandardExit {
            utxo_pos,
            output_tx,
        } = request;

        let tx = Self::decode_tx(&output_tx.tx)?;
        let output = tx.outputs()[utxo_pos.oindex()];

        if output.is_empty() || output.amount == 0 {
            return Err(ExitGameError::InvalidOutput(utxo_pos));
        }

        self.ensure_registered(&output.token)?;

        if output.owner != sender {
            return Err(ExitGameError::NotOwner {
                expected: output.owner,
                got: sender,
            });
        }

        Self::check_bond(self.params.standard_exit_bond, bond)?;

        if self.state.exits.standard_exit(&utxo_pos).is_some() {
            return Err(ExitGameError::ExitAlreadyStarted(ExitId::Standard(utxo_pos)));
        }

        self.check_inclusion(&tx.hash(), utxo_pos.tx_pos(), &output_tx.proof)?;
        let created_at = self.block_timestamp(utxo_pos.blknum())?;

        let now = self.clock.now();
        let exitable_at = self.params.exitable_at(created_at, now);

        self.vault.collect(Address::NATIVE_TOKEN, sender, bond)?;

        self.state.exits.insert_standard_exit(StandardExit {
            owner: output.owner,
            token: output.token,
            amount: output.amount,
            exitable_at,
            position: utxo_pos,
            bond_owner: sender,
            bond,
            status: ExitStatus::Active,
        })?;
        self.state.queues.insert(
            output.token,
            QueueEntry {
                exitable_at,
                priority: utxo_pos,
                exit_id: ExitId::Standard(utxo_pos),
            },
        )?;

        info!(%utxo_pos, owner = %output.owner, token = %output.token, amount = output.amount, %exitable_at, "standard exit started");

        self.emit(ExitEvent::ExitStarted {
            utxo_pos,
            owner: output.owner,
            token: output.token,
            amount: output.amount,
            exitable_at,
        });

        Ok(())
    }
}
