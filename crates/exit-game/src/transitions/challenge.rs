//! Challenging standard exits of spent outputs.

use plasma_params::prelude::ChallengeBondPolicy;
use plasma_primitives::types::Address;
use tracing::info;

use crate::{
    errors::{ExitGameError, ExitGameResult},
    events::ExitEvent,
    external::{ChildChain, Clock, Payout, Vault},
    game::ExitGame,
    piggyback::Slot,
    requests::ChallengeStandardExit,
};

impl<C, V, L> ExitGame<C, V, L>
where
    C: Clock,
    V: Vault,
    L: ChildChain,
{
    /// Cancels a standard exit by showing a transaction, signed by the exit owner, that spends the
    /// exited output.
    ///
    /// The exit is cleared immediately and its queue entry becomes stale. The bond is handled
    /// according to the configured [`ChallengeBondPolicy`].
    pub fn challenge_standard_exit(
        &mut self,
        challenger: Address,
        request: ChallengeStandardExit,
    ) -> ExitGameResult<()> {
        let ChallengeStandardExit {
            utxo_pos,
            spending_tx,
            input_index,
        } = request;

        let exit = match self.state.exits.standard_exit(&utxo_pos) {
            Some(exit) if exit.is_active() => *exit,
            _ => {
                return Err(ExitGameError::NotChallengeable(format!(
                    "no active exit for {utxo_pos}"
                )))
            }
        };

        let slot = Slot::input(input_index)?;
        let spending_tx = Self::decode_tx(&spending_tx)?;

        if spending_tx.inputs()[slot.index()] != utxo_pos {
            return Err(ExitGameError::NotChallengeable(format!(
                "{slot} of the spending transaction does not spend {utxo_pos}"
            )));
        }

        if spending_tx.signers()[slot.index()] != exit.owner {
            return Err(ExitGameError::NotChallengeable(
                "the spend is not signed by the exit owner".to_string(),
            ));
        }

        match self.params.challenge_bond_policy {
            ChallengeBondPolicy::Challenger => {
                self.vault.settle(&[Payout::native(challenger, exit.bond)])?
            }
            ChallengeBondPolicy::Retained => {}
        }

        self.state.exits.challenge_standard_exit(&utxo_pos)?;

        info!(%utxo_pos, %challenger, policy = ?self.params.challenge_bond_policy, "standard exit challenged");

        self.emit(ExitEvent::ExitChallenged {
            utxo_pos,
            challenger,
        });

        Ok(())
    }
}
