//! Every mutating operation of the exit game as a value, so it can be queued, logged and replayed.

use plasma_primitives::types::{Address, Amount, TxHash};
use serde::{Deserialize, Serialize};

use crate::{
    errors::ExitGameResult,
    external::{ChildChain, Clock, Vault},
    game::ExitGame,
    queue::ExitId,
    requests::{
        ChallengeInFlightNotCanonical, ChallengeStandardExit, RespondToNonCanonicalChallenge,
        StartInFlightExit, StartStandardExit,
    },
};

/// A mutating operation on the exit game, together with its caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum ExitGameCommand {
    /// See [`ExitGame::add_token`].
    AddToken {
        /// The token to register.
        token: Address,
    },

    /// See [`ExitGame::start_standard_exit`].
    StartStandardExit {
        /// The owner of the exited output.
        sender: Address,
        /// The exit request.
        request: StartStandardExit,
        /// The posted bond.
        bond: Amount,
    },

    /// See [`ExitGame::start_in_flight_exit`].
    StartInFlightExit {
        /// Whoever starts the exit.
        sender: Address,
        /// The exit request.
        request: StartInFlightExit,
        /// The posted bond.
        bond: Amount,
    },

    /// See [`ExitGame::piggyback_input`].
    PiggybackInput {
        /// The owner of the input.
        sender: Address,
        /// The in-flight transaction.
        tx_hash: TxHash,
        /// The input index.
        index: usize,
        /// The posted bond.
        bond: Amount,
    },

    /// See [`ExitGame::piggyback_output`].
    PiggybackOutput {
        /// The owner of the output.
        sender: Address,
        /// The in-flight transaction.
        tx_hash: TxHash,
        /// The output index.
        index: usize,
        /// The posted bond.
        bond: Amount,
    },

    /// See [`ExitGame::challenge_standard_exit`].
    ChallengeStandardExit {
        /// The challenger.
        challenger: Address,
        /// The challenge.
        request: ChallengeStandardExit,
    },

    /// See [`ExitGame::challenge_in_flight_exit_not_canonical`].
    ChallengeInFlightNotCanonical {
        /// The challenger.
        challenger: Address,
        /// The challenge.
        request: ChallengeInFlightNotCanonical,
    },

    /// See [`ExitGame::respond_to_non_canonical_challenge`].
    RespondToNonCanonicalChallenge {
        /// The responder.
        responder: Address,
        /// The response.
        request: RespondToNonCanonicalChallenge,
    },

    /// See [`ExitGame::process_exits`].
    ProcessExits {
        /// The token whose queue to drain.
        token: Address,
        /// The exit expected at the head of the queue.
        top_exit_hint: Option<ExitId>,
        /// The maximum number of entries to consume.
        max_count: u32,
    },
}

impl ExitGameCommand {
    /// The name of the operation, for logging.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::AddToken { .. } => "add_token",
            Self::StartStandardExit { .. } => "start_standard_exit",
            Self::StartInFlightExit { .. } => "start_in_flight_exit",
            Self::PiggybackInput { .. } => "piggyback_input",
            Self::PiggybackOutput { .. } => "piggyback_output",
            Self::ChallengeStandardExit { .. } => "challenge_standard_exit",
            Self::ChallengeInFlightNotCanonical { .. } => "challenge_in_flight_exit_not_canonical",
            Self::RespondToNonCanonicalChallenge { .. } => "respond_to_non_canonical_challenge",
            Self::ProcessExits { .. } => "process_exits",
        }
    }
}

/// What a successful [`ExitGameCommand`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandOutcome {
    /// The command has no return value.
    Done,

    /// An in-flight exit of the transaction with this hash was started.
    InFlightExitStarted(TxHash),

    /// This many queue entries were consumed.
    Processed(u32),
}

impl<C, V, L> ExitGame<C, V, L>
where
    C: Clock,
    V: Vault,
    L: ChildChain,
{
    /// Applies a command.
    pub fn execute(&mut self, command: ExitGameCommand) -> ExitGameResult<CommandOutcome> {
        match command {
            ExitGameCommand::AddToken { token } => self.add_token(token).map(|_| CommandOutcome::Done),
            ExitGameCommand::StartStandardExit {
                sender,
                request,
                bond,
            } => self
                .start_standard_exit(sender, request, bond)
                .map(|_| CommandOutcome::Done),
            ExitGameCommand::StartInFlightExit {
                sender,
                request,
                bond,
            } => self
                .start_in_flight_exit(sender, request, bond)
                .map(CommandOutcome::InFlightExitStarted),
            ExitGameCommand::PiggybackInput {
                sender,
                tx_hash,
                index,
                bond,
            } => self
                .piggyback_input(sender, tx_hash, index, bond)
                .map(|_| CommandOutcome::Done),
            ExitGameCommand::PiggybackOutput {
                sender,
                tx_hash,
                index,
                bond,
            } => self
                .piggyback_output(sender, tx_hash, index, bond)
                .map(|_| CommandOutcome::Done),
            ExitGameCommand::ChallengeStandardExit {
                challenger,
                request,
            } => self
                .challenge_standard_exit(challenger, request)
                .map(|_| CommandOutcome::Done),
            ExitGameCommand::ChallengeInFlightNotCanonical {
                challenger,
                request,
            } => self
                .challenge_in_flight_exit_not_canonical(challenger, request)
                .map(|_| CommandOutcome::Done),
            ExitGameCommand::RespondToNonCanonicalChallenge { responder, request } => self
                .respond_to_non_canonical_challenge(responder, request)
                .map(|_| CommandOutcome::Done),
            ExitGameCommand::ProcessExits {
                token,
                top_exit_hint,
                max_count,
            } => self
                .process_exits(token, top_exit_hint, max_count)
                .map(CommandOutcome::Processed),
        }
    }
}
