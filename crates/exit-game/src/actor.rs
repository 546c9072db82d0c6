//! Runs an [`ExitGame`] in its own task and serializes every call to it through a channel.

use std::time::Duration;

use plasma_primitives::types::{Address, Amount, TxHash};
use thiserror::Error;
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::{
    commands::{CommandOutcome, ExitGameCommand},
    errors::ExitGameError,
    events::ExitEvent,
    external::{ChildChain, Clock, Vault},
    game::{ExitGame, ExitGameState},
    queue::ExitId,
};

/// How long [`ExitGameActor::shutdown`] waits for the task to finish.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors raised by an [`ExitGameActor`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActorError {
    /// The actor is no longer running.
    #[error("exit game actor has shut down")]
    Shutdown,

    /// The operation was refused by the exit game.
    #[error(transparent)]
    Game(#[from] ExitGameError),

    /// The actor task did not finish cleanly.
    #[error("exit game actor task failed: {0}")]
    Task(String),
}

/// Messages handled by an [`ExitGameActor`].
#[derive(Debug)]
pub enum ExitGameActorMessage {
    /// Applies an [`ExitGameCommand`].
    Execute {
        /// The command to apply.
        command: ExitGameCommand,

        /// Channel to send the response back.
        respond_to: oneshot::Sender<Result<CommandOutcome, ExitGameError>>,
    },

    /// Gets a copy of the current [`ExitGameState`].
    GetSnapshot {
        /// Channel to send the response back.
        respond_to: oneshot::Sender<ExitGameState>,
    },

    /// Takes every [`ExitEvent`] emitted so far.
    DrainEvents {
        /// Channel to send the response back.
        respond_to: oneshot::Sender<Vec<ExitEvent>>,
    },

    /// Stops the actor.
    Shutdown,
}

/// Handle to an [`ExitGame`] running in its own task.
#[derive(Debug)]
pub struct ExitGameActor {
    sender: mpsc::UnboundedSender<ExitGameActorMessage>,
    handle: JoinHandle<()>,
}

impl ExitGameActor {
    /// Moves `game` into a new task.
    pub fn spawn<C, V, L>(mut game: ExitGame<C, V, L>) -> Self
    where
        C: Clock + Send + 'static,
        V: Vault + Send + 'static,
        L: ChildChain + Send + 'static,
    {
        let (sender, mut receiver) = mpsc::unbounded_channel();

        let handle = tokio::spawn(async move {
            info!("exit game actor started");

            while let Some(message) = receiver.recv().await {
                match message {
                    ExitGameActorMessage::Execute {
                        command,
                        respond_to,
                    } => {
                        let name = command.name();
                        debug!(command = name, "executing command");

                        let result = game.execute(command);
                        if let Err(err) = &result {
                            warn!(command = name, %err, "command refused");
                        }

                        let _ = respond_to.send(result);
                    }
                    ExitGameActorMessage::GetSnapshot { respond_to } => {
                        let _ = respond_to.send(game.snapshot());
                    }
                    ExitGameActorMessage::DrainEvents { respond_to } => {
                        let _ = respond_to.send(game.drain_events());
                    }
                    ExitGameActorMessage::Shutdown => {
                        info!("exit game actor shutting down");
                        break;
                    }
                }
            }

            info!("exit game actor terminated");
        });

        Self { sender, handle }
    }

    /// Applies a command and waits for its outcome.
    pub async fn execute(&self, command: ExitGameCommand) -> Result<CommandOutcome, ActorError> {
        let (respond_to, receiver) = oneshot::channel();
        self.sender
            .send(ExitGameActorMessage::Execute {
                command,
                respond_to,
            })
            .map_err(|_| ActorError::Shutdown)?;

        Ok(receiver.await.map_err(|_| ActorError::Shutdown)??)
    }

    /// Registers a token.
    pub async fn add_token(&self, token: Address) -> Result<(), ActorError> {
        self.execute(ExitGameCommand::AddToken { token })
            .await
            .map(|_| ())
    }

    /// Piggybacks an input of an in-flight exit.
    pub async fn piggyback_input(
        &self,
        sender: Address,
        tx_hash: TxHash,
        index: usize,
        bond: Amount,
    ) -> Result<(), ActorError> {
        self.execute(ExitGameCommand::PiggybackInput {
            sender,
            tx_hash,
            index,
            bond,
        })
        .await
        .map(|_| ())
    }

    /// Piggybacks an output of an in-flight exit.
    pub async fn piggyback_output(
        &self,
        sender: Address,
        tx_hash: TxHash,
        index: usize,
        bond: Amount,
    ) -> Result<(), ActorError> {
        self.execute(ExitGameCommand::PiggybackOutput {
            sender,
            tx_hash,
            index,
            bond,
        })
        .await
        .map(|_| ())
    }

    /// Processes up to `max_count` exits of `token` and returns how many entries were consumed.
    pub async fn process_exits(
        &self,
        token: Address,
        top_exit_hint: Option<ExitId>,
        max_count: u32,
    ) -> Result<u32, ActorError> {
        match self
            .execute(ExitGameCommand::ProcessExits {
                token,
                top_exit_hint,
                max_count,
            })
            .await?
        {
            CommandOutcome::Processed(count) => Ok(count),
            other => Err(ActorError::Task(format!(
                "unexpected outcome of process_exits: {other:?}"
            ))),
        }
    }

    /// Gets a copy of the current state.
    pub async fn snapshot(&self) -> Result<ExitGameState, ActorError> {
        let (respond_to, receiver) = oneshot::channel();
        self.sender
            .send(ExitGameActorMessage::GetSnapshot { respond_to })
            .map_err(|_| ActorError::Shutdown)?;

        receiver.await.map_err(|_| ActorError::Shutdown)
    }

    /// Takes every event emitted so far.
    pub async fn drain_events(&self) -> Result<Vec<ExitEvent>, ActorError> {
        let (respond_to, receiver) = oneshot::channel();
        self.sender
            .send(ExitGameActorMessage::DrainEvents { respond_to })
            .map_err(|_| ActorError::Shutdown)?;

        receiver.await.map_err(|_| ActorError::Shutdown)
    }

    /// Stops the actor and waits for its task to finish.
    pub async fn shutdown(self) -> Result<(), ActorError> {
        let _ = self.sender.send(ExitGameActorMessage::Shutdown);

        match tokio::time::timeout(SHUTDOWN_TIMEOUT, self.handle).await {
            Ok(result) => result.map_err(|err| ActorError::Task(err.to_string())),
            Err(_) => {
                warn!("exit game actor shutdown timed out");
                Err(ActorError::Task("shutdown timed out".to_string()))
            }
        }
    }
}
