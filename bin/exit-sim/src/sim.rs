//! Replays a [`Scenario`] against an exit game running in an [`ExitGameActor`].

use std::collections::BTreeMap;

use anyhow::{anyhow, bail, Context};
use plasma_exit_game::{
    actor::{ActorError, ExitGameActor},
    commands::{CommandOutcome, ExitGameCommand},
    events::ExitEvent,
    external::Clock,
    game::{ExitGame, ExitGameState},
    inmemory::{InMemoryChildChain, InMemoryVault, ManualClock},
    requests::{
        ChallengeInFlightNotCanonical, ChallengeStandardExit, Inclusion, ProvenTx,
        RespondToNonCanonicalChallenge, StartInFlightExit, StartStandardExit,
    },
};
use plasma_params::prelude::ExitGameParams;
use plasma_primitives::{
    tx::{Transaction, TxOutput},
    types::{Address, Amount, TxHash},
    utxo::{TxPos, UtxoPos},
};
use plasma_test_utils::prelude::{deposit_tx, spend_tx, TestAccount};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    config::Config,
    scenario::{OutputRef, OutputSpec, Scenario, Step, NATIVE},
};

/// A step the exit game refused.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct RejectedStep {
    pub step: usize,
    pub action: &'static str,
    pub error: String,
}

/// The outcome of a replayed scenario.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct Report {
    /// Every event in emission order.
    pub events: Vec<ExitEvent>,

    /// The steps the exit game refused.
    pub rejected: Vec<RejectedStep>,

    /// The final balance of every account, by account and token name.
    pub balances: BTreeMap<String, BTreeMap<String, Amount>>,

    /// What is still open once the scenario ends.
    pub pending: PendingExits,

    /// The final state of the exit game.
    pub state: ExitGameState,
}

/// Exits a scenario left unsettled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub(crate) struct PendingExits {
    /// Queue entries per registered token, stale ones included.
    pub queued: BTreeMap<Address, usize>,

    /// Standard exits neither finalized nor challenged.
    pub standard: Vec<UtxoPos>,

    /// In-flight exits not yet cleared.
    pub in_flight: Vec<TxHash>,
}

impl PendingExits {
    fn of(state: &ExitGameState) -> Self {
        let queued = state
            .queues
            .tokens()
            .map(|token| (*token, state.queues.len(token).unwrap_or_default()))
            .collect();
        let standard = state
            .exits
            .standard_exits()
            .filter(|exit| exit.is_active())
            .map(|exit| exit.position)
            .collect();
        let in_flight = state
            .exits
            .in_flight_exits()
            .filter(|(_, exit)| exit.is_active())
            .map(|(tx_hash, _)| *tx_hash)
            .collect();

        Self {
            queued,
            standard,
            in_flight,
        }
    }
}

#[derive(Debug, Clone)]
struct LabelledTx {
    tx: Transaction,
    position: Option<TxPos>,
}

/// Drives an exit game through a scenario.
#[derive(Debug)]
pub(crate) struct Simulator {
    params: ExitGameParams,
    config: Config,
    actor: ExitGameActor,
    clock: ManualClock,
    vault: InMemoryVault,
    chain: InMemoryChildChain,
    accounts: BTreeMap<String, TestAccount>,
    tokens: BTreeMap<String, Address>,
    txs: BTreeMap<String, LabelledTx>,
    in_flight: BTreeMap<String, TxHash>,
    events: Vec<ExitEvent>,
    rejected: Vec<RejectedStep>,
}

impl Simulator {
    /// Spawns a fresh exit game. Must be called within a tokio runtime.
    pub(crate) fn new(params: ExitGameParams, config: Config) -> Self {
        let clock = ManualClock::new(config.start_timestamp);
        let vault = InMemoryVault::new();
        let chain = InMemoryChildChain::new();

        let game = ExitGame::new(params, clock.clone(), vault.clone(), chain.clone());

        Self {
            params,
            config,
            actor: ExitGameActor::spawn(game),
            clock,
            vault,
            chain,
            accounts: BTreeMap::new(),
            tokens: BTreeMap::from([(NATIVE.to_string(), Address::NATIVE_TOKEN)]),
            txs: BTreeMap::new(),
            in_flight: BTreeMap::new(),
            events: Vec::new(),
            rejected: Vec::new(),
        }
    }

    /// Replays every step, shuts the exit game down and reports the outcome.
    ///
    /// Steps refused by the exit game are recorded and skipped. Malformed steps, e.g. references
    /// to unknown labels, abort the replay.
    pub(crate) async fn run(mut self, scenario: Scenario) -> anyhow::Result<Report> {
        info!(steps = scenario.steps.len(), "replaying scenario");

        for (index, step) in scenario.steps.into_iter().enumerate() {
            let action = step.action();
            debug!(step = index, action, now = self.clock.now(), "replaying step");

            match self.apply(step).await {
                Ok(()) => {}
                Err(StepError::Refused(err)) => {
                    warn!(step = index, action, %err, "step refused");
                    self.rejected.push(RejectedStep {
                        step: index,
                        action,
                        error: err.to_string(),
                    });
                }
                Err(StepError::Fatal(err)) => {
                    return Err(err.context(format!("step {index} ({action}) failed")));
                }
            }

            for event in self.actor.drain_events().await? {
                info!(step = index, %event, "exit game event");
                self.events.push(event);
            }
        }

        let state = self.actor.snapshot().await?;
        let balances = self.balances();
        let pending = PendingExits::of(&state);
        self.actor.shutdown().await?;

        info!(
            standard = pending.standard.len(),
            in_flight = pending.in_flight.len(),
            "scenario replayed"
        );

        Ok(Report {
            events: self.events,
            rejected: self.rejected,
            balances,
            pending,
            state,
        })
    }

    async fn apply(&mut self, step: Step) -> Result<(), StepError> {
        match step {
            Step::AddToken { token } => {
                let token = self.token(&token)?;
                self.execute(ExitGameCommand::AddToken { token }).await?;
            }
            Step::Deposit {
                label,
                owner,
                token,
                amount,
            } => {
                let owner = self.account(&owner);
                let token = self.token(&token)?;

                self.vault.mint(token, owner.address, amount);
                self.vault
                    .deposit(token, owner.address, amount)
                    .context("deposit failed")?;

                let tx = deposit_tx(owner.address, token, amount);
                self.label(label, tx, true)?;
            }
            Step::Spend {
                label,
                inputs,
                signers,
                outputs,
                include,
            } => {
                if signers.len() != inputs.len() {
                    return Err(anyhow!(
                        "{} inputs need {} signers, got {}",
                        inputs.len(),
                        inputs.len(),
                        signers.len()
                    )
                    .into());
                }

                let inputs = inputs
                    .iter()
                    .map(|input| self.utxo(input))
                    .collect::<anyhow::Result<Vec<_>>>()?;
                let keys: Vec<_> = signers.iter().map(|name| self.account(name).key).collect();
                let outputs = outputs
                    .iter()
                    .map(|output| self.output(output))
                    .collect::<anyhow::Result<Vec<_>>>()?;

                if inputs.len() > 4 || outputs.len() > 4 {
                    return Err(anyhow!("a transaction has at most 4 inputs and 4 outputs").into());
                }

                let tx = spend_tx(&inputs, &keys, &outputs);
                self.label(label, tx, include)?;
            }
            Step::Include { tx } => {
                let labelled = self.labelled(&tx)?;
                if labelled.position.is_some() {
                    return Err(anyhow!("transaction `{tx}` is already included").into());
                }

                let position = self.submit(labelled.tx.clone())?;
                if let Some(labelled) = self.txs.get_mut(&tx) {
                    labelled.position = Some(position);
                }
            }
            Step::AdvanceTime { seconds } => {
                self.clock.advance(seconds);
            }
            Step::StartStandardExit { owner, utxo } => {
                let owner = self.account(&owner);
                let utxo_pos = self.utxo(&utxo)?;
                let request = StartStandardExit {
                    utxo_pos,
                    output_tx: self.proven(&utxo.label)?,
                };

                let bond = self.params.standard_exit_bond;
                self.execute(ExitGameCommand::StartStandardExit {
                    sender: owner.address,
                    request,
                    bond,
                })
                .await?;
            }
            Step::StartInFlightExit { sender, tx } => {
                let sender = self.account(&sender);
                let in_flight_tx = self.labelled(&tx)?.tx.clone();

                let input_txs = in_flight_tx
                    .spent_inputs()
                    .map(|(_, pos)| self.proven_at(pos.tx_pos()))
                    .collect::<anyhow::Result<Vec<_>>>()?;
                let request = StartInFlightExit {
                    in_flight_tx: in_flight_tx.encode(),
                    input_txs,
                };

                let bond = self.params.in_flight_exit_bond;
                let outcome = self
                    .execute(ExitGameCommand::StartInFlightExit {
                        sender: sender.address,
                        request,
                        bond,
                    })
                    .await?;

                if let CommandOutcome::InFlightExitStarted(tx_hash) = outcome {
                    self.in_flight.insert(tx, tx_hash);
                }
            }
            Step::PiggybackInput { owner, tx, index } => {
                let owner = self.account(&owner);
                let tx_hash = self.tx_hash(&tx)?;

                self.execute(ExitGameCommand::PiggybackInput {
                    sender: owner.address,
                    tx_hash,
                    index,
                    bond: self.params.piggyback_bond,
                })
                .await?;
            }
            Step::PiggybackOutput { owner, tx, index } => {
                let owner = self.account(&owner);
                let tx_hash = self.tx_hash(&tx)?;

                self.execute(ExitGameCommand::PiggybackOutput {
                    sender: owner.address,
                    tx_hash,
                    index,
                    bond: self.params.piggyback_bond,
                })
                .await?;
            }
            Step::ChallengeStandardExit {
                challenger,
                utxo,
                spending_tx,
                input_index,
            } => {
                let challenger = self.account(&challenger);
                let request = ChallengeStandardExit {
                    utxo_pos: self.utxo(&utxo)?,
                    spending_tx: self.labelled(&spending_tx)?.tx.encode(),
                    input_index,
                };

                self.execute(ExitGameCommand::ChallengeStandardExit {
                    challenger: challenger.address,
                    request,
                })
                .await?;
            }
            Step::ChallengeInFlightExitNotCanonical {
                challenger,
                tx,
                input_index,
                competing_tx,
                competing_input_index,
            } => {
                let challenger = self.account(&challenger);
                let competitor = self.labelled(&competing_tx)?.clone();
                let competitor_inclusion = competitor
                    .position
                    .map(|position| self.inclusion(position))
                    .transpose()?;

                let request = ChallengeInFlightNotCanonical {
                    in_flight_tx: self.labelled(&tx)?.tx.encode(),
                    in_flight_input_index: input_index,
                    competing_tx: competitor.tx.encode(),
                    competing_input_index,
                    competitor_inclusion,
                };

                self.execute(ExitGameCommand::ChallengeInFlightNotCanonical {
                    challenger: challenger.address,
                    request,
                })
                .await?;
            }
            Step::RespondToNonCanonicalChallenge { responder, tx } => {
                let responder = self.account(&responder);
                let labelled = self.labelled(&tx)?.clone();
                let position = labelled
                    .position
                    .ok_or_else(|| anyhow!("transaction `{tx}` was never included"))?;

                let request = RespondToNonCanonicalChallenge {
                    in_flight_tx: labelled.tx.encode(),
                    inclusion: self.inclusion(position)?,
                };

                self.execute(ExitGameCommand::RespondToNonCanonicalChallenge {
                    responder: responder.address,
                    request,
                })
                .await?;
            }
            Step::ProcessExits { token, max_count } => {
                let token = self.token(&token)?;
                self.execute(ExitGameCommand::ProcessExits {
                    token,
                    top_exit_hint: None,
                    max_count,
                })
                .await?;
            }
        }

        Ok(())
    }

    async fn execute(&self, command: ExitGameCommand) -> Result<CommandOutcome, StepError> {
        match self.actor.execute(command).await {
            Ok(outcome) => {
                debug!(?outcome, "command applied");
                Ok(outcome)
            }
            Err(ActorError::Game(err)) => Err(StepError::Refused(err.into())),
            Err(err) => Err(StepError::Fatal(err.into())),
        }
    }

    /// The account with this name, created and funded on first use.
    fn account(&mut self, name: &str) -> TestAccount {
        if let Some(account) = self.accounts.get(name) {
            return *account;
        }

        let account = TestAccount::from_seed(name);
        self.vault.mint(
            Address::NATIVE_TOKEN,
            account.address,
            self.config.initial_account_balance,
        );
        self.accounts.insert(name.to_string(), account);

        debug!(%name, address = %account.address, "created account");

        account
    }

    /// The token with this name: `native`, a hex address or a name that derives an address.
    fn token(&mut self, name: &str) -> anyhow::Result<Address> {
        if let Some(token) = self.tokens.get(name) {
            return Ok(*token);
        }

        let token = if name.starts_with("0x") {
            name.parse::<Address>()
                .with_context(|| format!("invalid token address `{name}`"))?
        } else {
            TestAccount::from_seed(&format!("token:{name}")).address
        };
        self.tokens.insert(name.to_string(), token);

        Ok(token)
    }

    fn output(&mut self, spec: &OutputSpec) -> anyhow::Result<TxOutput> {
        let owner = self.account(&spec.owner).address;
        let token = self.token(&spec.token)?;

        Ok(TxOutput::new(owner, token, spec.amount))
    }

    fn labelled(&self, label: &str) -> anyhow::Result<&LabelledTx> {
        self.txs
            .get(label)
            .ok_or_else(|| anyhow!("unknown transaction `{label}`"))
    }

    fn tx_hash(&self, label: &str) -> anyhow::Result<TxHash> {
        self.in_flight
            .get(label)
            .copied()
            .ok_or_else(|| anyhow!("transaction `{label}` has no in-flight exit"))
    }

    fn utxo(&self, output: &OutputRef) -> anyhow::Result<UtxoPos> {
        let position = self
            .labelled(&output.label)?
            .position
            .ok_or_else(|| anyhow!("transaction `{}` was never included", output.label))?;

        Ok(position.output(output.oindex)?)
    }

    /// Stores a transaction under `label`, including it if asked to.
    fn label(&mut self, label: String, tx: Transaction, include: bool) -> anyhow::Result<()> {
        if self.txs.contains_key(&label) {
            bail!("label `{label}` is already taken");
        }

        let position = if include {
            Some(self.submit(tx.clone())?)
        } else {
            None
        };

        debug!(%label, tx_hash = %tx.hash(), ?position, "labelled transaction");
        self.txs.insert(label, LabelledTx { tx, position });

        Ok(())
    }

    /// Includes a transaction in a block of its own and moves the clock one block forward.
    fn submit(&self, tx: Transaction) -> anyhow::Result<TxPos> {
        let blknum = self.chain.submit_block(self.clock.now(), vec![tx]);
        self.clock.advance(self.config.block_interval);

        Ok(TxPos::new(blknum, 0)?)
    }

    fn inclusion(&self, position: TxPos) -> anyhow::Result<Inclusion> {
        let proof = self
            .chain
            .inclusion_proof(position)
            .ok_or_else(|| anyhow!("nothing is included at {position}"))?;

        Ok(Inclusion { position, proof })
    }

    fn proven(&self, label: &str) -> anyhow::Result<ProvenTx> {
        let labelled = self.labelled(label)?;
        let position = labelled
            .position
            .ok_or_else(|| anyhow!("transaction `{label}` was never included"))?;

        self.proven_at(position)
    }

    fn proven_at(&self, position: TxPos) -> anyhow::Result<ProvenTx> {
        let tx = self
            .chain
            .transaction(position)
            .ok_or_else(|| anyhow!("nothing is included at {position}"))?;
        let Inclusion { proof, .. } = self.inclusion(position)?;

        Ok(ProvenTx {
            tx: tx.encode(),
            proof,
        })
    }

    fn balances(&self) -> BTreeMap<String, BTreeMap<String, Amount>> {
        self.accounts
            .iter()
            .map(|(name, account)| {
                let balances = self
                    .tokens
                    .iter()
                    .map(|(token_name, token)| {
                        (token_name.clone(), self.vault.balance(*token, account.address))
                    })
                    .collect();

                (name.clone(), balances)
            })
            .collect()
    }
}

/// Why a step did not apply.
#[derive(Debug)]
enum StepError {
    /// The exit game refused the step; the replay goes on.
    Refused(anyhow::Error),

    /// The step cannot be replayed at all.
    Fatal(anyhow::Error),
}

impl From<anyhow::Error> for StepError {
    fn from(err: anyhow::Error) -> Self {
        StepError::Fatal(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn replay(scenario: &str) -> Report {
        let scenario = toml::from_str::<Scenario>(scenario).unwrap();

        Simulator::new(ExitGameParams::default(), Config::default())
            .run(scenario)
            .await
            .unwrap()
    }

    fn balance(report: &Report, account: &str, token: &str) -> Amount {
        report.balances[account][token]
    }

    #[tokio::test]
    async fn test_standard_exit_scenario() {
        let report = replay(include_str!("../scenarios/standard_exit.toml")).await;
        let config = Config::default();
        let bond = ExitGameParams::default().standard_exit_bond;

        assert!(report.rejected.is_empty(), "{:?}", report.rejected);
        assert_eq!(balance(&report, "alice", NATIVE), config.initial_account_balance + 100);
        assert_eq!(
            balance(&report, "bob", NATIVE),
            config.initial_account_balance + bond,
            "bob challenged carol's exit"
        );
        assert_eq!(
            balance(&report, "carol", NATIVE),
            config.initial_account_balance - bond
        );
        assert!(report
            .events
            .iter()
            .any(|event| matches!(event, ExitEvent::ExitChallenged { .. })));
    }

    #[tokio::test]
    async fn test_in_flight_split_scenario() {
        let report = replay(include_str!("../scenarios/in_flight_split.toml")).await;

        assert!(report.rejected.is_empty(), "{:?}", report.rejected);
        assert_eq!(balance(&report, "alice", "gold"), 33);
        assert_eq!(balance(&report, "bob", "gold"), 67);
        assert!(matches!(
            report.events.last(),
            Some(ExitEvent::InFlightExitCleared { .. })
        ));

        // the cleared exit still has its stale native entry
        let pending = &report.pending;
        assert!(pending.in_flight.is_empty());
        assert_eq!(pending.queued[&Address::NATIVE_TOKEN], 1);
        assert_eq!(pending.queued.len(), 2);
    }

    #[tokio::test]
    async fn test_unprocessed_exits_are_pending() {
        let scenario = r#"
            [[steps]]
            action = "deposit"
            label = "alice-deposit"
            owner = "alice"
            token = "native"
            amount = 100

            [[steps]]
            action = "start_standard_exit"
            owner = "alice"
            utxo = "alice-deposit:0"
        "#;
        let report = replay(scenario).await;

        assert_eq!(report.pending.standard.len(), 1);
        assert!(report.pending.in_flight.is_empty());
        assert_eq!(
            report.pending.queued,
            BTreeMap::from([(Address::NATIVE_TOKEN, 1)])
        );
    }

    #[tokio::test]
    async fn test_double_spend_scenario() {
        let report = replay(include_str!("../scenarios/double_spend.toml")).await;

        assert_eq!(report.rejected.len(), 1, "{:?}", report.rejected);
        assert_eq!(report.rejected[0].action, "piggyback_output");
        assert_eq!(balance(&report, "alice", "gold"), 100);
        assert_eq!(balance(&report, "bob", "gold"), 0);
    }

    #[tokio::test]
    async fn test_unknown_label_aborts() {
        let scenario = r#"
            [[steps]]
            action = "start_standard_exit"
            owner = "alice"
            utxo = "missing:0"
        "#;
        let scenario = toml::from_str::<Scenario>(scenario).unwrap();

        let result = Simulator::new(ExitGameParams::default(), Config::default())
            .run(scenario)
            .await;
        assert!(result.is_err());
    }
}
