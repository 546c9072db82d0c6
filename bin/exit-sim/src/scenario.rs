//! The scenario file format.
//!
//! A scenario is a list of steps replayed in order. Accounts and tokens are referred to by name,
//! transactions by the label given when they were created and outputs as `label:oindex`.

use std::str::FromStr;

use anyhow::{anyhow, Context};
use plasma_primitives::types::Amount;
use serde::{Deserialize, Serialize};

/// Name of the native token in scenario files.
pub(crate) const NATIVE: &str = "native";

/// A scenario to replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Scenario {
    /// The steps in replay order.
    pub steps: Vec<Step>,
}

/// An output of a transaction built by the scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct OutputSpec {
    pub owner: String,
    pub token: String,
    pub amount: Amount,
}

/// A single step of a scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub(crate) enum Step {
    /// Registers a token.
    AddToken { token: String },

    /// Deposits funds for `owner` in a block of its own.
    Deposit {
        label: String,
        owner: String,
        token: String,
        amount: Amount,
    },

    /// Builds a transaction signed by `signers`, one per input, and includes it unless told not
    /// to.
    Spend {
        label: String,
        inputs: Vec<OutputRef>,
        signers: Vec<String>,
        outputs: Vec<OutputSpec>,
        #[serde(default = "default_include")]
        include: bool,
    },

    /// Includes a transaction built by an earlier `spend` step with `include = false`.
    Include { tx: String },

    /// Moves the clock forward.
    AdvanceTime { seconds: u64 },

    StartStandardExit { owner: String, utxo: OutputRef },

    StartInFlightExit { sender: String, tx: String },

    PiggybackInput {
        owner: String,
        tx: String,
        index: usize,
    },

    PiggybackOutput {
        owner: String,
        tx: String,
        index: usize,
    },

    ChallengeStandardExit {
        challenger: String,
        utxo: OutputRef,
        spending_tx: String,
        input_index: usize,
    },

    /// Challenges the in-flight exit of `tx` with `competing_tx`, proving its inclusion if it was
    /// included.
    ChallengeInFlightExitNotCanonical {
        challenger: String,
        tx: String,
        input_index: usize,
        competing_tx: String,
        competing_input_index: usize,
    },

    RespondToNonCanonicalChallenge { responder: String, tx: String },

    ProcessExits {
        token: String,
        #[serde(default = "default_max_count")]
        max_count: u32,
    },
}

const fn default_include() -> bool {
    true
}

const fn default_max_count() -> u32 {
    u32::MAX
}

impl Step {
    /// The name of the action, as written in scenario files.
    pub(crate) const fn action(&self) -> &'static str {
        match self {
            Step::AddToken { .. } => "add_token",
            Step::Deposit { .. } => "deposit",
            Step::Spend { .. } => "spend",
            Step::Include { .. } => "include",
            Step::AdvanceTime { .. } => "advance_time",
            Step::StartStandardExit { .. } => "start_standard_exit",
            Step::StartInFlightExit { .. } => "start_in_flight_exit",
            Step::PiggybackInput { .. } => "piggyback_input",
            Step::PiggybackOutput { .. } => "piggyback_output",
            Step::ChallengeStandardExit { .. } => "challenge_standard_exit",
            Step::ChallengeInFlightExitNotCanonical { .. } => {
                "challenge_in_flight_exit_not_canonical"
            }
            Step::RespondToNonCanonicalChallenge { .. } => "respond_to_non_canonical_challenge",
            Step::ProcessExits { .. } => "process_exits",
        }
    }
}

/// A reference to an output of a labelled transaction, written as `label:oindex`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct OutputRef {
    pub label: String,
    pub oindex: usize,
}

impl FromStr for OutputRef {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (label, oindex) = s
            .rsplit_once(':')
            .ok_or_else(|| anyhow!("output reference `{s}` must look like `label:oindex`"))?;

        if label.is_empty() {
            return Err(anyhow!("output reference `{s}` has no label"));
        }

        let oindex = oindex
            .parse()
            .with_context(|| format!("invalid output index in `{s}`"))?;

        Ok(Self {
            label: label.to_string(),
            oindex,
        })
    }
}

impl std::fmt::Display for OutputRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.label, self.oindex)
    }
}

impl Serialize for OutputRef {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for OutputRef {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;

        s.parse().map_err(serde::de::Error::custom)
    }
}
