//! Replays Plasma exit scenarios against an in-memory exit game and reports the outcome.

use std::{fs, path::Path};

use anyhow::Context;
use clap::Parser;
use config::Config;
use plasma_common::logging::{self, LoggerConfig};
use plasma_params::prelude::ExitGameParams;
use scenario::Scenario;
use serde::de::DeserializeOwned;
use sim::Simulator;
use tokio::runtime;
use tracing::{debug, info, trace};

mod args;
mod config;
mod scenario;
mod sim;

fn main() -> anyhow::Result<()> {
    let runtime = runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("could not create runtime")?;

    // the OTLP exporter needs a runtime to spawn its workers on
    let _guard = runtime.enter();
    logging::init(LoggerConfig::from_env("exit-sim"))?;

    let cli = args::Cli::parse();
    info!(scenario = %cli.scenario.display(), "starting exit simulator");

    let params = match &cli.params {
        Some(path) => parse_toml::<ExitGameParams>(path)?,
        None => ExitGameParams::default(),
    };
    params.validate().context("invalid params")?;

    let config = parse_toml::<Config>(&cli.config)?;
    let scenario = parse_toml::<Scenario>(&cli.scenario)?;

    let report =
        runtime.block_on(async move { Simulator::new(params, config).run(scenario).await })?;
    info!(
        events = report.events.len(),
        rejected = report.rejected.len(),
        "scenario replayed"
    );

    let json = serde_json::to_string_pretty(&report).context("could not serialize report")?;
    match &cli.output {
        Some(path) => {
            fs::write(path, json)
                .with_context(|| format!("could not write report to {}", path.display()))?;
            info!(path = %path.display(), "wrote report");
        }
        None => println!("{json}"),
    }

    Ok(())
}

/// Reads and parses a TOML file from the given path into the given type `T`.
fn parse_toml<T>(path: impl AsRef<Path>) -> anyhow::Result<T>
where
    T: std::fmt::Debug + DeserializeOwned,
{
    let path = path.as_ref();
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read TOML file {}", path.display()))?;
    trace!(?contents, "read file");

    let parsed = toml::from_str::<T>(&contents)
        .with_context(|| format!("failed to parse TOML file {}", path.display()))?;
    debug!(?parsed, "parsed TOML file");

    Ok(parsed)
}
