//! Parses command-line arguments for the exit simulator.

use std::path::PathBuf;

use clap::{crate_version, Parser};

#[derive(Debug, Parser)]
#[clap(
    name = "exit-sim",
    about = "Replays a Plasma exit scenario against an in-memory exit game",
    version = crate_version!()
)]
pub(crate) struct Cli {
    #[clap(
        long,
        short = 'p',
        help = "The file containing the exit game params, defaults are used if omitted"
    )]
    pub params: Option<PathBuf>,

    #[clap(
        long,
        short = 'c',
        help = "The file containing the configuration for the simulator",
        default_value = "config.toml"
    )]
    pub config: PathBuf,

    #[clap(long, short = 's', help = "The scenario to replay")]
    pub scenario: PathBuf,

    #[clap(
        long,
        short = 'o',
        help = "Where to write the JSON report, stdout if omitted"
    )]
    pub output: Option<PathBuf>,
}
