// mpn/src/cli.rs
//! Defines the command-line argument structure using clap.
use clap::{ArgAction, Parser, Subcommand};
use mpn_common::error::Result;
use mpn_common::Config;

pub mod build;
pub mod graph;
pub mod packages;
pub mod status;

use crate::cli::build::BuildArgs;
use crate::cli::graph::Graph;
use crate::cli::packages::Packages;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, name = "mpn", bin_name = "mpn")]
#[command(propagate_version = true)]
pub struct CliArgs {
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Copy sources and the npm packages they use into an output directory
    Build(BuildArgs),
    /// Print the dependency tree of one file
    Graph(Graph),
    /// List the packages installed in the package tree
    Packages(Packages),
}

impl Command {
    pub async fn run(&self, config: Config) -> Result<()> {
        match self {
            Self::Build(command) => command.run(config).await,
            Self::Graph(command) => command.run(config).await,
            Self::Packages(command) => command.run(config).await,
        }
    }
}
