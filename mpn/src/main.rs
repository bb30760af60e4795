// mpn/src/main.rs
use std::process;

use clap::Parser;
use colored::Colorize;
use mpn_common::config::Config;
use mpn_common::error::{MpnError, Result as MpnResult};
use tracing::level_filters::LevelFilter;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

mod cli;
mod pipeline;
use cli::CliArgs;

fn init_tracing(verbose: u8) {
    let level_filter = match verbose {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };

    let env_filter = EnvFilter::builder()
        .with_default_directive(level_filter.into())
        .with_env_var("MPN_LOG")
        .from_env_lossy();

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .without_time()
        .try_init();
}

#[tokio::main]
async fn main() -> MpnResult<()> {
    let cli_args = CliArgs::parse();
    init_tracing(cli_args.verbose);

    let config = Config::load()
        .map_err(|e| MpnError::Config(format!("Could not load config: {e}")))?;

    if let Err(e) = cli_args.command.run(config).await {
        error!("Command failed: {:#}", e);
        eprintln!("{}: {:#}", "Error".red().bold(), e);
        process::exit(1);
    }

    debug!("Command completed successfully.");
    Ok(())
}
