#![doc = include_str!("../README.md")]

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use eth_tx_proof_client::{fetch, verify};
use tracing::{error, info};
use tracing_subscriber::filter::EnvFilter;

/// Build and check Ethereum transaction inclusion proofs
#[derive(Parser)]
#[command(author, version, about, long_about = None, propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Log filter used when RUST_LOG is unset (off, error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand, Clone, Debug)]
enum Commands {
    /// Fetch a block from the node and build an inclusion proof
    Fetch(fetch::FetchArgs),
    /// Verify a proof file offline
    Verify(verify::VerifyArgs),
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Fetch(_) => "fetch",
            Commands::Verify(_) => "verify",
        }
    }
}

/// Logs go to stderr so that `verify` output stays clean on stdout
fn init_tracing(log_level: &str) -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow::anyhow!("Failed to install log subscriber: {err}"))
}

#[tokio::main]
async fn main() -> ExitCode {
    // A local .env file may provide ETH_RPC, USERPWD and ETH_NETWORK
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    if let Err(err) = init_tracing(&cli.log_level) {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    let command = cli.command.name();
    let res = match cli.command {
        Commands::Fetch(args) => fetch::run(args).await,
        Commands::Verify(args) => verify::run(args).await,
    };

    match res {
        Ok(()) => {
            info!("{} finished", command);
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("{} failed: {:#}", command, err);
            ExitCode::FAILURE
        }
    }
}
