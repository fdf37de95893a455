//! Fetch a block from an Ethereum node and build the inclusion proof of one of its
//! transactions.

use std::path::Path;
use std::path::PathBuf;

use alloy_primitives::{Bytes, B256};
use anyhow::{bail, Context};
use async_trait::async_trait;
use eth_rpc_client::EthClient;
use eth_tx_proof::{build_inclusion_proof, BlockWithTransactions, Network, NetworkProfile, RawTransaction};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::verify::verify_proof_file;

/// CLI arguments for the `fetch` subcommand
#[derive(Clone, Debug, clap::Args)]
pub struct FetchArgs {
    /// Number of the block containing the transaction
    #[arg(long, requires = "tx_index", conflicts_with = "tx_hash")]
    block_number: Option<u64>,
    /// Position of the transaction in the block
    #[arg(long, requires = "block_number")]
    tx_index: Option<u64>,
    /// Transaction hash, instead of block number and index
    #[arg(long, required_unless_present = "block_number")]
    tx_hash: Option<B256>,
    /// Network name (resolved from the node's chain id if omitted)
    #[arg(long, env = "ETH_NETWORK")]
    network: Option<String>,
    /// Ethereum JSON-RPC URL
    #[arg(long, env = "ETH_RPC")]
    rpc_url: String,
    /// Ethereum RPC user:password (optional)
    #[arg(long, env = "USERPWD")]
    rpc_userpwd: Option<String>,
    /// Blocks to wait for on top of the proven block
    #[arg(long, default_value = "0")]
    confirmations: u64,
    /// Path to save the proof
    #[arg(long)]
    proof_path: PathBuf,
    /// Verify the proof after fetching it
    #[arg(long, default_value = "false")]
    verify: bool,
}

/// Transaction to prove
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProofTarget {
    Position { block_number: u64, index: u64 },
    Hash(B256),
}

impl FetchArgs {
    fn target(&self) -> anyhow::Result<ProofTarget> {
        match (self.block_number, self.tx_index, self.tx_hash) {
            (Some(block_number), Some(index), None) => Ok(ProofTarget::Position {
                block_number,
                index,
            }),
            (None, None, Some(hash)) => Ok(ProofTarget::Hash(hash)),
            _ => bail!("Either --block-number with --tx-index or --tx-hash is required"),
        }
    }
}

/// Proof file written by `fetch` and read by `verify`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofFile {
    pub network: Network,
    pub block_number: u64,
    pub block_hash: B256,
    pub block_timestamp: u64,
    pub transaction_index: u64,
    pub transaction_hash: B256,
    /// Proof blob as passed to the on-chain verifier
    pub proof: Bytes,
}

/// Source of block data: the single I/O round-trip of a proof request
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BlockProvider: Send + Sync {
    async fn chain_id(&self) -> anyhow::Result<u64>;

    async fn block_with_transactions(&self, number: u64) -> anyhow::Result<BlockWithTransactions>;

    async fn transaction_by_hash(&self, hash: B256) -> anyhow::Result<RawTransaction>;

    /// Resolve once `confirmations` blocks are built on top of block `number`
    async fn wait_for_block(&self, number: u64, confirmations: u64) -> anyhow::Result<()>;
}

#[async_trait]
impl BlockProvider for EthClient {
    async fn chain_id(&self) -> anyhow::Result<u64> {
        Ok(self.get_chain_id().await?)
    }

    async fn block_with_transactions(&self, number: u64) -> anyhow::Result<BlockWithTransactions> {
        Ok(self.get_block_with_transactions(number).await?)
    }

    async fn transaction_by_hash(&self, hash: B256) -> anyhow::Result<RawTransaction> {
        Ok(self.get_transaction_by_hash(&hash).await?)
    }

    async fn wait_for_block(&self, number: u64, confirmations: u64) -> anyhow::Result<()> {
        Ok(EthClient::wait_for_block(self, number, confirmations).await?)
    }
}

/// Run the `fetch` subcommand: build an inclusion proof and write it to disk
///
/// Returns an error if any network request fails, the block data does not reproduce the
/// header commitments or the proof cannot be written to the specified path.
pub async fn run(args: FetchArgs) -> Result<(), anyhow::Error> {
    let target = args.target()?;
    let client = EthClient::new(args.rpc_url.clone(), args.rpc_userpwd.clone())?;

    let proof_file = fetch_inclusion_proof(
        &client,
        target,
        args.network.as_deref(),
        args.confirmations,
    )
    .await?;

    save_proof_file(&proof_file, &args.proof_path)?;

    if args.verify {
        verify_proof_file(&proof_file)?;
    }

    Ok(())
}

/// Fetch the block holding `target` and build its inclusion proof
///
/// - `network`: profile name; when `None` the profile is resolved from the node's chain id
/// - `confirmations`: blocks to wait for on top of the proven block before fetching it
pub async fn fetch_inclusion_proof<P: BlockProvider + ?Sized>(
    provider: &P,
    target: ProofTarget,
    network: Option<&str>,
    confirmations: u64,
) -> Result<ProofFile, anyhow::Error> {
    let (block_number, index, expected_hash) = match target {
        ProofTarget::Position {
            block_number,
            index,
        } => (block_number, index, None),
        ProofTarget::Hash(hash) => {
            info!("Fetching transaction {} ...", hash);
            let tx = provider
                .transaction_by_hash(hash)
                .await
                .context("Failed to fetch transaction")?;
            let (Some(block_number), Some(index)) = (tx.block_number, tx.transaction_index) else {
                bail!("Transaction {} is not mined yet", hash);
            };
            (block_number.to::<u64>(), index.to::<u64>(), Some(hash))
        }
    };

    if confirmations > 0 {
        provider
            .wait_for_block(block_number, confirmations)
            .await
            .context("Failed to wait for block confirmations")?;
    }

    info!("Fetching block {} ...", block_number);
    let block = provider
        .block_with_transactions(block_number)
        .await
        .context("Failed to fetch block")?;
    info!(
        "Block fetched: {} transactions",
        block.transactions.len()
    );

    let profile = match network {
        Some(name) => NetworkProfile::resolve(name, block_number)?,
        None => {
            let chain_id = provider
                .chain_id()
                .await
                .context("Failed to fetch chain id")?;
            Network::from_chain_id(chain_id)?.profile_at(block_number)?
        }
    };

    let proof = build_inclusion_proof(&block, index, &profile)
        .with_context(|| format!("Failed to prove transaction {index} of block {block_number}"))?;

    let transaction_hash = block.transactions[index as usize].hash;
    if let Some(expected) = expected_hash {
        if expected != transaction_hash {
            bail!(
                "Transaction at index {} of block {} is {}, expected {}",
                index,
                block_number,
                transaction_hash,
                expected
            );
        }
    }

    Ok(ProofFile {
        network: profile.network,
        block_number,
        block_hash: proof.block_hash,
        block_timestamp: block.header.timestamp.to::<u64>(),
        transaction_index: index,
        transaction_hash,
        proof: proof.blob,
    })
}

/// Save a proof file as pretty-printed JSON, creating parent directories
pub fn save_proof_file(proof: &ProofFile, proof_path: &Path) -> Result<(), anyhow::Error> {
    if let Some(proof_dir) = proof_path.parent() {
        std::fs::create_dir_all(proof_dir)?;
    }

    let file = std::fs::File::create(proof_path)
        .with_context(|| format!("Failed to create {}", proof_path.display()))?;
    serde_json::to_writer_pretty(file, proof)?;

    info!(
        "Proof of {} bytes written to {}",
        proof.proof.len(),
        proof_path.display()
    );
    Ok(())
}

/// Load a proof file written by `save_proof_file`
pub fn load_proof_file(proof_path: &Path) -> Result<ProofFile, anyhow::Error> {
    info!("Loading proof from {}", proof_path.display());
    let file = std::fs::File::open(proof_path)
        .with_context(|| format!("Failed to open {}", proof_path.display()))?;
    let proof = serde_json::from_reader(std::io::BufReader::new(file))?;
    Ok(proof)
}
