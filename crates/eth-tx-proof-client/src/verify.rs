//! CLI wrapper for the verify functionality

use clap::Args;
use std::path::PathBuf;

use anyhow::{bail, Context};
use eth_tx_proof_verify::{decode_proof, verify_inclusion, VerifiedInclusion};

use crate::fetch::{load_proof_file, ProofFile};
use crate::format::format_inclusion;

/// CLI arguments for the `verify` subcommand
#[derive(Clone, Debug, Args)]
pub struct VerifyArgs {
    /// Path to read the proof from
    #[arg(long)]
    proof_path: PathBuf,
}

/// Run the `verify` subcommand: read a proof from disk, verify it and display the transaction
pub async fn run(args: VerifyArgs) -> Result<(), anyhow::Error> {
    let proof_file = load_proof_file(&args.proof_path)?;
    let verified = verify_proof_file(&proof_file)?;

    let proof_nodes = decode_proof(&proof_file.proof)?.nodes.len();
    println!("{}", format_inclusion(&proof_file, &verified, proof_nodes));

    Ok(())
}

/// Verify the proof blob against the block hash recorded in the file, and check that the
/// file metadata agrees with what the proof commits to
pub fn verify_proof_file(proof_file: &ProofFile) -> Result<VerifiedInclusion, anyhow::Error> {
    let verified = verify_inclusion(&proof_file.proof, proof_file.block_hash)
        .context("Inclusion proof is invalid")?;

    if verified.block_number != proof_file.block_number {
        bail!(
            "Proof is for block {}, file claims block {}",
            verified.block_number,
            proof_file.block_number
        );
    }
    if verified.index != proof_file.transaction_index {
        bail!(
            "Proof is for transaction index {}, file claims index {}",
            verified.index,
            proof_file.transaction_index
        );
    }
    if verified.transaction_hash != proof_file.transaction_hash {
        bail!(
            "Proven transaction hashes to {}, file claims {}",
            verified.transaction_hash,
            proof_file.transaction_hash
        );
    }

    Ok(verified)
}
