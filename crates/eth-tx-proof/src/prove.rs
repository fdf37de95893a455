//! End-to-end proof construction for one transaction of a block.

use alloy_primitives::{Bytes, B256};
use tracing::{debug, info};

use crate::codec::encode_transaction;
use crate::error::ProofError;
use crate::network::NetworkProfile;
use crate::path::{extract_path, ProofPath, Terminus};
use crate::proof::{encode_proof, INCLUSION_PROOF_TAG};
use crate::trie::{to_nibbles, transaction_key, Trie};
use crate::types::BlockWithTransactions;

/// Proof blob along with what went into it
#[derive(Debug, Clone)]
pub struct InclusionProof {
    pub blob: Bytes,
    /// Hash of the header fields as encoded in the blob
    pub block_hash: B256,
    pub transactions_root: B256,
    pub index: u64,
    /// Network-encoded transaction the path leads to
    pub transaction: Bytes,
    pub path: ProofPath,
    pub profile: NetworkProfile,
}

/// Encode every transaction of the block, checking each against its reported hash
pub fn encode_block_transactions(
    block: &BlockWithTransactions,
    profile: &NetworkProfile,
) -> Result<Vec<Bytes>, ProofError> {
    block
        .transactions
        .iter()
        .map(|tx| encode_transaction(tx, profile))
        .collect()
}

/// Rebuild the transactions trie of the block and check its root against the header
pub fn build_transactions_trie(
    block: &BlockWithTransactions,
    profile: &NetworkProfile,
) -> Result<(Trie, Vec<Bytes>), ProofError> {
    let encoded = encode_block_transactions(block, profile)?;
    debug!("Encoded {} transactions", encoded.len());

    let trie = Trie::from_transactions(&encoded);
    trie.verify_root(block.header.transactions_root)?;
    info!("Transactions root verified: {}", trie.root_hash());
    Ok((trie, encoded))
}

pub fn build_inclusion_proof(
    block: &BlockWithTransactions,
    index: u64,
    profile: &NetworkProfile,
) -> Result<InclusionProof, ProofError> {
    let count = block.transactions.len();
    if index >= count as u64 {
        return Err(ProofError::IndexOutOfRange { index, count });
    }
    if profile.has_base_fee && block.header.base_fee_per_gas.is_none() {
        return Err(ProofError::MissingBaseFee);
    }

    info!(
        "Proving transaction {} of block {} ({} transactions, {} at {})",
        index,
        block.header.block_number(),
        count,
        profile.network,
        profile.hardfork
    );
    let (trie, encoded) = build_transactions_trie(block, profile)?;

    let block_hash = block.header.hash_slow(profile.has_base_fee)?;
    match block.hash {
        Some(expected) if expected != block_hash => {
            return Err(ProofError::BlockHashMismatch {
                expected,
                computed: block_hash,
            });
        }
        Some(_) => info!("Block hash verified: {}", block_hash),
        None => debug!("Block reports no hash, header hashes to {}", block_hash),
    }

    let path = extract_path(&trie, &to_nibbles(&transaction_key(index)))?;
    let transaction = match &path.terminus {
        Terminus::Found(value) if value == &encoded[index as usize] => value.clone(),
        _ => return Err(ProofError::KeyNotFound(index)),
    };
    info!("Extracted proof path of {} nodes", path.len());

    let blob = encode_proof(INCLUSION_PROOF_TAG, &block.header, profile, index, &path)?;
    info!("Encoded proof blob of {} bytes", blob.len());

    Ok(InclusionProof {
        blob,
        block_hash,
        transactions_root: trie.root_hash(),
        index,
        transaction,
        path,
        profile: *profile,
    })
}

/// Resolve the network profile by name at the block's height, then build the proof
pub fn prove_transaction(
    network: &str,
    block: &BlockWithTransactions,
    index: u64,
) -> Result<InclusionProof, ProofError> {
    let profile = NetworkProfile::resolve(network, block.header.block_number())?;
    build_inclusion_proof(block, index, &profile)
}
