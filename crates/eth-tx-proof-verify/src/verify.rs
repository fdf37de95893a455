//! Replay of the transactions trie walk recorded in a proof blob.

use alloy_primitives::{keccak256, Bytes, B256};
use eth_tx_proof::trie::to_nibbles;
use eth_tx_proof::{transaction_key, NodeRef, TrieNode, INCLUSION_PROOF_TAG};
use tracing::{debug, info};

use crate::error::VerifyError;
use crate::proof::decode_proof;

/// Transaction proven to be included in a block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedInclusion {
    pub block_number: u64,
    pub block_hash: B256,
    pub index: u64,
    /// Network-encoded transaction stored at the index
    pub transaction: Bytes,
    pub transaction_hash: B256,
}

/// Verify a proof blob against a trusted block hash.
///
/// This checks the proof tag, the header against `expected_block_hash` and the node path
/// from the header's transactions root to the transaction at the claimed index.
pub fn verify_inclusion(
    blob: &[u8],
    expected_block_hash: B256,
) -> Result<VerifiedInclusion, VerifyError> {
    let proof = decode_proof(blob)?;
    if proof.tag != INCLUSION_PROOF_TAG {
        return Err(VerifyError::UnsupportedTag(proof.tag));
    }

    info!("Verifying block header ...");
    if proof.block_hash != expected_block_hash {
        return Err(VerifyError::BlockHashMismatch {
            expected: expected_block_hash,
            computed: proof.block_hash,
        });
    }

    info!("Verifying transaction inclusion proof ...");
    let key = to_nibbles(&transaction_key(proof.index));
    let transaction = verify_path(proof.header.transactions_root, &key, &proof.nodes)?;

    let transaction_hash = keccak256(&transaction);
    info!(
        "Transaction {} verified at index {} of block {}",
        transaction_hash,
        proof.index,
        proof.header.block_number()
    );

    Ok(VerifiedInclusion {
        block_number: proof.header.block_number(),
        block_hash: proof.block_hash,
        index: proof.index,
        transaction,
        transaction_hash,
    })
}

/// Walk `nodes` from `root` along `key` (as nibbles) and return the value at the end.
///
/// Every node must match the reference its parent holds for it: the hash for hashed
/// children, the exact bytes for inlined ones. The value must sit in the last node.
pub fn verify_path(root: B256, key: &[u8], nodes: &[Bytes]) -> Result<Bytes, VerifyError> {
    let mut expected = NodeRef::Hash(root);
    let mut key = key;

    for (depth, raw) in nodes.iter().enumerate() {
        let matches = match &expected {
            NodeRef::Hash(hash) => keccak256(raw) == *hash,
            NodeRef::Inline(node) => node.raw_encoding() == *raw,
        };
        if !matches {
            return Err(VerifyError::NodeMismatch { depth });
        }

        let node = TrieNode::decode(raw)
            .map_err(|source| VerifyError::MalformedNode { depth, source })?;
        debug!("Node {} matches its reference", depth);

        expected = match node {
            TrieNode::Branch { mut children, value } => match key.split_first() {
                None => {
                    let value = value.ok_or(VerifyError::Absent { depth })?;
                    return finish(value, depth, nodes.len());
                }
                Some((&nibble, rest)) => {
                    key = rest;
                    children
                        .get_mut(nibble as usize)
                        .and_then(Option::take)
                        .ok_or(VerifyError::Absent { depth })?
                }
            },
            TrieNode::Extension { prefix, child } => {
                if !key.starts_with(&prefix) {
                    return Err(VerifyError::Divergence { depth });
                }
                key = &key[prefix.len()..];
                child
            }
            TrieNode::Leaf { suffix, value } => {
                if suffix.as_slice() != key {
                    return Err(VerifyError::Divergence { depth });
                }
                return finish(value, depth, nodes.len());
            }
        };
    }

    Err(VerifyError::ShortProof)
}

fn finish(value: Bytes, depth: usize, total: usize) -> Result<Bytes, VerifyError> {
    if depth + 1 != total {
        return Err(VerifyError::LeftoverNodes {
            used: depth + 1,
            total,
        });
    }
    Ok(value)
}
