//! Inclusion proof blob: `RLP([tag, header_fields, index, [node_0, .., node_n]])`.
//!
//! Header fields are the canonical header list, so a verifier can hash the second item
//! to get the block hash. Nodes are embedded as RLP lists, exactly as their parents (or the
//! header's `transactionsRoot`) commit to them.

use alloy_primitives::Bytes;
use alloy_rlp::Encodable;

use crate::error::ProofError;
use crate::network::NetworkProfile;
use crate::path::ProofPath;
use crate::types::{put_list, BlockHeader};

/// Tag of a transaction inclusion proof
pub const INCLUSION_PROOF_TAG: u8 = 1;

pub fn encode_proof(
    tag: u8,
    header: &BlockHeader,
    profile: &NetworkProfile,
    index: u64,
    path: &ProofPath,
) -> Result<Bytes, ProofError> {
    let mut payload = Vec::new();
    tag.encode(&mut payload);
    header.encode_fields(profile.has_base_fee, &mut payload)?;
    index.encode(&mut payload);

    let mut nodes = Vec::new();
    for node in path.nodes() {
        node.encode(&mut nodes);
    }
    put_list(&nodes, &mut payload);

    let mut out = Vec::with_capacity(payload.len() + 4);
    put_list(&payload, &mut out);
    Ok(out.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode_transaction;
    use crate::network::Network;
    use crate::path::extract_path;
    use crate::trie::{to_nibbles, transaction_key, Trie};
    use crate::types::BlockWithTransactions;
    use alloy_primitives::{b256, keccak256};

    const BLOCK_JSON: &str = include_str!("../tests/fixtures/block_synthetic.json");

    fn fixture_path(index: u64) -> (BlockWithTransactions, NetworkProfile, ProofPath) {
        let block: BlockWithTransactions = serde_json::from_str(BLOCK_JSON).unwrap();
        let profile = Network::Mainnet.profile_at(block.header.block_number()).unwrap();
        let encoded: Vec<Bytes> = block
            .transactions
            .iter()
            .map(|tx| encode_transaction(tx, &profile).unwrap())
            .collect();
        let trie = Trie::from_transactions(&encoded);
        let path = extract_path(&trie, &to_nibbles(&transaction_key(index))).unwrap();
        (block, profile, path)
    }

    #[test]
    fn test_proof_blob_bytes() {
        let (block, profile, path) = fixture_path(1);
        let blob = encode_proof(INCLUSION_PROOF_TAG, &block.header, &profile, 1, &path).unwrap();

        assert_eq!(blob.len(), 980);
        assert_eq!(&blob[..6], &[0xf9, 0x03, 0xd1, 0x01, 0xf9, 0x02]);
        assert_eq!(
            keccak256(&blob),
            b256!("0d80182f019124fd415e2b1541b1bacd0d44fd4a91c1ce43442f6023f8ce0b08")
        );
    }

    #[test]
    fn test_proof_blob_without_base_fee() {
        let (block, mut profile, path) = fixture_path(1);
        profile.has_base_fee = false;
        let blob = encode_proof(INCLUSION_PROOF_TAG, &block.header, &profile, 1, &path).unwrap();

        assert_eq!(blob.len(), 974);
        assert_eq!(
            keccak256(&blob),
            b256!("5ca9f8f94dc53ad0c587d36454dd56e6afcd7d39a73a770d50abaf7908a077aa")
        );
    }

    #[test]
    fn test_missing_base_fee_is_rejected() {
        let (mut block, profile, path) = fixture_path(0);
        block.header.base_fee_per_gas = None;
        assert!(matches!(
            encode_proof(INCLUSION_PROOF_TAG, &block.header, &profile, 0, &path),
            Err(ProofError::MissingBaseFee)
        ));
    }

    #[test]
    fn test_nodes_embedded_verbatim() {
        let (block, profile, path) = fixture_path(2);
        let blob = encode_proof(INCLUSION_PROOF_TAG, &block.header, &profile, 2, &path).unwrap();
        let header = block.header.rlp_fields(true).unwrap();

        let nodes: Vec<u8> = path.raw_nodes().concat();
        assert!(blob.ends_with(&nodes));
        // list prefix(3) + tag(1) + header + index(1) + node list prefix(3)
        assert_eq!(blob.len(), 3 + 1 + header.len() + 1 + 3 + nodes.len());
    }
}
