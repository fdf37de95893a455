use alloy_primitives::{b256, Bytes, B256};
use eth_tx_proof::{
    build_inclusion_proof, encode_proof, prove_transaction, BlockWithTransactions, Network,
    INCLUSION_PROOF_TAG,
};
use eth_tx_proof_verify::{decode_proof, verify_inclusion, VerifyError};

const BLOCK_JSON: &str = include_str!("../../eth-tx-proof/tests/fixtures/block_synthetic.json");

fn block() -> BlockWithTransactions {
    serde_json::from_str(BLOCK_JSON).unwrap()
}

fn block_hash(block: &BlockWithTransactions) -> B256 {
    block.hash.unwrap()
}

#[test]
fn test_accepts_every_index() {
    let block = block();
    for (index, tx) in block.transactions.iter().enumerate() {
        let proof = prove_transaction("mainnet", &block, index as u64).unwrap();
        let verified = verify_inclusion(&proof.blob, block_hash(&block)).unwrap();

        assert_eq!(verified.index, index as u64);
        assert_eq!(verified.block_number, 16_900_000);
        assert_eq!(verified.transaction_hash, tx.hash);
        assert_eq!(verified.transaction, proof.transaction);
    }
}

#[test]
fn test_decoded_proof_matches_scenario() {
    let block = block();
    let proof = prove_transaction("mainnet", &block, 1).unwrap();
    let decoded = decode_proof(&proof.blob).unwrap();

    assert_eq!(decoded.tag, INCLUSION_PROOF_TAG);
    assert_eq!(decoded.header, block.header);
    assert!(decoded.has_base_fee);
    assert_eq!(decoded.index, 1);
    assert_eq!(decoded.nodes.len(), proof.path.len());
    assert_eq!(decoded.nodes, proof.path.raw_nodes());
}

#[test]
fn test_rejects_every_single_byte_mutation() {
    let block = block();
    let expected = block_hash(&block);
    let proof = prove_transaction("mainnet", &block, 1).unwrap();

    for position in 0..proof.blob.len() {
        for mask in [0x01u8, 0x80, 0xff] {
            let mut mutated = proof.blob.to_vec();
            mutated[position] ^= mask;
            assert!(
                verify_inclusion(&mutated, expected).is_err(),
                "mutation {mask:#04x} at byte {position} was accepted"
            );
        }
    }
}

#[test]
fn test_rejects_other_block() {
    let block = block();
    let proof = prove_transaction("mainnet", &block, 0).unwrap();
    assert!(matches!(
        verify_inclusion(&proof.blob, B256::repeat_byte(0x01)),
        Err(VerifyError::BlockHashMismatch { .. })
    ));
}

#[test]
fn test_header_without_base_fee() {
    // Same fields without the base fee hash to another block
    let mut block = block();
    block.hash = None;
    let mut profile = Network::Mainnet.profile_at(block.header.block_number()).unwrap();
    profile.has_base_fee = false;
    let proof = build_inclusion_proof(&block, 1, &profile).unwrap();

    let decoded = decode_proof(&proof.blob).unwrap();
    assert!(!decoded.has_base_fee);
    assert_eq!(decoded.header.base_fee_per_gas, None);

    let legacy_hash = b256!("06820eeb8dd8d6722027c3491de80d624b5d6c37f3d071293c1180630b0e1d3c");
    assert_eq!(decoded.block_hash, legacy_hash);
    verify_inclusion(&proof.blob, legacy_hash).unwrap();
}

#[test]
fn test_rejects_unknown_tag() {
    let block = block();
    let profile = Network::Mainnet.profile_at(block.header.block_number()).unwrap();
    let proof = build_inclusion_proof(&block, 2, &profile).unwrap();

    let blob = encode_proof(2, &block.header, &profile, 2, &proof.path).unwrap();
    assert!(matches!(
        verify_inclusion(&blob, block_hash(&block)),
        Err(VerifyError::UnsupportedTag(2))
    ));
}

#[test]
fn test_rejects_index_swap() {
    // Path of transaction 1 presented as a proof for transaction 2
    let block = block();
    let profile = Network::Mainnet.profile_at(block.header.block_number()).unwrap();
    let proof = build_inclusion_proof(&block, 1, &profile).unwrap();

    let blob = encode_proof(INCLUSION_PROOF_TAG, &block.header, &profile, 2, &proof.path).unwrap();
    assert!(matches!(
        verify_inclusion(&blob, block_hash(&block)),
        Err(VerifyError::NodeMismatch { depth: 2 })
    ));
}

#[test]
fn test_rejects_trailing_bytes() {
    let block = block();
    let proof = prove_transaction("mainnet", &block, 0).unwrap();
    let mut blob = proof.blob.to_vec();
    blob.push(0x80);
    assert!(verify_inclusion(&blob, block_hash(&block)).is_err());

    let empty: Bytes = Bytes::new();
    assert!(verify_inclusion(&empty, block_hash(&block)).is_err());
}
