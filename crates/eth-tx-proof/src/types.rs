//! Block and transaction shapes as returned by an Ethereum JSON-RPC provider, and the
//! canonical RLP encoding of the block header.

use alloy_primitives::{keccak256, Address, Bloom, Bytes, B256, B64, U256, U64};
use alloy_rlp::{BufMut, Encodable, RlpDecodable, RlpEncodable};
use serde::{Deserialize, Serialize};

use crate::error::ProofError;

/// Ethereum block header fields relevant to the transactions trie proof
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockHeader {
    pub parent_hash: B256,
    #[serde(rename = "sha3Uncles")]
    pub uncles_hash: B256,
    #[serde(rename = "miner")]
    pub coinbase: Address,
    pub state_root: B256,
    pub transactions_root: B256,
    pub receipts_root: B256,
    pub logs_bloom: Bloom,
    pub difficulty: U256,
    pub number: U64,
    pub gas_limit: U64,
    pub gas_used: U64,
    pub timestamp: U64,
    pub extra_data: Bytes,
    pub mix_hash: B256,
    pub nonce: B64,
    /// Present only on chains and forks that define it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_fee_per_gas: Option<U256>,
}

impl BlockHeader {
    pub fn block_number(&self) -> u64 {
        self.number.to::<u64>()
    }

    /// RLP payload of the header fields in canonical order.
    ///
    /// `baseFeePerGas` is appended only when `has_base_fee` is set, and is an error if the
    /// header does not carry it.
    fn fields_payload(&self, has_base_fee: bool) -> Result<Vec<u8>, ProofError> {
        let mut payload = Vec::new();
        self.parent_hash.encode(&mut payload);
        self.uncles_hash.encode(&mut payload);
        self.coinbase.encode(&mut payload);
        self.state_root.encode(&mut payload);
        self.transactions_root.encode(&mut payload);
        self.receipts_root.encode(&mut payload);
        self.logs_bloom.encode(&mut payload);
        self.difficulty.encode(&mut payload);
        self.number.encode(&mut payload);
        self.gas_limit.encode(&mut payload);
        self.gas_used.encode(&mut payload);
        self.timestamp.encode(&mut payload);
        self.extra_data.encode(&mut payload);
        self.mix_hash.encode(&mut payload);
        self.nonce.encode(&mut payload);
        if has_base_fee {
            self.base_fee_per_gas
                .ok_or(ProofError::MissingBaseFee)?
                .encode(&mut payload);
        }
        Ok(payload)
    }

    /// Write the header as one RLP list
    pub fn encode_fields(&self, has_base_fee: bool, out: &mut dyn BufMut) -> Result<(), ProofError> {
        let payload = self.fields_payload(has_base_fee)?;
        put_list(&payload, out);
        Ok(())
    }

    pub fn rlp_fields(&self, has_base_fee: bool) -> Result<Vec<u8>, ProofError> {
        let mut out = Vec::new();
        self.encode_fields(has_base_fee, &mut out)?;
        Ok(out)
    }

    /// Block hash, i.e. keccak256 of the RLP header
    pub fn hash_slow(&self, has_base_fee: bool) -> Result<B256, ProofError> {
        Ok(keccak256(self.rlp_fields(has_base_fee)?))
    }
}

/// Block as returned by `eth_getBlockByNumber` with full transaction objects
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockWithTransactions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<B256>,
    #[serde(flatten)]
    pub header: BlockHeader,
    pub transactions: Vec<RawTransaction>,
}

/// EIP-2930 access list entry
#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, RlpEncodable, RlpDecodable,
)]
#[serde(rename_all = "camelCase")]
pub struct AccessListItem {
    pub address: Address,
    pub storage_keys: Vec<B256>,
}

/// Transaction object as returned by the RPC, untyped
///
/// Which fields are meaningful depends on `tx_type`; the codec checks that the required
/// ones are present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTransaction {
    pub hash: B256,
    pub nonce: U64,
    #[serde(default)]
    pub to: Option<Address>,
    pub value: U256,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_priority_fee_per_gas: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_fee_per_gas: Option<U256>,
    pub gas: U64,
    pub input: Bytes,
    pub v: U256,
    pub r: U256,
    pub s: U256,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_parity: Option<U64>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub tx_type: Option<U64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<U64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_list: Option<Vec<AccessListItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_hash: Option<B256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_number: Option<U64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_index: Option<U64>,
}

/// Write an RLP list header followed by an already encoded payload
pub(crate) fn put_list(payload: &[u8], out: &mut dyn BufMut) {
    alloy_rlp::Header {
        list: true,
        payload_length: payload.len(),
    }
    .encode(out);
    out.put_slice(payload);
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, b256};

    const BLOCK_JSON: &str = include_str!("../tests/fixtures/block_synthetic.json");

    #[test]
    fn test_deserialize_rpc_block() {
        let block: BlockWithTransactions = serde_json::from_str(BLOCK_JSON).unwrap();
        assert_eq!(block.header.block_number(), 16_900_000);
        assert_eq!(block.header.base_fee_per_gas, Some(U256::from(0x5d21dba00u64)));
        assert_eq!(block.header.extra_data.as_ref(), b"synthetic block");
        assert_eq!(block.transactions.len(), 3);

        let creation = &block.transactions[2];
        assert_eq!(creation.to, None);
        assert_eq!(creation.tx_type, Some(U64::from(2)));
        assert_eq!(creation.access_list.as_deref(), Some(&[][..]));

        let access_list = block.transactions[1].access_list.as_ref().unwrap();
        assert_eq!(access_list.len(), 1);
        assert_eq!(access_list[0].storage_keys.len(), 2);
    }

    #[test]
    fn test_header_hash_matches_block_hash() {
        let block: BlockWithTransactions = serde_json::from_str(BLOCK_JSON).unwrap();
        assert_eq!(
            Some(block.header.hash_slow(true).unwrap()),
            block.hash,
            "canonical field order must reproduce the block hash"
        );
    }

    #[test]
    fn test_sixteen_field_header_hash() {
        // OP Sepolia genesis
        let header = BlockHeader {
            parent_hash: B256::ZERO,
            uncles_hash: b256!("1dcc4de8dec75d7aab85b567b6ccd41ad312451b948a7413f0a142fd40d49347"),
            coinbase: address!("4200000000000000000000000000000000000011"),
            state_root: b256!("06787a17a3ed87c339a39dbbeeb311578a0c83ed29daa2db95da62b28efce8a9"),
            transactions_root: crate::trie::EMPTY_ROOT_HASH,
            receipts_root: crate::trie::EMPTY_ROOT_HASH,
            logs_bloom: Bloom::ZERO,
            difficulty: U256::ZERO,
            number: U64::ZERO,
            gas_limit: U64::from(0x1c9c380),
            gas_used: U64::ZERO,
            timestamp: U64::from(0x64d6dbac),
            extra_data: Bytes::from_static(b"BEDROCK"),
            mix_hash: B256::ZERO,
            nonce: B64::ZERO,
            base_fee_per_gas: Some(U256::from(0x3b9aca00)),
        };
        assert_eq!(
            header.hash_slow(true).unwrap(),
            b256!("102de6ffb001480cc9b8b548fd05c34cd4f46ae4aa91759393db90ea0409887d")
        );
    }

    #[test]
    fn test_base_fee_is_never_synthesized() {
        let block: BlockWithTransactions = serde_json::from_str(BLOCK_JSON).unwrap();
        let mut header = block.header;

        let with_fee = header.rlp_fields(true).unwrap();
        let without_fee = header.rlp_fields(false).unwrap();
        // 0x5d21dba00 encodes as a 5-byte string behind a 1-byte prefix
        assert_eq!(with_fee.len(), without_fee.len() + 6);

        header.base_fee_per_gas = None;
        assert!(matches!(header.rlp_fields(true), Err(ProofError::MissingBaseFee)));
        assert_eq!(header.rlp_fields(false).unwrap(), without_fee);
    }

    #[test]
    fn test_zero_base_fee_is_emitted() {
        let block: BlockWithTransactions = serde_json::from_str(BLOCK_JSON).unwrap();
        let mut header = block.header;
        header.base_fee_per_gas = Some(U256::ZERO);

        let with_fee = header.rlp_fields(true).unwrap();
        let without_fee = header.rlp_fields(false).unwrap();
        assert_eq!(with_fee.len(), without_fee.len() + 1);
        assert_eq!(*with_fee.last().unwrap(), alloy_rlp::EMPTY_STRING_CODE);
    }
}
