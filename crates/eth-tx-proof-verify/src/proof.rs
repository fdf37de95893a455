//! Strict decoding of the proof blob `RLP([tag, header_fields, index, [node, ..]])`.

use alloy_primitives::{keccak256, Address, Bloom, Bytes, B256, B64, U256, U64};
use alloy_rlp::{Decodable, Header};
use eth_tx_proof::BlockHeader;

use crate::error::VerifyError;

/// Proof blob split into its parts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedProof {
    pub tag: u8,
    pub header: BlockHeader,
    /// Whether the header list carried `baseFeePerGas`
    pub has_base_fee: bool,
    /// keccak256 of the header list exactly as it appears in the blob
    pub block_hash: B256,
    pub index: u64,
    /// Raw node encodings, root first
    pub nodes: Vec<Bytes>,
}

pub fn decode_proof(blob: &[u8]) -> Result<DecodedProof, VerifyError> {
    let mut buf = blob;
    let mut payload = list_payload(&mut buf)?;
    if !buf.is_empty() {
        return Err(alloy_rlp::Error::UnexpectedLength.into());
    }

    let tag = u8::decode(&mut payload)?;

    let header_start = payload;
    let (header, has_base_fee) = decode_header(&mut payload)?;
    let block_hash = keccak256(&header_start[..header_start.len() - payload.len()]);

    let index = u64::decode(&mut payload)?;

    let mut node_list = list_payload(&mut payload)?;
    let mut nodes = Vec::new();
    while !node_list.is_empty() {
        nodes.push(Bytes::copy_from_slice(next_node(&mut node_list)?));
    }

    if !payload.is_empty() {
        return Err(alloy_rlp::Error::UnexpectedLength.into());
    }

    Ok(DecodedProof {
        tag,
        header,
        has_base_fee,
        block_hash,
        index,
        nodes,
    })
}

/// Consume a list header and return the list payload
fn list_payload<'a>(buf: &mut &'a [u8]) -> Result<&'a [u8], VerifyError> {
    let header = Header::decode(buf)?;
    if !header.list {
        return Err(alloy_rlp::Error::UnexpectedString.into());
    }
    if buf.len() < header.payload_length {
        return Err(alloy_rlp::Error::InputTooShort.into());
    }
    let (payload, rest) = buf.split_at(header.payload_length);
    *buf = rest;
    Ok(payload)
}

/// Consume one node and return its full encoding
fn next_node<'a>(buf: &mut &'a [u8]) -> Result<&'a [u8], VerifyError> {
    let start: &'a [u8] = *buf;
    list_payload(buf)?;
    Ok(&start[..start.len() - buf.len()])
}

fn count_items(mut payload: &[u8]) -> Result<usize, VerifyError> {
    let mut count = 0;
    while !payload.is_empty() {
        let header = Header::decode(&mut payload)?;
        if payload.len() < header.payload_length {
            return Err(alloy_rlp::Error::InputTooShort.into());
        }
        payload = &payload[header.payload_length..];
        count += 1;
    }
    Ok(count)
}

fn decode_header(buf: &mut &[u8]) -> Result<(BlockHeader, bool), VerifyError> {
    let mut fields = list_payload(buf)?;
    let has_base_fee = match count_items(fields)? {
        15 => false,
        16 => true,
        other => return Err(VerifyError::HeaderFieldCount(other)),
    };

    let header = BlockHeader {
        parent_hash: B256::decode(&mut fields)?,
        uncles_hash: B256::decode(&mut fields)?,
        coinbase: Address::decode(&mut fields)?,
        state_root: B256::decode(&mut fields)?,
        transactions_root: B256::decode(&mut fields)?,
        receipts_root: B256::decode(&mut fields)?,
        logs_bloom: Bloom::decode(&mut fields)?,
        difficulty: U256::decode(&mut fields)?,
        number: U64::decode(&mut fields)?,
        gas_limit: U64::decode(&mut fields)?,
        gas_used: U64::decode(&mut fields)?,
        timestamp: U64::decode(&mut fields)?,
        extra_data: Bytes::decode(&mut fields)?,
        mix_hash: B256::decode(&mut fields)?,
        nonce: B64::decode(&mut fields)?,
        base_fee_per_gas: if has_base_fee {
            Some(U256::decode(&mut fields)?)
        } else {
            None
        },
    };
    Ok((header, has_base_fee))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_string_blob() {
        // 0x83 "abc" is a string, not a list
        assert!(matches!(
            decode_proof(&[0x83, b'a', b'b', b'c']),
            Err(VerifyError::Rlp(alloy_rlp::Error::UnexpectedString))
        ));
    }

    #[test]
    fn test_rejects_short_header() {
        // [1, [0x80, 0x80], 1, []]
        let blob = [0xc6, 0x01, 0xc2, 0x80, 0x80, 0x01, 0xc0];
        assert!(matches!(
            decode_proof(&blob),
            Err(VerifyError::HeaderFieldCount(2))
        ));
    }

    #[test]
    fn test_rejects_truncated_blob() {
        assert!(decode_proof(&[0xc6, 0x01, 0xc2, 0x80]).is_err());
        assert!(decode_proof(&[]).is_err());
    }
}
