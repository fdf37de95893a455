//! Canonical transaction codec.
//!
//! Produces the exact bytes Ethereum commits to in the transactions trie:
//! `RLP([...])` for legacy transactions and `type || RLP([...])` for EIP-2718 envelopes.
//! Every encoding is checked against the hash reported by the provider.

use std::fmt;

use alloy_primitives::{keccak256, Address, Bytes, B256, U256, U64};
use alloy_rlp::{BufMut, Encodable, EMPTY_STRING_CODE};

use crate::error::ProofError;
use crate::network::NetworkProfile;
use crate::types::{put_list, AccessListItem, RawTransaction};

/// EIP-2718 transaction type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TxType {
    Legacy = 0x00,
    AccessList = 0x01,
    FeeMarket = 0x02,
}

impl TryFrom<u64> for TxType {
    type Error = ProofError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(TxType::Legacy),
            0x01 => Ok(TxType::AccessList),
            0x02 => Ok(TxType::FeeMarket),
            other => Err(ProofError::UnexpectedTransactionType(other)),
        }
    }
}

impl fmt::Display for TxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxType::Legacy => f.write_str("legacy"),
            TxType::AccessList => f.write_str("0x01 (access list)"),
            TxType::FeeMarket => f.write_str("0x02 (fee market)"),
        }
    }
}

/// Signature values exactly as committed: `v` is the EIP-155 value for legacy transactions
/// and the y-parity for typed ones
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub v: U256,
    pub r: U256,
    pub s: U256,
}

impl Signature {
    fn encode(&self, out: &mut dyn BufMut) {
        self.v.encode(out);
        self.r.encode(out);
        self.s.encode(out);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxLegacy {
    pub nonce: U64,
    pub gas_price: U256,
    pub gas_limit: U64,
    pub to: Option<Address>,
    pub value: U256,
    pub input: Bytes,
    pub signature: Signature,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxAccessList {
    pub chain_id: U64,
    pub nonce: U64,
    pub gas_price: U256,
    pub gas_limit: U64,
    pub to: Option<Address>,
    pub value: U256,
    pub input: Bytes,
    pub access_list: Vec<AccessListItem>,
    pub signature: Signature,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxFeeMarket {
    pub chain_id: U64,
    pub nonce: U64,
    pub max_priority_fee_per_gas: U256,
    pub max_fee_per_gas: U256,
    pub gas_limit: U64,
    pub to: Option<Address>,
    pub value: U256,
    pub input: Bytes,
    pub access_list: Vec<AccessListItem>,
    pub signature: Signature,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transaction {
    Legacy(TxLegacy),
    AccessList(TxAccessList),
    FeeMarket(TxFeeMarket),
}

impl Transaction {
    /// Convert an RPC transaction object under the given network profile.
    ///
    /// Fails on unknown type bytes, on types the active hardfork does not define, on
    /// signatures or chain ids belonging to another chain, and on missing fee fields.
    pub fn from_raw(raw: &RawTransaction, profile: &NetworkProfile) -> Result<Self, ProofError> {
        let tx_type = match raw.tx_type {
            Some(tx_type) => TxType::try_from(tx_type.to::<u64>())?,
            None => TxType::Legacy,
        };

        let active = match tx_type {
            TxType::Legacy => true,
            TxType::AccessList => profile.hardfork.has_access_lists(),
            TxType::FeeMarket => profile.hardfork.has_fee_market(),
        };
        if !active {
            return Err(ProofError::TransactionTypeNotActive {
                tx_type,
                hardfork: profile.hardfork,
            });
        }

        let tx = match tx_type {
            TxType::Legacy => {
                check_eip155_chain_id(&raw.v, profile.chain_id)?;
                Transaction::Legacy(TxLegacy {
                    nonce: raw.nonce,
                    gas_price: raw.gas_price.ok_or(ProofError::MissingField("gasPrice"))?,
                    gas_limit: raw.gas,
                    to: raw.to,
                    value: raw.value,
                    input: raw.input.clone(),
                    signature: Signature {
                        v: raw.v,
                        r: raw.r,
                        s: raw.s,
                    },
                })
            }
            TxType::AccessList => Transaction::AccessList(TxAccessList {
                chain_id: typed_chain_id(raw, profile)?,
                nonce: raw.nonce,
                gas_price: raw.gas_price.ok_or(ProofError::MissingField("gasPrice"))?,
                gas_limit: raw.gas,
                to: raw.to,
                value: raw.value,
                input: raw.input.clone(),
                access_list: raw.access_list.clone().unwrap_or_default(),
                signature: typed_signature(raw),
            }),
            TxType::FeeMarket => Transaction::FeeMarket(TxFeeMarket {
                chain_id: typed_chain_id(raw, profile)?,
                nonce: raw.nonce,
                max_priority_fee_per_gas: raw
                    .max_priority_fee_per_gas
                    .ok_or(ProofError::MissingField("maxPriorityFeePerGas"))?,
                max_fee_per_gas: raw
                    .max_fee_per_gas
                    .ok_or(ProofError::MissingField("maxFeePerGas"))?,
                gas_limit: raw.gas,
                to: raw.to,
                value: raw.value,
                input: raw.input.clone(),
                access_list: raw.access_list.clone().unwrap_or_default(),
                signature: typed_signature(raw),
            }),
        };
        Ok(tx)
    }

    pub fn tx_type(&self) -> TxType {
        match self {
            Transaction::Legacy(_) => TxType::Legacy,
            Transaction::AccessList(_) => TxType::AccessList,
            Transaction::FeeMarket(_) => TxType::FeeMarket,
        }
    }

    /// Canonical encoding as committed to the transactions trie
    pub fn encoded(&self) -> Bytes {
        let mut payload = Vec::new();
        match self {
            Transaction::Legacy(tx) => {
                tx.nonce.encode(&mut payload);
                tx.gas_price.encode(&mut payload);
                tx.gas_limit.encode(&mut payload);
                encode_to(&tx.to, &mut payload);
                tx.value.encode(&mut payload);
                tx.input.encode(&mut payload);
                tx.signature.encode(&mut payload);
            }
            Transaction::AccessList(tx) => {
                tx.chain_id.encode(&mut payload);
                tx.nonce.encode(&mut payload);
                tx.gas_price.encode(&mut payload);
                tx.gas_limit.encode(&mut payload);
                encode_to(&tx.to, &mut payload);
                tx.value.encode(&mut payload);
                tx.input.encode(&mut payload);
                tx.access_list.encode(&mut payload);
                tx.signature.encode(&mut payload);
            }
            Transaction::FeeMarket(tx) => {
                tx.chain_id.encode(&mut payload);
                tx.nonce.encode(&mut payload);
                tx.max_priority_fee_per_gas.encode(&mut payload);
                tx.max_fee_per_gas.encode(&mut payload);
                tx.gas_limit.encode(&mut payload);
                encode_to(&tx.to, &mut payload);
                tx.value.encode(&mut payload);
                tx.input.encode(&mut payload);
                tx.access_list.encode(&mut payload);
                tx.signature.encode(&mut payload);
            }
        }

        let mut out = Vec::with_capacity(payload.len() + 4);
        match self.tx_type() {
            TxType::Legacy => {}
            typed => out.put_u8(typed as u8),
        }
        put_list(&payload, &mut out);
        out.into()
    }

    pub fn hash(&self) -> B256 {
        keccak256(self.encoded())
    }
}

/// Encode a transaction and check the encoding against its reported hash.
///
/// There is no fallback encoding: a mismatch aborts with `EncodingMismatch`.
pub fn encode_transaction(
    raw: &RawTransaction,
    profile: &NetworkProfile,
) -> Result<Bytes, ProofError> {
    let encoded = Transaction::from_raw(raw, profile)?.encoded();
    let computed = keccak256(&encoded);
    if computed != raw.hash {
        return Err(ProofError::EncodingMismatch {
            expected: raw.hash,
            computed,
        });
    }
    Ok(encoded)
}

/// Contract creations commit an empty string in place of the recipient
fn encode_to(to: &Option<Address>, out: &mut dyn BufMut) {
    match to {
        Some(address) => address.encode(out),
        None => out.put_u8(EMPTY_STRING_CODE),
    }
}

fn typed_chain_id(raw: &RawTransaction, profile: &NetworkProfile) -> Result<U64, ProofError> {
    match raw.chain_id {
        Some(chain_id) if chain_id.to::<u64>() != profile.chain_id => {
            Err(ProofError::ChainIdMismatch {
                expected: profile.chain_id,
                found: chain_id.to::<u64>(),
            })
        }
        Some(chain_id) => Ok(chain_id),
        None => Ok(U64::from(profile.chain_id)),
    }
}

fn typed_signature(raw: &RawTransaction) -> Signature {
    let v = raw
        .y_parity
        .map(|parity| U256::from(parity.to::<u64>()))
        .unwrap_or(raw.v);
    Signature { v, r: raw.r, s: raw.s }
}

/// Replay-protected legacy signatures carry `v = chain_id * 2 + 35 + parity`
fn check_eip155_chain_id(v: &U256, chain_id: u64) -> Result<(), ProofError> {
    let base = U256::from(35);
    if *v < base {
        return Ok(());
    }
    let signed_for = (*v - base) / U256::from(2);
    if signed_for != U256::from(chain_id) {
        return Err(ProofError::ChainIdMismatch {
            expected: chain_id,
            found: signed_for.saturating_to::<u64>(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::Network;
    use crate::types::BlockWithTransactions;
    use alloy_primitives::hex;

    const BLOCK_JSON: &str = include_str!("../tests/fixtures/block_synthetic.json");

    const LEGACY_ENCODING: &str = "f86c098504a817c800825208943535353535353535353535353535353535353535880de0b6b3a76400008025a0834e9f608318bd8f8f624f790e15ce388f6063c469418ba5f47a3235b29f99d5a0b0ab6b2fab0a5a9e5ad9c8adbcc957b9cbfbfab5576f7329621083d759551372";
    const FEE_MARKET_ENCODING: &str = "02f87501078459682f008509502f9000830186a080809d6080604052348015600f57600080fd5b50603f80601d6000396000f3fec080a0b30894b322fc6b93289eb200825dd68a60b9dff2e4162a763d4b12fbf97617cea09212b3db3e2894431f716f82eb2d5cdf05dd39b96a4c4370ee342d092d107e00";

    fn fixture() -> (BlockWithTransactions, NetworkProfile) {
        let block: BlockWithTransactions = serde_json::from_str(BLOCK_JSON).unwrap();
        let profile = Network::Mainnet.profile_at(block.header.block_number()).unwrap();
        (block, profile)
    }

    #[test]
    fn test_encodings_match_reported_hashes() {
        let (block, profile) = fixture();
        for raw in &block.transactions {
            let encoded = encode_transaction(raw, &profile).unwrap();
            assert_eq!(keccak256(&encoded), raw.hash);
        }
    }

    #[test]
    fn test_legacy_encoding_bytes() {
        let (block, profile) = fixture();
        let tx = Transaction::from_raw(&block.transactions[0], &profile).unwrap();
        assert_eq!(tx.tx_type(), TxType::Legacy);
        assert_eq!(hex::encode(tx.encoded()), LEGACY_ENCODING);
    }

    #[test]
    fn test_access_list_envelope() {
        let (block, profile) = fixture();
        let tx = Transaction::from_raw(&block.transactions[1], &profile).unwrap();
        assert_eq!(tx.tx_type(), TxType::AccessList);

        let encoded = tx.encoded();
        assert_eq!(encoded[0], 0x01);
        // [address, [key, key]] nests as 0xf859 0x94<20 bytes> 0xf842 0xa0<32> 0xa0<32>
        let item = hex::encode(&encoded);
        assert!(item.contains("f85bf85994dac17f958d2ee523a2206206994597c13d831ec7f842a0"));
    }

    #[test]
    fn test_contract_creation_encodes_empty_recipient() {
        let (block, profile) = fixture();
        let tx = Transaction::from_raw(&block.transactions[2], &profile).unwrap();
        assert_eq!(tx.tx_type(), TxType::FeeMarket);
        assert_eq!(hex::encode(tx.encoded()), FEE_MARKET_ENCODING);
    }

    #[test]
    fn test_mutated_field_is_an_encoding_mismatch() {
        let (block, profile) = fixture();
        let mut raw = block.transactions[0].clone();
        raw.nonce = U64::from(10);
        assert!(matches!(
            encode_transaction(&raw, &profile),
            Err(ProofError::EncodingMismatch { expected, .. }) if expected == raw.hash
        ));
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let (block, profile) = fixture();
        let mut raw = block.transactions[2].clone();
        raw.tx_type = Some(U64::from(3));
        assert!(matches!(
            encode_transaction(&raw, &profile),
            Err(ProofError::UnexpectedTransactionType(3))
        ));
    }

    #[test]
    fn test_fee_market_before_london_is_rejected() {
        let (block, _) = fixture();
        let berlin = Network::Mainnet.profile_at(12_500_000).unwrap();
        assert!(matches!(
            Transaction::from_raw(&block.transactions[2], &berlin),
            Err(ProofError::TransactionTypeNotActive {
                tx_type: TxType::FeeMarket,
                ..
            })
        ));
        assert!(Transaction::from_raw(&block.transactions[1], &berlin).is_ok());
    }

    #[test]
    fn test_foreign_chain_id_is_rejected() {
        let (block, _) = fixture();
        let polygon = Network::Polygon.profile_at(50_000_000).unwrap();
        assert!(matches!(
            Transaction::from_raw(&block.transactions[1], &polygon),
            Err(ProofError::ChainIdMismatch {
                expected: 137,
                found: 1
            })
        ));
        // v = 37 was signed for chain id 1
        assert!(matches!(
            Transaction::from_raw(&block.transactions[0], &polygon),
            Err(ProofError::ChainIdMismatch {
                expected: 137,
                found: 1
            })
        ));
    }

    #[test]
    fn test_missing_chain_id_falls_back_to_profile() {
        let (block, profile) = fixture();
        let mut raw = block.transactions[2].clone();
        raw.chain_id = None;
        assert!(encode_transaction(&raw, &profile).is_ok());
    }

    #[test]
    fn test_missing_fee_field() {
        let (block, profile) = fixture();
        let mut raw = block.transactions[2].clone();
        raw.max_fee_per_gas = None;
        assert!(matches!(
            encode_transaction(&raw, &profile),
            Err(ProofError::MissingField("maxFeePerGas"))
        ));
    }
}
