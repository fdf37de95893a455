//! Error taxonomy of the proof pipeline. Every variant is fatal to the current request.

use alloy_primitives::B256;
use thiserror::Error;

use crate::codec::TxType;
use crate::network::{Hardfork, Network};

#[derive(Error, Debug)]
pub enum ProofError {
    /// Recomputed transaction hash disagrees with the reported one
    #[error("Transaction encoding mismatch: reported hash {expected}, computed {computed}")]
    EncodingMismatch { expected: B256, computed: B256 },
    /// Recomputed trie root disagrees with the header
    #[error("Transactions trie root mismatch: header declares {expected}, computed {computed}")]
    TrieRootMismatch { expected: B256, computed: B256 },
    /// No encoding profile for the requested network
    #[error("Unsupported network: {0}")]
    UnsupportedNetwork(String),
    /// Header layout of the active hardfork carries fields past `baseFeePerGas`
    #[error("Block {block_number} of {network} uses the {hardfork} header layout, which proofs do not encode")]
    UnsupportedHardfork {
        network: Network,
        hardfork: Hardfork,
        block_number: u64,
    },
    /// Header fields do not hash to the block hash reported alongside them
    #[error("Block hash mismatch: block reports {expected}, header hashes to {computed}")]
    BlockHashMismatch { expected: B256, computed: B256 },
    /// A trie node that is neither a branch, an extension nor a leaf
    #[error("Unsupported trie node type with {0} items")]
    UnsupportedNodeType(usize),
    /// Transaction type byte outside of legacy, 0x01 and 0x02
    #[error("Unexpected transaction type: {0:#x}")]
    UnexpectedTransactionType(u64),
    /// Known transaction type that the active hardfork does not define
    #[error("Transaction type {tx_type} is not active under {hardfork}")]
    TransactionTypeNotActive { tx_type: TxType, hardfork: Hardfork },
    /// Typed transaction signed for another chain than the active profile
    #[error("Chain id mismatch: profile expects {expected}, transaction reports {found}")]
    ChainIdMismatch { expected: u64, found: u64 },
    /// Field required by the transaction type is absent
    #[error("Missing transaction field: {0}")]
    MissingField(&'static str),
    /// Base fee is required by the profile but the header does not carry it
    #[error("Header has no base fee but the network profile requires one")]
    MissingBaseFee,
    /// Requested index is past the last transaction of the block
    #[error("Transaction index {index} out of range (block has {count} transactions)")]
    IndexOutOfRange { index: u64, count: usize },
    /// Trie walk did not end on a value for the requested key
    #[error("Transaction index {0} not found in the trie")]
    KeyNotFound(u64),
    /// Hash reference with no node behind it
    #[error("Missing trie node {0}")]
    MissingNode(B256),
    /// Malformed RLP while decoding a node
    #[error("RLP error: {0}")]
    Rlp(#[from] alloy_rlp::Error),
}
