//! Ethereum transaction inclusion proofs
//!
//! This crate builds the transactions Merkle-Patricia trie of a block, checks it against
//! the header, extracts the root-to-leaf node path for a transaction index and packages
//! header and path into a single RLP proof blob for an on-chain verifier.

pub mod codec;
pub mod error;
pub mod network;
pub mod path;
pub mod proof;
pub mod prove;
pub mod trie;
pub mod types;

pub use codec::{encode_transaction, Transaction, TxType};
pub use error::ProofError;
pub use network::{Hardfork, Network, NetworkProfile};
pub use path::{extract_path, ProofPath, ProofStep, Terminus};
pub use proof::{encode_proof, INCLUSION_PROOF_TAG};
pub use prove::{
    build_inclusion_proof, build_transactions_trie, encode_block_transactions, prove_transaction,
    InclusionProof,
};
pub use trie::{transaction_key, NodeRef, Trie, TrieBuilder, TrieNode, EMPTY_ROOT_HASH};
pub use types::{AccessListItem, BlockHeader, BlockWithTransactions, RawTransaction};
