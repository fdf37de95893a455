use alloy_primitives::B256;
use eth_tx_proof::ProofError;
use thiserror::Error;

/// Reasons a proof blob is rejected
#[derive(Error, Debug)]
pub enum VerifyError {
    /// Blob or one of its items is not canonical RLP of the expected shape
    #[error("Malformed proof encoding: {0}")]
    Rlp(#[from] alloy_rlp::Error),
    /// Discriminant other than the inclusion-proof scheme
    #[error("Unsupported proof tag: {0}")]
    UnsupportedTag(u8),
    /// Header list is neither the 15 legacy fields nor 16 with the base fee
    #[error("Unexpected number of header fields: {0}")]
    HeaderFieldCount(usize),
    /// Header fields do not hash to the trusted block hash
    #[error("Block hash mismatch: expected {expected}, proof header hashes to {computed}")]
    BlockHashMismatch { expected: B256, computed: B256 },
    /// Node does not match the reference held by its parent (or the transactions root)
    #[error("Proof node {depth} does not match its parent reference")]
    NodeMismatch { depth: usize },
    /// Node matches its reference but does not decode as a trie node
    #[error("Malformed proof node {depth}: {source}")]
    MalformedNode { depth: usize, source: ProofError },
    /// Extension or leaf path disagrees with the transaction key
    #[error("Key diverges from the trie path at node {depth}")]
    Divergence { depth: usize },
    /// Empty child or value slot on the key path
    #[error("Key is absent from the trie at node {depth}")]
    Absent { depth: usize },
    /// Nodes left over after the value was reached
    #[error("Proof carries {total} nodes but the value was reached after {used}")]
    LeftoverNodes { used: usize, total: usize },
    /// Node list runs out on a hash or inline reference
    #[error("Proof ends before reaching a value")]
    ShortProof,
}
