//! Ethereum transaction inclusion proof client
//!
//! This library fetches a block with its transactions from a JSON-RPC node, builds the
//! inclusion proof of one transaction and reads and writes proof files.

pub mod fetch;
pub mod format;
pub mod verify;

pub use fetch::{fetch_inclusion_proof, BlockProvider, ProofFile, ProofTarget};
pub use verify::verify_proof_file;
