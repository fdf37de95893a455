//! Ethereum transaction inclusion proof verification
//!
//! This crate replays a proof blob the way an on-chain verifier does: it decodes the blob,
//! checks the header against a trusted block hash and walks the transactions trie from the
//! header's root down to the claimed transaction.

pub mod error;
pub mod proof;
pub mod verify;

pub use error::VerifyError;
pub use proof::{decode_proof, DecodedProof};
pub use verify::{verify_inclusion, verify_path, VerifiedInclusion};
