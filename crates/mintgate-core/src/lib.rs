//! Core primitives for the mintgate issuance ledger.
//!
//! This crate exposes the building blocks that the ledger and the off-line
//! allowlist tooling share:
//!
//! * [`account`] — 20-byte account identifiers and their allowlist leaves.
//! * [`merkle`] — Keccak-256 sorted-pair Merkle trees: the builder used to
//!   commit to an allowlist and the verifier used to check membership proofs.
//!
//! Both sides must hash pairs the same way, so the pairing rule lives in one
//! place ([`merkle::hash_pair`]) and everything else goes through it.

pub mod account;
pub mod merkle;

mod error;

pub use account::Account;
pub use error::CoreError;
pub use merkle::{keccak256, AllowlistTree, Digest, MerkleProof};
