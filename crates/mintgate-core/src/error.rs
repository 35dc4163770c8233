use thiserror::Error;

/// Canonical error type exposed by the core primitives.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Hex input could not be decoded.
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    /// An account identifier was not exactly 20 bytes.
    #[error("invalid account length: expected 20 bytes, got {0}")]
    InvalidAccount(usize),

    /// A digest (root, leaf or proof element) was not exactly 32 bytes.
    #[error("invalid digest length: expected 32 bytes, got {0}")]
    InvalidDigest(usize),

    /// Merkle tree builder failure.
    #[error("merkle error: {0}")]
    Merkle(String),
}
