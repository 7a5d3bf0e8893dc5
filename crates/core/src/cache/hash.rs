//! Content digests for integrity verification.

use sha2::{Digest, Sha256};

/// Computes and checks content digests of downloaded resources.
pub trait ContentVerifier: Send + Sync {
    /// Hex-encoded digest of `bytes`.
    fn digest(&self, bytes: &[u8]) -> String;

    /// Whether `bytes` hash to `expected` (hex, case-insensitive).
    fn verify(&self, bytes: &[u8], expected: &str) -> bool {
        self.digest(bytes).eq_ignore_ascii_case(expected.trim())
    }
}

/// SHA-256 verifier producing lowercase hex.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Verifier;

impl ContentVerifier for Sha256Verifier {
    fn digest(&self, bytes: &[u8]) -> String {
        sha256_hex(bytes)
    }
}

/// Lowercase hex SHA-256 of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
