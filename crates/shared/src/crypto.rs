//! Digest utilities for API key comparison.

use sha2::{Digest, Sha256};

/// Computes SHA-256 hash of the input and returns it as a hex string.
pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Compares a presented API key against a configured key by digest.
///
/// Both sides are hashed before comparison so a timing difference never
/// reveals a shared prefix of the configured key.
pub fn key_matches(presented: &str, configured: &str) -> bool {
    sha256_hex(presented) == sha256_hex(configured)
}

/// Extracts the prefix from an API key (first 8 characters after "bm_").
///
/// The prefix is safe to log; the rest of the key is not.
pub fn extract_key_prefix(key: &str) -> Option<&str> {
    if key.starts_with("bm_") && key.len() >= 11 {
        Some(&key[3..11])
    } else {
        None
    }
}
