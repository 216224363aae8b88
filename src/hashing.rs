//! Hashing System - SHA-256 for Fingerprints
//!
//! Provides deterministic, reproducible content digests for cache-busting.

use sha2::{Digest, Sha256};

/// Number of hex characters embedded in a fingerprinted filename.
pub const FINGERPRINT_LEN: usize = 16;

/// Compute SHA-256 hash of bytes, return hex string
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    hex::encode(result)
}

/// Compute the truncated content digest embedded in output filenames.
/// Same input bytes produce the same fingerprint across runs and machines.
pub fn fingerprint_digest(data: &[u8]) -> String {
    let mut digest = sha256_hex(data);
    digest.truncate(FINGERPRINT_LEN);
    digest
}

// We need hex encoding
mod hex {
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes.as_ref().iter().map(|b| format!("{:02x}", b)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_deterministic() {
        let data = b"test data";
        let h1 = sha256_hex(data);
        let h2 = sha256_hex(data);
        assert_eq!(h1, h2);
    }

    #[test]
    fn test_fingerprint_length_and_charset() {
        let digest = fingerprint_digest(b"body { color: red }");
        assert_eq!(digest.len(), FINGERPRINT_LEN);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_fingerprint_sensitive_to_one_byte() {
        let a = fingerprint_digest(b"console.log(1)");
        let b = fingerprint_digest(b"console.log(2)");
        assert_ne!(a, b);
    }
}
