//! Hash utilities for file fingerprints
//! Every file reference carries a SHA-256 checksum over the full byte
//! stream, rendered as lowercase hex.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use sha2::{Digest as ShaDigest, Sha256};

/// Hashes a byte slice with SHA-256, lowercase hex
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Hashes file content at the given path
pub fn sha256_file(path: &Path) -> Result<String, std::io::Error> {
    let mut file = File::open(path)?;
    let mut buffer = Vec::new();
    file.read_to_end(&mut buffer)?;
    Ok(sha256_hex(&buffer))
}

/// Verifies content hash matches the expected value
pub fn verify_sha256(data: &[u8], expected: &str) -> bool {
    sha256_hex(data).eq_ignore_ascii_case(expected)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_hashing() {
        let input = b"forensic test";
        let digest = sha256_hex(input);
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(digest, digest.to_lowercase());
    }

    #[test]
    fn test_verify_correct_hash() {
        let input = b"integrity";
        let digest = sha256_hex(input);
        assert!(verify_sha256(input, &digest));
    }

    #[test]
    fn test_verify_incorrect_hash() {
        assert!(!verify_sha256(b"tampered", "abcdef123456"));
    }
}
