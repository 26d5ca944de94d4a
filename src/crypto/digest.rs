//! SHA-256 fingerprints for log correlation.
//!
//! Raw tickets, signatures and signed documents are credentials; logs
//! carry a short digest prefix instead so two log lines about the same
//! proof can still be matched up.

use sha2::{Digest, Sha256};

/// Number of hex characters kept from the digest.
pub const FINGERPRINT_LEN: usize = 12;

/// Full SHA-256 digest, hex-encoded.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Short, log-safe fingerprint of a credential.
pub fn fingerprint(data: &[u8]) -> String {
    let mut digest = sha256_hex(data);
    digest.truncate(FINGERPRINT_LEN);
    digest
}
