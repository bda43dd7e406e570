// Transaction hashing

use sha2::{Digest, Sha256};

/// SHA-256 of the given bytes as upper-case hex, the form ledgers report tx hashes in.
pub fn tx_hash_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode_upper(hasher.finalize())
}
