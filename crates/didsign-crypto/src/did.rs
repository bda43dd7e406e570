// Sovrin DID derivation
// A Sovrin DID is the base58 encoding of the first 16 bytes of the Ed25519 verify key.

use ed25519_dalek::VerifyingKey;

/// Number of verify key bytes that make up the DID.
const SOVRIN_DID_BYTES: usize = 16;

/// Method prefix accepted in front of a bare Sovrin DID.
pub const SOVRIN_DID_PREFIX: &str = "did:sov:";

/// Derives the bare Sovrin DID (no method prefix) for a verify key.
pub fn did_from_verify_key(verify_key: &VerifyingKey) -> String {
    bs58::encode(&verify_key.as_bytes()[..SOVRIN_DID_BYTES]).into_string()
}

/// Adds the `did:sov:` prefix to a bare DID; leaves prefixed DIDs untouched.
pub fn qualified_did(did: &str) -> String {
    if did.starts_with("did:") {
        did.to_string()
    } else {
        format!("{}{}", SOVRIN_DID_PREFIX, did)
    }
}
